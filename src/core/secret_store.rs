use std::fmt;

use tracing::debug;

use super::errors::CoreError;

pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

const KEYRING_SERVICE: &str = "com.resumescreener.openai.api_key";
const KEYRING_USERNAME: &str = "default";

/// The model API key. Never printed by `Debug`.
#[derive(Clone)]
pub struct ApiCredential(String);

impl ApiCredential {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Environment (with an optional `.env` file) first, then the OS keychain.
    pub fn resolve(store: &ApiKeyStore) -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::resolve_from(std::env::var(API_KEY_ENV).ok(), store)
    }

    fn resolve_from(env_value: Option<String>, store: &ApiKeyStore) -> anyhow::Result<Self> {
        if let Some(value) = env_value.filter(|v| !v.trim().is_empty()) {
            debug!("using API key from {API_KEY_ENV}");
            return Ok(Self(value.trim().to_string()));
        }

        match store.load() {
            Ok(Some(value)) => {
                debug!("using API key from OS keychain");
                Ok(Self(value))
            }
            Ok(None) => Err(CoreError::MissingApiKey.into()),
            Err(err) => {
                debug!(error = %err, "keychain lookup failed");
                Err(CoreError::MissingApiKey.into())
            }
        }
    }
}

impl fmt::Debug for ApiCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiCredential(***)")
    }
}

pub struct ApiKeyStore {
    service: String,
}

impl ApiKeyStore {
    pub fn new() -> Self {
        Self {
            service: KEYRING_SERVICE.to_string(),
        }
    }

    pub fn with_service(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    pub fn load(&self) -> anyhow::Result<Option<String>> {
        let entry = keyring::Entry::new(&self.service, KEYRING_USERNAME)?;
        let value = match entry.get_password() {
            Ok(v) => v,
            Err(keyring::Error::NoEntry) => return Ok(None),
            Err(err) => return Err(err.into()),
        };

        if value.trim().is_empty() {
            return Ok(None);
        }

        Ok(Some(value))
    }

    pub fn save(&self, secret: &str) -> anyhow::Result<()> {
        let trimmed = secret.trim();
        if trimmed.is_empty() {
            return Err(CoreError::InvalidRequest("API key must not be empty".to_string()).into());
        }

        let entry = keyring::Entry::new(&self.service, KEYRING_USERNAME)?;
        entry.set_password(trimmed)?;
        Ok(())
    }

    pub fn clear(&self) -> anyhow::Result<()> {
        let entry = keyring::Entry::new(&self.service, KEYRING_USERNAME)?;
        match entry.delete_credential() {
            Ok(_) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

impl Default for ApiKeyStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unused_store() -> ApiKeyStore {
        ApiKeyStore::with_service("com.resumescreener.test.unused")
    }

    #[test]
    fn environment_value_wins_and_is_trimmed() {
        let credential =
            ApiCredential::resolve_from(Some("  sk-env \n".to_string()), &unused_store()).unwrap();
        assert_eq!(credential.expose(), "sk-env");
    }

    #[test]
    fn blank_environment_and_empty_keychain_is_a_configuration_error() {
        let err = ApiCredential::resolve_from(Some("   ".to_string()), &unused_store()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CoreError>(),
            Some(CoreError::MissingApiKey)
        ));
    }

    #[test]
    fn debug_output_hides_the_key() {
        let credential = ApiCredential::new("sk-secret");
        assert_eq!(format!("{credential:?}"), "ApiCredential(***)");
    }

    #[test]
    fn saving_blank_key_is_rejected() {
        let err = unused_store().save("   ").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CoreError>(),
            Some(CoreError::InvalidRequest(_))
        ));
    }
}

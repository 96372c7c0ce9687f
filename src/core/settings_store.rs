use std::path::PathBuf;

use anyhow::Context;

use super::models::RuntimeSettings;

pub struct SettingsStore {
    file_path: PathBuf,
}

impl SettingsStore {
    pub fn new() -> Self {
        Self {
            file_path: settings_path(),
        }
    }

    pub fn with_path(file_path: PathBuf) -> Self {
        Self { file_path }
    }

    pub fn path(&self) -> &PathBuf {
        &self.file_path
    }

    pub async fn load(&self) -> anyhow::Result<RuntimeSettings> {
        if !tokio::fs::try_exists(&self.file_path)
            .await
            .unwrap_or(false)
        {
            return Ok(RuntimeSettings::default());
        }

        let content = tokio::fs::read_to_string(&self.file_path)
            .await
            .with_context(|| {
                format!("failed to read settings file {}", self.file_path.display())
            })?;

        let parsed = serde_json::from_str::<RuntimeSettings>(&content).with_context(|| {
            format!("invalid JSON in settings file {}", self.file_path.display())
        })?;

        Ok(parsed.sanitized())
    }

    pub async fn save(&self, settings: &RuntimeSettings) -> anyhow::Result<()> {
        if let Some(parent) = self.file_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let json = serde_json::to_string_pretty(&settings.clone().sanitized())?;
        tokio::fs::write(&self.file_path, json).await?;
        Ok(())
    }
}

impl Default for SettingsStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Overrides the directory holding `settings.json`.
pub const CONFIG_DIR_ENV: &str = "RESUME_SCREENER_CONFIG_DIR";

const APP_DIR_NAME: &str = "resume-screener";

fn settings_path() -> PathBuf {
    config_root().join("settings.json")
}

/// `$RESUME_SCREENER_CONFIG_DIR` when set, else the per-user config directory.
pub fn config_root() -> PathBuf {
    if let Some(dir) = std::env::var_os(CONFIG_DIR_ENV).filter(|v| !v.is_empty()) {
        return PathBuf::from(dir);
    }

    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_file_yields_defaults() {
        let temp = tempfile::tempdir().unwrap();
        let store = SettingsStore::with_path(temp.path().join("absent.json"));

        let settings = store.load().await.unwrap();
        assert_eq!(settings, RuntimeSettings::default());
    }

    #[tokio::test]
    async fn saved_settings_load_back_sanitized() {
        let temp = tempfile::tempdir().unwrap();
        let store = SettingsStore::with_path(temp.path().join("nested").join("settings.json"));

        let settings = RuntimeSettings {
            model: "gpt-4o-mini".to_string(),
            temperature: 0.3,
            max_attempts: 0,
            ..RuntimeSettings::default()
        };
        store.save(&settings).await.unwrap();

        let loaded = store.load().await.unwrap();
        assert_eq!(loaded.model, "gpt-4o-mini");
        assert!((loaded.temperature - 0.3).abs() < f32::EPSILON);
        assert_eq!(loaded.max_attempts, 1);
    }

    #[tokio::test]
    async fn malformed_file_names_the_path() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("settings.json");
        tokio::fs::write(&path, "{ not json").await.unwrap();

        let err = SettingsStore::with_path(path).load().await.unwrap_err();
        assert!(err.to_string().contains("invalid JSON in settings file"));
    }

    #[test]
    fn config_dir_override_is_used_for_settings_path() {
        let temp = tempfile::tempdir().unwrap();
        std::env::set_var(CONFIG_DIR_ENV, temp.path());
        let path = SettingsStore::new().path().clone();
        std::env::remove_var(CONFIG_DIR_ENV);

        assert_eq!(path, temp.path().join("settings.json"));
    }
}

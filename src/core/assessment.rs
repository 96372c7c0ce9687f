use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use super::chat_model::{ChatModel, OpenAiChatClient};
use super::errors::CoreError;
use super::models::{AssessmentReply, RuntimeSettings};
use super::prompt::build_prompt;
use super::secret_store::ApiCredential;

pub struct AssessmentClient {
    model: Arc<dyn ChatModel>,
    max_attempts: usize,
    retry_delay: Duration,
}

impl AssessmentClient {
    pub fn new(model: Arc<dyn ChatModel>) -> Self {
        Self {
            model,
            max_attempts: 1,
            retry_delay: Duration::from_secs(1),
        }
    }

    pub fn with_retry(mut self, max_attempts: usize, retry_delay: Duration) -> Self {
        self.max_attempts = max_attempts.max(1);
        self.retry_delay = retry_delay;
        self
    }

    pub fn from_settings(
        settings: &RuntimeSettings,
        credential: ApiCredential,
    ) -> anyhow::Result<Self> {
        let model = OpenAiChatClient::new(settings, credential)?;
        Ok(Self::new(Arc::new(model)).with_retry(
            settings.max_attempts,
            Duration::from_secs_f64(settings.retry_delay_seconds),
        ))
    }

    /// Blank resume text short-circuits to `NoContent` without calling the model.
    pub async fn assess(&self, resume_text: &str, job_description: &str) -> AssessmentReply {
        if resume_text.trim().is_empty() {
            return AssessmentReply::NoContent;
        }

        let prompt = build_prompt(job_description, resume_text);

        for attempt in 0..self.max_attempts {
            match self.model.complete(&prompt).await {
                Ok(text) => return AssessmentReply::Completed(text),
                Err(err) => {
                    let is_last_attempt = attempt + 1 >= self.max_attempts;
                    if is_retryable_error(&err) && !is_last_attempt {
                        let backoff = self.retry_delay.mul_f64(2_f64.powf(attempt as f64));
                        warn!(
                            attempt = attempt + 1,
                            backoff_ms = backoff.as_millis() as u64,
                            error = %err,
                            "model call failed, retrying"
                        );
                        tokio::time::sleep(backoff).await;
                        continue;
                    }

                    warn!(error = %err, "model call failed");
                    return AssessmentReply::Failed(format!("{err:#}"));
                }
            }
        }

        AssessmentReply::Failed("no attempts made".to_string())
    }
}

fn is_retryable_error(error: &anyhow::Error) -> bool {
    if let Some(core_error) = error.downcast_ref::<CoreError>() {
        return core_error.is_retryable();
    }

    if let Some(reqwest_error) = error.downcast_ref::<reqwest::Error>() {
        if reqwest_error.is_timeout() || reqwest_error.is_connect() {
            return true;
        }

        if let Some(status) = reqwest_error.status() {
            let code = status.as_u16();
            return code == 429 || code >= 500;
        }
    }

    false
}

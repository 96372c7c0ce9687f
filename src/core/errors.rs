use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Model API request failed with status {status}: {body}")]
    ModelApi { status: u16, body: String },
    #[error("Model API returned no message content")]
    EmptyModelReply,
    #[error("API key is not configured. Set OPENAI_API_KEY or run `credential set`.")]
    MissingApiKey,
    #[error("Unsupported file type: {0}")]
    UnsupportedFormat(String),
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl CoreError {
    pub fn is_retryable(&self) -> bool {
        match self {
            CoreError::ModelApi { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

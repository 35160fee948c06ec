use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("{service} returned an error (status {status:?}): {message}")]
    Remote {
        service: &'static str,
        status: Option<u16>,
        message: String,
    },

    #[error("llm failure: {0}")]
    Llm(String),

    #[error("invalid pipeline transition: {0}")]
    StateTransition(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CoreError {
    /// Network-level failures and 5xx/429 answers are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            CoreError::Transport(_) => true,
            CoreError::Remote { status, .. } => {
                matches!(status, Some(s) if *s >= 500 || *s == 429)
            }
            _ => false,
        }
    }

    pub(crate) fn remote(service: &'static str, status: Option<u16>, message: impl Into<String>) -> Self {
        CoreError::Remote {
            service,
            status,
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for CoreError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            return CoreError::remote("http", None, format!("undecodable response body: {}", err));
        }
        match err.status() {
            Some(status) => CoreError::Remote {
                service: "http",
                status: Some(status.as_u16()),
                message: err.to_string(),
            },
            None => CoreError::Transport(err.to_string()),
        }
    }
}

pub type CoreResult<T> = Result<T, CoreError>;

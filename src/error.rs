use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("rpc error: {0}")]
    Rpc(String),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("state error: {0}")]
    State(String),
    #[error("chat session is awaiting a reply")]
    SessionBusy,
    #[error("provider not found: {0}")]
    ProviderNotFound(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

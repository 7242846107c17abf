use thiserror::Error;

#[derive(Error, Debug)]
pub enum SseError {
    #[error("Malformed JSON in SSE data: {0}")]
    MalformedJson(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Upstream error: {0}")]
    UpstreamError(String),

    #[error("Transport error: {0}")]
    TransportError(String),
}

pub type Result<T> = std::result::Result<T, SseError>;

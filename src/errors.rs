use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Failures raised inside the notifier. None of these ever leave `main`: callers
/// turn them into strategy outcomes or log them and carry on.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("script error: {0}")]
    Script(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

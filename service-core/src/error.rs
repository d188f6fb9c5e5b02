use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    ConfigError(anyhow::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Decoding error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Tracing setup error: {0}")]
    Tracing(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::ConfigError(anyhow::Error::new(err))
    }
}

impl From<tracing_subscriber::util::TryInitError> for AppError {
    fn from(err: tracing_subscriber::util::TryInitError) -> Self {
        AppError::Tracing(err.to_string())
    }
}

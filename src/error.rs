use thiserror::Error;

/// Failures of the ambient surface: storage, configuration and IO.
///
/// Widget interactions never produce these; invalid user input is corrected
/// or ignored in place.
#[derive(Debug, Error)]
pub enum FormError {
    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("invalid config file: {0}")]
    Config(#[from] toml::de::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid bind address '{0}'")]
    BindAddr(String),
}

pub type Result<T> = std::result::Result<T, FormError>;

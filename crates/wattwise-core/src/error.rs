use thiserror::Error;

/// Top-level error type for the Wattwise system.
///
/// Subsystem crates define their own error types and wrap this one, so that
/// the `?` operator works across crate boundaries.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum WattwiseError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Collaborator error: {0}")]
    Collaborator(String),
}

impl From<toml::de::Error> for WattwiseError {
    fn from(err: toml::de::Error) -> Self {
        WattwiseError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for WattwiseError {
    fn from(err: toml::ser::Error) -> Self {
        WattwiseError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for WattwiseError {
    fn from(err: serde_json::Error) -> Self {
        WattwiseError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for Wattwise operations.
pub type Result<T> = std::result::Result<T, WattwiseError>;

//! Engine error taxonomy
//!
//! Every fallible operation in the engine returns [`EngineError`]. The variants
//! follow where a failure originates rather than which module raised it:
//!
//! - [`EngineError::Config`] - invalid settings or options
//! - [`EngineError::File`] - I/O failure (settings files, collaborator loaders)
//! - [`EngineError::Parse`] - malformed data handed in by a collaborator
//! - [`EngineError::System`] - platform, driver or context failure
//! - [`EngineError::Data`] - inconsistent in-memory state

/// Errors produced by the engine runtime.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    /// Bad settings or options
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O failure
    #[error("file error: {0}")]
    File(String),

    /// Malformed data
    #[error("parse error: {0}")]
    Parse(String),

    /// Platform, driver or graphics context failure
    #[error("system error: {0}")]
    System(String),

    /// Inconsistent in-memory state
    #[error("data error: {0}")]
    Data(String),
}

impl EngineError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn file(msg: impl Into<String>) -> Self {
        Self::File(msg.into())
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    pub fn system(msg: impl Into<String>) -> Self {
        Self::System(msg.into())
    }

    pub fn data(msg: impl Into<String>) -> Self {
        Self::Data(msg.into())
    }
}

impl From<std::io::Error> for EngineError {
    fn from(err: std::io::Error) -> Self {
        Self::File(err.to_string())
    }
}

impl From<toml::de::Error> for EngineError {
    fn from(err: toml::de::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

/// Result alias used throughout the engine.
pub type Result<T> = std::result::Result<T, EngineError>;

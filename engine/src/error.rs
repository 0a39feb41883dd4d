use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("persistence error: {0}")]
    Persistence(String),

    #[error("operation cancelled")]
    Cancelled,

    #[error("malformed input: {0}")]
    Malformed(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("spatial index error: {0}")]
    Spatial(#[from] fortwatch_spatial::SpatialError),

    #[error("webhook delivery failed: {0}")]
    Webhook(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    pub fn persistence(message: impl Into<String>) -> Self {
        Self::Persistence(message.into())
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed(message.into())
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

impl From<toml::de::Error> for EngineError {
    fn from(err: toml::de::Error) -> Self {
        EngineError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("directions request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("directions provider returned {code}: {message}")]
    Provider { code: String, message: String },
    #[error("directions provider found no route")]
    NoRoute,
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("invalid configuration: {0}")]
    Config(String),
    #[cfg(feature = "redis")]
    #[error(transparent)]
    Redis(#[from] redis::RedisError),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn provider(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}

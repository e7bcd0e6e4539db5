use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing configuration key `{0}`")]
    KeyNotFound(String),

    #[error("cannot read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot tell the configuration format of {}", .0.display())]
    UnknownFormat(PathBuf),

    #[error("invalid {format} configuration: {message}")]
    Parse {
        format: &'static str,
        message: String,
    },

    #[error("configuration root must be a table")]
    NotATable,

    #[error("invalid setting `{field}`: {message}")]
    Invalid { field: String, message: String },

    #[error("configuration value has the wrong shape: {0}")]
    Shape(#[from] serde_json::Error),

    #[error(".env error: {0}")]
    Dotenv(#[from] dotenvy::Error),

    #[error("environment variable error: {0}")]
    Env(#[from] std::env::VarError),
}

impl ConfigError {
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        ConfigError::Invalid {
            field: field.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ConfigError>;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum NonceError {
    #[error("Nonce secret must be at least {0} bytes")]
    SecretTooShort(usize),

    #[error("Nonce lifetime must be at least 2 seconds, got {0}")]
    InvalidLifetime(i64),

    #[error("Invalid key: {0}")]
    InvalidKey(String),
}

pub type Result<T> = std::result::Result<T, NonceError>;

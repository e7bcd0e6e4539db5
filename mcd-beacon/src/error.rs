use crate::report::RecordId;
use thiserror::Error;

/// Reasons a beacon request is not turned into a record
#[derive(Error, Debug)]
pub enum BeaconError {
    #[error("No authenticated user")]
    Unauthenticated,

    #[error("Not a beacon request")]
    NotBeacon,

    #[error("Missing or invalid nonce")]
    InvalidNonce,

    #[error("Body is not JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Body has no csp-report object")]
    MissingReport,

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}

/// Report storage errors
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Record not found: {0}")]
    NotFound(RecordId),

    #[error("Corrupt store at line {line}: {reason}")]
    Corrupt { line: usize, reason: String },
}

pub type Result<T> = std::result::Result<T, StoreError>;

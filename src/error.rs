use crate::types::DataType;
use thiserror::Error;

/// Error type for page decoding and scan operations.
#[derive(Error, Debug)]
pub enum PageError {
    /// The page declares a data type that has no decode path.
    #[error("Unsupported data type: {0}")]
    UnsupportedType(DataType),

    #[error("I/O Error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed page bytes: bad length prefix, truncated stream, overlong varint.
    #[error("Decode error: {0}")]
    Decode(String),

    /// Caller violated a precondition (e.g. a non-zero measurement index).
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Type mismatch: expected {expected}, got {actual}")]
    TypeMismatch { expected: DataType, actual: DataType },

    #[error("Corruption detected: {details}")]
    Corruption { details: String },

    #[error("Serialization Error: {0}")]
    Serialization(String),

    #[error("Configuration Error: {0}")]
    ConfigError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<bincode::Error> for PageError {
    fn from(err: bincode::Error) -> Self {
        PageError::Serialization(err.to_string())
    }
}

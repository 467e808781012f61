use thiserror::Error;

/// Main error type for PER codec operations
#[derive(Error, Debug)]
pub enum PerError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Insufficient data: {0}")]
    Exhausted(String),

    #[error("Invalid encoding: {0}")]
    InvalidEncoding(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),
}

/// Result type alias for PER codec operations
pub type PerResult<T> = Result<T, PerError>;

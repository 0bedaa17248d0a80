//! Error types for the loadcast sample store.

use thiserror::Error;

/// Result type alias for sample store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur during sample store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to open database: {0}")]
    Open(String),

    #[error("transaction error: {0}")]
    Transaction(String),

    #[error("table error: {0}")]
    Table(String),

    #[error("read error: {0}")]
    Read(String),

    #[error("write error: {0}")]
    Write(String),

    #[error("serialization error: {0}")]
    Serialize(String),

    #[error("deserialization error: {0}")]
    Deserialize(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed csv at line {line}: {message}")]
    Csv { line: usize, message: String },
}

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FlowError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
    #[error("Storage error: {0}")]
    StorageError(String),
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Verification service is no longer running")]
    ServiceClosed,
}

#[cfg(feature = "storage-rocksdb")]
impl From<rocksdb::Error> for FlowError {
    fn from(e: rocksdb::Error) -> Self {
        FlowError::StorageError(e.into_string())
    }
}

pub type Result<T> = std::result::Result<T, FlowError>;

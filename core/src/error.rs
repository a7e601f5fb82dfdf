use std::collections::TryReserveError;
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FatError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    IoError(#[from] io::Error),

    #[error("Out of range: {0}")]
    OutOfRange(String),

    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    #[error("Out of memory: {0}")]
    OutOfMemory(String),

    #[error("Not a directory: {0}")]
    NotADirectory(String),

    #[error("Is a directory: {0}")]
    IsADirectory(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

pub type FatResult<T> = Result<T, FatError>;

impl FatError {
    /// Stable label for the error kind, independent of the context message
    pub fn kind_name(&self) -> &'static str {
        match self {
            FatError::InvalidArgument(_) => "InvalidArgument",
            FatError::NotFound(_) => "NotFound",
            FatError::IoError(_) => "IoError",
            FatError::OutOfRange(_) => "OutOfRange",
            FatError::InvalidFormat(_) => "InvalidFormat",
            FatError::OutOfMemory(_) => "OutOfMemory",
            FatError::NotADirectory(_) => "NotADirectory",
            FatError::IsADirectory(_) => "IsADirectory",
            FatError::Configuration(_) => "Configuration",
            FatError::SerializationError(_) => "SerializationError",
        }
    }
}

impl From<TryReserveError> for FatError {
    fn from(err: TryReserveError) -> Self {
        FatError::OutOfMemory(err.to_string())
    }
}

// Lets file handles sit behind std::io::Read / Seek
impl From<FatError> for io::Error {
    fn from(err: FatError) -> Self {
        let kind = match &err {
            FatError::IoError(inner) => return io::Error::new(inner.kind(), err.to_string()),
            FatError::InvalidArgument(_) | FatError::OutOfRange(_) => io::ErrorKind::InvalidInput,
            FatError::NotFound(_) => io::ErrorKind::NotFound,
            FatError::InvalidFormat(_)
            | FatError::Configuration(_)
            | FatError::SerializationError(_) => io::ErrorKind::InvalidData,
            FatError::OutOfMemory(_) => io::ErrorKind::OutOfMemory,
            FatError::NotADirectory(_) | FatError::IsADirectory(_) => io::ErrorKind::Other,
        };
        io::Error::new(kind, err)
    }
}

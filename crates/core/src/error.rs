use crate::authorization::Permission;
use crate::lab::{LabAction, LabStatus};
use crate::validation::ValidationFailure;
use lab_uuid::ShardableUuid;

#[derive(Debug, thiserror::Error)]
pub enum LabError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("validation failed: {0}")]
    Validation(ValidationFailure),
    #[error("cannot {action} a lab request that is {status}")]
    InvalidState { status: LabStatus, action: LabAction },
    #[error("lab request not found: {0}")]
    NotFound(ShardableUuid),
    #[error("permission required: {0}")]
    Unauthorized(Permission),
    #[error("failed to persist lab request: {0}")]
    Persistence(#[from] StorageError),
}

/// Failures raised by a storage adapter behind the repository port.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("failed to create lab directory: {0}")]
    DirCreation(std::io::Error),
    #[error("failed to read lab request file: {0}")]
    FileRead(std::io::Error),
    #[error("failed to write lab request file: {0}")]
    FileWrite(std::io::Error),
    #[error("lab request file is invalid: {0}")]
    Wire(#[from] lab_wire::WireError),
    #[error("lab store unavailable: {0}")]
    Unavailable(String),
}

pub type LabResult<T> = std::result::Result<T, LabError>;

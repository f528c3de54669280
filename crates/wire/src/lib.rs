//! On-disk wire support for lab requests.
//!
//! This crate provides the **wire model** and **format/translation helpers** for the YAML file
//! a lab request is persisted as. It knows nothing about the lifecycle rules; it only
//! guarantees that what it parses is structurally sound:
//! - unknown keys are rejected (`#[serde(deny_unknown_fields)]`)
//! - schema mismatches report the offending path (via `serde_path_to_error`)
//! - identifiers and timestamps are parsed into typed values
//! - the status/timestamp pairing is consistent

pub mod lab_request;

pub use lab_request::{LabRequestData, LabRequestFile, RequestStatus};

/// Errors returned by the `lab-wire` boundary crate.
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("translation error: {0}")]
    Translation(String),

    #[error("invalid UUID: {0}")]
    InvalidUuid(String),

    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),
}

/// Type alias for Results that can fail with a [`WireError`].
pub type WireResult<T> = Result<T, WireError>;

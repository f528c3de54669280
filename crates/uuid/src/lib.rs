//! Lab request identifiers.
//!
//! A [`ShardableUuid`] is a random (v4) UUID that only ever exists in its simple form:
//! 32 lowercase hex digits, e.g. `550e8400e29b41d4a716446655440000`. That one string is what
//! the CLI prints, what `lab.yaml` stores, and what the storage directory is named after.
//! [`ShardableUuid::parse`] rejects anything else (hyphens, uppercase, wrong length).
//!
//! The first two pairs of hex digits pick the shard directories, so a lab lives at
//! `<parent>/55/0e/550e8400e29b41d4a716446655440000/`.

mod service;

pub use service::ShardableUuid;

#[derive(Debug, thiserror::Error)]
pub enum UuidError {
    #[error("not a canonical lab id: {0}")]
    InvalidInput(String),
}

pub type UuidResult<T> = Result<T, UuidError>;

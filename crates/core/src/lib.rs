//! # Lab Core
//!
//! Core business logic for laboratory test requests.
//!
//! This crate contains the request lifecycle and its storage:
//! - The [`Lab`] entity and its `requested -> completed | canceled` state machine
//! - Validation of proposed actions and new requests
//! - The [`LabWorkflow`] that checks permissions, applies a submission and saves it once
//! - Repository adapters (in-memory and sharded YAML files under `LAB_DATA_DIR`)
//!
//! **No presentation concerns**: rendering, prompts and argument parsing belong in `lab-cli`.

pub mod authorization;
pub mod clock;
pub mod config;
pub mod constants;
pub mod error;
pub mod lab;
pub mod repositories;
pub mod transition;
pub mod validation;
pub mod workflow;

pub use authorization::{
    offerable_actions, required_permission, AuthorizationGate, GrantedPermissions, Permission,
    Principal,
};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::CoreConfig;
pub use error::{LabError, LabResult, StorageError};
pub use lab::{Lab, LabAction, LabParts, LabStatus};
pub use repositories::file::FileLabRepository;
pub use repositories::memory::InMemoryLabRepository;
pub use repositories::LabRepository;
pub use transition::{LabSubmission, TransitionEngine};
pub use validation::{validate, NewLabRequest, ValidationFailure, ValidationOutcome};
pub use workflow::{LabView, LabWorkflow};

pub use lab_types::NonEmptyText;
pub use lab_uuid::ShardableUuid;

//! The repository port and its storage adapters.
//!
//! [`LabRepository`] is the only way the workflow reaches storage. It is synchronous from the
//! core's point of view: a call returns once the adapter has confirmed (or refused) the
//! operation. Adapters are not expected to arbitrate concurrent writers; edits to one lab are
//! assumed to be serialised by the hosting layer.
//!
//! - [`memory::InMemoryLabRepository`] keeps labs in a map (tests, embedding callers).
//! - [`file::FileLabRepository`] stores each lab as a YAML file in a sharded directory tree.

pub mod file;
pub mod memory;

use crate::error::LabResult;
use crate::lab::Lab;
use lab_uuid::ShardableUuid;

pub trait LabRepository {
    /// Loads a lab by id.
    ///
    /// # Errors
    ///
    /// [`crate::LabError::NotFound`] if no lab has this id, or
    /// [`crate::LabError::Persistence`] if storage could not be read.
    fn find(&self, id: &ShardableUuid) -> LabResult<Lab>;

    /// Inserts or replaces a lab, returning the stored value.
    ///
    /// # Errors
    ///
    /// [`crate::LabError::Persistence`] if the write was not confirmed. Nothing is observable
    /// through [`LabRepository::find`] in that case.
    fn save_or_update(&self, lab: &Lab) -> LabResult<Lab>;

    /// All labs for a patient, oldest request first.
    fn find_all_by_patient(&self, patient_ref: &str) -> LabResult<Vec<Lab>>;
}

impl<R: LabRepository + ?Sized> LabRepository for &R {
    fn find(&self, id: &ShardableUuid) -> LabResult<Lab> {
        (**self).find(id)
    }

    fn save_or_update(&self, lab: &Lab) -> LabResult<Lab> {
        (**self).save_or_update(lab)
    }

    fn find_all_by_patient(&self, patient_ref: &str) -> LabResult<Vec<Lab>> {
        (**self).find_all_by_patient(patient_ref)
    }
}

//! In-memory lab storage.

use crate::error::{LabError, LabResult, StorageError};
use crate::lab::Lab;
use crate::repositories::LabRepository;
use lab_uuid::ShardableUuid;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Default)]
pub struct InMemoryLabRepository {
    labs: Mutex<HashMap<ShardableUuid, Lab>>,
}

impl InMemoryLabRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a repository pre-populated with `labs`.
    pub fn with_labs(labs: impl IntoIterator<Item = Lab>) -> Self {
        let labs = labs.into_iter().map(|lab| (*lab.id(), lab)).collect();
        Self {
            labs: Mutex::new(labs),
        }
    }

    fn lock(&self) -> LabResult<MutexGuard<'_, HashMap<ShardableUuid, Lab>>> {
        self.labs.lock().map_err(|_| {
            LabError::Persistence(StorageError::Unavailable(
                "in-memory lab store lock poisoned".into(),
            ))
        })
    }
}

impl LabRepository for InMemoryLabRepository {
    fn find(&self, id: &ShardableUuid) -> LabResult<Lab> {
        self.lock()?
            .get(id)
            .cloned()
            .ok_or(LabError::NotFound(*id))
    }

    fn save_or_update(&self, lab: &Lab) -> LabResult<Lab> {
        self.lock()?.insert(*lab.id(), lab.clone());
        Ok(lab.clone())
    }

    fn find_all_by_patient(&self, patient_ref: &str) -> LabResult<Vec<Lab>> {
        let patient_ref = patient_ref.trim();
        let mut labs: Vec<Lab> = self
            .lock()?
            .values()
            .filter(|lab| lab.patient_ref().as_str() == patient_ref)
            .cloned()
            .collect();
        labs.sort_by_key(|lab| lab.requested_on());
        Ok(labs)
    }
}

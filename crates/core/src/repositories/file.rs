//! File-backed lab storage.
//!
//! ## Storage Layout
//!
//! ```text
//! <lab_data_dir>/
//!   labs/
//!     <s1>/
//!       <s2>/
//!         <uuid>/
//!           lab.yaml
//! ```
//!
//! where `s1` and `s2` are the first four hex characters of the lab id.
//!
//! Saves write `lab.yaml.tmp` and rename it over `lab.yaml`. A reader therefore sees either
//! the previous file or the new one, and a failed save leaves the previous file in place.

use crate::config::CoreConfig;
use crate::constants::{LAB_FILE_NAME, LAB_FILE_TMP_NAME};
use crate::error::{LabError, LabResult, StorageError};
use crate::lab::{Lab, LabParts, LabStatus};
use crate::repositories::LabRepository;
use lab_types::NonEmptyText;
use lab_uuid::ShardableUuid;
use lab_wire::{LabRequestData, LabRequestFile, RequestStatus, WireError};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Clone, Debug)]
pub struct FileLabRepository {
    cfg: Arc<CoreConfig>,
}

impl FileLabRepository {
    pub fn new(cfg: Arc<CoreConfig>) -> Self {
        Self { cfg }
    }

    fn lab_dir(&self, id: &ShardableUuid) -> PathBuf {
        id.sharded_dir(&self.cfg.labs_dir())
    }

    fn read_lab_file(path: &Path) -> LabResult<Lab> {
        let contents = fs::read_to_string(path).map_err(StorageError::FileRead)?;
        let data = LabRequestFile::parse(&contents).map_err(StorageError::Wire)?;
        lab_from_wire(data)
    }
}

impl LabRepository for FileLabRepository {
    fn find(&self, id: &ShardableUuid) -> LabResult<Lab> {
        let path = self.lab_dir(id).join(LAB_FILE_NAME);
        match fs::metadata(&path) {
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(LabError::NotFound(*id)),
            Err(e) => return Err(StorageError::FileRead(e).into()),
        }

        tracing::debug!("loading lab {} from {}", id, path.display());
        let lab = Self::read_lab_file(&path)?;
        if lab.id() != id {
            return Err(StorageError::Wire(WireError::InvalidInput(format!(
                "{} holds lab {}",
                path.display(),
                lab.id()
            )))
            .into());
        }
        Ok(lab)
    }

    fn save_or_update(&self, lab: &Lab) -> LabResult<Lab> {
        let lab_dir = self.lab_dir(lab.id());
        fs::create_dir_all(&lab_dir).map_err(StorageError::DirCreation)?;

        let yaml = LabRequestFile::render(&lab_to_wire(lab)).map_err(StorageError::Wire)?;

        let tmp_path = lab_dir.join(LAB_FILE_TMP_NAME);
        fs::write(&tmp_path, yaml).map_err(StorageError::FileWrite)?;
        if let Err(e) = fs::rename(&tmp_path, lab_dir.join(LAB_FILE_NAME)) {
            let _ = fs::remove_file(&tmp_path);
            return Err(StorageError::FileWrite(e).into());
        }

        Ok(lab.clone())
    }

    fn find_all_by_patient(&self, patient_ref: &str) -> LabResult<Vec<Lab>> {
        let patient_ref = patient_ref.trim();
        let mut labs = Vec::new();

        let s1_iter = match fs::read_dir(self.cfg.labs_dir()) {
            Ok(it) => it,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(labs),
            Err(e) => return Err(StorageError::FileRead(e).into()),
        };

        for s1 in s1_iter.flatten() {
            let Ok(s2_iter) = fs::read_dir(s1.path()) else {
                continue;
            };
            for s2 in s2_iter.flatten() {
                let Ok(id_iter) = fs::read_dir(s2.path()) else {
                    continue;
                };
                for id_ent in id_iter.flatten() {
                    let lab_path = id_ent.path().join(LAB_FILE_NAME);
                    if !lab_path.is_file() {
                        continue;
                    }

                    match Self::read_lab_file(&lab_path) {
                        Ok(lab) if id_ent.file_name() != lab.id().to_string().as_str() => {
                            tracing::warn!(
                                "skipping {}: holds lab {}",
                                lab_path.display(),
                                lab.id()
                            )
                        }
                        Ok(lab) if lab.patient_ref().as_str() == patient_ref => labs.push(lab),
                        Ok(_) => {}
                        Err(e) => {
                            tracing::warn!("skipping unreadable lab {}: {}", lab_path.display(), e)
                        }
                    }
                }
            }
        }

        labs.sort_by_key(|lab| lab.requested_on());
        Ok(labs)
    }
}

fn lab_to_wire(lab: &Lab) -> LabRequestData {
    LabRequestData {
        id: *lab.id(),
        code: lab.code().to_string(),
        patient: lab.patient_ref().to_string(),
        lab_type: lab.lab_type().to_string(),
        status: match lab.status() {
            LabStatus::Requested => RequestStatus::Requested,
            LabStatus::Completed => RequestStatus::Completed,
            LabStatus::Canceled => RequestStatus::Canceled,
        },
        result: lab.result().map(str::to_string),
        notes: lab.notes().to_vec(),
        requested_on: lab.requested_on(),
        completed_on: lab.completed_on(),
        canceled_on: lab.canceled_on(),
    }
}

fn lab_from_wire(data: LabRequestData) -> LabResult<Lab> {
    let text = |field: &str, value: String| {
        NonEmptyText::new(value).map_err(|_| {
            LabError::from(StorageError::Wire(WireError::InvalidInput(format!(
                "{field} cannot be empty"
            ))))
        })
    };

    Lab::from_parts(LabParts {
        id: data.id,
        code: text("code", data.code)?,
        patient_ref: text("patient", data.patient)?,
        lab_type: text("type", data.lab_type)?,
        status: match data.status {
            RequestStatus::Requested => LabStatus::Requested,
            RequestStatus::Completed => LabStatus::Completed,
            RequestStatus::Canceled => LabStatus::Canceled,
        },
        result: data.result,
        notes: data.notes,
        requested_on: data.requested_on,
        completed_on: data.completed_on,
        canceled_on: data.canceled_on,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::transition::{LabSubmission, TransitionEngine};
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    fn test_cfg(lab_data_dir: &Path) -> Arc<CoreConfig> {
        Arc::new(CoreConfig::new(lab_data_dir.to_path_buf()).expect("CoreConfig::new should succeed"))
    }

    fn new_lab(patient: &str) -> Lab {
        let id = ShardableUuid::new();
        Lab::new_request(
            id,
            crate::lab::request_code(&id),
            NonEmptyText::new(patient).unwrap(),
            NonEmptyText::new("lab type").unwrap(),
            Utc.with_ymd_and_hms(2020, 3, 30, 4, 43, 20).unwrap(),
        )
    }

    #[test]
    fn save_writes_sharded_yaml_file() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let repo = FileLabRepository::new(test_cfg(temp_dir.path()));
        let lab = new_lab("1234");

        repo.save_or_update(&lab).unwrap();

        let canonical = lab.id().to_string();
        let expected = temp_dir
            .path()
            .join("labs")
            .join(&canonical[0..2])
            .join(&canonical[2..4])
            .join(&canonical)
            .join(LAB_FILE_NAME);
        assert!(expected.is_file(), "missing {}", expected.display());
        assert!(!expected.with_file_name(LAB_FILE_TMP_NAME).exists());
    }

    #[test]
    fn find_returns_saved_lab_with_transition_fields() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let repo = FileLabRepository::new(test_cfg(temp_dir.path()));
        let t0 = Utc.with_ymd_and_hms(2020, 3, 30, 5, 0, 0).unwrap();

        let lab = TransitionEngine::new(FixedClock::new(t0))
            .apply(
                &new_lab("1234"),
                &LabSubmission::complete()
                    .with_result("expected result")
                    .with_note("first"),
            )
            .unwrap();
        repo.save_or_update(&lab).unwrap();

        let found = repo.find(lab.id()).unwrap();
        assert_eq!(found, lab);
        assert_eq!(found.status(), LabStatus::Completed);
        assert_eq!(found.completed_on(), Some(t0));
        assert_eq!(found.notes(), ["first"]);
    }

    #[test]
    fn find_missing_lab_is_not_found() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let repo = FileLabRepository::new(test_cfg(temp_dir.path()));

        let err = repo.find(&ShardableUuid::new()).expect_err("should be missing");
        assert!(matches!(err, LabError::NotFound(_)));
    }

    #[test]
    fn corrupt_file_is_a_persistence_error() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let repo = FileLabRepository::new(test_cfg(temp_dir.path()));
        let lab = new_lab("1234");
        repo.save_or_update(&lab).unwrap();

        let path = lab
            .id()
            .sharded_dir(&temp_dir.path().join("labs"))
            .join(LAB_FILE_NAME);
        fs::write(&path, "not: [valid").unwrap();

        let err = repo.find(lab.id()).expect_err("should fail to parse");
        assert!(matches!(err, LabError::Persistence(StorageError::Wire(_))));
    }

    #[test]
    fn find_rejects_file_stored_under_another_id() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let repo = FileLabRepository::new(test_cfg(temp_dir.path()));
        let labs_dir = temp_dir.path().join("labs");

        let stored = new_lab("1234");
        repo.save_or_update(&stored).unwrap();

        let other = ShardableUuid::new();
        let other_dir = other.sharded_dir(&labs_dir);
        fs::create_dir_all(&other_dir).unwrap();
        fs::copy(
            stored.id().sharded_dir(&labs_dir).join(LAB_FILE_NAME),
            other_dir.join(LAB_FILE_NAME),
        )
        .unwrap();

        let err = repo.find(&other).expect_err("should reject mismatched id");
        assert!(matches!(
            err,
            LabError::Persistence(StorageError::Wire(WireError::InvalidInput(_)))
        ));
        assert_eq!(repo.find(stored.id()).unwrap(), stored);
    }

    #[test]
    fn find_all_by_patient_skips_other_patients_and_bad_files() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let repo = FileLabRepository::new(test_cfg(temp_dir.path()));

        let mine = new_lab("1234");
        let theirs = new_lab("5678");
        let broken = new_lab("1234");
        for lab in [&mine, &theirs, &broken] {
            repo.save_or_update(lab).unwrap();
        }
        let broken_path = broken
            .id()
            .sharded_dir(&temp_dir.path().join("labs"))
            .join(LAB_FILE_NAME);
        fs::write(&broken_path, "garbage: true\n").unwrap();

        let labs = repo.find_all_by_patient("1234").unwrap();
        assert_eq!(labs, vec![mine.clone()]);
        assert_eq!(repo.find_all_by_patient(" 1234 ").unwrap(), vec![mine]);
    }

    #[test]
    fn find_all_by_patient_without_data_dir_is_empty() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let repo = FileLabRepository::new(test_cfg(&temp_dir.path().join("missing")));

        assert!(repo.find_all_by_patient("1234").unwrap().is_empty());
    }
}

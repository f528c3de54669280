//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and passed into core services as an
//! `Arc<CoreConfig>`. Nothing in the core reads environment variables while handling a
//! request; the helpers here take the raw values so the binary decides where they come from.

use crate::authorization::Permission;
use crate::constants::{DEFAULT_LAB_DATA_DIR, LABS_DIR_NAME};
use crate::error::{LabError, LabResult};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    lab_data_dir: PathBuf,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// # Errors
    ///
    /// Returns [`LabError::InvalidInput`] if `lab_data_dir` is empty.
    pub fn new(lab_data_dir: PathBuf) -> LabResult<Self> {
        if lab_data_dir.as_os_str().is_empty() {
            return Err(LabError::InvalidInput(
                "lab_data_dir cannot be empty".into(),
            ));
        }

        Ok(Self { lab_data_dir })
    }

    pub fn lab_data_dir(&self) -> &Path {
        &self.lab_data_dir
    }

    pub fn labs_dir(&self) -> PathBuf {
        self.lab_data_dir.join(LABS_DIR_NAME)
    }
}

/// Resolve the lab data directory from an optional raw value.
///
/// `None` or a blank value falls back to [`DEFAULT_LAB_DATA_DIR`].
pub fn lab_data_dir_from_env_value(value: Option<String>) -> PathBuf {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_LAB_DATA_DIR))
}

/// Parse a comma-separated permission list, e.g. `read:lab,complete:lab`.
///
/// Blank entries are ignored; `None` yields an empty set.
///
/// # Errors
///
/// Returns [`LabError::InvalidInput`] naming the first unknown permission.
pub fn permissions_from_env_value(value: Option<String>) -> LabResult<BTreeSet<Permission>> {
    let Some(value) = value else {
        return Ok(BTreeSet::new());
    };

    value
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::parse::<Permission>)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_config_rejects_empty_dir() {
        let err = CoreConfig::new(PathBuf::new()).expect_err("should reject empty dir");
        assert!(matches!(err, LabError::InvalidInput(msg) if msg.contains("lab_data_dir")));
    }

    #[test]
    fn labs_dir_is_under_data_dir() {
        let cfg = CoreConfig::new(PathBuf::from("/srv/lab_data")).unwrap();
        assert_eq!(cfg.lab_data_dir(), Path::new("/srv/lab_data"));
        assert_eq!(cfg.labs_dir(), PathBuf::from("/srv/lab_data/labs"));
    }

    #[test]
    fn lab_data_dir_defaults_when_unset_or_blank() {
        assert_eq!(
            lab_data_dir_from_env_value(None),
            PathBuf::from(DEFAULT_LAB_DATA_DIR)
        );
        assert_eq!(
            lab_data_dir_from_env_value(Some("  ".into())),
            PathBuf::from(DEFAULT_LAB_DATA_DIR)
        );
        assert_eq!(
            lab_data_dir_from_env_value(Some(" /data ".into())),
            PathBuf::from("/data")
        );
    }

    #[test]
    fn permissions_parse_comma_separated_list() {
        let parsed =
            permissions_from_env_value(Some("read:lab, complete:lab,,CancelLab".into())).unwrap();
        assert_eq!(
            parsed,
            BTreeSet::from([
                Permission::ViewLab,
                Permission::CompleteLab,
                Permission::CancelLab
            ])
        );

        assert!(permissions_from_env_value(None).unwrap().is_empty());
    }

    #[test]
    fn permissions_reject_unknown_entry() {
        let err = permissions_from_env_value(Some("read:lab,admin".into()))
            .expect_err("should reject unknown permission");
        assert!(matches!(err, LabError::InvalidInput(msg) if msg.contains("admin")));
    }
}

//! Constants used throughout the lab core crate.
//!
//! Path and filename constants live here so storage layout stays consistent, alongside the
//! user-facing validation text returned to hosting layers.

/// Default directory for lab data when no explicit directory is configured.
pub const DEFAULT_LAB_DATA_DIR: &str = "lab_data";

/// Directory name (under the data directory) for lab request storage.
pub const LABS_DIR_NAME: &str = "labs";

/// Filename for a persisted lab request.
pub const LAB_FILE_NAME: &str = "lab.yaml";

/// Temporary filename a lab request is written to before being renamed into place.
pub const LAB_FILE_TMP_NAME: &str = "lab.yaml.tmp";

/// Prefix of generated lab request codes.
pub const LAB_CODE_PREFIX: &str = "L-";

pub const UNABLE_TO_COMPLETE_MESSAGE: &str = "Unable to complete lab request.";
pub const RESULT_REQUIRED_TO_COMPLETE: &str = "A result is required to complete a lab request.";

pub const UNABLE_TO_REQUEST_MESSAGE: &str = "Unable to create new lab request.";
pub const PATIENT_REQUIRED: &str = "A patient is required.";
pub const TYPE_REQUIRED: &str = "A lab type is required.";

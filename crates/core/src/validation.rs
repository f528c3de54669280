//! Admissibility rules for lab actions.
//!
//! These functions are pure: they look at a lab (or a new request) and decide whether the
//! proposed action may go ahead. They never mutate and never touch storage.
//!
//! Two kinds of "no" are distinguished:
//! - [`ValidationOutcome::Rejected`] carries a [`ValidationFailure`] meant to be shown to the
//!   user (e.g. a result is required before completing).
//! - [`ValidationOutcome::InvalidState`] means the lab is already terminal; the caller is
//!   working from a stale view or has a bug.

use crate::constants::{
    PATIENT_REQUIRED, RESULT_REQUIRED_TO_COMPLETE, TYPE_REQUIRED, UNABLE_TO_COMPLETE_MESSAGE,
    UNABLE_TO_REQUEST_MESSAGE,
};
use crate::error::{LabError, LabResult};
use crate::lab::{Lab, LabAction, LabStatus};
use lab_types::NonEmptyText;
use std::fmt;

/// A user-facing validation failure.
///
/// `message` summarises the failure; the remaining fields hold feedback scoped to a single
/// input field and are `None` when that field is fine. All text is opaque to the core.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ValidationFailure {
    pub message: String,
    pub result: Option<String>,
    pub patient: Option<String>,
    pub lab_type: Option<String>,
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)?;
        for feedback in [&self.result, &self.patient, &self.lab_type]
            .into_iter()
            .flatten()
        {
            write!(f, " {feedback}")?;
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ValidationOutcome {
    Admissible,
    Rejected(ValidationFailure),
    InvalidState { status: LabStatus, action: LabAction },
}

impl ValidationOutcome {
    pub fn is_admissible(&self) -> bool {
        matches!(self, ValidationOutcome::Admissible)
    }

    pub fn into_result(self) -> LabResult<()> {
        match self {
            ValidationOutcome::Admissible => Ok(()),
            ValidationOutcome::Rejected(failure) => Err(LabError::Validation(failure)),
            ValidationOutcome::InvalidState { status, action } => {
                Err(LabError::InvalidState { status, action })
            }
        }
    }
}

/// Decides whether `action` may be applied to `lab` as it currently stands.
///
/// When a submission carries pending edits, pass the lab with those edits already merged so
/// that a result typed in the same submission satisfies the `complete` precondition.
pub fn validate(lab: &Lab, action: LabAction) -> ValidationOutcome {
    let status = lab.status();
    if status.is_terminal() {
        return ValidationOutcome::InvalidState { status, action };
    }

    match action {
        LabAction::Update | LabAction::Cancel => ValidationOutcome::Admissible,
        LabAction::Complete => {
            let has_result = lab.result().is_some_and(|r| !r.trim().is_empty());
            if has_result {
                ValidationOutcome::Admissible
            } else {
                ValidationOutcome::Rejected(ValidationFailure {
                    message: UNABLE_TO_COMPLETE_MESSAGE.into(),
                    result: Some(RESULT_REQUIRED_TO_COMPLETE.into()),
                    ..ValidationFailure::default()
                })
            }
        }
    }
}

/// Input for creating a lab request, as typed by the user.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NewLabRequest {
    pub patient_ref: String,
    pub lab_type: String,
    pub note: Option<String>,
}

/// A new request that passed [`validate_request`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidatedLabRequest {
    pub patient_ref: NonEmptyText,
    pub lab_type: NonEmptyText,
    pub note: Option<NonEmptyText>,
}

/// Checks that a new request names a patient and a lab type.
///
/// # Errors
///
/// Returns a [`ValidationFailure`] with `patient` and/or `lab_type` feedback set for every
/// missing field.
pub fn validate_request(input: &NewLabRequest) -> Result<ValidatedLabRequest, ValidationFailure> {
    let patient_ref = NonEmptyText::new(&input.patient_ref);
    let lab_type = NonEmptyText::new(&input.lab_type);

    match (patient_ref, lab_type) {
        (Ok(patient_ref), Ok(lab_type)) => Ok(ValidatedLabRequest {
            patient_ref,
            lab_type,
            note: NonEmptyText::from_optional(input.note.as_deref()),
        }),
        (patient_ref, lab_type) => Err(ValidationFailure {
            message: UNABLE_TO_REQUEST_MESSAGE.into(),
            patient: patient_ref.err().map(|_| PATIENT_REQUIRED.to_string()),
            lab_type: lab_type.err().map(|_| TYPE_REQUIRED.to_string()),
            ..ValidationFailure::default()
        }),
    }
}

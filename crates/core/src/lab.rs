//! The lab request entity.
//!
//! A [`Lab`] is a laboratory test order tracked from `requested` to one of the two terminal
//! states, `completed` or `canceled`. The status and its timestamp are held together in a
//! single private enum so a completed lab always has a `completed_on`, a canceled lab always
//! has a `canceled_on`, and a requested lab has neither.
//!
//! Outside this crate a `Lab` is read-only. Content edits and status changes go through
//! [`crate::transition::TransitionEngine`]; new requests are created with [`Lab::new_request`].

use crate::constants::LAB_CODE_PREFIX;
use crate::error::{LabError, LabResult};
use chrono::{DateTime, Utc};
use lab_types::NonEmptyText;
use lab_uuid::ShardableUuid;
use std::fmt;
use std::str::FromStr;

/// Lifecycle status of a lab request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LabStatus {
    Requested,
    Completed,
    Canceled,
}

impl LabStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LabStatus::Requested => "requested",
            LabStatus::Completed => "completed",
            LabStatus::Canceled => "canceled",
        }
    }

    /// `completed` and `canceled` have no outgoing transitions.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, LabStatus::Requested)
    }

    /// Colour hint for a status badge in a hosting UI.
    pub fn badge_colour(&self) -> &'static str {
        match self {
            LabStatus::Requested => "warning",
            LabStatus::Completed => "primary",
            LabStatus::Canceled => "danger",
        }
    }
}

impl fmt::Display for LabStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LabStatus {
    type Err = LabError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "requested" => Ok(LabStatus::Requested),
            "completed" => Ok(LabStatus::Completed),
            "canceled" => Ok(LabStatus::Canceled),
            other => Err(LabError::InvalidInput(format!(
                "unknown lab status '{other}'"
            ))),
        }
    }
}

/// Something a caller can do to a lab request.
///
/// `Update` edits content (result, new note) without changing status; `Complete` and
/// `Cancel` are the two status transitions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LabAction {
    Update,
    Complete,
    Cancel,
}

impl LabAction {
    pub const ALL: [LabAction; 3] = [LabAction::Update, LabAction::Complete, LabAction::Cancel];

    pub fn as_str(&self) -> &'static str {
        match self {
            LabAction::Update => "update",
            LabAction::Complete => "complete",
            LabAction::Cancel => "cancel",
        }
    }
}

impl fmt::Display for LabAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum LabState {
    Requested,
    Completed { completed_on: DateTime<Utc> },
    Canceled { canceled_on: DateTime<Utc> },
}

/// A laboratory test request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Lab {
    id: ShardableUuid,
    code: NonEmptyText,
    patient_ref: NonEmptyText,
    lab_type: NonEmptyText,
    result: Option<String>,
    notes: Vec<String>,
    requested_on: DateTime<Utc>,
    state: LabState,
}

/// Every field of a [`Lab`], as held by a hosting layer or a storage adapter.
///
/// Converting into a `Lab` with [`Lab::from_parts`] checks that `status` agrees with the
/// completion and cancellation timestamps.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LabParts {
    pub id: ShardableUuid,
    pub code: NonEmptyText,
    pub patient_ref: NonEmptyText,
    pub lab_type: NonEmptyText,
    pub status: LabStatus,
    pub result: Option<String>,
    pub notes: Vec<String>,
    pub requested_on: DateTime<Utc>,
    pub completed_on: Option<DateTime<Utc>>,
    pub canceled_on: Option<DateTime<Utc>>,
}

impl Lab {
    /// Creates a lab request in the `requested` state with no result and no notes.
    pub fn new_request(
        id: ShardableUuid,
        code: NonEmptyText,
        patient_ref: NonEmptyText,
        lab_type: NonEmptyText,
        requested_on: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            code,
            patient_ref,
            lab_type,
            result: None,
            notes: Vec::new(),
            requested_on,
            state: LabState::Requested,
        }
    }

    /// Rebuilds a lab from a full snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`LabError::InvalidInput`] if the status and timestamps disagree, for example a
    /// `completed` snapshot without `completed_on`, or a `requested` one with `canceled_on`.
    pub fn from_parts(parts: LabParts) -> LabResult<Self> {
        let state = match (parts.status, parts.completed_on, parts.canceled_on) {
            (LabStatus::Requested, None, None) => LabState::Requested,
            (LabStatus::Completed, Some(completed_on), None) => {
                LabState::Completed { completed_on }
            }
            (LabStatus::Canceled, None, Some(canceled_on)) => LabState::Canceled { canceled_on },
            (status, _, _) => {
                return Err(LabError::InvalidInput(format!(
                    "lab {} is {status} but completed_on/canceled_on do not match",
                    parts.id
                )))
            }
        };

        Ok(Self {
            id: parts.id,
            code: parts.code,
            patient_ref: parts.patient_ref,
            lab_type: parts.lab_type,
            result: parts.result,
            notes: parts.notes,
            requested_on: parts.requested_on,
            state,
        })
    }

    pub fn into_parts(self) -> LabParts {
        let status = self.status();
        let completed_on = self.completed_on();
        let canceled_on = self.canceled_on();
        LabParts {
            id: self.id,
            code: self.code,
            patient_ref: self.patient_ref,
            lab_type: self.lab_type,
            status,
            result: self.result,
            notes: self.notes,
            requested_on: self.requested_on,
            completed_on,
            canceled_on,
        }
    }

    pub fn id(&self) -> &ShardableUuid {
        &self.id
    }

    pub fn code(&self) -> &NonEmptyText {
        &self.code
    }

    pub fn patient_ref(&self) -> &NonEmptyText {
        &self.patient_ref
    }

    pub fn lab_type(&self) -> &NonEmptyText {
        &self.lab_type
    }

    pub fn status(&self) -> LabStatus {
        match self.state {
            LabState::Requested => LabStatus::Requested,
            LabState::Completed { .. } => LabStatus::Completed,
            LabState::Canceled { .. } => LabStatus::Canceled,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status().is_terminal()
    }

    pub fn result(&self) -> Option<&str> {
        self.result.as_deref()
    }

    /// Notes in the order they were added, oldest first.
    pub fn notes(&self) -> &[String] {
        &self.notes
    }

    pub fn requested_on(&self) -> DateTime<Utc> {
        self.requested_on
    }

    pub fn completed_on(&self) -> Option<DateTime<Utc>> {
        match self.state {
            LabState::Completed { completed_on } => Some(completed_on),
            _ => None,
        }
    }

    pub fn canceled_on(&self) -> Option<DateTime<Utc>> {
        match self.state {
            LabState::Canceled { canceled_on } => Some(canceled_on),
            _ => None,
        }
    }

    pub(crate) fn set_result(&mut self, result: NonEmptyText) {
        self.result = Some(result.into_string());
    }

    pub(crate) fn append_note(&mut self, note: NonEmptyText) {
        self.notes.push(note.into_string());
    }

    // Callers must have checked the lab is still `requested`.
    pub(crate) fn mark_completed(&mut self, at: DateTime<Utc>) {
        debug_assert!(!self.is_terminal());
        self.state = LabState::Completed { completed_on: at };
    }

    pub(crate) fn mark_canceled(&mut self, at: DateTime<Utc>) {
        debug_assert!(!self.is_terminal());
        self.state = LabState::Canceled { canceled_on: at };
    }
}

/// Derives the human-readable request code for a new lab, e.g. `L-550E8400`.
pub fn request_code(id: &ShardableUuid) -> NonEmptyText {
    let canonical = id.to_string();
    let code = format!("{}{}", LAB_CODE_PREFIX, canonical[..8].to_uppercase());
    // The prefix alone is non-empty, so this cannot fail.
    NonEmptyText::new(&code).unwrap_or_else(|_| unreachable!("lab code is never blank"))
}

//! Lab request wire model and translation helpers.
//!
//! Responsibilities:
//! - Define a domain-level carrier ([`LabRequestData`]) for external use
//! - Define a strict wire model for serialisation/deserialisation
//! - Translate between the two, validating identifiers, timestamps and status consistency
//!
//! The file is overwritten on every save; notes are stored as an ordered YAML sequence.

use crate::{WireError, WireResult};
use chrono::{DateTime, SecondsFormat, Utc};
use lab_uuid::ShardableUuid;
use serde::{Deserialize, Serialize};

// ============================================================================
// Public domain-level types
// ============================================================================

/// Domain-level carrier for a persisted lab request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LabRequestData {
    pub id: ShardableUuid,
    pub code: String,
    pub patient: String,
    pub lab_type: String,
    pub status: RequestStatus,
    pub result: Option<String>,
    pub notes: Vec<String>,
    pub requested_on: DateTime<Utc>,
    pub completed_on: Option<DateTime<Utc>>,
    pub canceled_on: Option<DateTime<Utc>>,
}

/// Persisted status value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Requested,
    Completed,
    Canceled,
}

// ============================================================================
// Public LabRequestFile operations
// ============================================================================

/// Lab request file operations.
///
/// Zero-sized type used for namespacing; all methods are associated functions.
pub struct LabRequestFile;

impl LabRequestFile {
    /// Parse a lab request from YAML text.
    ///
    /// # Errors
    ///
    /// Returns [`WireError`] if:
    /// - the YAML does not match the wire schema (unknown keys, wrong types, missing fields),
    /// - the id is not a canonical UUID,
    /// - a timestamp is not RFC 3339,
    /// - the status disagrees with the completion/cancellation timestamps.
    pub fn parse(yaml_text: &str) -> WireResult<LabRequestData> {
        let deserializer = serde_yaml::Deserializer::from_str(yaml_text);

        let wire = match serde_path_to_error::deserialize::<_, LabRequestWire>(deserializer) {
            Ok(parsed) => parsed,
            Err(err) => {
                let path = err.path().to_string();
                let source = err.into_inner();
                let path = if path.is_empty() {
                    "<root>"
                } else {
                    path.as_str()
                };
                return Err(WireError::Translation(format!(
                    "Lab request schema mismatch at {path}: {source}"
                )));
            }
        };

        wire_to_domain(wire)
    }

    /// Render a lab request as YAML text.
    ///
    /// # Errors
    ///
    /// Returns [`WireError`] if serialisation fails.
    pub fn render(data: &LabRequestData) -> WireResult<String> {
        let wire = domain_to_wire(data);
        serde_yaml::to_string(&wire)
            .map_err(|e| WireError::Translation(format!("Failed to serialize lab request: {e}")))
    }
}

// ============================================================================
// Wire types (internal)
// ============================================================================

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
struct LabRequestWire {
    id: String,
    code: String,
    patient: String,
    #[serde(rename = "type")]
    lab_type: String,
    requested_on: String,
    status: StatusWire,
    #[serde(default)]
    notes: Vec<String>,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
struct StatusWire {
    state: RequestStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    result: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    completed_on: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    canceled_on: Option<String>,
}

// ============================================================================
// Helper functions (internal)
// ============================================================================

fn parse_timestamp(field: &str, value: &str) -> WireResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| WireError::InvalidTimestamp(format!("{field}: '{value}': {e}")))
}

fn format_timestamp(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

fn wire_to_domain(wire: LabRequestWire) -> WireResult<LabRequestData> {
    let id = ShardableUuid::parse(&wire.id)
        .map_err(|_| WireError::InvalidUuid(format!("Invalid UUID in id: {}", wire.id)))?;

    for (field, value) in [
        ("code", &wire.code),
        ("patient", &wire.patient),
        ("type", &wire.lab_type),
    ] {
        if value.trim().is_empty() {
            return Err(WireError::InvalidInput(format!("{field} cannot be empty")));
        }
    }

    let requested_on = parse_timestamp("requested_on", &wire.requested_on)?;
    let completed_on = wire
        .status
        .completed_on
        .as_deref()
        .map(|v| parse_timestamp("completed_on", v))
        .transpose()?;
    let canceled_on = wire
        .status
        .canceled_on
        .as_deref()
        .map(|v| parse_timestamp("canceled_on", v))
        .transpose()?;

    let consistent = match wire.status.state {
        RequestStatus::Requested => completed_on.is_none() && canceled_on.is_none(),
        RequestStatus::Completed => completed_on.is_some() && canceled_on.is_none(),
        RequestStatus::Canceled => canceled_on.is_some() && completed_on.is_none(),
    };
    if !consistent {
        return Err(WireError::Translation(format!(
            "status '{:?}' is inconsistent with completed_on/canceled_on",
            wire.status.state
        )));
    }

    Ok(LabRequestData {
        id,
        code: wire.code,
        patient: wire.patient,
        lab_type: wire.lab_type,
        status: wire.status.state,
        result: wire.status.result,
        notes: wire.notes,
        requested_on,
        completed_on,
        canceled_on,
    })
}

fn domain_to_wire(data: &LabRequestData) -> LabRequestWire {
    LabRequestWire {
        id: data.id.to_string(),
        code: data.code.clone(),
        patient: data.patient.clone(),
        lab_type: data.lab_type.clone(),
        requested_on: format_timestamp(&data.requested_on),
        status: StatusWire {
            state: data.status,
            result: data.result.clone(),
            completed_on: data.completed_on.as_ref().map(format_timestamp),
            canceled_on: data.canceled_on.as_ref().map(format_timestamp),
        },
        notes: data.notes.clone(),
    }
}

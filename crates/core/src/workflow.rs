//! Lab request workflow.
//!
//! [`LabWorkflow`] is what a hosting layer (CLI, API handler) talks to. For each request it:
//! 1. checks the principal holds the permission for the operation,
//! 2. loads the lab through the repository port,
//! 3. runs the transition engine,
//! 4. persists the result with exactly one `save_or_update` call.
//!
//! Any failure before step 4 means nothing is saved. A failure in step 4 is returned as-is;
//! the workflow does not retry.

use crate::authorization::{
    offerable_actions, required_permission, AuthorizationGate, Permission, Principal,
};
use crate::clock::Clock;
use crate::error::{LabError, LabResult};
use crate::lab::{request_code, Lab, LabAction};
use crate::repositories::LabRepository;
use crate::transition::{LabSubmission, TransitionEngine};
use crate::validation::{validate_request, NewLabRequest};
use lab_uuid::ShardableUuid;

/// A lab as presented to a principal, with the actions they may take on it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LabView {
    pub lab: Lab,
    pub actions: Vec<LabAction>,
}

#[derive(Clone, Debug)]
pub struct LabWorkflow<R, G, C> {
    repository: R,
    gate: G,
    clock: C,
}

impl<R, G, C> LabWorkflow<R, G, C>
where
    R: LabRepository,
    G: AuthorizationGate,
    C: Clock,
{
    pub fn new(repository: R, gate: G, clock: C) -> Self {
        Self {
            repository,
            gate,
            clock,
        }
    }

    fn require(&self, principal: &Principal, permission: Permission) -> LabResult<()> {
        if self.gate.has_permission(principal, permission) {
            Ok(())
        } else {
            tracing::warn!(
                "principal {} denied: missing permission {}",
                principal.id,
                permission
            );
            Err(LabError::Unauthorized(permission))
        }
    }

    /// Loads a lab together with the actions the principal may take on it.
    ///
    /// # Errors
    ///
    /// [`LabError::Unauthorized`] without `ViewLab`, or any repository error from `find`.
    pub fn view(&self, principal: &Principal, id: &ShardableUuid) -> LabResult<LabView> {
        self.require(principal, Permission::ViewLab)?;
        let lab = self.repository.find(id)?;
        let actions = offerable_actions(lab.status(), principal, &self.gate);
        Ok(LabView { lab, actions })
    }

    /// Loads the lab and applies `submission` to it.
    ///
    /// See [`LabWorkflow::submit_snapshot`] for the remaining steps.
    pub fn submit(
        &self,
        principal: &Principal,
        id: &ShardableUuid,
        submission: &LabSubmission,
    ) -> LabResult<Lab> {
        self.require(principal, required_permission(submission.action))?;
        let lab = self.repository.find(id)?;
        self.apply_and_save(&lab, submission)
    }

    /// Applies `submission` to a lab the caller already holds and persists the outcome.
    ///
    /// `lab` is never modified; on success the saved lab is returned.
    ///
    /// # Errors
    ///
    /// - [`LabError::Unauthorized`] if the principal lacks the action's permission.
    /// - [`LabError::InvalidState`] / [`LabError::Validation`] from the transition engine;
    ///   nothing is saved.
    /// - [`LabError::Persistence`] if the save was not confirmed.
    pub fn submit_snapshot(
        &self,
        principal: &Principal,
        lab: &Lab,
        submission: &LabSubmission,
    ) -> LabResult<Lab> {
        self.require(principal, required_permission(submission.action))?;
        self.apply_and_save(lab, submission)
    }

    fn apply_and_save(&self, lab: &Lab, submission: &LabSubmission) -> LabResult<Lab> {
        let next = match TransitionEngine::new(&self.clock).apply(lab, submission) {
            Ok(next) => next,
            Err(e) => {
                tracing::warn!("lab {}: {} rejected: {}", lab.id(), submission.action, e);
                return Err(e);
            }
        };

        let saved = self.repository.save_or_update(&next)?;
        tracing::info!(
            "lab {} ({}): {} applied, status {}",
            saved.id(),
            saved.code(),
            submission.action,
            saved.status()
        );
        Ok(saved)
    }

    /// Creates a new lab request in the `requested` state.
    ///
    /// The id and code are generated, `requested_on` is read from the clock, and a non-blank
    /// `note` becomes the first entry of the lab's notes.
    ///
    /// # Errors
    ///
    /// - [`LabError::Unauthorized`] without `RequestLab`.
    /// - [`LabError::Validation`] if the patient or type is missing; nothing is saved.
    /// - [`LabError::Persistence`] if the save was not confirmed.
    pub fn request(&self, principal: &Principal, input: &NewLabRequest) -> LabResult<Lab> {
        self.require(principal, Permission::RequestLab)?;
        let validated = validate_request(input).map_err(LabError::Validation)?;

        let id = ShardableUuid::new();
        let mut lab = Lab::new_request(
            id,
            request_code(&id),
            validated.patient_ref,
            validated.lab_type,
            self.clock.now(),
        );
        if let Some(note) = validated.note {
            lab.append_note(note);
        }

        let saved = self.repository.save_or_update(&lab)?;
        tracing::info!("lab {} ({}) requested", saved.id(), saved.code());
        Ok(saved)
    }

    /// All labs for a patient, oldest request first.
    ///
    /// # Errors
    ///
    /// [`LabError::Unauthorized`] without `ViewLabs`, or any repository error.
    pub fn list_for_patient(&self, principal: &Principal, patient_ref: &str) -> LabResult<Vec<Lab>> {
        self.require(principal, Permission::ViewLabs)?;
        self.repository.find_all_by_patient(patient_ref)
    }
}

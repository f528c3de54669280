//! The lab request state machine.
//!
//! ```text
//!              update
//!             ┌──────┐
//!             ▼      │
//!         requested ─┘
//!          │     │
//!  complete│     │cancel
//!          ▼     ▼
//!   completed   canceled      (terminal: every action is rejected)
//! ```
//!
//! A [`LabSubmission`] bundles the edits a user made (a result, a new note) with the action
//! they pressed. [`TransitionEngine::apply`] merges the edits, validates the merged lab, and
//! stamps the transition time from its [`Clock`]. It returns a new `Lab` and leaves the input
//! untouched, so a failed save never leaves the caller holding a half-applied lab.

use crate::clock::Clock;
use crate::error::{LabError, LabResult};
use crate::lab::{Lab, LabAction};
use crate::validation::validate;
use lab_types::NonEmptyText;

/// One "edit then act" submission against a lab request.
///
/// Blank `pending_result` and `pending_note` values are treated as absent.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LabSubmission {
    pub pending_result: Option<String>,
    pub pending_note: Option<String>,
    pub action: LabAction,
}

impl LabSubmission {
    pub fn new(action: LabAction) -> Self {
        Self {
            pending_result: None,
            pending_note: None,
            action,
        }
    }

    pub fn update() -> Self {
        Self::new(LabAction::Update)
    }

    pub fn complete() -> Self {
        Self::new(LabAction::Complete)
    }

    pub fn cancel() -> Self {
        Self::new(LabAction::Cancel)
    }

    pub fn with_result(mut self, result: impl Into<String>) -> Self {
        self.pending_result = Some(result.into());
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.pending_note = Some(note.into());
        self
    }
}

#[derive(Clone, Debug)]
pub struct TransitionEngine<C> {
    clock: C,
}

impl<C: Clock> TransitionEngine<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }

    /// Applies `submission` to `lab`, returning the next state of the lab.
    ///
    /// # Errors
    ///
    /// - [`LabError::InvalidState`] if `lab` is already completed or canceled.
    /// - [`LabError::Validation`] if the merged lab fails validation (for example completing
    ///   without a result).
    pub fn apply(&self, lab: &Lab, submission: &LabSubmission) -> LabResult<Lab> {
        let action = submission.action;

        // Re-checked here so callers that skip the validator still cannot leave a terminal state.
        if lab.is_terminal() {
            return Err(LabError::InvalidState {
                status: lab.status(),
                action,
            });
        }

        let mut next = lab.clone();
        if let Some(result) = NonEmptyText::from_optional(submission.pending_result.as_deref()) {
            next.set_result(result);
        }
        if let Some(note) = NonEmptyText::from_optional(submission.pending_note.as_deref()) {
            next.append_note(note);
        }

        validate(&next, action).into_result()?;

        match action {
            LabAction::Update => {}
            LabAction::Complete => next.mark_completed(self.clock.now()),
            LabAction::Cancel => next.mark_canceled(self.clock.now()),
        }

        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{CountingClock, FixedClock};
    use crate::constants::{RESULT_REQUIRED_TO_COMPLETE, UNABLE_TO_COMPLETE_MESSAGE};
    use crate::lab::{LabParts, LabStatus};
    use chrono::{DateTime, TimeZone, Utc};
    use lab_uuid::ShardableUuid;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2020, 3, 30, 5, 0, 0).unwrap()
    }

    fn engine() -> TransitionEngine<FixedClock> {
        TransitionEngine::new(FixedClock::new(t0()))
    }

    fn mock_lab() -> Lab {
        Lab::from_parts(LabParts {
            id: ShardableUuid::parse("550e8400e29b41d4a716446655440000").unwrap(),
            code: NonEmptyText::new("L-1234").unwrap(),
            patient_ref: NonEmptyText::new("1234").unwrap(),
            lab_type: NonEmptyText::new("lab type").unwrap(),
            status: LabStatus::Requested,
            result: None,
            notes: vec!["lab notes".into()],
            requested_on: DateTime::parse_from_rfc3339("2020-03-30T04:43:20.102Z")
                .unwrap()
                .with_timezone(&Utc),
            completed_on: None,
            canceled_on: None,
        })
        .unwrap()
    }

    #[test]
    fn update_sets_result_and_appends_note() {
        let lab = mock_lab();
        let next = engine()
            .apply(
                &lab,
                &LabSubmission::update()
                    .with_result("expected result")
                    .with_note("expected notes"),
            )
            .unwrap();

        assert_eq!(next.status(), LabStatus::Requested);
        assert_eq!(next.result(), Some("expected result"));
        assert_eq!(next.notes(), ["lab notes", "expected notes"]);
        assert_eq!(next.completed_on(), None);
        assert_eq!(next.canceled_on(), None);
        assert_eq!(next.requested_on(), lab.requested_on());
    }

    #[test]
    fn update_with_blank_note_leaves_notes_unchanged() {
        let lab = mock_lab();
        for note in ["", "   "] {
            let next = engine()
                .apply(&lab, &LabSubmission::update().with_note(note))
                .unwrap();
            assert_eq!(next.notes(), lab.notes());
        }
    }

    #[test]
    fn blank_result_never_clears_existing_result() {
        let lab = engine()
            .apply(&mock_lab(), &LabSubmission::update().with_result("first"))
            .unwrap();

        let next = engine()
            .apply(&lab, &LabSubmission::update().with_result("  "))
            .unwrap();
        assert_eq!(next.result(), Some("first"));
    }

    #[test]
    fn complete_without_result_fails_and_leaves_lab_untouched() {
        let lab = mock_lab();
        let err = engine()
            .apply(&lab, &LabSubmission::complete())
            .expect_err("should fail");

        match err {
            LabError::Validation(failure) => {
                assert_eq!(failure.message, UNABLE_TO_COMPLETE_MESSAGE);
                assert_eq!(failure.result.as_deref(), Some(RESULT_REQUIRED_TO_COMPLETE));
            }
            other => panic!("expected validation failure, got {other:?}"),
        }
        assert_eq!(lab.status(), LabStatus::Requested);
        assert_eq!(lab, mock_lab());
    }

    #[test]
    fn complete_with_pending_result_stamps_clock() {
        let next = engine()
            .apply(
                &mock_lab(),
                &LabSubmission::complete().with_result("expected result"),
            )
            .unwrap();

        assert_eq!(next.status(), LabStatus::Completed);
        assert_eq!(next.completed_on(), Some(t0()));
        assert_eq!(next.canceled_on(), None);
        assert_eq!(next.result(), Some("expected result"));
        assert_eq!(next.notes(), ["lab notes"]);
    }

    #[test]
    fn complete_uses_previously_saved_result() {
        let lab = engine()
            .apply(&mock_lab(), &LabSubmission::update().with_result("saved"))
            .unwrap();

        let next = engine().apply(&lab, &LabSubmission::complete()).unwrap();
        assert_eq!(next.result(), Some("saved"));
        assert_eq!(next.status(), LabStatus::Completed);
    }

    #[test]
    fn cancel_carries_pending_edits() {
        let next = engine()
            .apply(
                &mock_lab(),
                &LabSubmission::cancel()
                    .with_result("expected result")
                    .with_note("patient left"),
            )
            .unwrap();

        assert_eq!(next.status(), LabStatus::Canceled);
        assert_eq!(next.canceled_on(), Some(t0()));
        assert_eq!(next.completed_on(), None);
        assert_eq!(next.result(), Some("expected result"));
        assert_eq!(next.notes(), ["lab notes", "patient left"]);
    }

    #[test]
    fn cancel_needs_no_result() {
        let next = engine()
            .apply(&mock_lab(), &LabSubmission::cancel())
            .unwrap();
        assert_eq!(next.status(), LabStatus::Canceled);
        assert_eq!(next.result(), None);
    }

    #[test]
    fn clock_is_read_once_per_status_change() {
        for (submission, expected_reads) in [
            (LabSubmission::update().with_result("r").with_note("n"), 0),
            (LabSubmission::complete().with_result("r"), 1),
            (LabSubmission::cancel(), 1),
        ] {
            let clock = CountingClock::new(t0());
            TransitionEngine::new(&clock)
                .apply(&mock_lab(), &submission)
                .unwrap();
            assert_eq!(clock.reads(), expected_reads, "{}", submission.action);
        }
    }

    #[test]
    fn rejected_submission_does_not_read_clock() {
        let clock = CountingClock::new(t0());
        let engine = TransitionEngine::new(&clock);

        engine
            .apply(&mock_lab(), &LabSubmission::complete())
            .expect_err("no result");
        let canceled = engine.apply(&mock_lab(), &LabSubmission::cancel()).unwrap();
        engine
            .apply(&canceled, &LabSubmission::cancel())
            .expect_err("terminal");

        assert_eq!(clock.reads(), 1);
    }

    #[test]
    fn terminal_labs_reject_every_submission() {
        let completed = engine()
            .apply(&mock_lab(), &LabSubmission::complete().with_result("r"))
            .unwrap();
        let canceled = engine()
            .apply(&mock_lab(), &LabSubmission::cancel())
            .unwrap();

        let later = TransitionEngine::new(FixedClock::new(t0() + chrono::Duration::hours(1)));
        for terminal in [completed, canceled] {
            let status = terminal.status();
            for action in LabAction::ALL {
                let submission = LabSubmission::new(action)
                    .with_result("other")
                    .with_note("late note");
                let err = later.apply(&terminal, &submission).expect_err("terminal");
                assert!(matches!(
                    err,
                    LabError::InvalidState { status: s, action: a } if s == status && a == action
                ));
            }
            assert_eq!(terminal.notes(), ["lab notes"]);
        }
    }
}

/*
 * Copyright (c) 2026 Mohamad Al-Zawahreh (dba Sovereign Systems).
 *
 * This file is part of the Ark Sovereign Compiler.
 *
 * LICENSE: DUAL-LICENSED (AGPLv3 or COMMERCIAL).
 * PATENT NOTICE: Protected by US Patent App #63/935,467.
 */

//! The two fixed workflow graphs, each encoded as an exhaustive
//! `match` over `(from, to)` pairs so an unhandled transition is a
//! compile error rather than a missing table entry.
//!
//! Neither graph can be advanced without a non-empty human confirmation
//! token — the state machine is the one place automation cannot route
//! around the human in the loop.

use crate::error::{GovernanceError, Result};
use serde::{Deserialize, Serialize};

/// States of the decision workflow: a human reviews something and either
/// confirms it (leading to completion) or the flow fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub enum DecisionState {
    Initialized,
    AwaitingHuman,
    HumanConfirmed,
    Completed,
    Failed,
}

impl DecisionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecisionState::Initialized => "Initialized",
            DecisionState::AwaitingHuman => "AwaitingHuman",
            DecisionState::HumanConfirmed => "HumanConfirmed",
            DecisionState::Completed => "Completed",
            DecisionState::Failed => "Failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, DecisionState::Completed | DecisionState::Failed)
    }
}

/// Whether `(from, to)` is a legal transition in the decision workflow.
/// Deliberately exhaustive: adding a new `DecisionState` variant without
/// updating this match is a compile error.
fn decision_transition_allowed(from: DecisionState, to: DecisionState) -> bool {
    use DecisionState::*;
    matches!(
        (from, to),
        (Initialized, AwaitingHuman)
            | (AwaitingHuman, HumanConfirmed)
            | (AwaitingHuman, Failed)
            | (HumanConfirmed, Completed)
            | (HumanConfirmed, Failed)
    )
}

/// States of the submission workflow. Note there is no `(Pending,
/// Submitted)` pair: a submission can never reach the platform without
/// first passing through `Confirmed`, which requires a human
/// confirmation token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub enum SubmissionState {
    Pending,
    Confirmed,
    Submitted,
    Failed,
    Acknowledged,
    Rejected,
}

impl SubmissionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionState::Pending => "Pending",
            SubmissionState::Confirmed => "Confirmed",
            SubmissionState::Submitted => "Submitted",
            SubmissionState::Failed => "Failed",
            SubmissionState::Acknowledged => "Acknowledged",
            SubmissionState::Rejected => "Rejected",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SubmissionState::Failed | SubmissionState::Acknowledged | SubmissionState::Rejected
        )
    }
}

fn submission_transition_allowed(from: SubmissionState, to: SubmissionState) -> bool {
    use SubmissionState::*;
    matches!(
        (from, to),
        (Pending, Confirmed)
            | (Confirmed, Submitted)
            | (Confirmed, Failed)
            | (Submitted, Acknowledged)
            | (Submitted, Rejected)
    )
}

/// Drives a [`DecisionState`] machine for one workflow instance.
pub struct DecisionWorkflow {
    pub workflow_id: String,
    state: DecisionState,
}

impl DecisionWorkflow {
    pub fn new(workflow_id: String) -> Self {
        Self {
            workflow_id,
            state: DecisionState::Initialized,
        }
    }

    pub fn state(&self) -> DecisionState {
        self.state
    }

    /// Attempts `self.state -> to`, requiring a non-empty
    /// `human_confirmation_token`. A missing/empty token is always an
    /// `AutomationAttempt`, even for transitions that would otherwise be
    /// legal — there is no path through this function that does not pass
    /// a human's hand through it.
    pub fn transition(&mut self, to: DecisionState, human_confirmation_token: &str) -> Result<()> {
        if self.state.is_terminal() {
            return Err(GovernanceError::WorkflowTerminal {
                workflow_id: self.workflow_id.clone(),
            });
        }
        if human_confirmation_token.trim().is_empty() {
            return Err(GovernanceError::AutomationAttempt);
        }
        if !decision_transition_allowed(self.state, to) {
            return Err(GovernanceError::InvalidTransition {
                from: self.state.as_str().to_string(),
                to: to.as_str().to_string(),
            });
        }
        self.state = to;
        Ok(())
    }
}

/// Drives a [`SubmissionState`] machine for one workflow instance.
pub struct SubmissionWorkflow {
    pub workflow_id: String,
    state: SubmissionState,
}

impl SubmissionWorkflow {
    pub fn new(workflow_id: String) -> Self {
        Self {
            workflow_id,
            state: SubmissionState::Pending,
        }
    }

    pub fn state(&self) -> SubmissionState {
        self.state
    }

    pub fn transition(
        &mut self,
        to: SubmissionState,
        human_confirmation_token: &str,
    ) -> Result<()> {
        if self.state.is_terminal() {
            return Err(GovernanceError::WorkflowTerminal {
                workflow_id: self.workflow_id.clone(),
            });
        }
        if human_confirmation_token.trim().is_empty() {
            return Err(GovernanceError::AutomationAttempt);
        }
        if !submission_transition_allowed(self.state, to) {
            return Err(GovernanceError::InvalidTransition {
                from: self.state.as_str().to_string(),
                to: to.as_str().to_string(),
            });
        }
        self.state = to;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decision_happy_path() {
        let mut wf = DecisionWorkflow::new("d1".into());
        wf.transition(DecisionState::AwaitingHuman, "tok").unwrap();
        wf.transition(DecisionState::HumanConfirmed, "tok").unwrap();
        wf.transition(DecisionState::Completed, "tok").unwrap();
        assert_eq!(wf.state(), DecisionState::Completed);
    }

    #[test]
    fn decision_empty_token_is_automation_attempt() {
        let mut wf = DecisionWorkflow::new("d1".into());
        let err = wf
            .transition(DecisionState::AwaitingHuman, "")
            .unwrap_err();
        assert!(matches!(err, GovernanceError::AutomationAttempt));
    }

    #[test]
    fn decision_terminal_state_rejects_further_transitions() {
        let mut wf = DecisionWorkflow::new("d1".into());
        wf.transition(DecisionState::AwaitingHuman, "tok").unwrap();
        wf.transition(DecisionState::Failed, "tok").unwrap();
        let err = wf
            .transition(DecisionState::Completed, "tok")
            .unwrap_err();
        assert!(matches!(err, GovernanceError::WorkflowTerminal { .. }));
    }

    #[test]
    fn submission_pending_cannot_jump_to_submitted() {
        let mut wf = SubmissionWorkflow::new("s1".into());
        let err = wf
            .transition(SubmissionState::Submitted, "tok")
            .unwrap_err();
        assert!(matches!(err, GovernanceError::InvalidTransition { .. }));
    }

    #[test]
    fn submission_happy_path_requires_confirmation_first() {
        let mut wf = SubmissionWorkflow::new("s1".into());
        wf.transition(SubmissionState::Confirmed, "tok").unwrap();
        wf.transition(SubmissionState::Submitted, "tok").unwrap();
        wf.transition(SubmissionState::Acknowledged, "tok").unwrap();
        assert_eq!(wf.state(), SubmissionState::Acknowledged);
    }

    #[test]
    fn exhaustive_decision_pairs_match_expected_set() {
        let all = [
            DecisionState::Initialized,
            DecisionState::AwaitingHuman,
            DecisionState::HumanConfirmed,
            DecisionState::Completed,
            DecisionState::Failed,
        ];
        let expected_legal = [
            (DecisionState::Initialized, DecisionState::AwaitingHuman),
            (DecisionState::AwaitingHuman, DecisionState::HumanConfirmed),
            (DecisionState::AwaitingHuman, DecisionState::Failed),
            (DecisionState::HumanConfirmed, DecisionState::Completed),
            (DecisionState::HumanConfirmed, DecisionState::Failed),
        ];
        for &from in &all {
            for &to in &all {
                let allowed = decision_transition_allowed(from, to);
                let expected = expected_legal.contains(&(from, to));
                assert_eq!(allowed, expected, "pair ({from:?}, {to:?})");
            }
        }
    }

    #[test]
    fn exhaustive_submission_pairs_exclude_pending_to_submitted() {
        assert!(!submission_transition_allowed(
            SubmissionState::Pending,
            SubmissionState::Submitted
        ));
    }
}

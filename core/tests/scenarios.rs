/*
 * Copyright (c) 2026 Mohamad Al-Zawahreh (dba Sovereign Systems).
 *
 * This file is part of the Ark Sovereign Compiler.
 *
 * LICENSE: DUAL-LICENSED (AGPLv3 or COMMERCIAL).
 *
 * 1. OPEN SOURCE: You may use this file under the terms of the GNU Affero
 * General Public License v3.0. If you link to this code, your ENTIRE
 * application must be open-sourced under AGPLv3.
 *
 * 2. COMMERCIAL: For proprietary use, you must obtain a Commercial License
 * from Sovereign Systems.
 *
 * PATENT NOTICE: Protected by US Patent App #63/935,467.
 * NO IMPLIED LICENSE to rights of Mohamad Al-Zawahreh or Sovereign Systems.
 */

//! End-to-end scenarios driving the whole pipeline through a deterministic
//! clock and in-memory adapters, no real sleeps and no network.

use custodian_core::adapters::MockPlatformAdapter;
use custodian_core::clock::{Clock, TestClock, TestRandomSource};
use custodian_core::config::GovernanceConfig;
use custodian_core::content::Content;
use custodian_core::coordinator::Coordinator;
use custodian_core::error::{ErrorClass, GovernanceError};
use custodian_core::ledger::AuditLedger;
use custodian_core::scope::ScopeEnforcer;
use custodian_core::tokens::TokenRegistry;
use custodian_core::workflow::{DecisionWorkflow, DecisionState, SubmissionState, SubmissionWorkflow};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

fn sample_draft() -> Content {
    Content::DraftReport {
        title: "suspicious login pattern".into(),
        description: "three failed logins from a new geography".into(),
        severity: "medium".into(),
        classification: "internal".into(),
        evidence_references: vec!["artifact-1".into()],
        custom_fields: BTreeMap::new(),
    }
}

fn build_coordinator(min_seconds: u64) -> (Coordinator, Arc<TestClock>) {
    let clock = Arc::new(TestClock::new(chrono::Utc::now()));
    let clock_dyn: Arc<dyn Clock> = clock.clone();
    let ledger = Arc::new(AuditLedger::new_in_memory(clock_dyn.clone()));
    let tokens = Arc::new(TokenRegistry::new(clock_dyn.clone(), Arc::new(TestRandomSource::new())));
    let config = GovernanceConfig {
        min_deliberation_seconds: min_seconds,
        min_cooldown_seconds: min_seconds,
        ..GovernanceConfig::default()
    };
    (Coordinator::new(ledger, tokens, clock_dyn, &config), clock)
}

fn run_friction_to_completion(
    coordinator: &Coordinator,
    clock: &Arc<TestClock>,
    decision_id: &str,
    draft: &Content,
    min_seconds: u64,
) -> custodian_core::friction::FrictionState {
    let mut state = coordinator
        .begin_submission(decision_id.to_string(), draft, "scenario")
        .unwrap();
    coordinator
        .friction
        .submit_edit(&mut state, "materially revised after human review")
        .unwrap();
    coordinator
        .friction
        .submit_challenge_answer(&mut state, "reviewed and confirmed manually")
        .unwrap();
    clock.advance(Duration::from_secs(min_seconds + 1));
    coordinator.friction.complete_deliberation(&mut state).unwrap();
    clock.advance(Duration::from_secs(min_seconds + 1));
    state
}

/// Scenario A: a fully-followed happy path reaches Acknowledged and the
/// ledger verifies clean.
#[test]
fn scenario_a_happy_path_submission() {
    let (coordinator, clock) = build_coordinator(1);
    let draft = sample_draft();
    let mut workflow = SubmissionWorkflow::new("scenario-a".into());
    let mut friction = run_friction_to_completion(&coordinator, &clock, "scenario-a", &draft, 1);

    let adapter = MockPlatformAdapter::new("case-system");
    let reference = coordinator
        .authorize_and_submit(&mut workflow, &mut friction, &draft, &adapter, "reviewer-1", "reviewer-token")
        .unwrap();

    assert!(!reference.is_empty());
    assert_eq!(workflow.state(), SubmissionState::Acknowledged);
    assert!(coordinator.ledger.verify_integrity().is_ok());
}

/// Scenario B: presenting the same token twice is blocked on the second
/// attempt, with the replay recorded to the ledger.
#[test]
fn scenario_b_token_replay_is_blocked() {
    let (coordinator, clock) = build_coordinator(1);
    let draft = sample_draft();
    let content_hash = draft.content_hash().unwrap();
    let token = coordinator
        .tokens
        .issue("reviewer-1".into(), content_hash.clone(), chrono::Duration::hours(1));

    coordinator.tokens.consume(&token.token_id, &content_hash).unwrap();
    let replay = coordinator.tokens.consume(&token.token_id, &content_hash);
    assert!(matches!(replay, Err(GovernanceError::TokenAlreadyUsed { .. })));
    assert_eq!(replay.unwrap_err().class(), ErrorClass::Recoverable);
    let _ = clock;
}

/// Scenario C: a token presented with content that doesn't match what it
/// authorized is detected as tampering, and the token is still consumed
/// (no second chance for the same token).
#[test]
fn scenario_c_tampering_is_detected_and_token_is_burned() {
    let (coordinator, _clock) = build_coordinator(1);
    let draft = sample_draft();
    let content_hash = draft.content_hash().unwrap();
    let token = coordinator
        .tokens
        .issue("reviewer-1".into(), content_hash, chrono::Duration::hours(1));

    let tampered = coordinator.tokens.consume(&token.token_id, "not-the-real-hash");
    assert!(matches!(
        tampered,
        Err(GovernanceError::TokenContentMismatch { .. })
    ));
    assert_eq!(tampered.unwrap_err().class(), ErrorClass::HardStop);

    let retried = coordinator.tokens.consume(&token.token_id, "not-the-real-hash");
    assert!(matches!(retried, Err(GovernanceError::TokenAlreadyUsed { .. })));
}

/// Scenario D: the submission state machine has no path from Pending
/// straight to Submitted — bypassing human confirmation is structurally
/// impossible, not merely discouraged.
#[test]
fn scenario_d_bypass_attempt_blocked_at_state_machine() {
    let mut workflow = SubmissionWorkflow::new("scenario-d".into());
    let err = workflow
        .transition(SubmissionState::Submitted, "some-token")
        .unwrap_err();
    assert!(matches!(err, GovernanceError::InvalidTransition { .. }));

    let mut decision = DecisionWorkflow::new("scenario-d-decision".into());
    let automation = decision.transition(DecisionState::AwaitingHuman, "");
    assert!(matches!(automation, Err(GovernanceError::AutomationAttempt)));
}

/// Scenario E: a target outside the activated scope is rejected, and
/// activating a second scope for the same session is rejected too.
#[test]
fn scenario_e_scope_violation_is_rejected() {
    let enforcer = ScopeEnforcer::new();
    enforcer.activate("session-1".into(), "reports.internal.example").unwrap();

    let violation = enforcer.validate("session-1", "evil.example.com");
    assert!(matches!(violation, Err(GovernanceError::ScopeViolation { .. })));

    let second_activation = enforcer.activate("session-1".into(), "other.example.com");
    assert!(matches!(
        second_activation,
        Err(GovernanceError::ScopeAlreadyActive { .. })
    ));
}

/// Scenario F: a broken hash chain halts the ledger; once halted, every
/// further append is refused, and only integrity queries are answered.
#[test]
fn scenario_f_integrity_break_halts_system() {
    let dir = std::env::temp_dir().join(format!("scenario-f-{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    let clock: Arc<dyn Clock> = Arc::new(TestClock::new(chrono::Utc::now()));
    {
        let ledger = custodian_core::ledger::mount(&dir, clock.clone()).unwrap();
        ledger
            .append(
                "r1".into(),
                custodian_core::ledger::AuditEvent::ScopeActivated {
                    session_id: "s1".into(),
                    host_count: 1,
                },
            )
            .unwrap();
    }
    let log_path = dir.join("ledger.jsonl");
    let contents = std::fs::read_to_string(&log_path).unwrap();
    let tampered = contents.replace("\"host_count\":1", "\"host_count\":999");
    std::fs::write(&log_path, tampered).unwrap();

    let remount = custodian_core::ledger::mount(&dir, clock).unwrap();
    assert!(remount.is_halted());
    let append_err = remount
        .append(
            "r2".into(),
            custodian_core::ledger::AuditEvent::ScopeActivated {
                session_id: "s2".into(),
                host_count: 1,
            },
        )
        .unwrap_err();
    assert!(matches!(append_err, GovernanceError::SystemHalted));
    let _ = std::fs::remove_dir_all(&dir);
}

/// A duplicate submission of the same decision to the same platform is
/// rejected even though the workflow state machine would otherwise allow
/// a second pass through confirmation with a fresh token.
#[test]
fn duplicate_submission_across_two_flows_is_rejected() {
    let (coordinator, clock) = build_coordinator(1);
    let draft = sample_draft();

    let mut wf1 = SubmissionWorkflow::new("dup-flow".into());
    let mut friction1 = run_friction_to_completion(&coordinator, &clock, "dup-flow", &draft, 1);
    let adapter = MockPlatformAdapter::new("case-system");
    coordinator
        .authorize_and_submit(&mut wf1, &mut friction1, &draft, &adapter, "reviewer-1", "reviewer-token")
        .unwrap();

    let mut wf2 = SubmissionWorkflow::new("dup-flow".into());
    let mut friction2 = run_friction_to_completion(&coordinator, &clock, "dup-flow", &draft, 1);
    let err = coordinator
        .authorize_and_submit(&mut wf2, &mut friction2, &draft, &adapter, "reviewer-1", "reviewer-token")
        .unwrap_err();
    assert!(matches!(err, GovernanceError::DuplicateSubmission { .. }));
}

/// When the external platform rejects a submission, the workflow lands
/// in Rejected, not stuck in Submitted, and the failure is recorded.
#[test]
fn platform_rejection_moves_workflow_to_rejected() {
    let (coordinator, clock) = build_coordinator(1);
    let draft = sample_draft();
    let mut workflow = SubmissionWorkflow::new("scenario-rejected".into());
    let mut friction = run_friction_to_completion(&coordinator, &clock, "scenario-rejected", &draft, 1);

    let adapter = MockPlatformAdapter::new("case-system").with_failure(
        GovernanceError::PlatformRejected {
            reason: "malformed submission".into(),
        },
    );
    let err = coordinator
        .authorize_and_submit(&mut workflow, &mut friction, &draft, &adapter, "reviewer-1", "reviewer-token")
        .unwrap_err();
    assert!(matches!(err, GovernanceError::PlatformRejected { .. }));
    assert_eq!(workflow.state(), SubmissionState::Rejected);
}

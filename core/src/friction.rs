/*
 * Copyright (c) 2026 Mohamad Al-Zawahreh (dba Sovereign Systems).
 *
 * This file is part of the Ark Sovereign Compiler.
 *
 * LICENSE: DUAL-LICENSED (AGPLv3 or COMMERCIAL).
 * PATENT NOTICE: Protected by US Patent App #63/935,467.
 */

//! The friction gate: the mandatory slow path between "a draft exists"
//! and "a human may authorize it". Every stage below must complete, in
//! order, before [`FrictionGate::complete`] returns a witness the
//! coordinator will accept for token issuance.
//!
//! Grounded in the reference coordinator's stage order: deliberation,
//! forced edit, challenge/answer, cooldown, audit completeness — plus a
//! non-blocking advisory check for rubber-stamping.

use crate::clock::Clock;
use crate::error::{GovernanceError, Result};
use sha2::{Digest, Sha256};
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// The five audit items that must all be recorded before a friction flow
/// is considered complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum FrictionItem {
    DeliberationStarted,
    EditSubmitted,
    ChallengeAnswered,
    CooldownCompleted,
    CompletionWitnessIssued,
}

/// The live state of one friction flow for one decision.
pub struct FrictionState {
    pub decision_id: String,
    original_fingerprint: String,
    deliberation_started_at: Option<Duration>,
    deliberation_completed_at: Option<Duration>,
    edited_fingerprint: Option<String>,
    challenge_question: String,
    challenge_answer: Option<String>,
    cooldown_started_at: Option<Duration>,
    pub audit_items_recorded: BTreeSet<FrictionItem>,
}

/// Witness returned once every stage has passed, accepted by the
/// coordinator as proof a human went through the full gate.
#[derive(Debug, Clone)]
pub struct CompletionWitness {
    pub decision_id: String,
    pub rubber_stamp_warning: bool,
}

/// Required minimum durations, injected so tests don't need to sleep.
#[derive(Debug, Clone, Copy)]
pub struct FrictionTimings {
    pub min_deliberation: Duration,
    pub min_cooldown: Duration,
}

/// Tuning for the cross-decision, per-approver rubber-stamp detector: a
/// warning fires once an approver has logged at least `min_decisions`
/// confirmations whose mean deliberation time is under `warn_threshold`.
#[derive(Debug, Clone, Copy)]
pub struct RubberStampThresholds {
    pub min_decisions: u64,
    pub warn_threshold: Duration,
}

/// Rolling confirmation statistics kept per approver, across every
/// decision they've completed through this gate.
struct ApproverStats {
    decisions: u64,
    total_deliberation: Duration,
}

pub struct FrictionGate {
    clock: Arc<dyn Clock>,
    timings: FrictionTimings,
    rubber_stamp_thresholds: RubberStampThresholds,
    min_challenge_answer_chars: usize,
    approver_stats: Mutex<HashMap<String, ApproverStats>>,
}

impl FrictionGate {
    pub fn new(clock: Arc<dyn Clock>, timings: FrictionTimings) -> Self {
        Self::with_thresholds(
            clock,
            timings,
            RubberStampThresholds {
                min_decisions: 5,
                warn_threshold: Duration::from_secs(5),
            },
            3,
        )
    }

    pub fn with_thresholds(
        clock: Arc<dyn Clock>,
        timings: FrictionTimings,
        rubber_stamp_thresholds: RubberStampThresholds,
        min_challenge_answer_chars: usize,
    ) -> Self {
        Self {
            clock,
            timings,
            rubber_stamp_thresholds,
            min_challenge_answer_chars,
            approver_stats: Mutex::new(HashMap::new()),
        }
    }

    /// Begins deliberation, fingerprints the original content, and
    /// deterministically derives the challenge question from
    /// `(decision_id, context)` — never from an LLM or heuristic.
    pub fn start(&self, decision_id: String, original_content: &str, context: &str) -> FrictionState {
        let mut hasher = Sha256::new();
        hasher.update(decision_id.as_bytes());
        hasher.update(context.as_bytes());
        let digest = hex::encode(hasher.finalize());
        let challenge_question = format!("Confirm decision {decision_id} (ref {})", &digest[..8]);

        let mut audit_items_recorded = BTreeSet::new();
        audit_items_recorded.insert(FrictionItem::DeliberationStarted);

        FrictionState {
            decision_id,
            original_fingerprint: fingerprint(original_content),
            deliberation_started_at: Some(self.clock.monotonic_now()),
            deliberation_completed_at: None,
            edited_fingerprint: None,
            challenge_question,
            challenge_answer: None,
            cooldown_started_at: None,
            audit_items_recorded,
        }
    }

    /// Records the caller's edited version of the content. Rejects edits
    /// that are identical, or that differ only by whitespace or a single
    /// trivial substitution, as not constituting a genuine forced edit.
    pub fn submit_edit(&self, state: &mut FrictionState, edited_content: &str) -> Result<()> {
        if !is_substantive_edit(&state.original_fingerprint, edited_content) {
            return Err(GovernanceError::ForcedEditViolation {
                reason: "edited content is identical to the original beyond whitespace".into(),
            });
        }
        state.edited_fingerprint = Some(fingerprint(edited_content));
        state.audit_items_recorded.insert(FrictionItem::EditSubmitted);
        Ok(())
    }

    pub fn challenge_question(&self, state: &FrictionState) -> &str {
        &state.challenge_question
    }

    /// Records the human's free-text answer to the challenge question.
    /// Rejects empty or whitespace-only answers, and answers shorter than
    /// a minimal length that would indicate genuine engagement.
    pub fn submit_challenge_answer(&self, state: &mut FrictionState, answer: &str) -> Result<()> {
        let trimmed = answer.trim();
        if trimmed.is_empty() || trimmed.len() < self.min_challenge_answer_chars {
            return Err(GovernanceError::ChallengeNotAnswered);
        }
        state.challenge_answer = Some(trimmed.to_string());
        state.audit_items_recorded.insert(FrictionItem::ChallengeAnswered);
        Ok(())
    }

    /// Marks deliberation complete, enforcing the minimum deliberation
    /// duration, and starts the cooldown timer.
    pub fn complete_deliberation(&self, state: &mut FrictionState) -> Result<()> {
        let started = state
            .deliberation_started_at
            .ok_or(GovernanceError::NoFrictionFlow {
                decision_id: state.decision_id.clone(),
            })?;
        let elapsed = self.clock.monotonic_now().saturating_sub(started);
        if elapsed < self.timings.min_deliberation {
            return Err(GovernanceError::DeliberationTimeViolation {
                elapsed,
                required: self.timings.min_deliberation,
            });
        }
        state.deliberation_completed_at = Some(self.clock.monotonic_now());
        state.cooldown_started_at = Some(self.clock.monotonic_now());
        Ok(())
    }

    /// Records one approver's completed deliberation time and reports
    /// whether their confirmation pattern now looks rubber-stamped: at
    /// least `min_decisions` confirmations logged with a mean
    /// deliberation time under `warn_threshold`. Advisory only — never
    /// blocks completion.
    fn record_confirmation_and_check_pattern(&self, approver_id: &str, deliberation: Duration) -> bool {
        let mut stats = self.approver_stats.lock().unwrap_or_else(|e| e.into_inner());
        let entry = stats.entry(approver_id.to_string()).or_insert(ApproverStats {
            decisions: 0,
            total_deliberation: Duration::ZERO,
        });
        entry.decisions += 1;
        entry.total_deliberation += deliberation;
        if entry.decisions < self.rubber_stamp_thresholds.min_decisions {
            return false;
        }
        let mean = entry.total_deliberation / entry.decisions as u32;
        mean < self.rubber_stamp_thresholds.warn_threshold
    }

    /// Enforces that all five checks have passed — deliberation time,
    /// forced edit, challenge answered, cooldown time, audit
    /// completeness — and returns a completion witness. `approver_id`
    /// feeds the cross-decision rubber-stamp detector; it plays no role
    /// in any blocking check.
    pub fn complete(&self, state: &mut FrictionState, approver_id: &str) -> Result<CompletionWitness> {
        let cooldown_started = state
            .cooldown_started_at
            .ok_or(GovernanceError::NoFrictionFlow {
                decision_id: state.decision_id.clone(),
            })?;
        let elapsed = self.clock.monotonic_now().saturating_sub(cooldown_started);
        if elapsed < self.timings.min_cooldown {
            return Err(GovernanceError::CooldownViolation {
                remaining: self.timings.min_cooldown.saturating_sub(elapsed),
            });
        }
        state.audit_items_recorded.insert(FrictionItem::CooldownCompleted);

        let required = [
            FrictionItem::DeliberationStarted,
            FrictionItem::EditSubmitted,
            FrictionItem::ChallengeAnswered,
            FrictionItem::CooldownCompleted,
        ];
        let missing: Vec<String> = required
            .iter()
            .filter(|item| !state.audit_items_recorded.contains(item))
            .map(|item| format!("{item:?}"))
            .collect();
        if !missing.is_empty() {
            return Err(GovernanceError::AuditIncomplete {
                missing_items: missing,
            });
        }

        state
            .audit_items_recorded
            .insert(FrictionItem::CompletionWitnessIssued);

        let deliberation = match (state.deliberation_started_at, state.deliberation_completed_at) {
            (Some(start), Some(end)) => end.saturating_sub(start),
            _ => Duration::ZERO,
        };
        let rubber_stamp_warning =
            self.record_confirmation_and_check_pattern(approver_id, deliberation);
        Ok(CompletionWitness {
            decision_id: state.decision_id.clone(),
            rubber_stamp_warning,
        })
    }
}

fn fingerprint(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(normalize_whitespace(content).as_bytes());
    hex::encode(hasher.finalize())
}

fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn is_substantive_edit(original_fingerprint: &str, edited_content: &str) -> bool {
    fingerprint(edited_content) != original_fingerprint
}

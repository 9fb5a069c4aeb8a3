/*
 * Copyright (c) 2026 Mohamad Al-Zawahreh (dba Sovereign Systems).
 *
 * This file is part of the Ark Sovereign Compiler.
 *
 * LICENSE: DUAL-LICENSED (AGPLv3 or COMMERCIAL).
 * PATENT NOTICE: Protected by US Patent App #63/935,467.
 */

//! The coordinator: wires the friction gate, token registry, workflow
//! state machine, guard layer, external adapter, and audit ledger into
//! the one pipeline every submission travels through.
//!
//! Order matters and is load-bearing: a token is always consumed before
//! the adapter is ever touched, so a transport failure after consumption
//! can never be retried against the same token — the caller must start a
//! fresh, newly-authorized flow, per the Recoverable error class.

use crate::adapters::PlatformAdapter;
use crate::config::GovernanceConfig;
use crate::content::Content;
use crate::error::{GovernanceError, Result};
use crate::friction::{CompletionWitness, FrictionGate, FrictionState, FrictionTimings, RubberStampThresholds};
use crate::guard::{DuplicateSubmissionGuard, SingleRequestGuard};
use crate::ledger::{AuditEvent, AuditLedger};
use crate::tokens::TokenRegistry;
use crate::workflow::{SubmissionState, SubmissionWorkflow};
use std::sync::Arc;

/// Everything the coordinator needs to drive one submission workflow end
/// to end, grouped so call sites don't thread five separate `Arc`s.
pub struct Coordinator {
    pub ledger: Arc<AuditLedger>,
    pub tokens: Arc<TokenRegistry>,
    pub friction: Arc<FrictionGate>,
    pub duplicate_guard: Arc<DuplicateSubmissionGuard>,
    token_ttl: chrono::Duration,
}

impl Coordinator {
    pub fn new(
        ledger: Arc<AuditLedger>,
        tokens: Arc<TokenRegistry>,
        clock: Arc<dyn crate::clock::Clock>,
        config: &GovernanceConfig,
    ) -> Self {
        let friction = Arc::new(FrictionGate::with_thresholds(
            clock,
            FrictionTimings {
                min_deliberation: std::time::Duration::from_secs(config.min_deliberation_seconds),
                min_cooldown: std::time::Duration::from_secs(config.min_cooldown_seconds),
            },
            RubberStampThresholds {
                min_decisions: config.rubber_stamp_min_decisions,
                warn_threshold: std::time::Duration::from_secs(
                    config.rubber_stamp_warn_threshold_seconds,
                ),
            },
            config.min_challenge_answer_chars,
        ));
        Self {
            ledger,
            tokens,
            friction,
            duplicate_guard: Arc::new(DuplicateSubmissionGuard::new()),
            token_ttl: chrono::Duration::seconds(config.token_ttl_seconds),
        }
    }

    /// Begins a friction flow for a draft that will eventually be
    /// submitted to `platform`. Returns the live [`FrictionState`] the
    /// caller drives through `submit_edit`/`submit_challenge_answer`/
    /// `complete_deliberation` before calling
    /// [`Coordinator::authorize_and_submit`].
    pub fn begin_submission(&self, decision_id: String, draft: &Content, context: &str) -> Result<FrictionState> {
        let original = draft.canonical_form()?;
        Ok(self.friction.start(decision_id, &original, context))
    }

    /// Completes the friction gate, issues a one-time token bound to
    /// `draft`'s content hash on behalf of `approver_id`, consumes it
    /// immediately, reserves this decision's submission slot, and — only
    /// then — invokes the adapter exactly once. Every step, including a
    /// blocked duplicate submission, is recorded to the ledger in order.
    pub fn authorize_and_submit(
        &self,
        workflow: &mut SubmissionWorkflow,
        friction_state: &mut FrictionState,
        draft: &Content,
        platform: &dyn PlatformAdapter,
        approver_id: &str,
        human_confirmation_token: &str,
    ) -> Result<String> {
        let witness = self.friction.complete(friction_state, approver_id)?;
        self.record_witness(&witness);

        workflow.transition(SubmissionState::Confirmed, human_confirmation_token)?;
        self.ledger.append(
            format!("{}-confirmed", workflow.workflow_id),
            AuditEvent::StateTransition {
                workflow_id: workflow.workflow_id.clone(),
                from: "Pending".into(),
                to: "Confirmed".into(),
            },
        )?;

        let content_hash = draft.content_hash()?;
        let token = self
            .tokens
            .issue(approver_id.to_string(), content_hash.clone(), self.token_ttl);
        self.ledger.append(
            format!("{}-token-issued", workflow.workflow_id),
            AuditEvent::TokenIssued {
                token_id: token.token_id.clone(),
                content_hash: content_hash.clone(),
                expires_at: token.expires_at.to_rfc3339(),
            },
        )?;

        let consume_result = self.tokens.consume(&token.token_id, &content_hash);
        match &consume_result {
            Ok(()) => {
                self.ledger.append(
                    format!("{}-token-consumed", workflow.workflow_id),
                    AuditEvent::TokenConsumed {
                        token_id: token.token_id.clone(),
                        workflow_id: workflow.workflow_id.clone(),
                    },
                )?;
            }
            Err(_) => {
                self.ledger.append(
                    format!("{}-token-replay-blocked", workflow.workflow_id),
                    AuditEvent::TokenReplayBlocked {
                        token_id: token.token_id.clone(),
                    },
                )?;
            }
        }
        consume_result?;

        if let Err(err) = self
            .duplicate_guard
            .record(&workflow.workflow_id, platform.platform_id())
        {
            self.ledger.append(
                format!("{}-duplicate-submission-blocked", workflow.workflow_id),
                AuditEvent::BoundaryViolationAttempted {
                    reason: err.to_string(),
                },
            )?;
            return Err(err);
        }

        let adapter_guard = SingleRequestGuard::new();
        adapter_guard.mark_invoked()?;

        workflow.transition(SubmissionState::Submitted, human_confirmation_token)?;
        self.ledger.append(
            format!("{}-submitted", workflow.workflow_id),
            AuditEvent::StateTransition {
                workflow_id: workflow.workflow_id.clone(),
                from: "Confirmed".into(),
                to: "Submitted".into(),
            },
        )?;
        self.ledger.append(
            format!("{}-adapter-invoked", workflow.workflow_id),
            AuditEvent::ExternalAdapterInvoked {
                platform: platform.platform_id().to_string(),
                decision_id: workflow.workflow_id.clone(),
            },
        )?;

        match platform.submit(draft) {
            Ok(response) => {
                workflow.transition(SubmissionState::Acknowledged, human_confirmation_token)?;
                self.ledger.append(
                    format!("{}-acknowledged", workflow.workflow_id),
                    AuditEvent::StateTransition {
                        workflow_id: workflow.workflow_id.clone(),
                        from: "Submitted".into(),
                        to: "Acknowledged".into(),
                    },
                )?;
                Ok(response.reference)
            }
            Err(err) => {
                self.ledger.append(
                    format!("{}-adapter-failed", workflow.workflow_id),
                    AuditEvent::ExternalAdapterFailed {
                        platform: platform.platform_id().to_string(),
                        decision_id: workflow.workflow_id.clone(),
                        reason: err.to_string(),
                    },
                )?;
                workflow.transition(SubmissionState::Rejected, human_confirmation_token)?;
                Err(err)
            }
        }
    }

    fn record_witness(&self, witness: &CompletionWitness) {
        let _ = self.ledger.append(
            format!("{}-friction-complete", witness.decision_id),
            AuditEvent::FrictionStageCompleted {
                decision_id: witness.decision_id.clone(),
                stage: "complete".into(),
            },
        );
        if witness.rubber_stamp_warning {
            tracing::event!(
                tracing::Level::WARN,
                decision_id = %witness.decision_id,
                "rubber_stamp_warning"
            );
        }
    }

    /// Rejects an automation attempt outright, recording it to the
    /// ledger, without touching the token registry or any adapter.
    pub fn reject_automation_attempt(&self, reason: &str) -> Result<()> {
        self.ledger.append(
            "automation-attempt".to_string(),
            AuditEvent::BoundaryViolationAttempted {
                reason: reason.to_string(),
            },
        )?;
        Err(GovernanceError::AutomationAttempt)
    }
}

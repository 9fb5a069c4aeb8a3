/*
 * Copyright (c) 2026 Mohamad Al-Zawahreh (dba Sovereign Systems).
 *
 * This file is part of the Ark Sovereign Compiler.
 *
 * LICENSE: DUAL-LICENSED (AGPLv3 or COMMERCIAL).
 * PATENT NOTICE: Protected by US Patent App #63/935,467.
 */

//! The governance kernel's single error taxonomy.
//!
//! Every failure in this crate is a [`GovernanceError`] variant. Each
//! variant belongs to exactly one [`ErrorClass`] — hard-stop, blocking, or
//! recoverable — per the error handling design. The class determines how
//! a caller (or the CLI wrapper in `bin/governctl.rs`) should react: a
//! hard-stop terminates the workflow and, for integrity/architectural
//! breaches, halts the whole system; a blocking error waits on more human
//! input; a recoverable error may be retried only by starting an entirely
//! new, freshly-authorized flow.

use thiserror::Error;

/// Which of the three error classes a [`GovernanceError`] belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Terminates the current workflow; integrity/architectural variants
    /// additionally halt the whole system. Never retried.
    HardStop,
    /// Awaiting human input; no internal timer resolves it.
    Blocking,
    /// Caller may start a fresh, newly-authorized flow. Never retried
    /// automatically by the core.
    Recoverable,
}

impl ErrorClass {
    /// The CLI-level exit code for this class, per the external interface.
    pub fn exit_code(self) -> i32 {
        match self {
            ErrorClass::HardStop => 2,
            ErrorClass::Blocking => 3,
            ErrorClass::Recoverable => 1,
        }
    }
}

#[derive(Debug, Error)]
pub enum GovernanceError {
    // -- Hash chain / ledger integrity (hard-stop) --
    #[error("hash chain integrity violation at index {first_bad_index}: expected {expected}, found {actual}")]
    IntegrityError {
        first_bad_index: usize,
        expected: String,
        actual: String,
    },
    #[error("ledger head file disagrees with recomputed tail: head={head}, tail={tail}")]
    LedgerHeadMismatch { head: String, tail: String },
    #[error("the system is halted pending operator intervention; only ledger queries are served")]
    SystemHalted,
    #[error("payload contains a non-finite number, which cannot be canonically serialized")]
    NonFiniteNumber,

    // -- Tokens (mixed) --
    #[error("token {token_id} has already been consumed")]
    TokenAlreadyUsed { token_id: String },
    #[error("token {token_id} expired at {expires_at}, now is {now}")]
    TokenExpired {
        token_id: String,
        expires_at: String,
        now: String,
    },
    #[error("token {token_id} content hash mismatch: token authorizes {expected}, presented content hashes to {actual}")]
    TokenContentMismatch {
        token_id: String,
        expected: String,
        actual: String,
    },

    // -- Workflow state machine (hard-stop) --
    #[error("invalid transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },
    #[error("automation attempt: a state transition was requested without a non-empty human confirmation token")]
    AutomationAttempt,

    // -- Friction gate (blocking) --
    #[error("deliberation time violation: elapsed {elapsed:?}, required at least {required:?}")]
    DeliberationTimeViolation {
        elapsed: std::time::Duration,
        required: std::time::Duration,
    },
    #[error("forced edit violation: {reason}")]
    ForcedEditViolation { reason: String },
    #[error("challenge question was not answered with a sufficient free-text response")]
    ChallengeNotAnswered,
    #[error("cooldown violation: {remaining:?} remaining before the flow may complete")]
    CooldownViolation { remaining: std::time::Duration },
    #[error("audit trail incomplete, missing items: {missing_items:?}")]
    AuditIncomplete { missing_items: Vec<String> },
    #[error("no friction flow exists for decision {decision_id}")]
    NoFrictionFlow { decision_id: String },

    // -- Scope (hard-stop) --
    #[error("scope definition rejected: {reason}")]
    ScopeParseError { reason: String },
    #[error("session {session_id} already has an activated scope; scope is immutable within a session")]
    ScopeAlreadyActive { session_id: String },
    #[error("target '{target}' blocked: {reason}")]
    ScopeViolation { target: String, reason: String },

    // -- Guard layer (hard-stop) --
    #[error("architectural violation: {reason}")]
    ArchitecturalViolation { reason: String },
    #[error("duplicate submission for decision {decision_id} on platform {platform}")]
    DuplicateSubmission { decision_id: String, platform: String },
    #[error("disk retention policy would exceed the critical threshold ({projected_percent:.1}% >= {critical_percent:.1}%)")]
    DiskRetentionCritical {
        projected_percent: f64,
        critical_percent: f64,
    },

    // -- Adapters (recoverable) --
    #[error("external adapter transport failure: {reason}")]
    AdapterTransportFailure { reason: String },
    #[error("platform rejected submission: {reason}")]
    PlatformRejected { reason: String },
    #[error("evidence capture failed transiently: {reason}")]
    EvidenceCaptureTransient { reason: String },

    // -- Coordinator (varies) --
    #[error("workflow {workflow_id} is already in a terminal state")]
    WorkflowTerminal { workflow_id: String },
}

impl GovernanceError {
    /// The error class this variant belongs to, per the error handling
    /// design: hard-stop, blocking, or recoverable.
    pub fn class(&self) -> ErrorClass {
        use GovernanceError::*;
        match self {
            IntegrityError { .. }
            | LedgerHeadMismatch { .. }
            | SystemHalted
            | NonFiniteNumber
            | InvalidTransition { .. }
            | AutomationAttempt
            | ScopeParseError { .. }
            | ScopeAlreadyActive { .. }
            | ScopeViolation { .. }
            | ArchitecturalViolation { .. }
            | DuplicateSubmission { .. }
            | DiskRetentionCritical { .. }
            | TokenContentMismatch { .. }
            | TokenExpired { .. }
            | AuditIncomplete { .. }
            | WorkflowTerminal { .. } => ErrorClass::HardStop,

            DeliberationTimeViolation { .. }
            | ForcedEditViolation { .. }
            | ChallengeNotAnswered
            | CooldownViolation { .. }
            | NoFrictionFlow { .. } => ErrorClass::Blocking,

            TokenAlreadyUsed { .. }
            | AdapterTransportFailure { .. }
            | PlatformRejected { .. }
            | EvidenceCaptureTransient { .. } => ErrorClass::Recoverable,
        }
    }
}

pub type Result<T> = std::result::Result<T, GovernanceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_match_external_interface() {
        assert_eq!(ErrorClass::HardStop.exit_code(), 2);
        assert_eq!(ErrorClass::Blocking.exit_code(), 3);
        assert_eq!(ErrorClass::Recoverable.exit_code(), 1);
    }

    #[test]
    fn integrity_errors_are_hard_stop() {
        let e = GovernanceError::IntegrityError {
            first_bad_index: 2,
            expected: "a".into(),
            actual: "b".into(),
        };
        assert_eq!(e.class(), ErrorClass::HardStop);
    }

    #[test]
    fn replay_is_recoverable_from_callers_view() {
        let e = GovernanceError::TokenAlreadyUsed {
            token_id: "tok-1".into(),
        };
        assert_eq!(e.class(), ErrorClass::Recoverable);
    }

    #[test]
    fn tampering_is_hard_stop() {
        let e = GovernanceError::TokenContentMismatch {
            token_id: "tok-1".into(),
            expected: "aa".into(),
            actual: "bb".into(),
        };
        assert_eq!(e.class(), ErrorClass::HardStop);
    }

    #[test]
    fn friction_violations_are_blocking() {
        assert_eq!(
            GovernanceError::ChallengeNotAnswered.class(),
            ErrorClass::Blocking
        );
        assert_eq!(
            GovernanceError::CooldownViolation {
                remaining: std::time::Duration::from_secs(1)
            }
            .class(),
            ErrorClass::Blocking
        );
    }
}

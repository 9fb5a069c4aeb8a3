/*
 * Copyright (c) 2026 Mohamad Al-Zawahreh (dba Sovereign Systems).
 *
 * This file is part of the Ark Sovereign Compiler.
 *
 * LICENSE: DUAL-LICENSED (AGPLv3 or COMMERCIAL).
 * PATENT NOTICE: Protected by US Patent App #63/935,467.
 */

//! Architectural invariants the rest of the crate is built to never
//! violate, plus the two stateful guards the coordinator consults on
//! every submission: duplicate-submission detection and disk-retention
//! headroom.
//!
//! The forbidden-method inventory below is necessarily a maintained list,
//! not a reflective check — Rust has no runtime introspection over this
//! crate's own public API surface. Keeping it current is a review-time
//! discipline, called out in the design ledger.

use crate::error::{GovernanceError, Result};
use std::collections::HashSet;
use std::sync::Mutex;

/// Method name prefixes that must never appear as public functions in
/// this crate — any of these would imply the kernel judges or acts
/// without a human in the loop.
pub const FORBIDDEN_METHOD_PREFIXES: &[&str] =
    &["auto_", "bypass_", "skip_", "override_", "recommend_"];

/// Exact method names that must never appear as public functions in this
/// crate for the same reason.
pub const FORBIDDEN_METHOD_NAMES: &[&str] = &[
    "classify",
    "compute_severity",
    "auto_approve",
    "auto_submit",
    "generate_proof",
    "compute_confidence",
];

/// Every public function name exported by this crate, maintained by hand
/// alongside the module list. A reviewer adding a new `pub fn` should add
/// its name here and let [`assert_no_forbidden_methods`] catch a
/// collision with the forbidden list.
pub const PUBLIC_API_SURFACE: &[&str] = &[
    "new",
    "new_in_memory",
    "with_thresholds",
    "mount",
    "append",
    "query",
    "verify_integrity",
    "halt",
    "head",
    "issue",
    "issue_batch",
    "consume",
    "transition",
    "state",
    "start",
    "submit_edit",
    "submit_challenge_answer",
    "complete_deliberation",
    "complete",
    "challenge_question",
    "parse",
    "activate",
    "validate",
    "content_hash",
    "canonical_form",
    "load_from_path",
    "class",
    "exit_code",
];

/// Panics (test-time) or returns an error (runtime) if any exported name
/// collides with the forbidden inventory. Intended to be exercised from a
/// unit test, not from production control flow.
pub fn assert_no_forbidden_methods() -> Result<()> {
    for &name in PUBLIC_API_SURFACE {
        for &prefix in FORBIDDEN_METHOD_PREFIXES {
            if name.starts_with(prefix) {
                return Err(GovernanceError::ArchitecturalViolation {
                    reason: format!("public method '{name}' uses forbidden prefix '{prefix}'"),
                });
            }
        }
        if FORBIDDEN_METHOD_NAMES.contains(&name) {
            return Err(GovernanceError::ArchitecturalViolation {
                reason: format!("public method '{name}' is a forbidden exact name"),
            });
        }
    }
    Ok(())
}

/// Blocks a second submission of the same decision to the same platform
/// within a process lifetime.
pub struct DuplicateSubmissionGuard {
    seen: Mutex<HashSet<(String, String)>>,
}

impl DuplicateSubmissionGuard {
    pub fn new() -> Self {
        Self {
            seen: Mutex::new(HashSet::new()),
        }
    }

    /// Records `(decision_id, platform)` as submitted, failing if it was
    /// already recorded.
    pub fn record(&self, decision_id: &str, platform: &str) -> Result<()> {
        let mut seen = self.seen.lock().unwrap_or_else(|e| e.into_inner());
        let key = (decision_id.to_string(), platform.to_string());
        if seen.contains(&key) {
            return Err(GovernanceError::DuplicateSubmission {
                decision_id: decision_id.to_string(),
                platform: platform.to_string(),
            });
        }
        seen.insert(key);
        Ok(())
    }
}

impl Default for DuplicateSubmissionGuard {
    fn default() -> Self {
        Self::new()
    }
}

/// Counts adapter invocations within one coordinator call, so a
/// programming error that would invoke an adapter twice for one
/// authorization is caught rather than silently double-submitting.
pub struct SingleRequestGuard {
    invoked: std::sync::atomic::AtomicBool,
}

impl SingleRequestGuard {
    pub fn new() -> Self {
        Self {
            invoked: std::sync::atomic::AtomicBool::new(false),
        }
    }

    /// Marks the single permitted adapter call as used. A second call
    /// within the same guard's lifetime is an architectural violation.
    pub fn mark_invoked(&self) -> Result<()> {
        if self
            .invoked
            .swap(true, std::sync::atomic::Ordering::SeqCst)
        {
            return Err(GovernanceError::ArchitecturalViolation {
                reason: "adapter invoked more than once for a single authorization".into(),
            });
        }
        Ok(())
    }
}

impl Default for SingleRequestGuard {
    fn default() -> Self {
        Self::new()
    }
}

/// Checks whether writing `projected_bytes` more to a retained store of
/// `capacity_bytes` total would cross the configured critical threshold.
pub fn check_disk_retention(
    current_bytes: u64,
    projected_additional_bytes: u64,
    capacity_bytes: u64,
    critical_percent: f64,
) -> Result<()> {
    if capacity_bytes == 0 {
        return Ok(());
    }
    let projected = current_bytes.saturating_add(projected_additional_bytes);
    let projected_percent = (projected as f64 / capacity_bytes as f64) * 100.0;
    if projected_percent >= critical_percent {
        return Err(GovernanceError::DiskRetentionCritical {
            projected_percent,
            critical_percent,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forbidden_method_inventory_has_no_collisions_today() {
        assert!(assert_no_forbidden_methods().is_ok());
    }

    #[test]
    fn duplicate_submission_is_blocked() {
        let guard = DuplicateSubmissionGuard::new();
        guard.record("d1", "platform-a").unwrap();
        let err = guard.record("d1", "platform-a").unwrap_err();
        assert!(matches!(err, GovernanceError::DuplicateSubmission { .. }));
    }

    #[test]
    fn same_decision_different_platform_is_allowed() {
        let guard = DuplicateSubmissionGuard::new();
        guard.record("d1", "platform-a").unwrap();
        assert!(guard.record("d1", "platform-b").is_ok());
    }

    #[test]
    fn single_request_guard_blocks_second_invocation() {
        let guard = SingleRequestGuard::new();
        guard.mark_invoked().unwrap();
        let err = guard.mark_invoked().unwrap_err();
        assert!(matches!(err, GovernanceError::ArchitecturalViolation { .. }));
    }

    #[test]
    fn disk_retention_blocks_at_critical_threshold() {
        let err = check_disk_retention(900, 50, 1000, 90.0).unwrap_err();
        assert!(matches!(err, GovernanceError::DiskRetentionCritical { .. }));
    }

    #[test]
    fn disk_retention_allows_under_threshold() {
        assert!(check_disk_retention(100, 50, 1000, 90.0).is_ok());
    }
}

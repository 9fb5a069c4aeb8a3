/*
 * Copyright (c) 2026 Mohamad Al-Zawahreh (dba Sovereign Systems).
 *
 * This file is part of the Ark Sovereign Compiler.
 *
 * LICENSE: DUAL-LICENSED (AGPLv3 or COMMERCIAL).
 * PATENT NOTICE: Protected by US Patent App #63/935,467.
 */

//! The audit ledger: a fixed vocabulary of [`AuditEvent`]s appended to a
//! [`crate::hash_chain::HashChain`], persisted as one canonical-JSON
//! record per line plus a `ledger.head` sidecar, and mountable in a way
//! that refuses to serve authorization calls once integrity has failed.

use crate::clock::Clock;
use crate::error::{GovernanceError, Result};
use crate::hash_chain::{genesis_hash, HashChain, HashedRecord};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// The fixed vocabulary of events this crate ever writes to the ledger.
/// Nothing outside this enum is ever recorded — the ledger does not accept
/// arbitrary caller-supplied event types.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event_type")]
pub enum AuditEvent {
    TokenIssued {
        token_id: String,
        content_hash: String,
        expires_at: String,
    },
    TokenConsumed {
        token_id: String,
        workflow_id: String,
    },
    TokenReplayBlocked {
        token_id: String,
    },
    StateTransition {
        workflow_id: String,
        from: String,
        to: String,
    },
    FrictionStageCompleted {
        decision_id: String,
        stage: String,
    },
    BoundaryViolationAttempted {
        reason: String,
    },
    ScopeActivated {
        session_id: String,
        host_count: usize,
    },
    ScopeValidated {
        session_id: String,
        target: String,
    },
    ScopeViolation {
        session_id: String,
        target: String,
        reason: String,
    },
    ExternalAdapterInvoked {
        platform: String,
        decision_id: String,
    },
    ExternalAdapterFailed {
        platform: String,
        decision_id: String,
        reason: String,
    },
    TamperingDetected {
        context: String,
        detail: String,
    },
}

impl AuditEvent {
    /// A coarse dimension used for index lookups at `query()` time.
    fn workflow_id(&self) -> Option<&str> {
        match self {
            AuditEvent::TokenConsumed { workflow_id, .. } => Some(workflow_id),
            AuditEvent::StateTransition { workflow_id, .. } => Some(workflow_id),
            _ => None,
        }
    }

    fn token_id(&self) -> Option<&str> {
        match self {
            AuditEvent::TokenIssued { token_id, .. }
            | AuditEvent::TokenConsumed { token_id, .. }
            | AuditEvent::TokenReplayBlocked { token_id } => Some(token_id),
            _ => None,
        }
    }

    fn session_id(&self) -> Option<&str> {
        match self {
            AuditEvent::ScopeActivated { session_id, .. }
            | AuditEvent::ScopeValidated { session_id, .. }
            | AuditEvent::ScopeViolation { session_id, .. } => Some(session_id),
            _ => None,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            AuditEvent::TokenIssued { .. } => "token_issued",
            AuditEvent::TokenConsumed { .. } => "token_consumed",
            AuditEvent::TokenReplayBlocked { .. } => "token_replay_blocked",
            AuditEvent::StateTransition { .. } => "state_transition",
            AuditEvent::FrictionStageCompleted { .. } => "friction_stage_completed",
            AuditEvent::BoundaryViolationAttempted { .. } => "boundary_violation_attempted",
            AuditEvent::ScopeActivated { .. } => "scope_activated",
            AuditEvent::ScopeValidated { .. } => "scope_validated",
            AuditEvent::ScopeViolation { .. } => "scope_violation",
            AuditEvent::ExternalAdapterInvoked { .. } => "external_adapter_invoked",
            AuditEvent::ExternalAdapterFailed { .. } => "external_adapter_failed",
            AuditEvent::TamperingDetected { .. } => "tampering_detected",
        }
    }
}

/// A query over recorded events, matched by any combination of fields
/// (all provided fields must match; `None` means "don't filter on this").
#[derive(Debug, Clone, Default)]
pub struct EventQuery<'a> {
    pub workflow_id: Option<&'a str>,
    pub token_id: Option<&'a str>,
    pub session_id: Option<&'a str>,
    pub event_kind: Option<&'a str>,
}

/// An in-memory side index over appended records' decoded events, so
/// `query()` doesn't have to re-deserialize every payload on every call.
struct EventIndex {
    events: Vec<AuditEvent>,
}

impl EventIndex {
    fn new() -> Self {
        Self { events: Vec::new() }
    }

    fn push(&mut self, event: AuditEvent) {
        self.events.push(event);
    }

    fn query(&self, q: &EventQuery) -> Vec<&AuditEvent> {
        self.events
            .iter()
            .filter(|e| q.workflow_id.map_or(true, |w| e.workflow_id() == Some(w)))
            .filter(|e| q.token_id.map_or(true, |t| e.token_id() == Some(t)))
            .filter(|e| q.session_id.map_or(true, |s| e.session_id() == Some(s)))
            .filter(|e| q.event_kind.map_or(true, |k| e.kind() == k))
            .collect()
    }
}

/// A live, writable audit ledger backed by a [`HashChain`] and an
/// in-memory event index, optionally persisted to disk.
pub struct AuditLedger {
    chain: Mutex<HashChain>,
    index: Mutex<EventIndex>,
    halted: AtomicBool,
    clock: std::sync::Arc<dyn Clock>,
    storage_path: Option<PathBuf>,
}

impl AuditLedger {
    /// A fresh, empty, in-memory ledger — no file backing.
    pub fn new_in_memory(clock: std::sync::Arc<dyn Clock>) -> Self {
        Self {
            chain: Mutex::new(HashChain::new()),
            index: Mutex::new(EventIndex::new()),
            halted: AtomicBool::new(false),
            clock,
            storage_path: None,
        }
    }

    /// Appends an event, advancing the hash chain from its current head.
    /// Refuses while halted.
    pub fn append(&self, record_id: String, event: AuditEvent) -> Result<HashedRecord> {
        if self.halted.load(Ordering::SeqCst) {
            return Err(GovernanceError::SystemHalted);
        }
        let payload = serde_json::to_value(&event).map_err(|_| GovernanceError::NonFiniteNumber)?;
        let timestamp = self.clock.wall_now();
        let record = {
            let mut chain = self.chain.lock().unwrap_or_else(|e| e.into_inner());
            chain.extend(record_id, timestamp, payload)?
        };
        self.index
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(event);
        tracing::event!(tracing::Level::INFO, record_hash = %record.record_hash, "ledger_append");
        if let Some(path) = &self.storage_path {
            self.persist_record(path, &record)?;
        }
        Ok(record)
    }

    pub fn query(&self, q: &EventQuery) -> Vec<AuditEvent> {
        self.index
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .query(q)
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn verify_integrity(&self) -> Result<()> {
        self.chain.lock().unwrap_or_else(|e| e.into_inner()).verify()
    }

    pub fn is_halted(&self) -> bool {
        self.halted.load(Ordering::SeqCst)
    }

    /// Marks this ledger permanently read-only: every subsequent `append`
    /// fails with `SystemHalted`. Never cleared within a process lifetime.
    pub fn halt(&self) {
        self.halted.store(true, Ordering::SeqCst);
    }

    pub fn head(&self) -> String {
        self.chain.lock().unwrap_or_else(|e| e.into_inner()).head()
    }

    fn persist_record(&self, dir: &Path, record: &HashedRecord) -> Result<()> {
        let log_path = dir.join("ledger.jsonl");
        let line = serde_json::to_string(record).map_err(|_| GovernanceError::NonFiniteNumber)?;
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)
            .map_err(|e| GovernanceError::LedgerHeadMismatch {
                head: "io-error".into(),
                tail: e.to_string(),
            })?;
        writeln!(file, "{line}").map_err(|e| GovernanceError::LedgerHeadMismatch {
            head: "io-error".into(),
            tail: e.to_string(),
        })?;
        let head_path = dir.join("ledger.head");
        let tmp_path = dir.join("ledger.head.tmp");
        fs::write(&tmp_path, &record.record_hash).map_err(|e| {
            GovernanceError::LedgerHeadMismatch {
                head: "io-error".into(),
                tail: e.to_string(),
            }
        })?;
        fs::rename(&tmp_path, &head_path).map_err(|e| GovernanceError::LedgerHeadMismatch {
            head: "io-error".into(),
            tail: e.to_string(),
        })?;
        Ok(())
    }
}

/// Mounts a ledger directory from disk, verifying the chain and comparing
/// its tail against the `ledger.head` sidecar before handing back a live
/// ledger. A head mismatch halts the returned ledger; a broken hash chain
/// halts a ledger rebuilt from the trusted prefix before the break, so
/// previously-recorded records are still queryable. Neither case panics
/// or silently repairs the log. An I/O or parse error while reading the
/// log is still a hard `Err`, since there's no ledger to build in that
/// case.
pub fn mount(dir: &Path, clock: std::sync::Arc<dyn Clock>) -> Result<AuditLedger> {
    fs::create_dir_all(dir).ok();
    let log_path = dir.join("ledger.jsonl");
    let mut records = Vec::new();
    let mut index = EventIndex::new();
    if log_path.exists() {
        let file = File::open(&log_path).map_err(|e| GovernanceError::LedgerHeadMismatch {
            head: "io-error".into(),
            tail: e.to_string(),
        })?;
        for line in BufReader::new(file).lines() {
            let line = line.map_err(|e| GovernanceError::LedgerHeadMismatch {
                head: "io-error".into(),
                tail: e.to_string(),
            })?;
            if line.trim().is_empty() {
                continue;
            }
            let record: HashedRecord = serde_json::from_str(&line).map_err(|_| {
                GovernanceError::LedgerHeadMismatch {
                    head: "parse-error".into(),
                    tail: line.clone(),
                }
            })?;
            if let Ok(event) = serde_json::from_value::<AuditEvent>(record.payload.clone()) {
                index.push(event);
            }
            records.push(record);
        }
    }
    let chain = HashChain::from_records(records);
    match chain.verify() {
        Ok(()) => {
            let head_path = dir.join("ledger.head");
            let halted = if head_path.exists() {
                let recorded_head = fs::read_to_string(&head_path).unwrap_or_default();
                let recorded_head = recorded_head.trim();
                let recomputed = chain.head();
                recorded_head != recomputed
                    && !(recorded_head.is_empty() && recomputed == genesis_hash())
            } else {
                !chain.is_empty()
            };
            let ledger = AuditLedger {
                chain: Mutex::new(chain),
                index: Mutex::new(index),
                halted: AtomicBool::new(false),
                clock,
                storage_path: Some(dir.to_path_buf()),
            };
            if halted {
                ledger.halt();
            }
            Ok(ledger)
        }
        Err(err) => {
            // The chain is broken from `first_bad_index` onward. Every
            // record before that point is still genuine, so the ledger is
            // rebuilt from that readable prefix, halted, and handed back —
            // callers can still query what was recorded before the break,
            // they just can never append again.
            tracing::event!(tracing::Level::ERROR, error = %err, "ledger_integrity_break_at_mount");
            let first_bad_index = match &err {
                GovernanceError::IntegrityError { first_bad_index, .. } => *first_bad_index,
                _ => 0,
            };
            let trusted_records: Vec<_> = chain.records()[..first_bad_index].to_vec();
            let mut trusted_index = EventIndex::new();
            for record in &trusted_records {
                if let Ok(event) = serde_json::from_value::<AuditEvent>(record.payload.clone()) {
                    trusted_index.push(event);
                }
            }
            let trusted_chain = HashChain::from_records(trusted_records);
            let ledger = AuditLedger {
                chain: Mutex::new(trusted_chain),
                index: Mutex::new(trusted_index),
                halted: AtomicBool::new(false),
                clock,
                storage_path: Some(dir.to_path_buf()),
            };
            ledger.halt();
            Ok(ledger)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::TestClock;
    use chrono::Utc;
    use std::sync::Arc;

    fn test_clock() -> Arc<dyn Clock> {
        Arc::new(TestClock::new(Utc::now()))
    }

    #[test]
    fn append_advances_head() {
        let ledger = AuditLedger::new_in_memory(test_clock());
        let before = ledger.head();
        ledger
            .append(
                "r1".into(),
                AuditEvent::TokenIssued {
                    token_id: "tok-1".into(),
                    content_hash: "h".into(),
                    expires_at: "2026-01-01T00:00:00Z".into(),
                },
            )
            .unwrap();
        assert_ne!(ledger.head(), before);
    }

    #[test]
    fn halted_ledger_rejects_append() {
        let ledger = AuditLedger::new_in_memory(test_clock());
        ledger.halt();
        let err = ledger
            .append(
                "r1".into(),
                AuditEvent::TokenReplayBlocked {
                    token_id: "tok-1".into(),
                },
            )
            .unwrap_err();
        assert!(matches!(err, GovernanceError::SystemHalted));
    }

    #[test]
    fn query_filters_by_workflow_id() {
        let ledger = AuditLedger::new_in_memory(test_clock());
        ledger
            .append(
                "r1".into(),
                AuditEvent::StateTransition {
                    workflow_id: "wf-1".into(),
                    from: "Pending".into(),
                    to: "Confirmed".into(),
                },
            )
            .unwrap();
        ledger
            .append(
                "r2".into(),
                AuditEvent::StateTransition {
                    workflow_id: "wf-2".into(),
                    from: "Pending".into(),
                    to: "Confirmed".into(),
                },
            )
            .unwrap();
        let results = ledger.query(&EventQuery {
            workflow_id: Some("wf-1"),
            ..Default::default()
        });
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn verify_integrity_passes_for_fresh_ledger() {
        let ledger = AuditLedger::new_in_memory(test_clock());
        ledger
            .append(
                "r1".into(),
                AuditEvent::ScopeActivated {
                    session_id: "s1".into(),
                    host_count: 2,
                },
            )
            .unwrap();
        assert!(ledger.verify_integrity().is_ok());
    }

    #[test]
    fn mount_round_trips_through_disk() {
        let dir = std::env::temp_dir().join(format!(
            "ledger-test-{}",
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        {
            let ledger = mount(&dir, test_clock()).unwrap();
            ledger
                .append(
                    "r1".into(),
                    AuditEvent::TokenIssued {
                        token_id: "tok-1".into(),
                        content_hash: "h".into(),
                        expires_at: "2026-01-01T00:00:00Z".into(),
                    },
                )
                .unwrap();
        }
        let remounted = mount(&dir, test_clock()).unwrap();
        assert!(!remounted.is_halted());
        assert_eq!(remounted.query(&EventQuery::default()).len(), 1);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn mount_halts_on_tampered_log() {
        let dir = std::env::temp_dir().join(format!(
            "ledger-test-tamper-{}",
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        {
            let ledger = mount(&dir, test_clock()).unwrap();
            ledger
                .append(
                    "r1".into(),
                    AuditEvent::TokenIssued {
                        token_id: "tok-1".into(),
                        content_hash: "h".into(),
                        expires_at: "2026-01-01T00:00:00Z".into(),
                    },
                )
                .unwrap();
        }
        let log_path = dir.join("ledger.jsonl");
        let contents = fs::read_to_string(&log_path).unwrap();
        let tampered = contents.replace("tok-1", "tok-EVIL");
        fs::write(&log_path, tampered).unwrap();
        let result = mount(&dir, test_clock()).unwrap();
        assert!(result.is_halted());
        assert!(result.verify_integrity().is_ok());
        let err = result
            .append(
                "r2".into(),
                AuditEvent::TokenReplayBlocked {
                    token_id: "tok-1".into(),
                },
            )
            .unwrap_err();
        assert!(matches!(err, GovernanceError::SystemHalted));
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn mount_on_broken_chain_still_serves_queries_for_the_trusted_prefix() {
        let dir = std::env::temp_dir().join(format!(
            "ledger-test-trusted-prefix-{}",
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        {
            let ledger = mount(&dir, test_clock()).unwrap();
            ledger
                .append(
                    "r1".into(),
                    AuditEvent::ScopeActivated {
                        session_id: "s1".into(),
                        host_count: 1,
                    },
                )
                .unwrap();
            ledger
                .append(
                    "r2".into(),
                    AuditEvent::ScopeActivated {
                        session_id: "s2".into(),
                        host_count: 1,
                    },
                )
                .unwrap();
        }
        let log_path = dir.join("ledger.jsonl");
        let contents = fs::read_to_string(&log_path).unwrap();
        let tampered = contents.replace("\"session_id\":\"s2\"", "\"session_id\":\"s2-evil\"");
        fs::write(&log_path, tampered).unwrap();

        let remount = mount(&dir, test_clock()).unwrap();
        assert!(remount.is_halted());
        let results = remount.query(&EventQuery {
            session_id: Some("s1"),
            ..Default::default()
        });
        assert_eq!(results.len(), 1);
        let _ = fs::remove_dir_all(&dir);
    }
}

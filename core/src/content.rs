/*
 * Copyright (c) 2026 Mohamad Al-Zawahreh (dba Sovereign Systems).
 *
 * This file is part of the Ark Sovereign Compiler.
 *
 * LICENSE: DUAL-LICENSED (AGPLv3 or COMMERCIAL).
 * PATENT NOTICE: Protected by US Patent App #63/935,467.
 */

//! The content model every token, friction stage, and ledger record binds
//! to — a closed, tagged enum rather than an opaque blob, so the hash a
//! token authorizes can be recomputed and compared without the caller
//! round-tripping through its own serializer.

use crate::error::{GovernanceError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Everything this crate can be asked to authorize or record.
///
/// Closed on purpose: every variant's fields are named, not a free-form
/// map, so `content_hash` can sort the few fields that are collections
/// without having to canonicalize an arbitrary caller-supplied tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "content_type")]
pub enum Content {
    SafeAction {
        session_id: String,
        action_kind: String,
        target: String,
        params: BTreeMap<String, String>,
    },
    DraftReport {
        title: String,
        description: String,
        severity: String,
        classification: String,
        evidence_references: Vec<String>,
        custom_fields: BTreeMap<String, String>,
    },
    EvidenceBundle {
        summary: String,
        artifact_hashes: Vec<String>,
    },
    AttestationBody {
        subject: String,
        statement: String,
    },
}

impl Content {
    /// The SHA-256 hex digest of this content's canonical serialization.
    ///
    /// Lists (`evidence_references`, `artifact_hashes`) are sorted before
    /// hashing so semantically identical content hashes identically
    /// regardless of caller-supplied ordering; maps already serialize with
    /// sorted keys because they are `BTreeMap`.
    pub fn content_hash(&self) -> Result<String> {
        let canonical = self.canonical_form()?;
        let mut hasher = Sha256::new();
        hasher.update(canonical.as_bytes());
        Ok(hex::encode(hasher.finalize()))
    }

    /// The canonical JSON string used both for hashing and for ledger
    /// persistence — sorted keys, sorted lists, LF-free single line.
    pub fn canonical_form(&self) -> Result<String> {
        let mut sorted = self.clone();
        sorted.sort_collections();
        let value = serde_json::to_value(&sorted)
            .map_err(|_| GovernanceError::NonFiniteNumber)?;
        reject_non_finite(&value)?;
        canonical_json(&value)
    }

    fn sort_collections(&mut self) {
        match self {
            Content::DraftReport {
                evidence_references,
                ..
            } => evidence_references.sort(),
            Content::EvidenceBundle {
                artifact_hashes, ..
            } => artifact_hashes.sort(),
            Content::SafeAction { .. } | Content::AttestationBody { .. } => {}
        }
    }
}

/// Recursively serializes a `serde_json::Value` with object keys sorted,
/// matching the canonicalization rule every hash in this crate depends on.
pub fn canonical_json(value: &Value) -> Result<String> {
    reject_non_finite(value)?;
    Ok(canonical_json_inner(value))
}

fn canonical_json_inner(value: &Value) -> String {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let parts: Vec<String> = keys
                .into_iter()
                .map(|k| {
                    format!(
                        "{}:{}",
                        serde_json::to_string(k).unwrap_or_default(),
                        canonical_json_inner(&map[k])
                    )
                })
                .collect();
            format!("{{{}}}", parts.join(","))
        }
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().map(canonical_json_inner).collect();
            format!("[{}]", parts.join(","))
        }
        other => serde_json::to_string(other).unwrap_or_default(),
    }
}

fn reject_non_finite(value: &Value) -> Result<()> {
    match value {
        Value::Number(n) => {
            if let Some(f) = n.as_f64() {
                if !f.is_finite() {
                    return Err(GovernanceError::NonFiniteNumber);
                }
            }
            Ok(())
        }
        Value::Array(items) => {
            for item in items {
                reject_non_finite(item)?;
            }
            Ok(())
        }
        Value::Object(map) => {
            for v in map.values() {
                reject_non_finite(v)?;
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

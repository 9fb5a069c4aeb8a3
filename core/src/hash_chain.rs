/*
 * Copyright (c) 2026 Mohamad Al-Zawahreh (dba Sovereign Systems).
 *
 * This file is part of the Ark Sovereign Compiler.
 *
 * LICENSE: DUAL-LICENSED (AGPLv3 or COMMERCIAL).
 * PATENT NOTICE: Protected by US Patent App #63/935,467.
 */

//! The tamper-evident hash chain underneath the audit ledger.
//!
//! Each record's hash binds its own id, timestamp, and payload to the
//! previous record's hash, so altering or reordering any one record breaks
//! every hash from that point forward. `verify` walks the whole chain and
//! reports the first index where recomputation disagrees with storage.

use crate::content::canonical_json;
use crate::error::{GovernanceError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

/// The all-zero hash every chain begins from, as a hex string.
pub fn genesis_hash() -> String {
    "0".repeat(64)
}

/// A single link in the chain: an id, a wall-clock timestamp, the previous
/// record's hash, the payload, and this record's own hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HashedRecord {
    pub record_id: String,
    pub timestamp: DateTime<Utc>,
    pub prev_hash: String,
    pub payload: Value,
    pub record_hash: String,
}

impl HashedRecord {
    /// Computes `SHA256(record_id || timestamp || prev_hash || canonical(payload))`.
    fn compute_hash(
        record_id: &str,
        timestamp: &DateTime<Utc>,
        prev_hash: &str,
        payload: &Value,
    ) -> Result<String> {
        let canonical_payload = canonical_json(payload)?;
        let mut hasher = Sha256::new();
        hasher.update(record_id.as_bytes());
        hasher.update(timestamp.to_rfc3339().as_bytes());
        hasher.update(prev_hash.as_bytes());
        hasher.update(canonical_payload.as_bytes());
        Ok(hex::encode(hasher.finalize()))
    }
}

/// An append-only, verifiable sequence of [`HashedRecord`]s.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HashChain {
    records: Vec<HashedRecord>,
}

impl HashChain {
    /// An empty chain, whose "head" is the all-zero genesis hash.
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
        }
    }

    /// Rebuilds a chain from previously-persisted records without
    /// recomputing hashes — callers must follow with [`HashChain::verify`]
    /// before trusting it.
    pub fn from_records(records: Vec<HashedRecord>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[HashedRecord] {
        &self.records
    }

    /// The hash the next record must chain from.
    pub fn head(&self) -> String {
        self.records
            .last()
            .map(|r| r.record_hash.clone())
            .unwrap_or_else(genesis_hash)
    }

    /// Appends a new record, computing its hash from the current head.
    pub fn extend(
        &mut self,
        record_id: String,
        timestamp: DateTime<Utc>,
        payload: Value,
    ) -> Result<HashedRecord> {
        let prev_hash = self.head();
        let record_hash =
            HashedRecord::compute_hash(&record_id, &timestamp, &prev_hash, &payload)?;
        let record = HashedRecord {
            record_id,
            timestamp,
            prev_hash,
            payload,
            record_hash,
        };
        self.records.push(record.clone());
        Ok(record)
    }

    /// Walks every record, recomputing its hash from its own fields and
    /// checking it both matches what's stored and chains from the previous
    /// record's hash. Returns the first disagreement found.
    pub fn verify(&self) -> Result<()> {
        let mut expected_prev = genesis_hash();
        for (index, record) in self.records.iter().enumerate() {
            if record.prev_hash != expected_prev {
                return Err(GovernanceError::IntegrityError {
                    first_bad_index: index,
                    expected: expected_prev,
                    actual: record.prev_hash.clone(),
                });
            }
            let recomputed = HashedRecord::compute_hash(
                &record.record_id,
                &record.timestamp,
                &record.prev_hash,
                &record.payload,
            )?;
            if recomputed != record.record_hash {
                return Err(GovernanceError::IntegrityError {
                    first_bad_index: index,
                    expected: recomputed,
                    actual: record.record_hash.clone(),
                });
            }
            expected_prev = record.record_hash.clone();
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

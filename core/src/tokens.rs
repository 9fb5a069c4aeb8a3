/*
 * Copyright (c) 2026 Mohamad Al-Zawahreh (dba Sovereign Systems).
 *
 * This file is part of the Ark Sovereign Compiler.
 *
 * LICENSE: DUAL-LICENSED (AGPLv3 or COMMERCIAL).
 * PATENT NOTICE: Protected by US Patent App #63/935,467.
 */

//! One-time, content-bound, expiring authorization tokens.
//!
//! A token authorizes exactly one piece of content (or, for a batch
//! token, one fixed-size batch of content) for one consumption, issued
//! by one named approver, before one deadline. `TokenRegistry::consume`
//! holds its mutex across the entire check-and-record sequence so two
//! racing callers can never both observe "unused".

use crate::clock::{Clock, RandomSource};
use crate::error::{GovernanceError, Result};
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Whether a token authorizes one piece of content or a fixed-size batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeTag {
    Single,
    Batch(usize),
}

/// An issued, not-yet-necessarily-consumed authorization token.
#[derive(Debug, Clone)]
pub struct AuthorizationToken {
    pub token_id: String,
    pub approver_id: String,
    pub scope_tag: ScopeTag,
    /// The hash this token authorizes: a single content hash for
    /// `ScopeTag::Single`, or the batch hash for `ScopeTag::Batch`.
    pub content_hash: String,
    /// Present only for `ScopeTag::Batch` tokens: the hash over the
    /// sorted concatenation of every member content hash.
    pub batch_content_hash: Option<String>,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConsumptionState {
    Unused,
    Used,
}

struct TokenRecord {
    token: AuthorizationToken,
    state: ConsumptionState,
}

/// Tracks every issued token and enforces one-time, content-bound
/// consumption.
pub struct TokenRegistry {
    records: Mutex<HashMap<String, TokenRecord>>,
    clock: Arc<dyn Clock>,
    random: Arc<dyn RandomSource>,
}

impl TokenRegistry {
    pub fn new(clock: Arc<dyn Clock>, random: Arc<dyn RandomSource>) -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
            clock,
            random,
        }
    }

    /// Issues a single token, on behalf of `approver_id`, authorizing
    /// `content_hash`, valid until `clock.wall_now() + ttl`.
    pub fn issue(
        &self,
        approver_id: String,
        content_hash: String,
        ttl: chrono::Duration,
    ) -> AuthorizationToken {
        let token = self.mint(approver_id, ScopeTag::Single, content_hash, None, ttl);
        self.store(token.clone());
        token
    }

    /// Issues one token, on behalf of `approver_id`, authorizing the
    /// whole batch of `content_hashes` together. The batch hash is
    /// `SHA256` over the sorted concatenation of every member content
    /// hash, so member ordering at the call site never changes the
    /// token's identity.
    pub fn issue_batch(
        &self,
        approver_id: String,
        content_hashes: Vec<String>,
        ttl: chrono::Duration,
    ) -> AuthorizationToken {
        let mut sorted = content_hashes.clone();
        sorted.sort();
        let mut hasher = Sha256::new();
        for hash in &sorted {
            hasher.update(hash.as_bytes());
        }
        let batch_hash = hex::encode(hasher.finalize());
        let token = self.mint(
            approver_id,
            ScopeTag::Batch(content_hashes.len()),
            batch_hash.clone(),
            Some(batch_hash),
            ttl,
        );
        self.store(token.clone());
        token
    }

    fn mint(
        &self,
        approver_id: String,
        scope_tag: ScopeTag,
        content_hash: String,
        batch_content_hash: Option<String>,
        ttl: chrono::Duration,
    ) -> AuthorizationToken {
        let id_bytes = self.random.bytes(32);
        let token_id = base64_urlsafe(&id_bytes);
        let issued_at = self.clock.wall_now();
        let expires_at = issued_at + ttl;
        let token = AuthorizationToken {
            token_id,
            approver_id,
            scope_tag,
            content_hash,
            batch_content_hash,
            issued_at,
            expires_at,
        };
        tracing::event!(tracing::Level::INFO, token_id = %token.token_id, "token_issued");
        token
    }

    fn store(&self, token: AuthorizationToken) {
        self.records.lock().unwrap_or_else(|e| e.into_inner()).insert(
            token.token_id.clone(),
            TokenRecord {
                token,
                state: ConsumptionState::Unused,
            },
        );
    }

    /// Atomically checks expiry, prior consumption, and content binding,
    /// then marks the token used — all inside one critical section, so a
    /// racing second caller always observes `TokenAlreadyUsed`.
    ///
    /// A tampered (content-mismatched) token is marked used: the
    /// presented content never gets the benefit of the doubt on a retry.
    /// An expired token, by contrast, is never registered as consumed —
    /// it was never validly usable, so there is nothing to burn; it is
    /// simply rejected and left `Unused`.
    pub fn consume(&self, token_id: &str, presented_content_hash: &str) -> Result<()> {
        let mut records = self.records.lock().unwrap_or_else(|e| e.into_inner());
        let record = records
            .get_mut(token_id)
            .ok_or_else(|| GovernanceError::TokenAlreadyUsed {
                token_id: token_id.to_string(),
            })?;

        if record.state == ConsumptionState::Used {
            tracing::event!(tracing::Level::WARN, token_id = %token_id, "token_replay_blocked");
            return Err(GovernanceError::TokenAlreadyUsed {
                token_id: token_id.to_string(),
            });
        }

        let now = self.clock.wall_now();
        if now >= record.token.expires_at {
            return Err(GovernanceError::TokenExpired {
                token_id: token_id.to_string(),
                expires_at: record.token.expires_at.to_rfc3339(),
                now: now.to_rfc3339(),
            });
        }

        if record.token.content_hash != presented_content_hash {
            record.state = ConsumptionState::Used;
            return Err(GovernanceError::TokenContentMismatch {
                token_id: token_id.to_string(),
                expected: record.token.content_hash.clone(),
                actual: presented_content_hash.to_string(),
            });
        }

        record.state = ConsumptionState::Used;
        tracing::event!(tracing::Level::INFO, token_id = %token_id, "token_consumed");
        Ok(())
    }
}

fn base64_urlsafe(bytes: &[u8]) -> String {
    const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-_";
    let mut out = String::with_capacity((bytes.len() * 4).div_ceil(3));
    for chunk in bytes.chunks(3) {
        let b0 = chunk[0] as u32;
        let b1 = *chunk.get(1).unwrap_or(&0) as u32;
        let b2 = *chunk.get(2).unwrap_or(&0) as u32;
        let triple = (b0 << 16) | (b1 << 8) | b2;
        out.push(ALPHABET[((triple >> 18) & 0x3f) as usize] as char);
        out.push(ALPHABET[((triple >> 12) & 0x3f) as usize] as char);
        if chunk.len() > 1 {
            out.push(ALPHABET[((triple >> 6) & 0x3f) as usize] as char);
        }
        if chunk.len() > 2 {
            out.push(ALPHABET[(triple & 0x3f) as usize] as char);
        }
    }
    out
}

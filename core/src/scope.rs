/*
 * Copyright (c) 2026 Mohamad Al-Zawahreh (dba Sovereign Systems).
 *
 * This file is part of the Ark Sovereign Compiler.
 *
 * LICENSE: DUAL-LICENSED (AGPLv3 or COMMERCIAL).
 * PATENT NOTICE: Protected by US Patent App #63/935,467.
 */

//! Scope enforcement: a session may only act against an explicit,
//! comma-separated list of exact hostnames. No wildcards, no regex
//! metacharacters, no "inherits from" phrases, no bracketed IPv6, no
//! bare IPv4 literals, no escape characters — and once activated, a
//! session's scope never changes.
//!
//! Grounded in the reference scope parser's forbidden-pattern and
//! forbidden-keyword lists: this is a closed, small set, so it is
//! checked with plain substring scans rather than a regex engine.

use crate::error::{GovernanceError, Result};
use std::collections::HashMap;
use std::sync::Mutex;

const FORBIDDEN_SUBSTRINGS: &[&str] = &[
    "*", "?", "[", "]", "(", ")", "{", "}", "^", "$", "|", "\\", "+", "@", "\0", "%40", "%2e",
    "%2E",
];

const FORBIDDEN_KEYWORDS: &[&str] = &["inherit", "inherits", "any", "all", "wildcard", "*.", ".*"];

/// Parses and validates a raw comma-separated scope definition string into
/// an exact-match host list.
pub struct ScopeParser;

impl ScopeParser {
    pub fn parse(raw: &str) -> Result<Vec<String>> {
        if raw.trim().is_empty() {
            return Err(GovernanceError::ScopeParseError {
                reason: "scope definition is empty".into(),
            });
        }
        let mut hosts = Vec::new();
        for candidate in raw.split(',') {
            let host = candidate.trim();
            if host.is_empty() {
                return Err(GovernanceError::ScopeParseError {
                    reason: "scope definition contains an empty entry".into(),
                });
            }
            validate_host_token(host)?;
            hosts.push(host.to_string());
        }
        Ok(hosts)
    }
}

fn validate_host_token(host: &str) -> Result<()> {
    let lower = host.to_ascii_lowercase();
    for pat in FORBIDDEN_SUBSTRINGS {
        if host.contains(pat) {
            return Err(GovernanceError::ScopeParseError {
                reason: format!("host '{host}' contains forbidden character sequence '{pat}'"),
            });
        }
    }
    for kw in FORBIDDEN_KEYWORDS {
        if lower.contains(kw) {
            return Err(GovernanceError::ScopeParseError {
                reason: format!("host '{host}' contains forbidden keyword '{kw}'"),
            });
        }
    }
    if host.starts_with('[') || host.ends_with(']') {
        return Err(GovernanceError::ScopeParseError {
            reason: format!("host '{host}' uses bracketed IPv6 literal syntax, which is not permitted"),
        });
    }
    if is_ipv4_literal(host) {
        return Err(GovernanceError::ScopeParseError {
            reason: format!("host '{host}' is a bare IPv4 literal, which is not permitted"),
        });
    }
    if host.contains('%') {
        return Err(GovernanceError::ScopeParseError {
            reason: format!("host '{host}' contains a percent-encoded escape sequence"),
        });
    }
    let labels: Vec<&str> = host.split('.').collect();
    if labels.len() < 2 {
        return Err(GovernanceError::ScopeParseError {
            reason: format!("host '{host}' must contain at least one '.'"),
        });
    }
    if labels.iter().any(|label| label.is_empty()) {
        return Err(GovernanceError::ScopeParseError {
            reason: format!("host '{host}' contains an empty label"),
        });
    }
    Ok(())
}

fn is_ipv4_literal(host: &str) -> bool {
    let parts: Vec<&str> = host.split('.').collect();
    parts.len() == 4
        && parts
            .iter()
            .all(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit()) && p.parse::<u16>().map_or(false, |n| n <= 255))
}

/// An activated, immutable scope for one session.
#[derive(Debug, Clone)]
pub struct ScopeActivation {
    pub session_id: String,
    pub hosts: Vec<String>,
}

/// Tracks one activation per session and validates targets against it.
/// A session's scope, once activated, cannot be replaced.
pub struct ScopeEnforcer {
    activations: Mutex<HashMap<String, ScopeActivation>>,
}

impl ScopeEnforcer {
    pub fn new() -> Self {
        Self {
            activations: Mutex::new(HashMap::new()),
        }
    }

    pub fn activate(&self, session_id: String, raw_scope: &str) -> Result<ScopeActivation> {
        let mut activations = self.activations.lock().unwrap_or_else(|e| e.into_inner());
        if activations.contains_key(&session_id) {
            return Err(GovernanceError::ScopeAlreadyActive { session_id });
        }
        let hosts = ScopeParser::parse(raw_scope)?;
        let activation = ScopeActivation {
            session_id: session_id.clone(),
            hosts,
        };
        activations.insert(session_id, activation.clone());
        tracing::event!(tracing::Level::INFO, session_id = %activation.session_id, host_count = activation.hosts.len(), "scope_activated");
        Ok(activation)
    }

    /// Validates `target` against the session's activated scope via exact
    /// string equality — no prefix/suffix/subdomain matching.
    pub fn validate(&self, session_id: &str, target: &str) -> Result<()> {
        let activations = self.activations.lock().unwrap_or_else(|e| e.into_inner());
        let activation =
            activations
                .get(session_id)
                .ok_or_else(|| GovernanceError::ScopeViolation {
                    target: target.to_string(),
                    reason: "no activated scope for this session".into(),
                })?;
        if activation.hosts.iter().any(|h| h == target) {
            Ok(())
        } else {
            Err(GovernanceError::ScopeViolation {
                target: target.to_string(),
                reason: "target is not in the activated host list".into(),
            })
        }
    }
}

impl Default for ScopeEnforcer {
    fn default() -> Self {
        Self::new()
    }
}

/*
 * Copyright (c) 2026 Mohamad Al-Zawahreh (dba Sovereign Systems).
 *
 * This file is part of the Ark Sovereign Compiler.
 *
 * LICENSE: DUAL-LICENSED (AGPLv3 or COMMERCIAL).
 * PATENT NOTICE: Protected by US Patent App #63/935,467.
 */

//! The governance kernel's configuration surface: deliberation/cooldown
//! durations, token TTL, disk retention thresholds, and logging
//! verbosity. No filesystem or environment parsing framework lives here
//! — `load_from_path` is a thin `toml` deserialize, not a CLI layer.

use crate::error::{GovernanceError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GovernanceConfig {
    /// Minimum seconds a human must deliberate before completing a
    /// friction flow.
    pub min_deliberation_seconds: u64,
    /// Minimum seconds of cooldown after deliberation before completion.
    pub min_cooldown_seconds: u64,
    /// Authorization token lifetime, in seconds, from issuance.
    pub token_ttl_seconds: i64,
    /// Percentage of retained-store capacity at which writes are refused.
    pub disk_retention_critical_percent: f64,
    /// Directory the audit ledger persists its JSONL log and head sidecar
    /// into.
    pub ledger_dir: String,
    /// Gates the higher-volume "decision trace" log level.
    pub request_logging_enabled: bool,
    /// Minimum character length a challenge-question answer must meet to
    /// be accepted as a genuine human response.
    pub min_challenge_answer_chars: usize,
    /// Default validity window, in seconds, for a batch authorization
    /// token when the caller doesn't specify one explicitly.
    pub batch_token_validity_default: i64,
    /// Maximum number of artifacts a single workflow may accumulate.
    pub max_artifacts_per_workflow: usize,
    /// Maximum total disk space, in megabytes, the artifact store may use.
    pub max_total_disk_mb: u64,
    /// Percentage of `max_total_disk_mb` at which a warning (not yet a
    /// hard stop) is raised.
    pub disk_warning_percent: f64,
    /// Days an artifact is retained before it becomes eligible for
    /// cleanup.
    pub artifact_ttl_days: u64,
    /// Mean per-decision deliberation time, in seconds, below which an
    /// approver's confirmations are flagged as a rubber-stamp pattern.
    pub rubber_stamp_warn_threshold_seconds: u64,
    /// Minimum number of confirmations an approver must have recorded
    /// before the rubber-stamp pattern check applies.
    pub rubber_stamp_min_decisions: u64,
}

impl Default for GovernanceConfig {
    fn default() -> Self {
        Self {
            min_deliberation_seconds: 30,
            min_cooldown_seconds: 10,
            token_ttl_seconds: 3600,
            disk_retention_critical_percent: 90.0,
            ledger_dir: "./governance-ledger".to_string(),
            request_logging_enabled: false,
            min_challenge_answer_chars: 3,
            batch_token_validity_default: 3600,
            max_artifacts_per_workflow: 50,
            max_total_disk_mb: 1024,
            disk_warning_percent: 75.0,
            artifact_ttl_days: 30,
            rubber_stamp_warn_threshold_seconds: 5,
            rubber_stamp_min_decisions: 5,
        }
    }
}

impl GovernanceConfig {
    /// Loads configuration from a TOML file, falling back to
    /// [`GovernanceConfig::default`] values for any field the file omits.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| GovernanceError::ScopeParseError {
            reason: format!("failed to read config file {}: {e}", path.display()),
        })?;
        toml::from_str(&text).map_err(|e| GovernanceError::ScopeParseError {
            reason: format!("failed to parse config file {}: {e}", path.display()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let cfg = GovernanceConfig::default();
        assert!(cfg.min_deliberation_seconds > 0);
        assert!(cfg.disk_retention_critical_percent > 0.0);
    }

    #[test]
    fn loads_partial_toml_with_defaults_filled_in() {
        let dir = std::env::temp_dir().join(format!("gov-config-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, "min_deliberation_seconds = 60\n").unwrap();
        let cfg = GovernanceConfig::load_from_path(&path).unwrap();
        assert_eq!(cfg.min_deliberation_seconds, 60);
        assert_eq!(cfg.min_cooldown_seconds, GovernanceConfig::default().min_cooldown_seconds);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_file_is_an_error() {
        let path = Path::new("/nonexistent/path/config.toml");
        assert!(GovernanceConfig::load_from_path(path).is_err());
    }
}

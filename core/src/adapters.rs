/*
 * Copyright (c) 2026 Mohamad Al-Zawahreh (dba Sovereign Systems).
 *
 * This file is part of the Ark Sovereign Compiler.
 *
 * LICENSE: DUAL-LICENSED (AGPLv3 or COMMERCIAL).
 * PATENT NOTICE: Protected by US Patent App #63/935,467.
 */

//! External adapter contracts: the only two ways this crate ever reaches
//! outside itself. Both are traits so the coordinator and its tests never
//! depend on a concrete network or browser stack.

use crate::content::Content;
use crate::error::Result;

/// Submits a confirmed [`Content::DraftReport`] to exactly one external
/// platform. Implementations must not retry internally — recoverable
/// failures bubble up so the coordinator (not the adapter) decides
/// whether a fresh, re-authorized flow is warranted.
pub trait PlatformAdapter: Send + Sync {
    fn platform_id(&self) -> &str;
    fn submit(&self, draft: &Content) -> Result<PlatformResponse>;
}

#[derive(Debug, Clone)]
pub struct PlatformResponse {
    pub platform_id: String,
    pub reference: String,
}

/// Drives a browser session to perform one [`Content::SafeAction`].
/// Every method call corresponds 1:1 to an audited action; there is no
/// "do whatever is needed" entry point.
pub trait BrowserEngine: Send + Sync {
    fn start_session(&self, session_id: &str) -> Result<()>;
    fn execute_action(&self, action: &Content) -> Result<()>;
    fn capture_screenshot(&self, session_id: &str) -> Result<Vec<u8>>;
    fn stop_session(&self, session_id: &str) -> Result<()>;
}

/// An in-memory `PlatformAdapter` for tests: always succeeds, recording
/// every call it receives.
pub struct MockPlatformAdapter {
    platform_id: String,
    calls: std::sync::Mutex<Vec<Content>>,
    fail_with: Option<crate::error::GovernanceError>,
}

impl MockPlatformAdapter {
    pub fn new(platform_id: impl Into<String>) -> Self {
        Self {
            platform_id: platform_id.into(),
            calls: std::sync::Mutex::new(Vec::new()),
            fail_with: None,
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn with_failure(mut self, err: crate::error::GovernanceError) -> Self {
        self.fail_with = Some(err);
        self
    }
}

impl PlatformAdapter for MockPlatformAdapter {
    fn platform_id(&self) -> &str {
        &self.platform_id
    }

    fn submit(&self, draft: &Content) -> Result<PlatformResponse> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(draft.clone());
        if let Some(err) = &self.fail_with {
            return Err(clone_error(err));
        }
        Ok(PlatformResponse {
            platform_id: self.platform_id.clone(),
            reference: format!("mock-ref-{}", self.call_count()),
        })
    }
}

fn clone_error(err: &crate::error::GovernanceError) -> crate::error::GovernanceError {
    use crate::error::GovernanceError::*;
    match err {
        PlatformRejected { reason } => PlatformRejected {
            reason: reason.clone(),
        },
        AdapterTransportFailure { reason } => AdapterTransportFailure {
            reason: reason.clone(),
        },
        _ => AdapterTransportFailure {
            reason: "mock adapter configured to fail".into(),
        },
    }
}

/// An in-memory `BrowserEngine` for tests.
pub struct MockBrowserEngine {
    sessions: std::sync::Mutex<std::collections::HashSet<String>>,
}

impl MockBrowserEngine {
    pub fn new() -> Self {
        Self {
            sessions: std::sync::Mutex::new(std::collections::HashSet::new()),
        }
    }
}

impl Default for MockBrowserEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl BrowserEngine for MockBrowserEngine {
    fn start_session(&self, session_id: &str) -> Result<()> {
        self.sessions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(session_id.to_string());
        Ok(())
    }

    fn execute_action(&self, _action: &Content) -> Result<()> {
        Ok(())
    }

    fn capture_screenshot(&self, _session_id: &str) -> Result<Vec<u8>> {
        Ok(vec![0u8; 4])
    }

    fn stop_session(&self, session_id: &str) -> Result<()> {
        self.sessions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(session_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn sample_draft() -> Content {
        Content::DraftReport {
            title: "t".into(),
            description: "d".into(),
            severity: "low".into(),
            classification: "public".into(),
            evidence_references: vec![],
            custom_fields: BTreeMap::new(),
        }
    }

    #[test]
    fn mock_platform_adapter_records_calls() {
        let adapter = MockPlatformAdapter::new("platform-a");
        adapter.submit(&sample_draft()).unwrap();
        assert_eq!(adapter.call_count(), 1);
    }

    #[test]
    fn mock_browser_engine_tracks_session_lifecycle() {
        let engine = MockBrowserEngine::new();
        engine.start_session("s1").unwrap();
        engine.execute_action(&sample_draft()).unwrap();
        let shot = engine.capture_screenshot("s1").unwrap();
        assert!(!shot.is_empty());
        engine.stop_session("s1").unwrap();
    }
}

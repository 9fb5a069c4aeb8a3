/*
 * Copyright (c) 2026 Mohamad Al-Zawahreh (dba Sovereign Systems).
 *
 * This file is part of the Ark Sovereign Compiler.
 *
 * LICENSE: DUAL-LICENSED (AGPLv3 or COMMERCIAL).
 * PATENT NOTICE: Protected by US Patent App #63/935,467.
 */

//! Injected clock and randomness — the core never reads the OS clock or
//! an OS entropy source directly.
//!
//! Every timestamp that lands in the hash chain, and every token ID, must
//! come from these two traits so that tests can pin both without real
//! sleeps, and so that a single "external timestamp provider" answers both
//! the monotonic and wall-clock questions the source used to ask the OS
//! for separately.

use chrono::{DateTime, Utc};
use std::time::Duration;

/// Time source injected into every component that needs "now".
///
/// `monotonic_now` is used for friction-gate timers and must never go
/// backward within a process. `wall_now` is used for ledger timestamps
/// and token expiry and must be RFC 3339 UTC.
pub trait Clock: Send + Sync {
    fn monotonic_now(&self) -> Duration;
    fn wall_now(&self) -> DateTime<Utc>;
}

/// Cryptographically strong byte source injected for token IDs and record
/// IDs. Never the OS RNG called directly from business logic.
pub trait RandomSource: Send + Sync {
    fn bytes(&self, n: usize) -> Vec<u8>;
}

/// Production clock backed by `std::time::Instant`/`chrono::Utc::now`.
pub struct SystemClock {
    epoch: std::time::Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            epoch: std::time::Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn monotonic_now(&self) -> Duration {
        self.epoch.elapsed()
    }

    fn wall_now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Production randomness backed by `rand::rngs::OsRng`.
pub struct OsRandom;

impl RandomSource for OsRandom {
    fn bytes(&self, n: usize) -> Vec<u8> {
        use rand::RngCore;
        let mut buf = vec![0u8; n];
        rand::rngs::OsRng.fill_bytes(&mut buf);
        buf
    }
}

/// A manually-advanced clock for deterministic tests — no real sleeps.
///
/// Mirrors the fixture-clock approach the Python reference test suite
/// uses: scenarios advance the clock explicitly rather than sleeping.
pub struct TestClock {
    monotonic: std::sync::Mutex<Duration>,
    wall: std::sync::Mutex<DateTime<Utc>>,
}

impl TestClock {
    pub fn new(start_wall: DateTime<Utc>) -> Self {
        Self {
            monotonic: std::sync::Mutex::new(Duration::ZERO),
            wall: std::sync::Mutex::new(start_wall),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut m = self.monotonic.lock().unwrap_or_else(|e| e.into_inner());
        *m += by;
        let mut w = self.wall.lock().unwrap_or_else(|e| e.into_inner());
        *w += chrono::Duration::from_std(by).unwrap_or_default();
    }
}

impl Clock for TestClock {
    fn monotonic_now(&self) -> Duration {
        *self.monotonic.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn wall_now(&self) -> DateTime<Utc> {
        *self.wall.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Deterministic, counter-seeded byte source for reproducible tests.
///
/// NOT cryptographically secure. Test-only.
pub struct TestRandomSource {
    counter: std::sync::atomic::AtomicU64,
}

impl TestRandomSource {
    pub fn new() -> Self {
        Self {
            counter: std::sync::atomic::AtomicU64::new(0),
        }
    }
}

impl Default for TestRandomSource {
    fn default() -> Self {
        Self::new()
    }
}

impl RandomSource for TestRandomSource {
    fn bytes(&self, n: usize) -> Vec<u8> {
        let seed = self
            .counter
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        (0..n)
            .map(|i| (seed.wrapping_mul(2654435761).wrapping_add(i as u64) % 256) as u8)
            .collect()
    }
}

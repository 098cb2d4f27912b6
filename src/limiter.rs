// Copyright 2025 Folia Interiors
// SPDX-License-Identifier: Apache-2.0

//! Fixed-window request counters keyed by client identity and limiter class.
//!
//! Each composite key owns at most one active window record. A record is
//! replaced, never incremented, once its window has elapsed, so expired
//! records behave as absent even before the janitor sweep removes them.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use thiserror::Error;

use crate::clock::Clock;

/// Named admission policy applied to a category of endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LimiterClass {
    General,
    Login,
    Reservation,
    Upload,
    Admin,
}

impl LimiterClass {
    pub const fn as_str(&self) -> &'static str {
        match self {
            LimiterClass::General => "general",
            LimiterClass::Login => "login",
            LimiterClass::Reservation => "reservation",
            LimiterClass::Upload => "upload",
            LimiterClass::Admin => "admin",
        }
    }

    /// Compose the client part of the window key. Only the general class is
    /// additionally scoped by path; every other class counts per ip across
    /// all of its endpoints.
    pub fn client_key(&self, client_ip: &str, path: &str) -> String {
        match self {
            LimiterClass::General => format!("{client_ip}:{path}"),
            _ => client_ip.to_string(),
        }
    }
}

/// Window size and threshold for one limiter class.
#[derive(Debug, Clone, Copy)]
pub struct LimiterPolicy {
    pub window_ms: i64,
    pub max_requests: u32,
}

impl LimiterPolicy {
    pub const fn new(window_ms: i64, max_requests: u32) -> Self {
        Self {
            window_ms,
            max_requests,
        }
    }
}

/// Full policy table, one entry per limiter class. Fixed after construction.
#[derive(Debug, Clone, Copy)]
pub struct LimiterConfig {
    pub general: LimiterPolicy,
    pub login: LimiterPolicy,
    pub reservation: LimiterPolicy,
    pub upload: LimiterPolicy,
    pub admin: LimiterPolicy,
}

impl Default for LimiterConfig {
    fn default() -> Self {
        Self {
            general: LimiterPolicy::new(60_000, 60),
            login: LimiterPolicy::new(60_000, 5),
            reservation: LimiterPolicy::new(60_000, 10),
            upload: LimiterPolicy::new(3_600_000, 20),
            admin: LimiterPolicy::new(60_000, 100),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LimiterConfigError {
    #[error("limiter class `{0}` has a non-positive window")]
    NonPositiveWindow(&'static str),
    #[error("limiter class `{0}` has a zero request limit")]
    ZeroLimit(&'static str),
}

impl LimiterConfig {
    pub fn policy(&self, class: LimiterClass) -> LimiterPolicy {
        match class {
            LimiterClass::General => self.general,
            LimiterClass::Login => self.login,
            LimiterClass::Reservation => self.reservation,
            LimiterClass::Upload => self.upload,
            LimiterClass::Admin => self.admin,
        }
    }

    /// Reject broken policies at setup time; `check` never re-validates.
    pub fn validate(&self) -> Result<(), LimiterConfigError> {
        const CLASSES: [LimiterClass; 5] = [
            LimiterClass::General,
            LimiterClass::Login,
            LimiterClass::Reservation,
            LimiterClass::Upload,
            LimiterClass::Admin,
        ];

        for class in CLASSES {
            let policy = self.policy(class);
            if policy.window_ms <= 0 {
                return Err(LimiterConfigError::NonPositiveWindow(class.as_str()));
            }
            if policy.max_requests == 0 {
                return Err(LimiterConfigError::ZeroLimit(class.as_str()));
            }
        }

        Ok(())
    }
}

/// Outcome of one admission check. Carries everything a caller needs to build
/// the `X-RateLimit-*` response headers and, on rejection, `Retry-After`.
#[derive(Debug, Clone, Copy)]
pub struct Decision {
    pub allowed: bool,
    pub remaining: u32,
    pub reset_time: DateTime<Utc>,
    pub total_requests: u32,
    pub limit: u32,
}

impl Decision {
    pub fn reset_unix(&self) -> i64 {
        self.reset_time.timestamp()
    }

    /// Whole seconds until the window resets, floored at zero.
    pub fn retry_after_secs(&self, now: DateTime<Utc>) -> i64 {
        (self.reset_time - now).num_seconds().max(0)
    }
}

#[derive(Debug, Clone)]
struct WindowCounter {
    count: u32,
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
}

impl WindowCounter {
    fn open(now: DateTime<Utc>, window: Duration) -> Self {
        Self {
            count: 1,
            window_start: now,
            window_end: now + window,
        }
    }

    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.window_end
    }
}

/// In-memory fixed-window counter store.
///
/// DashMap's `entry` API locks a single shard for the duration of the
/// read-modify-write, which gives the required per-key critical section
/// without serializing checks on unrelated keys.
pub struct RateLimitStore {
    windows: DashMap<String, WindowCounter>,
    config: LimiterConfig,
    clock: Arc<dyn Clock>,
}

impl RateLimitStore {
    pub fn new(config: LimiterConfig, clock: Arc<dyn Clock>) -> Result<Self, LimiterConfigError> {
        config.validate()?;
        Ok(Self {
            windows: DashMap::new(),
            config,
            clock,
        })
    }

    /// Count one request against `(class, client_key)` and decide admission.
    pub fn check(&self, client_key: &str, class: LimiterClass) -> Decision {
        let policy = self.config.policy(class);
        let now = self.clock.now();
        let window = Duration::milliseconds(policy.window_ms);
        let composite = format!("{}:{}", class.as_str(), client_key);

        let counter = self
            .windows
            .entry(composite)
            .and_modify(|existing| {
                if existing.is_expired(now) {
                    *existing = WindowCounter::open(now, window);
                } else {
                    existing.count += 1;
                }
            })
            .or_insert_with(|| WindowCounter::open(now, window));

        let count = counter.count;
        let reset_time = counter.window_end;
        drop(counter);

        Decision {
            allowed: count <= policy.max_requests,
            remaining: policy.max_requests.saturating_sub(count),
            reset_time,
            total_requests: count,
            limit: policy.max_requests,
        }
    }

    /// Drop windows that have already elapsed. Memory management only:
    /// `check` treats expired records as absent regardless.
    pub fn sweep_expired(&self) -> usize {
        let now = self.clock.now();
        let before = self.windows.len();
        self.windows.retain(|_, counter| !counter.is_expired(now));
        before - self.windows.len()
    }

    pub fn active_windows(&self) -> usize {
        self.windows.len()
    }
}

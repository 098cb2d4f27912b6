// Copyright 2025 Folia Interiors
// SPDX-License-Identifier: Apache-2.0

//! Security event model and externalization.
//!
//! Events are append-only: created once per notable occurrence, masked, and
//! handed to a sink immediately. Nothing in this module stores events for
//! later query, and a sink failure never propagates to the request path.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

/// Placeholder written over masked detail values.
pub const REDACTION_MARKER: &str = "[REDACTED]";

const SENSITIVE_KEY_FRAGMENTS: [&str; 5] =
    ["password", "token", "secret", "key", "authorization"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SecurityEventKind {
    AuthSuccess,
    AuthFailure,
    SuspiciousActivity,
    ValidationError,
    RateLimitHit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl SecurityEventKind {
    /// Severity is derived from the kind alone. Suspicious activity may be
    /// explicitly escalated to Critical via [`SecurityEvent::escalate`]; no
    /// other escalation rule exists.
    pub const fn severity(&self) -> Severity {
        match self {
            SecurityEventKind::AuthSuccess => Severity::Low,
            SecurityEventKind::AuthFailure => Severity::Medium,
            SecurityEventKind::ValidationError => Severity::Medium,
            SecurityEventKind::RateLimitHit => Severity::High,
            SecurityEventKind::SuspiciousActivity => Severity::High,
        }
    }
}

/// One immutable security-relevant occurrence.
#[derive(Debug, Clone, Serialize)]
pub struct SecurityEvent {
    #[serde(rename = "type")]
    pub kind: SecurityEventKind,
    pub severity: Severity,
    pub client_ip: String,
    pub endpoint: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    pub details: Value,
    pub timestamp: DateTime<Utc>,
}

impl SecurityEvent {
    pub fn new(
        kind: SecurityEventKind,
        client_ip: impl Into<String>,
        endpoint: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            kind,
            severity: kind.severity(),
            client_ip: client_ip.into(),
            endpoint: endpoint.into(),
            username: None,
            user_agent: None,
            details: Value::Object(serde_json::Map::new()),
            timestamp,
        }
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn with_user_agent(mut self, user_agent: Option<String>) -> Self {
        self.user_agent = user_agent;
        self
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = details;
        self
    }

    /// Escalate suspicious activity to Critical. Other kinds keep their
    /// derived severity.
    pub fn escalate(mut self) -> Self {
        if self.kind == SecurityEventKind::SuspiciousActivity {
            self.severity = Severity::Critical;
        }
        self
    }
}

/// Replace values under sensitive keys at any nesting depth.
pub fn mask_sensitive(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for (key, entry) in map.iter_mut() {
                if is_sensitive_key(key) {
                    *entry = Value::String(REDACTION_MARKER.to_string());
                } else {
                    mask_sensitive(entry);
                }
            }
        }
        Value::Array(items) => {
            for item in items.iter_mut() {
                mask_sensitive(item);
            }
        }
        _ => {}
    }
}

fn is_sensitive_key(key: &str) -> bool {
    let lowered = key.to_ascii_lowercase();
    SENSITIVE_KEY_FRAGMENTS
        .iter()
        .any(|fragment| lowered.contains(fragment))
}

/// Outbound transport for security events.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &SecurityEvent) -> anyhow::Result<()>;
}

/// Default sink: structured tracing events on the `bookgate::security` target.
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: &SecurityEvent) -> anyhow::Result<()> {
        let payload = serde_json::to_string(event)?;
        match event.severity {
            Severity::Low => {
                tracing::info!(target: "bookgate::security", event = %payload, "security event")
            }
            Severity::Medium => {
                tracing::warn!(target: "bookgate::security", event = %payload, "security event")
            }
            Severity::High | Severity::Critical => {
                tracing::error!(target: "bookgate::security", event = %payload, "security event")
            }
        }
        Ok(())
    }
}

/// Fire-and-forget wrapper around a sink.
#[derive(Clone)]
pub struct SecurityLogger {
    sink: Arc<dyn EventSink>,
}

impl SecurityLogger {
    pub fn new(sink: Arc<dyn EventSink>) -> Self {
        Self { sink }
    }

    /// Mask and externalize one event. Transport failures are logged and
    /// swallowed; the admission decision must never depend on the sink.
    pub fn emit(&self, mut event: SecurityEvent) {
        mask_sensitive(&mut event.details);

        if let Err(error) = self.sink.emit(&event) {
            tracing::error!(%error, kind = ?event.kind, "failed to externalize security event");
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::Mutex;

    /// Sink that records every emitted event for assertions.
    #[derive(Default)]
    pub struct CapturingSink {
        pub events: Mutex<Vec<SecurityEvent>>,
    }

    impl EventSink for CapturingSink {
        fn emit(&self, event: &SecurityEvent) -> anyhow::Result<()> {
            self.events.lock().unwrap().push(event.clone());
            Ok(())
        }
    }

    /// Sink that always fails, for fire-and-forget behavior tests.
    pub struct FailingSink;

    impl EventSink for FailingSink {
        fn emit(&self, _event: &SecurityEvent) -> anyhow::Result<()> {
            anyhow::bail!("sink unavailable")
        }
    }
}

// Copyright 2025 Folia Interiors
// SPDX-License-Identifier: Apache-2.0

//! Request admission control.
//!
//! Gates requests by (client, limiter class) before they reach business
//! logic and records security events for rejections, authentication
//! outcomes, and validation failures.

use std::sync::Arc;

use serde_json::json;

use crate::clock::Clock;
use crate::limiter::{Decision, LimiterClass, LimiterConfig, LimiterConfigError, RateLimitStore};
use crate::security::{SecurityEvent, SecurityEventKind, SecurityLogger};

/// Validation detail values are truncated before logging to bound event size.
const MAX_RAW_VALUE_LEN: usize = 100;

pub struct AdmissionController {
    store: RateLimitStore,
    logger: SecurityLogger,
    clock: Arc<dyn Clock>,
}

impl AdmissionController {
    /// Build a controller over a validated policy table. A broken table is a
    /// setup error, reported here and never at check time.
    pub fn new(
        config: LimiterConfig,
        logger: SecurityLogger,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, LimiterConfigError> {
        let store = RateLimitStore::new(config, clock.clone())?;
        Ok(Self {
            store,
            logger,
            clock,
        })
    }

    /// Decide admission for one request. Emits one `RateLimitHit` event per
    /// rejected call.
    pub fn check_limit(
        &self,
        client_ip: &str,
        endpoint: &str,
        user_agent: Option<&str>,
        class: LimiterClass,
    ) -> Decision {
        let key = class.client_key(client_ip, endpoint);
        let decision = self.store.check(&key, class);

        if !decision.allowed {
            let event = SecurityEvent::new(
                SecurityEventKind::RateLimitHit,
                client_ip,
                endpoint,
                self.clock.now(),
            )
            .with_user_agent(user_agent.map(str::to_string))
            .with_details(json!({
                "limiter_class": class.as_str(),
                "max_requests": decision.limit,
                "total_requests": decision.total_requests,
            }));
            self.logger.emit(event);
        }

        decision
    }

    pub fn record_auth_outcome(
        &self,
        success: bool,
        client_ip: &str,
        username: &str,
        endpoint: &str,
        reason: Option<&str>,
        user_agent: Option<&str>,
    ) {
        let kind = if success {
            SecurityEventKind::AuthSuccess
        } else {
            SecurityEventKind::AuthFailure
        };

        let mut event = SecurityEvent::new(kind, client_ip, endpoint, self.clock.now())
            .with_username(username)
            .with_user_agent(user_agent.map(str::to_string));

        if let Some(reason) = reason {
            event = event.with_details(json!({ "reason": reason }));
        }

        self.logger.emit(event);
    }

    pub fn record_validation_failure(
        &self,
        client_ip: &str,
        endpoint: &str,
        field: &str,
        raw_value: &str,
        user_agent: Option<&str>,
    ) {
        let truncated: String = raw_value.chars().take(MAX_RAW_VALUE_LEN).collect();

        let event = SecurityEvent::new(
            SecurityEventKind::ValidationError,
            client_ip,
            endpoint,
            self.clock.now(),
        )
        .with_user_agent(user_agent.map(str::to_string))
        .with_details(json!({
            "field": field,
            "raw_value": truncated,
        }));

        self.logger.emit(event);
    }

    /// Remove expired window records. Called by the janitor task.
    pub fn sweep_expired(&self) -> usize {
        self.store.sweep_expired()
    }

    pub fn active_windows(&self) -> usize {
        self.store.active_windows()
    }
}

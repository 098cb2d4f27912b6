// Copyright 2025 Folia Interiors
// SPDX-License-Identifier: Apache-2.0

//! Prometheus metrics for admission decisions and task scoring.

use prometheus::{IntCounter, IntGauge, Opts, Registry};
use std::sync::Arc;

use crate::error::AppError;

#[derive(Clone)]
pub struct Metrics {
    pub registry: Arc<Registry>,

    // Admission metrics
    pub requests_admitted: IntCounter,
    pub requests_rejected: IntCounter,
    pub active_windows: IntGauge,
    pub windows_swept: IntCounter,

    // Security event metrics
    pub auth_successes: IntCounter,
    pub auth_failures: IntCounter,
    pub validation_failures: IntCounter,

    // Scoring metrics
    pub tasks_scored: IntCounter,
}

impl Metrics {
    pub fn new() -> Result<Self, AppError> {
        let registry = Registry::new();

        let requests_admitted = IntCounter::with_opts(Opts::new(
            "bookgate_requests_admitted_total",
            "Total number of requests admitted by the rate limiter",
        ))
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to create metric: {}", e)))?;

        let requests_rejected = IntCounter::with_opts(Opts::new(
            "bookgate_requests_rejected_total",
            "Total number of requests rejected by the rate limiter",
        ))
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to create metric: {}", e)))?;

        let active_windows = IntGauge::with_opts(Opts::new(
            "bookgate_active_windows",
            "Current number of live rate-limit window records",
        ))
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to create metric: {}", e)))?;

        let windows_swept = IntCounter::with_opts(Opts::new(
            "bookgate_windows_swept_total",
            "Total number of expired window records removed by the janitor",
        ))
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to create metric: {}", e)))?;

        let auth_successes = IntCounter::with_opts(Opts::new(
            "bookgate_auth_successes_total",
            "Total number of successful login attempts",
        ))
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to create metric: {}", e)))?;

        let auth_failures = IntCounter::with_opts(Opts::new(
            "bookgate_auth_failures_total",
            "Total number of failed login attempts",
        ))
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to create metric: {}", e)))?;

        let validation_failures = IntCounter::with_opts(Opts::new(
            "bookgate_validation_failures_total",
            "Total number of request payload validation failures",
        ))
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to create metric: {}", e)))?;

        let tasks_scored = IntCounter::with_opts(Opts::new(
            "bookgate_tasks_scored_total",
            "Total number of tasks run through the scoring engine",
        ))
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to create metric: {}", e)))?;

        registry
            .register(Box::new(requests_admitted.clone()))
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to register metric: {}", e)))?;
        registry
            .register(Box::new(requests_rejected.clone()))
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to register metric: {}", e)))?;
        registry
            .register(Box::new(active_windows.clone()))
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to register metric: {}", e)))?;
        registry
            .register(Box::new(windows_swept.clone()))
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to register metric: {}", e)))?;
        registry
            .register(Box::new(auth_successes.clone()))
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to register metric: {}", e)))?;
        registry
            .register(Box::new(auth_failures.clone()))
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to register metric: {}", e)))?;
        registry
            .register(Box::new(validation_failures.clone()))
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to register metric: {}", e)))?;
        registry
            .register(Box::new(tasks_scored.clone()))
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to register metric: {}", e)))?;

        Ok(Self {
            registry: Arc::new(registry),
            requests_admitted,
            requests_rejected,
            active_windows,
            windows_swept,
            auth_successes,
            auth_failures,
            validation_failures,
            tasks_scored,
        })
    }

    /// Record one admission decision.
    pub fn record_admission(&self, allowed: bool) {
        if allowed {
            self.requests_admitted.inc();
        } else {
            self.requests_rejected.inc();
        }
    }

    /// Record one authentication outcome.
    pub fn record_auth_outcome(&self, success: bool) {
        if success {
            self.auth_successes.inc();
        } else {
            self.auth_failures.inc();
        }
    }

    pub fn record_validation_failure(&self) {
        self.validation_failures.inc();
    }

    pub fn record_task_scored(&self) {
        self.tasks_scored.inc();
    }

    /// Record one janitor pass.
    pub fn record_sweep(&self, purged: usize, remaining: usize) {
        self.windows_swept.inc_by(purged as u64);
        self.active_windows.set(remaining as i64);
    }

    /// Export metrics in Prometheus format
    pub fn export(&self) -> Result<String, AppError> {
        use prometheus::Encoder;

        let encoder = prometheus::TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();

        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to encode metrics: {}", e)))?;

        String::from_utf8(buffer).map_err(|e| {
            AppError::Internal(anyhow::anyhow!(
                "Failed to convert metrics to string: {}",
                e
            ))
        })
    }
}

use std::env;
use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result};

pub struct AppConfig {
    pub listen_addr: SocketAddr,
    pub sweep_interval: Duration,
    pub admin_username: String,
    pub admin_password: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let listen_addr: SocketAddr = env::var("BOOKGATE_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:8080".to_string())
            .parse()
            .context("invalid BOOKGATE_ADDR")?;

        // Sweep cadence is independent of any limiter window; it only bounds
        // how long expired counters linger in memory.
        let sweep_interval = parse_duration("BOOKGATE_SWEEP_SECONDS", 300)?;

        let admin_username =
            env::var("BOOKGATE_ADMIN_USER").unwrap_or_else(|_| "admin".to_string());
        let admin_password = env::var("BOOKGATE_ADMIN_PASSWORD")
            .context("BOOKGATE_ADMIN_PASSWORD must be set")?;

        Ok(Self {
            listen_addr,
            sweep_interval,
            admin_username,
            admin_password,
        })
    }

    pub fn listen_addr(&self) -> SocketAddr {
        self.listen_addr
    }

    pub fn sweep_interval(&self) -> Duration {
        self.sweep_interval
    }
}

fn parse_duration(env_key: &str, default_secs: u64) -> Result<Duration> {
    let raw = env::var(env_key).unwrap_or_else(|_| default_secs.to_string());
    let secs: u64 = raw
        .parse()
        .with_context(|| format!("{env_key} must be an integer number of seconds"))?;

    Ok(Duration::from_secs(secs))
}

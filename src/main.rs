mod admission;
mod api;
mod auth;
mod clock;
mod config;
mod error;
mod limiter;
mod metrics;
mod model;
mod repository;
mod scoring;
mod security;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use api::AppState;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cfg = config::AppConfig::from_env()?;

    let clock: Arc<dyn clock::Clock> = Arc::new(clock::SystemClock);
    let logger = security::SecurityLogger::new(Arc::new(security::TracingSink));
    let admission = Arc::new(admission::AdmissionController::new(
        limiter::LimiterConfig::default(),
        logger,
        clock.clone(),
    )?);
    let metrics = metrics::Metrics::new()?;

    let state = AppState {
        admission: admission.clone(),
        repository: repository::Repository::new(repository::MemoryRepository::new()),
        verifier: Arc::new(auth::StaticVerifier::new(
            cfg.admin_username.clone(),
            cfg.admin_password.clone(),
        )),
        metrics: metrics.clone(),
        clock,
    };

    spawn_janitor(admission, metrics, cfg.sweep_interval());

    let app = api::router(state);

    let listen_addr = cfg.listen_addr();
    let listener = tokio::net::TcpListener::bind(listen_addr).await?;

    tracing::info!(%listen_addr, "starting bookgate admission gateway");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("bookgate exited cleanly");

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn spawn_janitor(
    admission: Arc<admission::AdmissionController>,
    metrics: metrics::Metrics,
    interval: Duration,
) {
    if interval.is_zero() {
        tracing::warn!("sweep interval disabled; expired windows will linger");
        return;
    }

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            let purged = admission.sweep_expired();
            metrics.record_sweep(purged, admission.active_windows());
            if purged > 0 {
                tracing::debug!(purged, "purged expired rate-limit windows");
            }
        }
    });
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            tracing::warn!(%error, "failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut term_signal) => term_signal.recv().await,
            Err(error) => {
                tracing::warn!(%error, "failed to install SIGTERM handler");
                None
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received");
}

//! QR Pass HTTP server.
//!
//! Verifies encrypted event tickets presented at gates and records
//! check-ins, behind per-client rate limits.

mod config;

use anyhow::Context;
use axum::{routing::get, Router};
use config::Config;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use qrpass_core::{Clock, InMemoryAttendance, RateLimitGuard, SystemClock, TicketCipher};
use qrpass_web::{build_router, metrics::describe_metrics, spawn_window_sweeper, AppState};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is normal in production.
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,qrpass=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting QR Pass server");

    let config = Config::from_env().context("Failed to load configuration")?;
    info!(
        bind_addr = %config.bind_addr(),
        trust_proxy_headers = config.trust_proxy_headers,
        general_max_requests = config.rate_limit.general.max_requests,
        general_window_secs = config.rate_limit.general.window.num_seconds(),
        verify_max_requests = config.rate_limit.verification.max_requests,
        verify_window_secs = config.rate_limit.verification.window.num_seconds(),
        "Configuration loaded"
    );

    let metrics_handle = PrometheusBuilder::new()
        .install_recorder()
        .context("Failed to install Prometheus recorder")?;
    describe_metrics();

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let guard = Arc::new(RateLimitGuard::new(config.rate_limit.clone()));
    let state = AppState::new(
        Arc::new(TicketCipher::from_secret(config.secret.expose())),
        Arc::clone(&guard),
        Arc::clone(&clock),
        Arc::new(InMemoryAttendance::new()),
    )
    .with_trust_proxy_headers(config.trust_proxy_headers);

    let sweeper = spawn_window_sweeper(guard, clock, config.sweep_interval);

    let app = build_router(state).merge(metrics_router(metrics_handle));

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Server listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    sweeper.abort();
    info!("Server stopped");
    Ok(())
}

/// `GET /metrics` in Prometheus text format.
fn metrics_router(handle: PrometheusHandle) -> Router {
    Router::new().route("/metrics", get(move || std::future::ready(handle.render())))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C signal, shutting down gracefully...");
        },
        () = terminate => {
            info!("Received SIGTERM signal, shutting down gracefully...");
        },
    }
}

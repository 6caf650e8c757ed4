use anyhow::Result;
use axum::serve;
use sentinel_core::{
    health::{IntegrityProber, ReadinessProber},
    LoadBalancer, MetricsCollector, ProxyConfig,
};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::{signal, sync::broadcast};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use server::{create_app, AppState};

/// In-flight requests get this long to drain after a shutdown signal before
/// the process exits anyway.
const SHUTDOWN_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// `RUST_LOG` takes precedence; the configured `LOG_LEVEL` is the fallback.
fn init_logging(cfg: &ProxyConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cfg.log_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // A local .env is a convenience, not a requirement.
    dotenvy::dotenv().ok();

    let cfg = ProxyConfig::load()
        .map_err(|e| anyhow::anyhow!("Configuration loading failed: {e}"))?;
    init_logging(&cfg);

    let cfg = Arc::new(cfg);
    info!(
        backends = cfg.backend_urls().len(),
        port = cfg.proxy_port,
        "Starting sentinel proxy"
    );

    let metrics = Arc::new(MetricsCollector::new());
    let lb = Arc::new(LoadBalancer::new(&cfg, metrics.clone()));

    let (shutdown_tx, _) = broadcast::channel::<()>(1);

    let readiness_handle = ReadinessProber::new(cfg.clone(), lb.clone())
        .start_with_shutdown(shutdown_tx.subscribe());
    let integrity_handle = Arc::new(IntegrityProber::new(cfg.clone(), lb.clone()))
        .start_with_shutdown(shutdown_tx.subscribe());

    let state = Arc::new(AppState::new(cfg.clone(), lb, metrics));
    let app = create_app(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], cfg.proxy_port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(address = %addr, "Sentinel proxy listening");

    let server = serve(listener, app).with_graceful_shutdown(shutdown_signal());
    tokio::select! {
        result = server => {
            if let Err(e) = result {
                error!(error = %e, "Server error occurred");
            }
        }
        () = drain_deadline() => {
            warn!(
                timeout_secs = SHUTDOWN_DRAIN_TIMEOUT.as_secs(),
                "Drain deadline exceeded, abandoning in-flight requests"
            );
        }
    }

    let _ = shutdown_tx.send(());
    readiness_handle.abort();
    integrity_handle.abort();
    info!("Server exited properly");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                () = std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Shutdown signal received, draining in-flight requests");
}

/// Completes one drain-timeout after the first shutdown signal.
async fn drain_deadline() {
    shutdown_signal().await;
    tokio::time::sleep(SHUTDOWN_DRAIN_TIMEOUT).await;
}

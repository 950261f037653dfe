use anyhow::Result;
use axum::serve;
use hydra_core::{
    config::{AppConfig, LoggingConfig},
    upstream::{Dispatcher, UpstreamPool},
};
use hydra_server::router;
use std::sync::Arc;
use tokio::signal;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initializes the logging system based on the configuration.
///
/// `RUST_LOG` takes precedence over the configured level when set.
fn init_logging(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "warn,hydra_core={level},hydra_server={level}",
            level = config.level
        ))
    });

    let registry = tracing_subscriber::registry().with(filter);

    if config.format.as_str() == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .pretty()
            .with_file(true)
            .with_line_number(true)
            .with_target(false);
        registry.with(fmt_layer).init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config =
        AppConfig::load().map_err(|e| anyhow::anyhow!("Configuration loading failed: {e}"))?;
    config.validate().map_err(|e| anyhow::anyhow!("Configuration validation failed: {e}"))?;

    init_logging(&config.logging);
    info!("starting hydra daemon gateway");

    let pool = Arc::new(
        UpstreamPool::new(config.pool_settings())
            .map_err(|e| anyhow::anyhow!("Upstream pool initialization failed: {e}"))?,
    );
    pool.start_reaper();

    // Seed admission runs in the background so a slow bootstrap node cannot
    // delay the listener; the handle is dropped at shutdown.
    let seeds = config.seed_nodes.clone();
    let seed_pool = Arc::clone(&pool);
    let seed_handle = tokio::spawn(async move {
        seed_pool.seed(&seeds).await;
    });

    let dispatcher = Arc::new(Dispatcher::new(Arc::clone(&pool), config.dispatch_timeout()));

    let app = router::gateway_router(dispatcher)
        .layer(ConcurrencyLimitLayer::new(config.server.max_concurrent_requests))
        .layer(RequestBodyLimitLayer::new(1024 * 1024));

    let addr = config.socket_addr().map_err(|e| anyhow::anyhow!(e))?;
    info!(address = %addr, seeds = config.seed_nodes.len(), "gateway listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    if let Err(e) = serve(listener, app).with_graceful_shutdown(shutdown_signal()).await {
        error!(error = %e, "server error occurred");
    }

    seed_handle.abort();
    pool.shutdown().await;
    info!("gateway shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install signal handler");
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

    info!("shutdown signal received, starting graceful shutdown");
}

use anyhow::{Context, Result};
use axum::Router;
use services::{bridge_service::BridgeService, s3_store::S3Store, store::RemoteStore};
use std::{io::ErrorKind, sync::Arc};
use tokio::{net::TcpListener, task::JoinSet};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

mod config;
mod errors;
mod handlers;
mod models;
mod routes;
mod services;

#[tokio::main]
async fn main() -> Result<()> {
    // --- Parse config ---
    let cfg = config::AppConfig::from_env_and_args();

    // --- Logging setup (RUST_LOG wins over --loglevel) ---
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cfg.log_level.as_filter()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // --- Validate before touching the network ---
    cfg.validate().context("invalid configuration")?;
    tracing::info!("Starting s3-bridge with config: {:?}", cfg);

    // --- Initialize core service ---
    let store: Arc<dyn RemoteStore> = Arc::new(S3Store::new(&cfg));
    let service = BridgeService::new(store, cfg.expiry, cfg.read_chunk_size);

    // --- Bind every enabled listener before serving any ---
    let mut listeners: Vec<(&'static str, TcpListener, Router<BridgeService>)> = Vec::new();
    if let Some(addr) = cfg.presign_addr() {
        let listener = bind_listener(&addr, &cfg.host, cfg.presign_port).await?;
        listeners.push(("presign", listener, routes::routes::presign_routes()));
    }
    if let Some(addr) = cfg.proxy_addr() {
        let listener = bind_listener(&addr, &cfg.host, cfg.proxy_port).await?;
        listeners.push(("proxy", listener, routes::routes::proxy_routes()));
    }
    if listeners.is_empty() {
        anyhow::bail!("no listener enabled: both --proxy-port and --presign-port are 0");
    }

    // --- Start servers ---
    let shutdown = CancellationToken::new();
    tokio::spawn(shutdown_signal(shutdown.clone()));

    let mut servers = JoinSet::new();
    for (name, listener, router) in listeners {
        let app = router.with_state(service.clone());
        let token = shutdown.clone();
        tracing::info!(
            "{} service listening on http://{}",
            name,
            listener.local_addr()?
        );
        servers.spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(token.cancelled_owned())
                .await
                .with_context(|| format!("{} service failed", name))
        });
    }

    while let Some(joined) = servers.join_next().await {
        if let Err(err) = joined.context("server task panicked").and_then(|res| res) {
            shutdown.cancel();
            return Err(err);
        }
    }

    tracing::debug!("finishing");
    Ok(())
}

/// Bind `addr`, falling back to loopback when a wildcard bind is refused
/// (e.g. an unprivileged user asking for port 80).
async fn bind_listener(addr: &str, host: &str, port: u16) -> Result<TcpListener> {
    match TcpListener::bind(addr).await {
        Ok(listener) => Ok(listener),
        Err(err)
            if err.kind() == ErrorKind::PermissionDenied && matches!(host, "0.0.0.0" | "::") =>
        {
            let fallback_addr = format!("127.0.0.1:{}", port);
            tracing::warn!(
                "Permission denied binding to {} ({}). Falling back to {}",
                addr,
                err,
                fallback_addr
            );
            TcpListener::bind(&fallback_addr)
                .await
                .with_context(|| format!("binding {}", fallback_addr))
        }
        Err(err) => Err(err).with_context(|| format!("binding {}", addr)),
    }
}

/// Cancel `token` on Ctrl-C or SIGTERM.
async fn shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::warn!("failed to listen for Ctrl-C: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::warn!("failed to listen for SIGTERM: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received, draining connections");
    token.cancel();
}

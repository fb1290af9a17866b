use anyhow::Context;
use axum::Router;
use scout_core::{api, app, config};
use std::net::SocketAddr;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    scout_telemetry::init();

    let (cfg, cfg_path) = config::Config::load().context("loading config/scout.toml")?;
    info!(?cfg_path, "config loaded");

    let state = app::AppState::new(cfg);
    let router: Router = api::build_router(state);

    let addr: SocketAddr = std::env::var("SCOUT_BIND")
        .unwrap_or_else(|_| "127.0.0.1:6080".to_string())
        .parse()
        .context("invalid SCOUT_BIND address")?;

    info!(%addr, version = env!("CARGO_PKG_VERSION"), "scout-core listening");

    let server = axum::serve(tokio::net::TcpListener::bind(addr).await?, router);

    let graceful = server.with_graceful_shutdown(async move {
        let _ = tokio::signal::ctrl_c().await;
        info!("ctrl-c received; shutting down");
    });

    if let Err(e) = graceful.await {
        error!(error = %e, "server error");
    }

    Ok(())
}

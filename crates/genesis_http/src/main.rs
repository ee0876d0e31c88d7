//! Server entry point.
//!
//! # Responsibility
//! - Load configuration, start logging, migrate the record store, and serve
//!   the JSON API until Ctrl-C.

use genesis_core::db::open_db;
use genesis_core::init_logging;
use genesis_http::{router, AppConfig, AppState};
use log::{info, warn};
use std::error::Error;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let config = AppConfig::from_env()?;
    init_logging(config.log_level.as_str(), &config.log_dir)?;

    if let Some(parent) = config.database_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    // Apply migrations once up front so a broken store fails startup.
    drop(open_db(&config.database_path)?);

    let state = AppState::new(config.database_path.clone());
    info!(
        "event=server_start module=http status=ok bind={} db_path={}",
        config.bind_addr,
        state.db_path().display()
    );
    eprintln!("genesis_server listening on http://{}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("event=server_stop module=http status=ok");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("event=server_signal module=http status=error error={}", err);
    }
}

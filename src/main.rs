// =============================================================================
// StockScope — Main Entry Point
// =============================================================================
//
// Startup order:
//   1. .env, config file, ticker override, validation
//   2. File logging (the terminal is reserved for the dashboard)
//   3. Refresh loop task: fetch -> indicators -> watch channel
//   4. Terminal UI on a blocking thread until the user quits
//   5. Signal shutdown and wait for the refresh loop to stop
// =============================================================================

// ── Module declarations ──────────────────────────────────────────────────────
mod analysis;
mod chart;
mod config;
mod indicators;
mod logging;
mod market_data;
mod refresh;
mod terminal;

use std::sync::Arc;

use anyhow::Context;
use tokio::sync::{watch, Notify};
use tracing::{error, info};

use crate::config::{AppConfig, SYMBOL_ENV};
use crate::market_data::YahooClient;
use crate::refresh::{run_refresh_loop, DashboardState, RefreshChannels};

/// Environment variable naming an alternative config file.
const CONFIG_PATH_ENV: &str = "STOCKSCOPE_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "stockscope.json";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Environment & config ──────────────────────────────────────────
    let _ = dotenv::dotenv();

    let config_path =
        std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let (config, origin) = AppConfig::resolve(&config_path, std::env::var(SYMBOL_ENV).ok())?;

    // ── 2. Logging ───────────────────────────────────────────────────────
    let _log_guard = logging::init(&config.log_dir)?;

    info!("StockScope starting");
    origin.log(&config);
    info!(
        symbol = %config.symbol,
        start = %config.start_date,
        end = %config.end_date,
        refresh_secs = config.refresh_interval_secs,
        "configuration ready"
    );

    // ── 3. Refresh loop ──────────────────────────────────────────────────
    let client = YahooClient::new(&config.base_url)?;
    let (updates_tx, updates_rx) = watch::channel(DashboardState::Loading);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let refresh_now = Arc::new(Notify::new());

    let refresh_handle = tokio::spawn(run_refresh_loop(
        client,
        config.clone(),
        RefreshChannels {
            updates: updates_tx,
            refresh_now: refresh_now.clone(),
            shutdown: shutdown_rx,
        },
    ));

    // ── 4. Terminal UI ───────────────────────────────────────────────────
    let ui_config = config.clone();
    let ui_result = tokio::task::spawn_blocking(move || {
        terminal::run(&ui_config, updates_rx, refresh_now)
    })
    .await
    .context("UI thread panicked")?;

    // ── 5. Shutdown ──────────────────────────────────────────────────────
    let _ = shutdown_tx.send(true);
    if let Err(e) = refresh_handle.await {
        error!(error = %e, "refresh task ended abnormally");
    }

    match &ui_result {
        Ok(()) => info!("shut down complete"),
        Err(e) => error!(error = %format!("{e:#}"), "UI exited with error"),
    }
    ui_result
}

// =============================================================================
// Application Configuration — ticker, date range, refresh cadence, windows
// =============================================================================
//
// Everything the refresh cycle needs is carried in one `AppConfig` record that
// is passed explicitly into the loop.  All fields carry `#[serde(default)]`
// so an empty or partial `stockscope.json` still loads, and running with no
// file at all reproduces the stock setup: AAPL, 2023-01-01..=2023-09-01,
// refreshed every 60 seconds.
//
// =============================================================================

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::analysis::IndicatorParams;
use crate::market_data::{yahoo, HistoryRequest};

/// Environment variable that overrides the configured ticker.
pub const SYMBOL_ENV: &str = "STOCKSCOPE_SYMBOL";

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_symbol() -> String {
    "AAPL".to_string()
}

fn default_start_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2023, 1, 1).unwrap_or_default()
}

fn default_end_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2023, 9, 1).unwrap_or_default()
}

fn default_refresh_interval_secs() -> u64 {
    60
}

fn default_ma_window() -> usize {
    20
}

fn default_bollinger_window() -> usize {
    20
}

fn default_bollinger_num_std() -> f64 {
    2.0
}

fn default_rsi_window() -> usize {
    14
}

fn default_base_url() -> String {
    yahoo::DEFAULT_BASE_URL.to_string()
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}

// =============================================================================
// AppConfig
// =============================================================================

/// Top-level configuration for one dashboard session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    // --- What to fetch ------------------------------------------------------

    /// Ticker symbol, e.g. "AAPL".
    #[serde(default = "default_symbol")]
    pub symbol: String,

    /// First calendar date of the history (inclusive).
    #[serde(default = "default_start_date")]
    pub start_date: NaiveDate,

    /// Last calendar date of the history (inclusive).
    #[serde(default = "default_end_date")]
    pub end_date: NaiveDate,

    /// Market-data API host.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    // --- Refresh cadence ------------------------------------------------------

    /// Seconds between refresh ticks.
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,

    // --- Indicator windows ----------------------------------------------------

    /// Moving-average window (rows).
    #[serde(default = "default_ma_window")]
    pub ma_window: usize,

    /// Bollinger Band window (rows). Must be >= 2 (sample deviation).
    #[serde(default = "default_bollinger_window")]
    pub bollinger_window: usize,

    /// Bollinger Band width in standard deviations.
    #[serde(default = "default_bollinger_num_std")]
    pub bollinger_num_std: f64,

    /// RSI window (deltas).
    #[serde(default = "default_rsi_window")]
    pub rsi_window: usize,

    // --- Logging --------------------------------------------------------------

    /// Directory for the rolling log file.
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            symbol: default_symbol(),
            start_date: default_start_date(),
            end_date: default_end_date(),
            base_url: default_base_url(),
            refresh_interval_secs: default_refresh_interval_secs(),
            ma_window: default_ma_window(),
            bollinger_window: default_bollinger_window(),
            bollinger_num_std: default_bollinger_num_std(),
            rsi_window: default_rsi_window(),
            log_dir: default_log_dir(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a JSON file at `path`.
    ///
    /// If the file does not exist, returns an error so the caller can fall
    /// back to defaults with a warning.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config from {}", path.display()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("failed to parse config from {}", path.display()))
    }

    /// Startup resolution: file (or defaults), then the ticker override,
    /// then validation.
    ///
    /// Nothing is logged here because the log directory comes from the
    /// result; call [`ConfigOrigin::log`] once logging is up.
    pub fn resolve(
        path: impl AsRef<Path>,
        symbol_override: Option<String>,
    ) -> Result<(Self, ConfigOrigin)> {
        let path = path.as_ref().to_path_buf();
        let (mut config, origin) = match Self::load(&path) {
            Ok(config) => (config, ConfigOrigin::File(path)),
            Err(e) => (
                Self::default(),
                ConfigOrigin::Defaults {
                    path,
                    reason: format!("{e:#}"),
                },
            ),
        };
        config.apply_symbol_override(symbol_override);
        config.validate()?;
        Ok((config, origin))
    }

    /// Apply the `STOCKSCOPE_SYMBOL` override, if set and non-blank.
    pub fn apply_symbol_override(&mut self, value: Option<String>) {
        if let Some(symbol) = value
            .map(|s| s.trim().to_uppercase())
            .filter(|s| !s.is_empty())
        {
            self.symbol = symbol;
        }
    }

    /// Reject settings the refresh cycle cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.symbol.trim().is_empty() {
            anyhow::bail!("symbol must not be empty");
        }
        if let Some(bad) = self
            .symbol
            .chars()
            .find(|c| matches!(c, '/' | '?' | '#') || c.is_whitespace())
        {
            anyhow::bail!("symbol {:?} contains {bad:?}", self.symbol);
        }
        if self.start_date > self.end_date {
            anyhow::bail!(
                "start_date {} is after end_date {}",
                self.start_date,
                self.end_date
            );
        }
        if self.refresh_interval_secs == 0 {
            anyhow::bail!("refresh_interval_secs must be at least 1");
        }
        if self.ma_window == 0 || self.rsi_window == 0 {
            anyhow::bail!("ma_window and rsi_window must be at least 1");
        }
        if self.bollinger_window < 2 {
            anyhow::bail!("bollinger_window must be at least 2");
        }
        if !(self.bollinger_num_std >= 0.0 && self.bollinger_num_std.is_finite()) {
            anyhow::bail!("bollinger_num_std must be a non-negative number");
        }
        Ok(())
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    pub fn history_request(&self) -> HistoryRequest {
        HistoryRequest {
            symbol: self.symbol.clone(),
            start: self.start_date,
            end: self.end_date,
        }
    }

    pub fn indicator_params(&self) -> IndicatorParams {
        IndicatorParams {
            ma_window: self.ma_window,
            bollinger_window: self.bollinger_window,
            bollinger_num_std: self.bollinger_num_std,
            rsi_window: self.rsi_window,
        }
    }
}

/// Where the running configuration came from.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigOrigin {
    File(PathBuf),
    Defaults { path: PathBuf, reason: String },
}

impl ConfigOrigin {
    pub fn log(&self, config: &AppConfig) {
        match self {
            Self::File(path) => info!(
                path = %path.display(),
                symbol = %config.symbol,
                start = %config.start_date,
                end = %config.end_date,
                "config loaded"
            ),
            Self::Defaults { path, reason } => warn!(
                path = %path.display(),
                error = %reason,
                "Failed to load config, using defaults"
            ),
        }
    }
}

// =============================================================================
// Refresh Loop — fetch, compute, publish on a fixed interval
// =============================================================================
//
// One task owns the whole cycle.  Each tick:
//   1. Fetch the configured history from the price source
//   2. Build a fresh IndicatorFrame (nothing carries over between ticks)
//   3. Publish the result on a watch channel; the UI only ever sees the
//      latest complete state
//
// The loop ends when the shutdown signal flips to `true` or its sender is
// dropped, including while a fetch is in flight.
// =============================================================================

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Utc};
use tokio::sync::{watch, Notify};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

use crate::analysis::{IndicatorFrame, IndicatorParams};
use crate::config::AppConfig;
use crate::market_data::{HistoryRequest, PriceSource};

// =============================================================================
// Dashboard state
// =============================================================================

/// What the display should currently show.
#[derive(Debug, Clone)]
pub enum DashboardState {
    /// No tick has completed yet.
    Loading,
    /// Latest successful refresh.
    Ready {
        frame: Arc<IndicatorFrame>,
        tick_started: DateTime<Utc>,
    },
    /// Latest tick failed; the previous frame is discarded.
    Failed {
        message: String,
        at: DateTime<Utc>,
        tick_started: DateTime<Utc>,
    },
}

impl DashboardState {
    pub fn frame(&self) -> Option<&IndicatorFrame> {
        match self {
            Self::Ready { frame, .. } => Some(frame),
            _ => None,
        }
    }

    /// Completion time of the tick that produced this state.
    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Loading => None,
            Self::Ready { frame, .. } => Some(frame.computed_at),
            Self::Failed { at, .. } => Some(*at),
        }
    }

    /// When the producing tick fired. The interval runs from this instant,
    /// so the next tick is one period after it regardless of fetch time.
    pub fn tick_started(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Loading => None,
            Self::Ready { tick_started, .. } | Self::Failed { tick_started, .. } => {
                Some(*tick_started)
            }
        }
    }
}

// =============================================================================
// Single tick
// =============================================================================

/// Fetch and compute one frame.
pub async fn refresh_once<S: PriceSource>(
    source: &S,
    request: &HistoryRequest,
    params: IndicatorParams,
) -> Result<IndicatorFrame> {
    let series = source.fetch_history(request).await?;
    Ok(IndicatorFrame::compute(series, params))
}

// =============================================================================
// Loop
// =============================================================================

/// Handles the refresh task needs besides its config.
pub struct RefreshChannels {
    pub updates: watch::Sender<DashboardState>,
    pub refresh_now: Arc<Notify>,
    pub shutdown: watch::Receiver<bool>,
}

/// Run ticks every `config.refresh_interval()` until shutdown.
///
/// The first tick fires immediately.  A `refresh_now` notification runs a
/// tick straight away and restarts the interval.
pub async fn run_refresh_loop<S: PriceSource>(source: S, config: AppConfig, channels: RefreshChannels) {
    let RefreshChannels {
        updates,
        refresh_now,
        mut shutdown,
    } = channels;

    let request = config.history_request();
    let params = config.indicator_params();
    let period = config.refresh_interval();

    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    info!(
        request = %request,
        period_secs = period.as_secs(),
        "refresh loop starting"
    );

    let mut tick: u64 = 0;
    loop {
        tokio::select! {
            _ = interval.tick() => {}
            _ = refresh_now.notified() => {
                debug!("manual refresh requested");
                interval.reset();
            }
            _ = wait_for_shutdown(&mut shutdown) => break,
        }

        tick += 1;
        let tick_started = Utc::now();
        let state = tokio::select! {
            outcome = refresh_once(&source, &request, params) => match outcome {
                Ok(frame) => {
                    info!(
                        tick,
                        symbol = %frame.symbol(),
                        rows = frame.len(),
                        last_close = ?frame.series.last_close(),
                        "refresh complete"
                    );
                    DashboardState::Ready {
                        frame: Arc::new(frame),
                        tick_started,
                    }
                }
                Err(e) => {
                    let message = format!("{e:#}");
                    error!(tick, request = %request, error = %message, "refresh failed");
                    DashboardState::Failed {
                        message,
                        at: Utc::now(),
                        tick_started,
                    }
                }
            },
            _ = wait_for_shutdown(&mut shutdown) => break,
        };

        if updates.send(state).is_err() {
            debug!("dashboard receiver dropped");
            break;
        }
    }

    info!(ticks = tick, "refresh loop stopped");
}

/// Resolves once shutdown is requested or the signal's sender is gone.
async fn wait_for_shutdown(shutdown: &mut watch::Receiver<bool>) {
    while !*shutdown.borrow_and_update() {
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}

/// Time left until the next scheduled tick after `last`, saturating at zero.
pub fn next_refresh_in(last: DateTime<Utc>, period: Duration, now: DateTime<Utc>) -> Duration {
    let elapsed = (now - last).to_std().unwrap_or_default();
    period.saturating_sub(elapsed)
}

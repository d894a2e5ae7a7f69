// =============================================================================
// Indicator Frame — one refresh worth of prices plus derived columns
// =============================================================================
//
// Pipeline (run from scratch on every tick):
//   1. Take the fetched price series
//   2. Moving average of the closes
//   3. Bollinger upper / middle / lower
//   4. RSI
//
// Every derived column has exactly one entry per candle.
// =============================================================================

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use crate::indicators::bollinger::{calculate_bollinger, BollingerResult};
use crate::indicators::rsi::latest_rsi;
use crate::indicators::{bollinger_bands, calculate_rsi, moving_average, BollingerSeries, RsiZone};
use crate::market_data::PriceSeries;

/// Window sizes and multipliers for one computation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct IndicatorParams {
    pub ma_window: usize,
    pub bollinger_window: usize,
    pub bollinger_num_std: f64,
    pub rsi_window: usize,
}

impl Default for IndicatorParams {
    fn default() -> Self {
        Self {
            ma_window: 20,
            bollinger_window: 20,
            bollinger_num_std: 2.0,
            rsi_window: 14,
        }
    }
}

/// Prices and all indicator columns for a single refresh.
#[derive(Debug, Clone)]
pub struct IndicatorFrame {
    pub series: PriceSeries,
    pub params: IndicatorParams,
    pub moving_average: Vec<Option<f64>>,
    pub bands: BollingerSeries,
    pub rsi: Vec<Option<f64>>,
    pub computed_at: DateTime<Utc>,
}

impl IndicatorFrame {
    pub fn compute(series: PriceSeries, params: IndicatorParams) -> Self {
        Self::compute_at(series, params, Utc::now())
    }

    pub fn compute_at(series: PriceSeries, params: IndicatorParams, computed_at: DateTime<Utc>) -> Self {
        let closes = series.closes();

        let moving_average = moving_average(&closes, params.ma_window);
        let bands = bollinger_bands(&closes, params.bollinger_window, params.bollinger_num_std);
        let rsi = calculate_rsi(&closes, params.rsi_window);

        debug!(
            symbol = %series.symbol(),
            rows = closes.len(),
            ma_defined = moving_average.iter().flatten().count(),
            rsi_defined = rsi.iter().flatten().count(),
            "indicator frame computed"
        );

        Self {
            series,
            params,
            moving_average,
            bands,
            rsi,
            computed_at,
        }
    }

    pub fn symbol(&self) -> &str {
        self.series.symbol()
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    /// Most recent defined RSI value and its zone.
    pub fn last_rsi(&self) -> Option<(f64, RsiZone)> {
        latest_rsi(&self.rsi)
    }

    /// Bollinger snapshot (including band width) for the latest window.
    pub fn last_bollinger(&self) -> Option<BollingerResult> {
        calculate_bollinger(
            &self.series.closes(),
            self.params.bollinger_window,
            self.params.bollinger_num_std,
        )
    }

    /// `(min, max)` over every price and band value, for chart scaling.
    pub fn price_bounds(&self) -> Option<(f64, f64)> {
        let (mut lo, mut hi) = self.series.price_range()?;
        for v in self
            .moving_average
            .iter()
            .chain(&self.bands.upper)
            .chain(&self.bands.lower)
            .flatten()
        {
            lo = lo.min(*v);
            hi = hi.max(*v);
        }
        Some((lo, hi))
    }
}

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Data types
// ---------------------------------------------------------------------------

/// A single daily OHLCV candle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    pub fn new(date: NaiveDate, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            date,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// True when the candle closed at or above its open.
    pub fn is_rising(&self) -> bool {
        self.close >= self.open
    }
}

// ---------------------------------------------------------------------------
// PriceSeries -- date-ordered candles for one ticker
// ---------------------------------------------------------------------------

/// Ordered (date ascending) sequence of daily candles for a single ticker.
///
/// The series is rebuilt from scratch on every refresh; nothing in here is
/// ever mutated after construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    symbol: String,
    candles: Vec<Candle>,
}

impl PriceSeries {
    /// Build a series, sorting the candles by date. Duplicate dates are kept
    /// as delivered by the source.
    pub fn new(symbol: impl Into<String>, mut candles: Vec<Candle>) -> Self {
        candles.sort_by_key(|c| c.date);
        Self {
            symbol: symbol.into(),
            candles,
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn candles(&self) -> &[Candle] {
        &self.candles
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    /// Close prices in date order.
    pub fn closes(&self) -> Vec<f64> {
        self.candles.iter().map(|c| c.close).collect()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.candles.first().map(|c| c.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.candles.last().map(|c| c.date)
    }

    /// Close price of the most recent candle, if any.
    pub fn last_close(&self) -> Option<f64> {
        self.candles.last().map(|c| c.close)
    }

    /// `(lowest low, highest high)` over the whole series.
    pub fn price_range(&self) -> Option<(f64, f64)> {
        if self.candles.is_empty() {
            return None;
        }
        let (lo, hi) = self
            .candles
            .iter()
            .fold((f64::MAX, f64::MIN), |(lo, hi), c| (lo.min(c.low), hi.max(c.high)));
        Some((lo, hi))
    }
}

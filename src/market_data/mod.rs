pub mod candle;
pub mod yahoo;

use std::future::Future;

use anyhow::Result;
use chrono::NaiveDate;

// Re-export the core types for convenient access (e.g. `use crate::market_data::Candle`).
pub use candle::{Candle, PriceSeries};
pub use yahoo::YahooClient;

/// One ticker over an inclusive calendar-date range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryRequest {
    pub symbol: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl std::fmt::Display for HistoryRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}..={}", self.symbol, self.start, self.end)
    }
}

/// Anything that can deliver a daily price history.
///
/// Errors are returned as-is; callers do not retry.
pub trait PriceSource: Send + Sync {
    fn fetch_history(
        &self,
        request: &HistoryRequest,
    ) -> impl Future<Output = Result<PriceSeries>> + Send;
}

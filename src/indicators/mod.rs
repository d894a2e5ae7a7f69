// =============================================================================
// Technical Indicators Module
// =============================================================================
//
// Pure, side-effect-free implementations of the indicators drawn on the
// dashboard.  Column functions return one `Option<f64>` per input close so
// that the undefined warm-up rows stay aligned with their dates.

pub mod bollinger;
pub mod rsi;
pub mod sma;

pub use bollinger::{bollinger_bands, BollingerSeries};
pub use rsi::{calculate_rsi, RsiZone};
pub use sma::moving_average;

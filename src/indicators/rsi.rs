// =============================================================================
// Relative Strength Index (RSI) — simple-average variant
// =============================================================================
//
// RSI measures the speed and magnitude of recent price changes to evaluate
// whether an asset is overbought or oversold.
//
// Step 1 — Compute price changes (deltas) from consecutive closes.
// Step 2 — Split each delta into a gain (delta > 0, else 0) and a loss
//          (|delta| when delta < 0, else 0).
// Step 3 — Trailing simple mean of gains and of losses over `period` deltas.
// Step 4 — RS  = avg_gain / avg_loss
//          RSI = 100 - 100 / (1 + RS)
//
// When avg_loss is zero the ratio is unbounded and RSI saturates at 100.
//
// Thresholds:  RSI >= 70 => OVERBOUGHT,  RSI <= 30 => OVERSOLD.
// =============================================================================

use std::fmt;

use serde::Serialize;

use super::sma::rolling_mean;

/// Upper reference line.
pub const OVERBOUGHT: f64 = 70.0;
/// Lower reference line.
pub const OVERSOLD: f64 = 30.0;

/// Which side of the reference lines an RSI value falls on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RsiZone {
    Overbought,
    Neutral,
    Oversold,
}

impl RsiZone {
    pub fn classify(rsi: f64) -> Self {
        if rsi >= OVERBOUGHT {
            Self::Overbought
        } else if rsi <= OVERSOLD {
            Self::Oversold
        } else {
            Self::Neutral
        }
    }
}

impl fmt::Display for RsiZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Overbought => write!(f, "OVERBOUGHT"),
            Self::Neutral => write!(f, "NEUTRAL"),
            Self::Oversold => write!(f, "OVERSOLD"),
        }
    }
}

/// Compute the RSI column for the given `closes` and `period`.
///
/// The returned vector is aligned with `closes`. Row `i` uses the deltas
/// ending at `i`, so the first `period` rows are `None`.
///
/// # Edge cases
/// - `period == 0` => all `None`
/// - `closes.len() <= period` => all `None` (need `period` deltas)
/// - If average loss is zero (no down moves, including a flat window),
///   RSI is 100.0.
/// - Windows touching a non-finite close are `None`.
pub fn calculate_rsi(closes: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; closes.len()];
    if period == 0 || closes.len() <= period {
        return out;
    }

    // --- Split deltas into gains and losses ----------------------------------
    let (gains, losses): (Vec<f64>, Vec<f64>) = closes
        .windows(2)
        .map(|w| {
            let delta = w[1] - w[0];
            if delta.is_nan() {
                (f64::NAN, f64::NAN)
            } else {
                (delta.max(0.0), (-delta).max(0.0))
            }
        })
        .unzip();

    // --- Trailing simple means ------------------------------------------------
    let avg_gains = rolling_mean(&gains, period);
    let avg_losses = rolling_mean(&losses, period);

    // Delta `j` ends at close `j + 1`.
    for (j, (gain, loss)) in avg_gains.iter().zip(&avg_losses).enumerate() {
        if let (Some(g), Some(l)) = (gain, loss) {
            out[j + 1] = rsi_from_averages(*g, *l);
        }
    }
    out
}

/// Most recent defined value of an RSI column, with its zone.
pub fn latest_rsi(rsi: &[Option<f64>]) -> Option<(f64, RsiZone)> {
    let value = rsi.iter().rev().flatten().next().copied()?;
    Some((value, RsiZone::classify(value)))
}

// =============================================================================
// Internal helpers
// =============================================================================

/// Convert average gain / average loss into an RSI value in [0, 100].
///
/// - If average loss is zero, RSI is 100.0.
/// - Returns `None` when the result is non-finite.
fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> Option<f64> {
    let rsi = if avg_loss == 0.0 {
        100.0
    } else {
        let rs = avg_gain / avg_loss;
        100.0 - 100.0 / (1.0 + rs)
    };

    if rsi.is_finite() {
        Some(rsi.clamp(0.0, 100.0))
    } else {
        None
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    fn defined(series: &[Option<f64>]) -> Vec<f64> {
        series.iter().flatten().copied().collect()
    }

    // ---- calculate_rsi ---------------------------------------------------

    #[test]
    fn rsi_empty_input() {
        assert!(calculate_rsi(&[], 14).is_empty());
    }

    #[test]
    fn rsi_period_zero() {
        assert_eq!(calculate_rsi(&[1.0, 2.0, 3.0], 0), vec![None, None, None]);
    }

    #[test]
    fn rsi_insufficient_data() {
        // Need period+1 closes (period deltas). 14 closes => 13 deltas < 14.
        let closes: Vec<f64> = (1..=14).map(|x| x as f64).collect();
        assert!(calculate_rsi(&closes, 14).iter().all(Option::is_none));
    }

    #[test]
    fn rsi_undefined_prefix_is_period_rows() {
        let closes: Vec<f64> = (0..40).map(|x| 50.0 + (x as f64).cos() * 3.0).collect();
        let series = calculate_rsi(&closes, 14);
        assert_eq!(series.len(), 40);
        assert!(series[..14].iter().all(Option::is_none));
        assert!(series[14..].iter().all(Option::is_some));
    }

    #[test]
    fn rsi_all_gains() {
        // Strictly ascending prices => RSI should be 100.
        let closes: Vec<f64> = (1..=30).map(|x| x as f64).collect();
        let series = defined(&calculate_rsi(&closes, 14));
        assert_eq!(series.len(), 16);
        for &v in &series {
            assert!((v - 100.0).abs() < 1e-10, "expected 100.0, got {v}");
        }
    }

    #[test]
    fn rsi_all_losses() {
        // Strictly descending prices => RSI should be 0.
        let closes: Vec<f64> = (1..=30).rev().map(|x| x as f64).collect();
        let series = defined(&calculate_rsi(&closes, 14));
        assert!(!series.is_empty());
        for &v in &series {
            assert!(v.abs() < 1e-10, "expected 0.0, got {v}");
        }
    }

    #[test]
    fn rsi_flat_market_saturates() {
        // No down-moves at all => average loss is zero => RSI = 100.
        let closes = vec![100.0; 30];
        let series = defined(&calculate_rsi(&closes, 14));
        assert!(!series.is_empty());
        for &v in &series {
            assert_eq!(v, 100.0);
        }
    }

    #[test]
    fn rsi_known_value() {
        // Deltas +2, -1, +3, -2 => gains 5/4, losses 3/4 => RS = 5/3.
        let closes = vec![10.0, 12.0, 11.0, 14.0, 12.0];
        let series = calculate_rsi(&closes, 4);
        let expected = 100.0 - 100.0 / (1.0 + 5.0 / 3.0);
        assert!((series[4].unwrap() - expected).abs() < 1e-10);
        assert!(series[3].is_none());
    }

    #[test]
    fn rsi_range_check() {
        // Arbitrary data — RSI must always be in [0, 100].
        let closes = vec![
            44.34, 44.09, 44.15, 43.61, 44.33, 44.83, 45.10, 45.42, 45.84, 46.08,
            45.89, 46.03, 44.18, 44.22, 44.57, 43.42, 42.66, 43.13,
        ];
        let series = defined(&calculate_rsi(&closes, 14));
        assert_eq!(series.len(), 4);
        for &v in &series {
            assert!((0.0..=100.0).contains(&v), "RSI {v} out of range");
        }
    }

    #[test]
    fn rsi_nan_close_only_poisons_its_windows() {
        let mut closes: Vec<f64> = (1..=10).map(|x| x as f64).collect();
        closes[2] = f64::NAN;
        let series = calculate_rsi(&closes, 2);
        // Deltas 1 and 2 (ending at rows 2 and 3) are NaN.
        assert!(series[2].is_none());
        assert!(series[3].is_none());
        assert!(series[4].is_none());
        assert_eq!(series[5], Some(100.0));
    }

    // ---- latest_rsi ------------------------------------------------------

    #[test]
    fn latest_rsi_overbought() {
        let closes: Vec<f64> = (1..=30).map(|x| x as f64).collect();
        let (val, zone) = latest_rsi(&calculate_rsi(&closes, 14)).unwrap();
        assert!((val - 100.0).abs() < 1e-10);
        assert_eq!(zone, RsiZone::Overbought);
        assert_eq!(zone.to_string(), "OVERBOUGHT");
    }

    #[test]
    fn latest_rsi_oversold() {
        let closes: Vec<f64> = (1..=30).rev().map(|x| x as f64).collect();
        let (val, zone) = latest_rsi(&calculate_rsi(&closes, 14)).unwrap();
        assert!(val.abs() < 1e-10);
        assert_eq!(zone, RsiZone::Oversold);
    }

    #[test]
    fn latest_rsi_neutral() {
        // Alternating +1 / -1 => equal averages => RSI = 50.
        let closes: Vec<f64> = (0..30).map(|i| if i % 2 == 0 { 100.0 } else { 101.0 }).collect();
        let (val, zone) = latest_rsi(&calculate_rsi(&closes, 14)).unwrap();
        assert!((val - 50.0).abs() < 1e-10);
        assert_eq!(zone, RsiZone::Neutral);
    }

    #[test]
    fn latest_rsi_skips_trailing_gaps() {
        let column = [None, Some(25.0), Some(75.0), None];
        assert_eq!(latest_rsi(&column), Some((75.0, RsiZone::Overbought)));
    }

    #[test]
    fn latest_rsi_none_on_bad_input() {
        assert!(latest_rsi(&calculate_rsi(&[], 14)).is_none());
    }
}

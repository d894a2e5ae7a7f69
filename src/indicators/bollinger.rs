// =============================================================================
// Bollinger Bands
// =============================================================================
//
// Bollinger Bands consist of a middle band (SMA), an upper band (SMA + k*σ),
// and a lower band (SMA - k*σ). The Band Width (BBW) is the normalised
// distance: BBW = (upper - lower) / middle * 100.
//
// σ is the *sample* standard deviation of the window (divisor `period - 1`),
// the convention of common dataframe rolling-std implementations.

use super::sma::rolling_mean;

/// Result of a Bollinger Band calculation for the most recent close.
#[derive(Debug, Clone)]
pub struct BollingerResult {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
    pub width: f64,
}

/// Full upper/middle/lower band columns, aligned with the input closes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BollingerSeries {
    pub upper: Vec<Option<f64>>,
    pub middle: Vec<Option<f64>>,
    pub lower: Vec<Option<f64>>,
}

impl BollingerSeries {
    pub fn len(&self) -> usize {
        self.middle.len()
    }

    /// `(upper, middle, lower)` at row `i` when all three are defined.
    pub fn at(&self, i: usize) -> Option<(f64, f64, f64)> {
        Some((
            (*self.upper.get(i)?)?,
            (*self.middle.get(i)?)?,
            (*self.lower.get(i)?)?,
        ))
    }
}

/// Compute Bollinger Bands for every row of `closes`.
///
/// Rows before the window is full are `None`, as are all rows when
/// `period < 2` (the sample deviation of one value is undefined).
pub fn bollinger_bands(closes: &[f64], period: usize, num_std: f64) -> BollingerSeries {
    let n = closes.len();
    let mut bands = BollingerSeries {
        upper: vec![None; n],
        middle: vec![None; n],
        lower: vec![None; n],
    };
    if period < 2 {
        return bands;
    }

    let means = rolling_mean(closes, period);
    for (i, mean) in means.iter().enumerate() {
        let Some(middle) = *mean else { continue };
        let std_dev = sample_std_dev(&closes[i + 1 - period..=i], middle);
        if !std_dev.is_finite() {
            continue;
        }
        bands.upper[i] = Some(middle + num_std * std_dev);
        bands.middle[i] = Some(middle);
        bands.lower[i] = Some(middle - num_std * std_dev);
    }
    bands
}

/// Calculate Bollinger Bands for the most recent `period` closes.
///
/// Returns `Some(BollingerResult)` containing:
/// - `upper`  = SMA + `num_std` * σ
/// - `middle` = SMA
/// - `lower`  = SMA - `num_std` * σ
/// - `width`  = (upper - lower) / middle * 100  (Bollinger Band Width)
///
/// Returns `None` when:
/// - Fewer than `period` data points, or `period < 2`.
/// - Middle band is zero (degenerate input).
pub fn calculate_bollinger(closes: &[f64], period: usize, num_std: f64) -> Option<BollingerResult> {
    if period < 2 || closes.len() < period {
        return None;
    }

    let window = &closes[closes.len() - period..];
    let middle = window.iter().sum::<f64>() / period as f64;

    if middle == 0.0 {
        return None;
    }

    let std_dev = sample_std_dev(window, middle);

    let upper = middle + num_std * std_dev;
    let lower = middle - num_std * std_dev;
    let width = (upper - lower) / middle * 100.0;

    if width.is_finite() {
        Some(BollingerResult {
            upper,
            middle,
            lower,
            width,
        })
    } else {
        None
    }
}

fn sample_std_dev(window: &[f64], mean: f64) -> f64 {
    let variance =
        window.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (window.len() - 1) as f64;
    variance.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bollinger_basic() {
        let closes: Vec<f64> = (1..=20).map(|x| x as f64).collect();
        let result = calculate_bollinger(&closes, 20, 2.0);
        assert!(result.is_some());
        let bb = result.unwrap();
        assert!(bb.upper > bb.middle);
        assert!(bb.lower < bb.middle);
        assert!(bb.width > 0.0);
    }

    #[test]
    fn bollinger_insufficient_data() {
        let closes = vec![1.0, 2.0, 3.0];
        assert!(calculate_bollinger(&closes, 20, 2.0).is_none());
        let bands = bollinger_bands(&closes, 20, 2.0);
        assert_eq!(bands.len(), 3);
        assert!(bands.middle.iter().all(Option::is_none));
    }

    #[test]
    fn bollinger_flat() {
        let closes = vec![100.0; 20];
        let result = calculate_bollinger(&closes, 20, 2.0);
        assert!(result.is_some());
        assert!((result.unwrap().width - 0.0).abs() < 1e-10);
    }

    #[test]
    fn bands_known_values_use_sample_deviation() {
        // Window [2, 4, 6]: mean 4, sample variance (4 + 0 + 4) / 2 = 4, σ = 2.
        let closes = vec![2.0, 4.0, 6.0];
        let bands = bollinger_bands(&closes, 3, 1.5);
        let (upper, middle, lower) = bands.at(2).unwrap();
        assert!((middle - 4.0).abs() < 1e-10);
        assert!((upper - 7.0).abs() < 1e-10);
        assert!((lower - 1.0).abs() < 1e-10);
        assert!(bands.at(0).is_none());
        assert!(bands.at(1).is_none());
    }

    #[test]
    fn bands_same_prefix_as_moving_average() {
        let closes: Vec<f64> = (1..=40).map(|x| (x as f64).sqrt()).collect();
        let bands = bollinger_bands(&closes, 20, 2.0);
        for col in [&bands.upper, &bands.middle, &bands.lower] {
            assert_eq!(col.len(), 40);
            assert!(col[..19].iter().all(Option::is_none));
            assert!(col[19..].iter().all(Option::is_some));
        }
    }

    #[test]
    fn bands_are_ordered_for_any_non_negative_multiplier() {
        let closes = vec![
            44.34, 44.09, 44.15, 43.61, 44.33, 44.83, 45.10, 45.42, 45.84, 46.08,
            45.89, 46.03, 44.18, 44.22, 44.57, 43.42, 42.66, 43.13,
        ];
        for k in [0.0, 0.5, 1.0, 2.0, 3.5] {
            let bands = bollinger_bands(&closes, 5, k);
            for i in 4..closes.len() {
                let (upper, middle, lower) = bands.at(i).unwrap();
                assert!(upper >= middle && middle >= lower, "row {i}, k {k}");
            }
        }
    }

    #[test]
    fn bands_collapse_on_zero_variance() {
        let closes = vec![50.0; 10];
        let bands = bollinger_bands(&closes, 5, 2.0);
        for i in 4..10 {
            let (upper, middle, lower) = bands.at(i).unwrap();
            assert_eq!(upper, middle);
            assert_eq!(middle, lower);
        }
    }

    #[test]
    fn bands_window_one_is_undefined() {
        let bands = bollinger_bands(&[1.0, 2.0, 3.0], 1, 2.0);
        assert!(bands.upper.iter().all(Option::is_none));
        assert!(calculate_bollinger(&[1.0, 2.0, 3.0], 1, 2.0).is_none());
    }
}

// =============================================================================
// Simple Moving Average (SMA)
// =============================================================================
//
// Trailing arithmetic mean of the last `window` closes (inclusive of the
// current row):
//
//   SMA_t = (close_{t-window+1} + ... + close_t) / window
//
// The output is aligned with the input: one entry per close, `None` for the
// first `window - 1` rows where the window is not yet full.
// =============================================================================

/// Trailing mean of `values` over `window` rows, aligned with the input.
///
/// # Edge cases
/// - `window == 0` => all `None`
/// - `values.len() < window` => all `None`
/// - A non-finite mean (e.g. a NaN close inside the window) is `None`.
pub fn rolling_mean(values: &[f64], window: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    if window == 0 || values.len() < window {
        return out;
    }

    let window_f = window as f64;
    for (i, slot) in out.iter_mut().enumerate().skip(window - 1) {
        // Summed per window: a NaN only poisons the windows that contain it.
        let mean = values[i + 1 - window..=i].iter().sum::<f64>() / window_f;
        if mean.is_finite() {
            *slot = Some(mean);
        }
    }
    out
}

/// Moving average of the close prices.
pub fn moving_average(closes: &[f64], window: usize) -> Vec<Option<f64>> {
    rolling_mean(closes, window)
}

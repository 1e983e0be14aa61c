//! Signal-conditioning stages shared by the detectors.

pub mod filter;
pub mod moving_average;
pub mod wavelet;

pub use filter::{FilterBand, TransferFunction};
pub use moving_average::{moving_average, MovingAverage};
pub use wavelet::{swt_detail, Wavelet};

use crate::error::{DetectError, Result};

/// Five-point derivative `(2x[n+1] + x[n+2] - 2x[n-1] - x[n-2]) * fs / 8`.
///
/// Taps falling outside the buffer contribute zero.
pub fn derivative(data: &[f64], fs: f64) -> Vec<f64> {
    let n = data.len() as isize;
    let tap = |i: isize| if (0..n).contains(&i) { data[i as usize] } else { 0.0 };
    (0..n)
        .map(|i| (2.0 * tap(i + 1) + tap(i + 2) - 2.0 * tap(i - 1) - tap(i - 2)) * fs / 8.0)
        .collect()
}

pub fn square(data: &[f64]) -> Vec<f64> {
    data.iter().map(|x| x * x).collect()
}

/// `y[n] = x[n] - x[n - lag]`, zero for the first `lag` samples.
pub fn lagged_difference(data: &[f64], lag: usize) -> Vec<f64> {
    data.iter()
        .enumerate()
        .map(|(i, &x)| if i < lag { 0.0 } else { x - data[i - lag] })
        .collect()
}

/// Scale so the largest magnitude becomes 1.
pub fn normalize_max_abs(data: &[f64]) -> Result<Vec<f64>> {
    let peak = data.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
    if peak == 0.0 || !peak.is_finite() {
        return Err(DetectError::degenerate(
            "cannot normalize by a zero maximum magnitude",
        ));
    }
    Ok(data.iter().map(|v| v / peak).collect())
}

/// Rescale to `[0, 1]`.
pub fn normalize_min_max(data: &[f64]) -> Result<Vec<f64>> {
    let (min, max) = data
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    let range = max - min;
    if data.is_empty() || range == 0.0 || !range.is_finite() {
        return Err(DetectError::degenerate(
            "cannot min-max normalize a constant or empty signal",
        ));
    }
    Ok(data.iter().map(|v| (v - min) / range).collect())
}

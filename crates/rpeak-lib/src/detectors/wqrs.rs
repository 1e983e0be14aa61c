//! Zong et al. (2003) curve-length transform detector.

use super::{
    peaks::{enforce_refractory, snap_to_raw},
    window_samples, DetectorKind, RPeakDetector,
};
use crate::{
    conditioning::{FilterBand, MovingAverage, TransferFunction},
    error::Result,
    signal::validate_input,
};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

/// Relative margin a length value must clear above the threshold.
const CROSSING_TOLERANCE: f64 = 1e-8;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WqrsConfig {
    pub lowpass_hz: f64,
    pub filter_order: usize,
    /// Curve-length window (seconds).
    pub length_window_s: f64,
    /// Averaging window of the moving threshold (seconds).
    pub threshold_window_s: f64,
    /// Minimum time between two crossings (seconds).
    pub refractory_s: f64,
    pub moving_average: MovingAverage,
}

impl Default for WqrsConfig {
    fn default() -> Self {
        Self {
            lowpass_hz: 15.0,
            filter_order: 2,
            length_window_s: 0.130,
            threshold_window_s: 10.0,
            refractory_s: 0.350,
            moving_average: MovingAverage::Convolution,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct WqrsDetector {
    pub config: WqrsConfig,
}

impl WqrsDetector {
    pub fn new(config: WqrsConfig) -> Self {
        Self { config }
    }
}

impl RPeakDetector for WqrsDetector {
    fn kind(&self) -> DetectorKind {
        DetectorKind::Wqrs
    }

    fn detect(&self, signal: &[f64], fs: f64) -> Result<Vec<usize>> {
        validate_input(signal, fs)?;
        let cfg = &self.config;
        let window = window_samples("length window", cfg.length_window_s, fs)?.max(2);
        let threshold_window = window_samples("threshold window", cfg.threshold_window_s, fs)?;
        // validated like the other windows, but compared unrounded
        let refractory =
            window_samples("refractory", cfg.refractory_s, fs).map(|_| cfg.refractory_s * fs)?;

        let filter =
            TransferFunction::butterworth(cfg.filter_order, FilterBand::Lowpass(cfg.lowpass_hz), fs)?;
        let length = length_transform(&filter.apply(signal), window, fs);
        let threshold = cfg.moving_average.apply(&length, threshold_window)?;

        let crossings = threshold_crossings(&length, &threshold, refractory);
        debug!(
            "wqrs: length window {} samples, {} crossings",
            window,
            crossings.len()
        );
        if crossings.is_empty() {
            warn!("wqrs: length transform never crossed its threshold");
        }
        let snapped = snap_to_raw(signal, &crossings, window, window);
        Ok(enforce_refractory(signal, snapped, refractory.ceil() as usize))
    }
}

/// Curve length of each trailing `window`-sample segment.
///
/// Every value is summed directly over its own segment so identical segments
/// give bit-identical lengths. The first full-window value stands in for the
/// first `window` outputs; a buffer no longer than one window gets its own
/// length everywhere.
fn length_transform(y: &[f64], window: usize, fs: f64) -> Vec<f64> {
    let dt2 = (1.0 / fs).powi(2);
    let segment_length = |seg: &[f64]| -> f64 {
        seg.windows(2)
            .map(|w| (dt2 + (w[1] - w[0]).powi(2)).sqrt())
            .sum()
    };
    let n = y.len();
    if n <= window {
        return vec![segment_length(y); n];
    }
    let tail: Vec<f64> = (window..n).map(|k| segment_length(&y[k - window..k])).collect();
    let mut out = vec![tail[0]; window];
    out.extend(tail);
    out
}

fn threshold_crossings(length: &[f64], threshold: &[f64], refractory: f64) -> Vec<usize> {
    let mut crossings: Vec<usize> = Vec::new();
    for (i, (&l, &u)) in length.iter().zip(threshold).enumerate() {
        let clear = crossings.last().map_or(true, |&last| (i - last) as f64 > refractory);
        if clear && l > u + CROSSING_TOLERANCE * u.abs() {
            crossings.push(i);
        }
    }
    crossings
}

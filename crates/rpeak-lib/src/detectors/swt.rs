//! Kalidas & Tamil (2017) stationary-wavelet-transform detector.

use super::{
    peaks::{enforce_refractory, local_maxima, snap_to_raw},
    window_samples, DetectorKind, RPeakDetector,
};
use crate::{
    conditioning::{square, swt_detail, MovingAverage, Wavelet},
    error::{DetectError, Result},
    signal::validate_input,
};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

const MAX_LEVEL: u32 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SwtConfig {
    /// Decomposition level whose detail band feeds the detector.
    pub level: u32,
    /// Largest edge padding (samples) allowed to reach a multiple of `2^level`.
    pub max_padding: usize,
    pub integration_window_s: f64,
    pub min_distance_s: f64,
    pub separation_s: f64,
    pub raw_search_s: f64,
    pub moving_average: MovingAverage,
}

impl Default for SwtConfig {
    fn default() -> Self {
        Self {
            level: 3,
            max_padding: 1000,
            integration_window_s: 0.150,
            min_distance_s: 0.250,
            separation_s: 0.300,
            raw_search_s: 0.200,
            moving_average: MovingAverage::Cumulative,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SwtDetector {
    pub config: SwtConfig,
}

impl SwtDetector {
    pub fn new(config: SwtConfig) -> Self {
        Self { config }
    }
}

impl RPeakDetector for SwtDetector {
    fn kind(&self) -> DetectorKind {
        DetectorKind::Swt
    }

    fn detect(&self, signal: &[f64], fs: f64) -> Result<Vec<usize>> {
        validate_input(signal, fs)?;
        let cfg = &self.config;
        if cfg.level == 0 || cfg.level > MAX_LEVEL {
            return Err(DetectError::config(format!(
                "SWT level must be in 1..={MAX_LEVEL}, got {}",
                cfg.level
            )));
        }
        let window = window_samples("integration window", cfg.integration_window_s, fs)?;
        let min_distance = window_samples("minimum distance", cfg.min_distance_s, fs)?;
        let separation = window_samples("separation", cfg.separation_s, fs)?;
        let raw_search = window_samples("raw search window", cfg.raw_search_s, fs)?;

        let padded = pad_to_multiple(signal, 1 << cfg.level, cfg.max_padding)?;
        let detail = swt_detail(&padded, Wavelet::Db3, cfg.level)?;
        let mut integrated = cfg.moving_average.apply(&square(&detail), window)?;
        // the integration start-up transient is not a beat
        let settle = (2 * window).min(integrated.len());
        integrated[..settle].iter_mut().for_each(|v| *v = 0.0);

        let accepted = single_threshold_peaks(&integrated, min_distance, separation);
        debug!(
            "swt: padded {} -> {} samples, {} peaks accepted",
            signal.len(),
            padded.len(),
            accepted.len()
        );
        if accepted.is_empty() {
            warn!("swt: no peaks cleared the threshold");
        }

        // snapping against the unpadded lead drops peaks found in the padding
        let snapped = snap_to_raw(signal, &accepted, raw_search, raw_search);
        Ok(enforce_refractory(signal, snapped, min_distance))
    }
}

/// Repeat the last sample until the length is a multiple of `multiple`.
fn pad_to_multiple(signal: &[f64], multiple: usize, limit: usize) -> Result<Vec<f64>> {
    let len = signal.len();
    let needed = (multiple - len % multiple) % multiple;
    if needed > limit {
        return Err(DetectError::InsufficientPadding {
            len,
            multiple,
            limit,
        });
    }
    let edge = signal.last().copied().unwrap_or(0.0);
    let mut padded = Vec::with_capacity(len + needed);
    padded.extend_from_slice(signal);
    padded.resize(len + needed, edge);
    Ok(padded)
}

/// One signal/noise level pair over the integrated detail band.
///
/// Every candidate moves one of the levels; those too close to the last
/// accepted peak are noise.
fn single_threshold_peaks(integrated: &[f64], min_distance: usize, separation: usize) -> Vec<usize> {
    let mut signal_level = 0.0;
    let mut noise_level = 0.0;
    let mut threshold = 0.0;
    let mut accepted: Vec<usize> = Vec::new();
    for candidate in local_maxima(integrated) {
        let separated = accepted.last().map_or(true, |&last| {
            let d = candidate - last;
            d >= min_distance && d > separation
        });
        let value = integrated[candidate];
        if value > threshold && separated {
            signal_level = 0.125 * value + 0.875 * signal_level;
            accepted.push(candidate);
        } else {
            noise_level = 0.125 * value + 0.875 * noise_level;
        }
        threshold = noise_level + 0.25 * (signal_level - noise_level);
    }
    accepted
}

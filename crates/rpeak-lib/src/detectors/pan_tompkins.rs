//! Pan & Tompkins (1985) QRS detection.
//!
//! The feature signal is the moving-window integral of the squared derivative
//! of a band-passed lead. Peaks of the integral are classified by two pairs of
//! adaptive thresholds, one on the integral and one on the band-passed signal,
//! with search-back for missed beats and slope-based T-wave rejection.

use super::{
    peaks::{argmax_in, enforce_refractory, local_maxima, snap_to_raw},
    window_samples, DetectorKind, RPeakDetector,
};
use crate::{
    conditioning::{derivative, normalize_max_abs, square, FilterBand, MovingAverage, TransferFunction},
    error::Result,
    signal::validate_input,
};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

const RR_HISTORY: usize = 8;
const RR_LOW: f64 = 0.92;
const RR_HIGH: f64 = 1.16;
const RR_MISSED: f64 = 1.66;
/// Intervals (seconds) in which a candidate may be a T-wave.
const T_WAVE_RR_S: (f64, f64) = (0.20, 0.36);
const T_WAVE_SLOPE_RATIO: f64 = 0.5;

/// Configurable parameters for the Pan–Tompkins pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PanTompkinsConfig {
    /// Lower band-pass cutoff (Hz).
    pub lowcut_hz: f64,
    /// Upper band-pass cutoff (Hz).
    pub highcut_hz: f64,
    pub filter_order: usize,
    /// Moving window integration length (seconds).
    pub integration_window_s: f64,
    /// Candidates closer than this to the last accepted peak only feed the
    /// noise levels (seconds).
    pub min_distance_s: f64,
    /// A signal peak must be further than this from the last accepted peak (seconds).
    pub separation_s: f64,
    /// Half-width of the final snap onto the raw lead (seconds).
    pub raw_search_s: f64,
    pub moving_average: MovingAverage,
}

impl Default for PanTompkinsConfig {
    fn default() -> Self {
        Self {
            lowcut_hz: 5.0,
            highcut_hz: 15.0,
            filter_order: 1,
            integration_window_s: 0.150,
            min_distance_s: 0.250,
            separation_s: 0.300,
            raw_search_s: 0.200,
            moving_average: MovingAverage::Cumulative,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PanTompkinsDetector {
    pub config: PanTompkinsConfig,
}

impl PanTompkinsDetector {
    pub fn new(config: PanTompkinsConfig) -> Self {
        Self { config }
    }
}

impl RPeakDetector for PanTompkinsDetector {
    fn kind(&self) -> DetectorKind {
        DetectorKind::PanTompkins
    }

    fn detect(&self, signal: &[f64], fs: f64) -> Result<Vec<usize>> {
        validate_input(signal, fs)?;
        let cfg = &self.config;
        let window = window_samples("integration window", cfg.integration_window_s, fs)?;
        let params = ScanParams {
            fs,
            min_distance: window_samples("minimum distance", cfg.min_distance_s, fs)?,
            separation: window_samples("separation", cfg.separation_s, fs)? as f64,
            window,
        };
        let raw_search = window_samples("raw search window", cfg.raw_search_s, fs)?;

        let filter = TransferFunction::butterworth(
            cfg.filter_order,
            FilterBand::Bandpass(cfg.lowcut_hz, cfg.highcut_hz),
            fs,
        )?;
        let bandpassed = normalize_max_abs(&filter.apply(signal))?;
        let squared = square(&derivative(&bandpassed, fs));
        let integrated = cfg.moving_average.apply(&squared, window)?;

        let candidates = local_maxima(&integrated);
        let accepted = adaptive_threshold_peaks(&integrated, &bandpassed, &candidates, params);
        debug!(
            "pan-tompkins: {} candidates, {} accepted, window {} samples",
            candidates.len(),
            accepted.len(),
            window
        );
        if accepted.len() < 2 {
            warn!("pan-tompkins: no beats after the threshold-learning peak");
            return Ok(Vec::new());
        }

        // the first accepted peak only seeds the thresholds
        let snapped = snap_to_raw(signal, &accepted[1..], raw_search, raw_search);
        Ok(enforce_refractory(signal, snapped, params.min_distance))
    }
}

#[derive(Debug, Clone, Copy)]
struct ScanParams {
    fs: f64,
    min_distance: usize,
    separation: f64,
    window: usize,
}

/// Running signal and noise peak levels with the thresholds derived from them.
#[derive(Debug, Clone, Copy, Default)]
struct ThresholdPair {
    signal: f64,
    noise: f64,
    primary: f64,
    secondary: f64,
}

impl ThresholdPair {
    fn signal_peak(&mut self, value: f64) {
        self.signal = 0.125 * value + 0.875 * self.signal;
    }

    /// Peaks found by search-back move the signal level faster.
    fn recovered_peak(&mut self, value: f64) {
        self.signal = 0.25 * value + 0.75 * self.signal;
    }

    fn noise_peak(&mut self, value: f64) {
        self.noise = 0.125 * value + 0.875 * self.noise;
    }

    fn refresh(&mut self) {
        self.primary = self.noise + 0.25 * (self.signal - self.noise);
        self.secondary = 0.5 * self.primary;
    }

    fn halve_primary(&mut self) {
        self.primary *= 0.5;
    }
}

/// The last eight RR intervals, plus the last eight that fell inside the
/// learned regular-rhythm bounds.
#[derive(Debug, Clone, Default)]
struct RrHistory {
    recent: VecDeque<usize>,
    selective: VecDeque<usize>,
    average: f64,
    low: f64,
    high: f64,
    missed: f64,
}

impl RrHistory {
    fn is_empty(&self) -> bool {
        self.recent.is_empty()
    }

    fn push(&mut self, rr: usize) {
        let value = rr as f64;
        if value > self.low && value < self.high {
            push_bounded(&mut self.selective, rr);
        }
        push_bounded(&mut self.recent, rr);
        self.average = mean(&self.recent);
        let reference = if self.selective.len() == RR_HISTORY {
            mean(&self.selective)
        } else {
            self.average
        };
        self.low = RR_LOW * reference;
        self.high = RR_HIGH * reference;
        self.missed = RR_MISSED * reference;
    }

    fn irregular(&self) -> bool {
        !self.is_empty() && (self.average < self.low || self.average > self.high)
    }
}

fn push_bounded(history: &mut VecDeque<usize>, rr: usize) {
    if history.len() == RR_HISTORY {
        history.pop_front();
    }
    history.push_back(rr);
}

fn mean(values: &VecDeque<usize>) -> f64 {
    values.iter().sum::<usize>() as f64 / values.len() as f64
}

struct Scan<'a> {
    integrated: &'a [f64],
    filtered: &'a [f64],
    candidates: &'a [usize],
    params: ScanParams,
    slope_window: usize,
    integrated_levels: ThresholdPair,
    filtered_levels: ThresholdPair,
    rr: RrHistory,
    accepted: Vec<usize>,
}

/// Classify `candidates` (local maxima of `integrated`) in temporal order.
///
/// Returns accepted peak positions in the integrated domain, including
/// search-back recoveries and the initial learning peak.
fn adaptive_threshold_peaks(
    integrated: &[f64],
    filtered: &[f64],
    candidates: &[usize],
    params: ScanParams,
) -> Vec<usize> {
    let mut scan = Scan::new(integrated, filtered, candidates, params);
    for &candidate in candidates {
        scan.step(candidate);
    }
    scan.accepted
}

impl<'a> Scan<'a> {
    fn new(
        integrated: &'a [f64],
        filtered: &'a [f64],
        candidates: &'a [usize],
        params: ScanParams,
    ) -> Self {
        Self {
            integrated,
            filtered,
            candidates,
            params,
            slope_window: (params.window as f64 / 2.0).round() as usize,
            integrated_levels: ThresholdPair::default(),
            filtered_levels: ThresholdPair::default(),
            rr: RrHistory::default(),
            accepted: Vec::new(),
        }
    }

    fn step(&mut self, candidate: usize) {
        let since_last = self.accepted.last().map(|&last| candidate - last);
        let value = self.integrated[candidate];
        let filtered_value = self.filtered_value(candidate);

        // ripple on the flanks of an accepted complex still counts as noise
        let separated = since_last.map_or(true, |d| {
            d >= self.params.min_distance && d as f64 > self.params.separation
        });
        if value > self.integrated_levels.primary && separated {
            if self.is_t_wave(candidate, since_last) {
                self.integrated_levels.noise_peak(value);
            } else if filtered_value > self.filtered_levels.primary {
                self.integrated_levels.signal_peak(value);
                self.filtered_levels.signal_peak(filtered_value);
                self.accept(candidate);
            } else {
                self.integrated_levels.signal_peak(value);
                self.filtered_levels.noise_peak(filtered_value);
            }
        } else {
            self.integrated_levels.noise_peak(value);
            self.filtered_levels.noise_peak(filtered_value);
        }

        self.integrated_levels.refresh();
        self.filtered_levels.refresh();
        if self.rr.irregular() {
            self.integrated_levels.halve_primary();
            self.filtered_levels.halve_primary();
        }
    }

    /// Band-passed maximum over the window that produced this integral value.
    fn filtered_value(&self, at: usize) -> f64 {
        argmax_in(self.filtered, at.saturating_sub(self.params.window), at + 1)
            .map_or(0.0, |i| self.filtered[i])
    }

    fn is_t_wave(&self, candidate: usize, since_last: Option<usize>) -> bool {
        let (Some(d), Some(&last)) = (since_last, self.accepted.last()) else {
            return false;
        };
        let rr_s = d as f64 / self.params.fs;
        if !(rr_s > T_WAVE_RR_S.0 && rr_s < T_WAVE_RR_S.1) {
            return false;
        }
        self.max_slope(candidate) < T_WAVE_SLOPE_RATIO * self.max_slope(last)
    }

    /// Steepest rise of the integral over the half window ending at `end`.
    fn max_slope(&self, end: usize) -> f64 {
        let start = end.saturating_sub(self.slope_window);
        self.integrated[start..=end]
            .windows(2)
            .map(|w| w[1] - w[0])
            .fold(f64::NEG_INFINITY, f64::max)
    }

    fn accept(&mut self, candidate: usize) {
        let Some(&previous) = self.accepted.last() else {
            self.accepted.push(candidate);
            return;
        };
        let interval = candidate - previous;
        if !self.rr.is_empty() && interval as f64 > self.rr.missed {
            if let Some(recovered) = self.search_back(previous, candidate) {
                debug!("pan-tompkins: search-back recovered peak at {recovered}");
                self.accepted.push(recovered);
                self.rr.push(recovered - previous);
                self.rr.push(candidate - recovered);
                self.accepted.push(candidate);
                return;
            }
        }
        self.rr.push(interval);
        self.accepted.push(candidate);
    }

    /// Largest candidate between two accepted peaks that clears both
    /// secondary thresholds.
    fn search_back(&mut self, previous: usize, current: usize) -> Option<usize> {
        let md = self.params.min_distance;
        let x = self.integrated;
        let mut best: Option<usize> = None;
        for &i in self.candidates {
            if i <= previous + md || i + md >= current {
                continue;
            }
            if best.map_or(true, |b| x[i] > x[b]) {
                best = Some(i);
            }
        }
        let best = best?;
        if x[best] <= self.integrated_levels.secondary {
            return None;
        }
        let filtered = argmax_in(self.filtered, best.saturating_sub(self.params.window), best + 1)?;
        if self.filtered[filtered] <= self.filtered_levels.secondary {
            return None;
        }
        self.integrated_levels.recovered_peak(x[best]);
        self.filtered_levels.recovered_peak(self.filtered[filtered]);
        Some(best)
    }
}

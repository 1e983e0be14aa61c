//! Engelse & Zeelenberg (1979) single-scan detector with the threshold
//! schedule of Lourenco et al. (2012).

use super::{
    peaks::{argmax_in, enforce_refractory},
    window_samples, DetectorKind, RPeakDetector,
};
use crate::{
    conditioning::{lagged_difference, FilterBand, TransferFunction},
    error::Result,
    signal::validate_input,
};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

const SMOOTHER: [f64; 5] = [1.0, 4.0, 6.0, 4.0, 1.0];
const DIFFERENCE_LAG: usize = 4;
const THRESHOLD_HISTORY: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngzeeConfig {
    /// Lower edge of the mains-interference stop band (Hz).
    pub notch_low_hz: f64,
    /// Upper edge of the mains-interference stop band (Hz).
    pub notch_high_hz: f64,
    pub filter_order: usize,
}

impl Default for EngzeeConfig {
    fn default() -> Self {
        Self {
            notch_low_hz: 48.0,
            notch_high_hz: 52.0,
            filter_order: 4,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct EngzeeDetector {
    pub config: EngzeeConfig,
}

impl EngzeeDetector {
    pub fn new(config: EngzeeConfig) -> Self {
        Self { config }
    }
}

impl RPeakDetector for EngzeeDetector {
    fn kind(&self) -> DetectorKind {
        DetectorKind::Engzee
    }

    fn detect(&self, signal: &[f64], fs: f64) -> Result<Vec<usize>> {
        validate_input(signal, fs)?;
        let timing = Timing::new(fs)?;
        let notch = TransferFunction::butterworth(
            self.config.filter_order,
            FilterBand::Bandstop(self.config.notch_low_hz, self.config.notch_high_hz),
            fs,
        )?;
        let differenced = lagged_difference(&notch.apply(signal), DIFFERENCE_LAG);
        let mut smoothed = TransferFunction::fir(&SMOOTHER).apply(&differenced);
        let settle = timing.ms200.min(smoothed.len());
        smoothed[..settle].iter_mut().for_each(|v| *v = 0.0);

        let beats = SingleScan::new(timing).run(&smoothed, signal);
        debug!("engzee: {} beats before discarding the first", beats.len());
        if beats.len() < 2 {
            warn!("engzee: no beats after the first detection");
            return Ok(Vec::new());
        }
        Ok(enforce_refractory(signal, beats[1..].to_vec(), timing.ms160))
    }
}

/// Sample counts of the fixed durations the schedule is written in.
#[derive(Debug, Clone, Copy)]
struct Timing {
    ms10: usize,
    ms160: usize,
    ms200: usize,
    ms1200: usize,
    bootstrap: usize,
}

impl Timing {
    fn new(fs: f64) -> Result<Self> {
        Ok(Self {
            ms10: window_samples("negative run", 0.01, fs)?,
            ms160: window_samples("QRS width", 0.16, fs)?,
            ms200: window_samples("onset blanking", 0.2, fs)?,
            ms1200: window_samples("threshold decay", 1.2, fs)?,
            bootstrap: window_samples("bootstrap", 5.0, fs)?,
        })
    }
}

struct SingleScan {
    timing: Timing,
    threshold: f64,
    history: VecDeque<f64>,
    pending: Option<f64>,
    onset: Option<usize>,
    running_max: f64,
    armed: bool,
    negative: bool,
    counter: usize,
    beats: Vec<usize>,
}

impl SingleScan {
    fn new(timing: Timing) -> Self {
        Self {
            timing,
            threshold: 0.0,
            history: VecDeque::with_capacity(THRESHOLD_HISTORY),
            pending: None,
            onset: None,
            running_max: f64::NEG_INFINITY,
            armed: false,
            negative: false,
            counter: 0,
            beats: Vec::new(),
        }
    }

    fn run(mut self, lp: &[f64], raw: &[f64]) -> Vec<usize> {
        for i in 0..lp.len() {
            self.update_threshold(lp, i);
            self.track_qrs(lp, raw, i);
        }
        self.beats
    }

    fn remember(&mut self, value: f64) {
        if self.history.len() == THRESHOLD_HISTORY {
            self.history.pop_front();
        }
        self.history.push_back(value);
    }

    fn history_mean(&self) -> f64 {
        if self.history.is_empty() {
            return 0.0;
        }
        self.history.iter().sum::<f64>() / self.history.len() as f64
    }

    fn update_threshold(&mut self, lp: &[f64], i: usize) {
        let t = self.timing;
        self.running_max = self.running_max.max(lp[i]);
        if i < t.bootstrap {
            self.threshold = 0.6 * self.running_max;
            self.remember(self.threshold);
            return;
        }
        let Some(onset) = self.onset else {
            return;
        };
        if i < onset + t.ms200 {
            let window_max = lp[onset..i].iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let mut candidate = 0.6 * window_max;
            if let Some(&last) = self.history.back() {
                if candidate > 1.5 * last {
                    candidate = 1.1 * last;
                }
            }
            self.pending = Some(candidate);
        } else if i == onset + t.ms200 {
            if let Some(pending) = self.pending.filter(|&v| v != 0.0) {
                self.remember(pending);
                self.threshold = self.history_mean();
            }
        } else if i < onset + t.ms1200 {
            // linear decay from the mean to 60% of it
            let span = (t.ms1200 - t.ms200).max(2) - 1;
            let j = i - (onset + t.ms200);
            self.threshold = self.history_mean() * (1.0 - 0.4 * j as f64 / span as f64);
        } else if i > onset + t.ms1200 {
            self.threshold = 0.6 * self.history_mean();
        }
    }

    fn track_qrs(&mut self, lp: &[f64], raw: &[f64], i: usize) {
        let t = self.timing;
        let m = self.threshold;
        if lp[i] > m && self.onset.map_or(true, |onset| i > onset + t.ms200) {
            self.onset = Some(i);
            self.armed = true;
            self.reset_run();
        }
        let Some(onset) = self.onset else {
            return;
        };
        if self.armed {
            if i < onset + t.ms160 {
                if i > 0 && lp[i] < -m && lp[i - 1] > -m {
                    self.negative = true;
                }
                if self.negative && lp[i] < -m {
                    self.counter += 1;
                } else if self.negative && lp[i] > -m {
                    self.armed = false;
                    self.reset_run();
                }
            } else if i > onset + t.ms160 {
                self.armed = false;
                self.reset_run();
            }
        }
        if self.counter > t.ms10 {
            if let Some(beat) = argmax_in(raw, onset.saturating_sub(t.ms10), i) {
                self.beats.push(beat);
            }
            self.armed = false;
            self.reset_run();
        }
    }

    fn reset_run(&mut self) {
        self.negative = false;
        self.counter = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::super::synthetic::{assert_strictly_increasing, matched_centers, pulse_train, FS};
    use super::*;
    use crate::error::DetectError;

    #[test]
    fn detects_synthetic_pulses_after_first_beat() {
        let (data, centers) = pulse_train();
        let peaks = EngzeeDetector::default().detect(&data, FS).unwrap();
        assert_strictly_increasing(&peaks);
        assert_eq!(matched_centers(&peaks, &centers, 5), centers[1..].to_vec());
        let min_gap = (0.16 * FS).round() as usize;
        assert!(peaks.windows(2).all(|w| w[1] - w[0] >= min_gap));
    }

    #[test]
    fn mains_hum_does_not_add_beats() {
        let (clean, centers) = pulse_train();
        let hum: Vec<f64> = clean
            .iter()
            .enumerate()
            .map(|(i, v)| v + 0.05 * (2.0 * std::f64::consts::PI * 50.0 * i as f64 / FS).sin())
            .collect();
        let peaks = EngzeeDetector::default().detect(&hum, FS).unwrap();
        let matched = matched_centers(&peaks, &centers, 5);
        assert!(matched.len() >= centers.len() - 2, "{peaks:?}");
    }

    #[test]
    fn notch_above_nyquist_is_a_configuration_error() {
        let (data, _) = pulse_train();
        assert!(matches!(
            EngzeeDetector::default().detect(&data, 100.0),
            Err(DetectError::InvalidConfiguration(_))
        ));
    }
}

//! R-peak detectors and the registry that selects between them.

pub mod engzee;
pub mod pan_tompkins;
pub(crate) mod peaks;
pub mod swt;
pub mod wqrs;

pub use engzee::{EngzeeConfig, EngzeeDetector};
pub use pan_tompkins::{PanTompkinsConfig, PanTompkinsDetector};
pub use swt::{SwtConfig, SwtDetector};
pub use wqrs::{WqrsConfig, WqrsDetector};

use crate::{
    error::{DetectError, Result},
    signal::{seconds_to_samples, Events, TimeSeries},
};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// A single-lead R-peak detector.
///
/// Implementations validate their input, hold no state between calls, and
/// return strictly increasing sample indices into `signal`.
pub trait RPeakDetector: Send + Sync {
    fn kind(&self) -> DetectorKind;

    fn detect(&self, signal: &[f64], fs: f64) -> Result<Vec<usize>>;

    fn detect_events(&self, ts: &TimeSeries) -> Result<Events> {
        self.detect(&ts.data, ts.fs).map(Events::from_indices)
    }
}

/// Names of the available detectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DetectorKind {
    PanTompkins,
    Swt,
    Engzee,
    Wqrs,
}

impl DetectorKind {
    pub const ALL: [DetectorKind; 4] = [
        DetectorKind::PanTompkins,
        DetectorKind::Swt,
        DetectorKind::Engzee,
        DetectorKind::Wqrs,
    ];

    pub fn name(self) -> &'static str {
        match self {
            DetectorKind::PanTompkins => "pan-tompkins",
            DetectorKind::Swt => "swt",
            DetectorKind::Engzee => "engzee",
            DetectorKind::Wqrs => "wqrs",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            DetectorKind::PanTompkins => {
                "Pan & Tompkins (1985): band-pass, derivative, squaring, integration, dual adaptive thresholds"
            }
            DetectorKind::Swt => {
                "Kalidas & Tamil (2017): stationary wavelet transform (db3, level 3) with adaptive threshold"
            }
            DetectorKind::Engzee => {
                "Engelse & Zeelenberg (1979), Lourenco et al. (2012): single-scan with decaying threshold"
            }
            DetectorKind::Wqrs => "Zong et al. (2003): curve-length transform with moving threshold",
        }
    }

    /// Build the detector with its section of `settings`.
    pub fn detector(self, settings: &DetectorSettings) -> Box<dyn RPeakDetector> {
        match self {
            DetectorKind::PanTompkins => Box::new(PanTompkinsDetector::new(settings.pan_tompkins)),
            DetectorKind::Swt => Box::new(SwtDetector::new(settings.swt)),
            DetectorKind::Engzee => Box::new(EngzeeDetector::new(settings.engzee)),
            DetectorKind::Wqrs => Box::new(WqrsDetector::new(settings.wqrs)),
        }
    }
}

impl FromStr for DetectorKind {
    type Err = DetectError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_ascii_lowercase().replace('_', "-");
        match wanted.as_str() {
            "pan-tompkins" | "pantompkins" => Ok(DetectorKind::PanTompkins),
            "swt" => Ok(DetectorKind::Swt),
            "engzee" => Ok(DetectorKind::Engzee),
            "wqrs" => Ok(DetectorKind::Wqrs),
            _ => Err(DetectError::config(format!(
                "unknown detector '{s}' (expected one of: {})",
                DetectorKind::ALL.map(DetectorKind::name).join(", ")
            ))),
        }
    }
}

impl fmt::Display for DetectorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Per-detector parameters, each section defaulting independently.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorSettings {
    pub pan_tompkins: PanTompkinsConfig,
    pub swt: SwtConfig,
    pub engzee: EngzeeConfig,
    pub wqrs: WqrsConfig,
}

/// Run `kind` with default parameters.
pub fn detect(kind: DetectorKind, signal: &[f64], fs: f64) -> Result<Vec<usize>> {
    detect_with_settings(kind, &DetectorSettings::default(), signal, fs)
}

pub fn detect_with_settings(
    kind: DetectorKind,
    settings: &DetectorSettings,
    signal: &[f64],
    fs: f64,
) -> Result<Vec<usize>> {
    kind.detector(settings).detect(signal, fs)
}

/// Window length in samples for a configured duration, at least one sample.
pub(crate) fn window_samples(label: &str, seconds: f64, fs: f64) -> Result<usize> {
    if !seconds.is_finite() || seconds <= 0.0 {
        return Err(DetectError::config(format!(
            "{label} must be a positive duration, got {seconds} s"
        )));
    }
    Ok(seconds_to_samples(seconds, fs).max(1))
}

#[cfg(test)]
pub(crate) mod synthetic {
    //! Gaussian pulse trains standing in for a clean single-lead ECG.

    pub const FS: f64 = 360.0;

    /// Ten seconds at 360 Hz, unit pulses every 0.8 s starting at 0.5 s.
    pub fn pulse_train() -> (Vec<f64>, Vec<usize>) {
        pulses(FS, 10.0, 0.5, 0.8, 0.01, 1.0)
    }

    pub fn pulses(
        fs: f64,
        duration_s: f64,
        first_s: f64,
        spacing_s: f64,
        width_s: f64,
        amplitude: f64,
    ) -> (Vec<f64>, Vec<usize>) {
        let n = (duration_s * fs).round() as usize;
        let spacing = (spacing_s * fs).round() as usize;
        let sigma = width_s * fs;
        let mut centers = Vec::new();
        let mut c = (first_s * fs).round() as usize;
        while c + spacing / 4 < n {
            centers.push(c);
            c += spacing;
        }
        let data = (0..n)
            .map(|i| {
                centers
                    .iter()
                    .map(|&cc| {
                        let z = (i as f64 - cc as f64) / sigma;
                        amplitude * (-0.5 * z * z).exp()
                    })
                    .sum()
            })
            .collect();
        (data, centers)
    }

    /// Beats every 0.8 s from 0.5 s, each an R wave with a small Q dip, a P wave
    /// 180 ms before and a broad T wave 300 ms after, over 0.3 Hz baseline wander.
    pub fn pqrst_lead(fs: f64, duration_s: f64) -> (Vec<f64>, Vec<usize>) {
        let (_, centers) = pulses(fs, duration_s, 0.5, 0.8, 0.01, 1.0);
        let wave = |i: f64, center: f64, sigma_s: f64| {
            let z = (i - center) / (sigma_s * fs);
            (-0.5 * z * z).exp()
        };
        let n = (duration_s * fs).round() as usize;
        let data = (0..n)
            .map(|i| {
                let t = i as f64;
                let wander = 0.1 * (2.0 * std::f64::consts::PI * 0.3 * t / fs).sin();
                let beats: f64 = centers
                    .iter()
                    .map(|&c| c as f64)
                    .filter(|c| (t - c).abs() <= 0.6 * fs)
                    .map(|c| {
                        wave(t, c, 0.010) - 0.15 * wave(t, c - 0.025 * fs, 0.008)
                            + 0.15 * wave(t, c - 0.18 * fs, 0.025)
                            + 0.35 * wave(t, c + 0.30 * fs, 0.040)
                    })
                    .sum();
                wander + beats
            })
            .collect();
        (data, centers)
    }

    /// Every detection within `tol` of a distinct center; returns the matched centers.
    pub fn matched_centers(detected: &[usize], centers: &[usize], tol: usize) -> Vec<usize> {
        let mut matched = Vec::new();
        for &d in detected {
            let hit = centers
                .iter()
                .copied()
                .find(|&c| d.abs_diff(c) <= tol)
                .unwrap_or_else(|| panic!("detection {d} is not near any pulse"));
            assert!(!matched.contains(&hit), "pulse {hit} detected twice");
            matched.push(hit);
        }
        matched
    }

    pub fn assert_strictly_increasing(peaks: &[usize]) {
        assert!(peaks.windows(2).all(|w| w[0] < w[1]), "{peaks:?}");
    }
}

#[cfg(test)]
mod tests {
    use super::synthetic::{assert_strictly_increasing, pulse_train, FS};
    use super::*;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    #[test]
    fn registry_round_trips_names() {
        for kind in DetectorKind::ALL {
            assert_eq!(kind.name().parse::<DetectorKind>().unwrap(), kind);
            assert_eq!(kind.to_string(), kind.name());
            assert_eq!(kind.detector(&DetectorSettings::default()).kind(), kind);
            assert!(!kind.description().is_empty());
        }
        assert_eq!(
            "Pan_Tompkins".parse::<DetectorKind>().unwrap(),
            DetectorKind::PanTompkins
        );
        assert!(matches!(
            "hamilton".parse::<DetectorKind>(),
            Err(DetectError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn degenerate_inputs_are_rejected() {
        for kind in DetectorKind::ALL {
            assert!(matches!(
                detect(kind, &[], FS),
                Err(DetectError::DegenerateSignal(_))
            ));
            assert!(matches!(
                detect(kind, &[0.0; 3600], FS),
                Err(DetectError::DegenerateSignal(_))
            ));
            assert!(matches!(
                detect(kind, &[0.0, 1.0, 0.0], -1.0),
                Err(DetectError::InvalidConfiguration(_))
            ));
        }
    }

    #[test]
    fn noisy_input_is_deterministic_and_well_formed() {
        let (clean, _) = pulse_train();
        let mut rng = StdRng::seed_from_u64(42);
        let noisy: Vec<f64> = clean
            .iter()
            .map(|v| v + rng.gen_range(-0.05..0.05))
            .collect();
        for kind in DetectorKind::ALL {
            let first = detect(kind, &noisy, FS).unwrap();
            let second = detect(kind, &noisy, FS).unwrap();
            assert_eq!(first, second, "{kind} is not idempotent");
            assert_strictly_increasing(&first);
            assert!(first.iter().all(|&i| i < noisy.len()));
        }
    }

    #[test]
    fn events_wrap_detector_output() {
        let (data, _) = pulse_train();
        let ts = TimeSeries::new(FS, data);
        let detector = DetectorKind::Swt.detector(&DetectorSettings::default());
        let events = detector.detect_events(&ts).unwrap();
        assert_eq!(events.indices, detector.detect(&ts.data, ts.fs).unwrap());
    }

    #[test]
    fn settings_sections_default_independently() {
        let settings: DetectorSettings =
            serde_json::from_str(r#"{"swt": {"max_padding": 10}}"#).unwrap();
        assert_eq!(settings.swt.max_padding, 10);
        assert_eq!(settings.swt.level, SwtConfig::default().level);
        assert_eq!(settings.pan_tompkins, PanTompkinsConfig::default());
    }
}

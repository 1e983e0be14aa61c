use crate::error::{DetectError, Result};
use serde::{Deserialize, Serialize};

/// Uniformly sampled single-lead recording.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeSeries {
    /// Uniform sampling frequency in Hz
    pub fs: f64,
    /// Samples
    pub data: Vec<f64>,
}

impl TimeSeries {
    pub fn new(fs: f64, data: Vec<f64>) -> Self {
        Self { fs, data }
    }
    pub fn len(&self) -> usize {
        self.data.len()
    }
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
    pub fn duration(&self) -> f64 {
        self.data.len() as f64 / self.fs
    }
}

/// Detected R-peak sample indices, strictly increasing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Events {
    pub indices: Vec<usize>,
}

impl Events {
    pub fn from_indices(indices: Vec<usize>) -> Self {
        Self { indices }
    }
    pub fn len(&self) -> usize {
        self.indices.len()
    }
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// RR intervals (seconds)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RRSeries {
    pub rr: Vec<f64>,
}

impl RRSeries {
    pub fn from_events(events: &Events, fs: f64) -> Self {
        let mut rr = Vec::new();
        for w in events.indices.windows(2) {
            let dt = (w[1] as f64 - w[0] as f64) / fs;
            rr.push(dt);
        }
        Self { rr }
    }

    /// Mean heart rate in beats per minute, `None` without at least one interval.
    pub fn mean_heart_rate_bpm(&self) -> Option<f64> {
        if self.rr.is_empty() {
            return None;
        }
        let mean = self.rr.iter().sum::<f64>() / self.rr.len() as f64;
        if mean > 0.0 {
            Some(60.0 / mean)
        } else {
            None
        }
    }
}

/// Convert a duration to a whole number of samples, rounding half away from zero.
pub fn seconds_to_samples(seconds: f64, fs: f64) -> usize {
    (seconds * fs).round().max(0.0) as usize
}

/// Reject inputs no detector can work with.
///
/// Checks run in order: sampling rate, emptiness, finiteness, then constancy,
/// so an all-zero buffer reports `DegenerateSignal` rather than a divisor
/// failure deep inside a pipeline.
pub fn validate_input(signal: &[f64], fs: f64) -> Result<()> {
    if !fs.is_finite() || fs <= 0.0 {
        return Err(DetectError::config(format!(
            "sampling rate must be finite and positive, got {fs}"
        )));
    }
    if signal.is_empty() {
        return Err(DetectError::degenerate("no samples"));
    }
    if let Some(pos) = signal.iter().position(|v| !v.is_finite()) {
        return Err(DetectError::config(format!(
            "sample {pos} is not finite ({})",
            signal[pos]
        )));
    }
    let (min, max) = signal
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    if max == min {
        return Err(DetectError::degenerate(format!(
            "all {} samples equal {min}",
            signal.len()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rr_and_heart_rate_from_events() {
        let events = Events::from_indices(vec![100, 460, 820, 1180]);
        let rr = RRSeries::from_events(&events, 360.0);
        assert_eq!(rr.rr.len(), 3);
        assert!(rr.rr.iter().all(|v| (v - 1.0).abs() < 1e-12));
        let bpm = rr.mean_heart_rate_bpm().expect("bpm");
        assert!((bpm - 60.0).abs() < 1e-9);
        assert!(RRSeries::default().mean_heart_rate_bpm().is_none());
    }

    #[test]
    fn rounding_is_half_away_from_zero() {
        assert_eq!(seconds_to_samples(0.15, 360.0), 54);
        assert_eq!(seconds_to_samples(0.075, 100.0), 8);
        assert_eq!(seconds_to_samples(0.01, 250.0), 3);
    }

    #[test]
    fn validation_order() {
        assert!(matches!(
            validate_input(&[1.0, 2.0], 0.0),
            Err(DetectError::InvalidConfiguration(_))
        ));
        assert!(matches!(
            validate_input(&[], 360.0),
            Err(DetectError::DegenerateSignal(_))
        ));
        assert!(matches!(
            validate_input(&[0.0, f64::NAN, 1.0], 360.0),
            Err(DetectError::InvalidConfiguration(_))
        ));
        assert!(matches!(
            validate_input(&[0.0; 16], 360.0),
            Err(DetectError::DegenerateSignal(_))
        ));
        assert!(validate_input(&[0.0, 1.0], 360.0).is_ok());
    }

    #[test]
    fn events_serialize_as_index_list() {
        let events = Events::from_indices(vec![3, 9]);
        let js = serde_json::to_string(&events).unwrap();
        assert_eq!(js, r#"{"indices":[3,9]}"#);
        let ts = TimeSeries::new(250.0, vec![0.0; 500]);
        assert!((ts.duration() - 2.0).abs() < 1e-12);
    }
}

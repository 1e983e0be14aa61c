use crate::error::{DetectError, Result};
use realfft::RealFftPlanner;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Trailing moving-average strategies.
///
/// All three produce the same values: the mean of the last `window` samples,
/// with the first `window - 1` outputs averaged over the samples seen so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MovingAverage {
    /// Running sum, subtracting the sample that leaves the window.
    #[default]
    Cumulative,
    /// Explicit mean of each trailing slice.
    #[serde(alias = "original")]
    Direct,
    /// Convolution with a box kernel through a real FFT.
    #[serde(alias = "convolve")]
    Convolution,
}

impl MovingAverage {
    pub const ALL: [MovingAverage; 3] = [
        MovingAverage::Cumulative,
        MovingAverage::Direct,
        MovingAverage::Convolution,
    ];

    pub fn name(self) -> &'static str {
        match self {
            MovingAverage::Cumulative => "cumulative",
            MovingAverage::Direct => "direct",
            MovingAverage::Convolution => "convolution",
        }
    }

    pub fn apply(self, data: &[f64], window: usize) -> Result<Vec<f64>> {
        if window == 0 {
            return Err(DetectError::config("moving-average window must be positive"));
        }
        if data.is_empty() {
            return Ok(Vec::new());
        }
        match self {
            MovingAverage::Cumulative => Ok(cumulative(data, window)),
            MovingAverage::Direct => Ok(direct(data, window)),
            MovingAverage::Convolution => convolution(data, window),
        }
    }
}

impl FromStr for MovingAverage {
    type Err = DetectError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cumulative" => Ok(MovingAverage::Cumulative),
            "direct" | "original" => Ok(MovingAverage::Direct),
            "convolution" | "convolve" => Ok(MovingAverage::Convolution),
            other => Err(DetectError::config(format!(
                "unknown moving-average strategy '{other}'"
            ))),
        }
    }
}

impl fmt::Display for MovingAverage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Moving average selected by strategy name.
///
/// The name is resolved before any computation, so an unknown strategy fails
/// even on empty input.
pub fn moving_average(strategy: &str, data: &[f64], window: usize) -> Result<Vec<f64>> {
    strategy.parse::<MovingAverage>()?.apply(data, window)
}

fn partial_count(i: usize, window: usize) -> f64 {
    (i + 1).min(window) as f64
}

fn cumulative(data: &[f64], window: usize) -> Vec<f64> {
    let mut out = vec![0.0; data.len()];
    let mut acc = 0.0;
    for (i, &sample) in data.iter().enumerate() {
        acc += sample;
        if i >= window {
            acc -= data[i - window];
        }
        out[i] = acc / partial_count(i, window);
    }
    out
}

fn direct(data: &[f64], window: usize) -> Vec<f64> {
    (0..data.len())
        .map(|i| {
            let start = (i + 1).saturating_sub(window);
            data[start..=i].iter().sum::<f64>() / partial_count(i, window)
        })
        .collect()
}

fn convolution(data: &[f64], window: usize) -> Result<Vec<f64>> {
    let len = (data.len() + window - 1).next_power_of_two();
    let mut planner = RealFftPlanner::<f64>::new();
    let r2c = planner.plan_fft_forward(len);
    let c2r = planner.plan_fft_inverse(len);

    let mut signal = r2c.make_input_vec();
    signal[..data.len()].copy_from_slice(data);
    let mut kernel = r2c.make_input_vec();
    kernel[..window].iter_mut().for_each(|k| *k = 1.0);

    let mut signal_spec = r2c.make_output_vec();
    let mut kernel_spec = r2c.make_output_vec();
    r2c.process(&mut signal, &mut signal_spec)
        .map_err(|e| DetectError::config(format!("forward FFT failed: {e}")))?;
    r2c.process(&mut kernel, &mut kernel_spec)
        .map_err(|e| DetectError::config(format!("forward FFT failed: {e}")))?;

    for (s, k) in signal_spec.iter_mut().zip(&kernel_spec) {
        *s *= *k;
    }
    // c2r rejects round-off in the imaginary parts of the DC and Nyquist bins
    if let Some(first) = signal_spec.first_mut() {
        first.im = 0.0;
    }
    if len % 2 == 0 {
        if let Some(last) = signal_spec.last_mut() {
            last.im = 0.0;
        }
    }

    let mut convolved = c2r.make_output_vec();
    c2r.process(&mut signal_spec, &mut convolved)
        .map_err(|e| DetectError::config(format!("inverse FFT failed: {e}")))?;

    let scale = len as f64;
    Ok(convolved[..data.len()]
        .iter()
        .enumerate()
        .map(|(i, v)| v / scale / partial_count(i, window))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    fn noisy(n: usize, seed: u64) -> Vec<f64> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..n).map(|_| rng.gen_range(-1.0..1.0)).collect()
    }

    #[test]
    fn strategies_agree() {
        let data = noisy(1000, 7);
        for window in [1, 2, 54, 999, 1000, 1500] {
            let reference = MovingAverage::Cumulative.apply(&data, window).unwrap();
            for strategy in [MovingAverage::Direct, MovingAverage::Convolution] {
                let other = strategy.apply(&data, window).unwrap();
                assert_eq!(other.len(), reference.len());
                for (a, b) in reference.iter().zip(&other) {
                    assert!((a - b).abs() < 1e-9, "{strategy} window {window}: {a} vs {b}");
                }
            }
        }
    }

    #[test]
    fn leading_edge_uses_partial_count() {
        let out = MovingAverage::Cumulative
            .apply(&[3.0, 5.0, 7.0, 9.0], 2)
            .unwrap();
        assert_eq!(out, vec![3.0, 4.0, 6.0, 8.0]);
    }

    #[test]
    fn names_and_aliases() {
        assert_eq!("original".parse::<MovingAverage>().unwrap(), MovingAverage::Direct);
        assert_eq!("convolve".parse::<MovingAverage>().unwrap(), MovingAverage::Convolution);
        assert_eq!(" Direct ".parse::<MovingAverage>().unwrap(), MovingAverage::Direct);
        for strategy in MovingAverage::ALL {
            assert_eq!(strategy.name().parse::<MovingAverage>().unwrap(), strategy);
        }
        let from_config: MovingAverage = serde_json::from_str(r#""original""#).unwrap();
        assert_eq!(from_config, MovingAverage::Direct);
    }

    #[test]
    fn unknown_strategy_is_rejected_up_front() {
        assert!(matches!(
            moving_average("bogus", &[1.0, 2.0], 2),
            Err(DetectError::InvalidConfiguration(_))
        ));
        assert!(matches!(
            moving_average("bogus", &[], 2),
            Err(DetectError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn zero_window_and_empty_input() {
        assert!(MovingAverage::Direct.apply(&[1.0], 0).is_err());
        assert!(moving_average("convolution", &[], 4).unwrap().is_empty());
    }
}

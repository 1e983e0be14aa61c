//! Butterworth IIR design and direct-form-II-transposed filtering.
//!
//! Designs go through the analog prototype in zero/pole/gain form, are shifted
//! to the requested band, mapped with a prewarped bilinear transform and
//! expanded into polynomial coefficients.

use crate::error::{DetectError, Result};
use num_complex::Complex64;
use std::f64::consts::PI;

/// Pass or stop band, cutoffs in Hz.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FilterBand {
    Lowpass(f64),
    Bandpass(f64, f64),
    Bandstop(f64, f64),
}

/// Rational transfer function `B(z) / A(z)`.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferFunction {
    pub b: Vec<f64>,
    pub a: Vec<f64>,
}

struct Zpk {
    zeros: Vec<Complex64>,
    poles: Vec<Complex64>,
    gain: f64,
}

impl TransferFunction {
    /// FIR filter from its taps.
    pub fn fir(taps: &[f64]) -> Self {
        Self {
            b: taps.to_vec(),
            a: vec![1.0],
        }
    }

    /// Digital Butterworth filter of `order` for `band` at sampling rate `fs`.
    pub fn butterworth(order: usize, band: FilterBand, fs: f64) -> Result<Self> {
        if order == 0 {
            return Err(DetectError::config("filter order must be at least 1"));
        }
        let nyquist = fs / 2.0;
        let warp = |hz: f64| -> Result<f64> {
            let wn = hz / nyquist;
            if !(wn > 0.0 && wn < 1.0) {
                return Err(DetectError::config(format!(
                    "cutoff {hz} Hz outside (0, {nyquist}) Hz"
                )));
            }
            // bilinear prewarp with the design rate fixed at 2
            Ok(4.0 * (PI * wn / 2.0).tan())
        };
        let proto = prototype(order);
        let analog = match band {
            FilterBand::Lowpass(cut) => lowpass(&proto, warp(cut)?),
            FilterBand::Bandpass(lo, hi) => {
                let (w1, w2) = ordered(warp(lo)?, warp(hi)?)?;
                bandpass(&proto, (w1 * w2).sqrt(), w2 - w1)
            }
            FilterBand::Bandstop(lo, hi) => {
                let (w1, w2) = ordered(warp(lo)?, warp(hi)?)?;
                bandstop(&proto, (w1 * w2).sqrt(), w2 - w1)
            }
        };
        let digital = bilinear(analog);
        let b = poly(&digital.zeros)
            .into_iter()
            .map(|c| c * digital.gain)
            .collect();
        let a = poly(&digital.poles);
        Ok(Self { b, a })
    }

    /// Filter with zero initial state, normalizing by `a[0]`.
    pub fn apply(&self, input: &[f64]) -> Vec<f64> {
        let n = self.b.len().max(self.a.len());
        let a0 = self.a.first().copied().unwrap_or(1.0);
        let coef = |v: &[f64], i: usize| v.get(i).copied().unwrap_or(0.0) / a0;
        let b: Vec<f64> = (0..n).map(|i| coef(self.b.as_slice(), i)).collect();
        let a: Vec<f64> = (0..n).map(|i| coef(self.a.as_slice(), i)).collect();

        let mut state = vec![0.0; n.saturating_sub(1)];
        let mut out = Vec::with_capacity(input.len());
        for &x in input {
            let y = b[0] * x + state.first().copied().unwrap_or(0.0);
            for i in 0..state.len() {
                let next = state.get(i + 1).copied().unwrap_or(0.0);
                state[i] = b[i + 1] * x - a[i + 1] * y + next;
            }
            out.push(y);
        }
        out
    }
}

fn ordered(w1: f64, w2: f64) -> Result<(f64, f64)> {
    if w1 >= w2 {
        return Err(DetectError::config(
            "band edges must satisfy low < high",
        ));
    }
    Ok((w1, w2))
}

/// Analog Butterworth prototype poles on the left half of the unit circle.
fn prototype(order: usize) -> Vec<Complex64> {
    let n = order as f64;
    (0..order)
        .map(|k| {
            let m = 2.0 * k as f64 - (n - 1.0);
            -Complex64::new(0.0, PI * m / (2.0 * n)).exp()
        })
        .collect()
}

fn lowpass(proto: &[Complex64], wo: f64) -> Zpk {
    Zpk {
        zeros: Vec::new(),
        poles: proto.iter().map(|p| *p * wo).collect(),
        gain: wo.powi(proto.len() as i32),
    }
}

fn bandpass(proto: &[Complex64], wo: f64, bw: f64) -> Zpk {
    let scaled: Vec<Complex64> = proto.iter().map(|p| *p * (bw / 2.0)).collect();
    Zpk {
        zeros: vec![Complex64::new(0.0, 0.0); proto.len()],
        poles: split_band(&scaled, wo),
        gain: bw.powi(proto.len() as i32),
    }
}

fn bandstop(proto: &[Complex64], wo: f64, bw: f64) -> Zpk {
    let inverted: Vec<Complex64> = proto.iter().map(|p| (bw / 2.0) / *p).collect();
    let mut zeros = vec![Complex64::new(0.0, wo); proto.len()];
    zeros.extend(std::iter::repeat(Complex64::new(0.0, -wo)).take(proto.len()));
    let prod = proto
        .iter()
        .fold(Complex64::new(1.0, 0.0), |acc, p| acc * -*p);
    Zpk {
        zeros,
        poles: split_band(&inverted, wo),
        gain: (1.0 / prod).re,
    }
}

/// Each shifted pole `p` becomes the pair `p ± sqrt(p² - wo²)`.
fn split_band(poles: &[Complex64], wo: f64) -> Vec<Complex64> {
    let root = |p: &Complex64| (*p * *p - wo * wo).sqrt();
    let upper = poles.iter().map(|p| *p + root(p));
    let lower = poles.iter().map(|p| *p - root(p));
    upper.chain(lower).collect()
}

fn bilinear(analog: Zpk) -> Zpk {
    let fs2 = Complex64::new(4.0, 0.0);
    let map = |s: &Complex64| (fs2 + *s) / (fs2 - *s);
    let mut zeros: Vec<Complex64> = analog.zeros.iter().map(map).collect();
    let poles: Vec<Complex64> = analog.poles.iter().map(map).collect();
    zeros.extend(
        std::iter::repeat(Complex64::new(-1.0, 0.0))
            .take(analog.poles.len().saturating_sub(analog.zeros.len())),
    );
    let num = analog
        .zeros
        .iter()
        .fold(Complex64::new(1.0, 0.0), |acc, z| acc * (fs2 - *z));
    let den = analog
        .poles
        .iter()
        .fold(Complex64::new(1.0, 0.0), |acc, p| acc * (fs2 - *p));
    Zpk {
        zeros,
        poles,
        gain: analog.gain * (num / den).re,
    }
}

/// Monic polynomial with the given roots, real parts kept.
fn poly(roots: &[Complex64]) -> Vec<f64> {
    let mut coeffs = vec![Complex64::new(1.0, 0.0)];
    for r in roots {
        let mut next = vec![Complex64::new(0.0, 0.0); coeffs.len() + 1];
        for (i, c) in coeffs.iter().enumerate() {
            next[i] += *c;
            next[i + 1] -= *c * *r;
        }
        coeffs = next;
    }
    coeffs.into_iter().map(|c| c.re).collect()
}

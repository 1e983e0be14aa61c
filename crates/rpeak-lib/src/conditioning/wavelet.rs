use crate::error::{DetectError, Result};

/// Orthogonal wavelets available to the stationary transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wavelet {
    /// Daubechies, three vanishing moments.
    Db3,
}

const DB3_DEC_LO: [f64; 6] = [
    0.035226291885709554,
    -0.08544127388202666,
    -0.1350110200102546,
    0.4598775021184915,
    0.8068915093110927,
    0.33267055295008263,
];

const DB3_DEC_HI: [f64; 6] = [
    -0.33267055295008263,
    0.8068915093110927,
    -0.4598775021184915,
    -0.1350110200102546,
    0.08544127388202666,
    0.035226291885709554,
];

impl Wavelet {
    pub fn dec_lo(self) -> &'static [f64] {
        match self {
            Wavelet::Db3 => &DB3_DEC_LO,
        }
    }

    pub fn dec_hi(self) -> &'static [f64] {
        match self {
            Wavelet::Db3 => &DB3_DEC_HI,
        }
    }
}

/// Detail coefficients of the undecimated transform at `level`.
///
/// Uses periodic extension. The filters are upsampled by `2^(j-1)` at level
/// `j` and each level decomposes the previous approximation, so the input
/// length must be a multiple of `2^level`.
pub fn swt_detail(data: &[f64], wavelet: Wavelet, level: u32) -> Result<Vec<f64>> {
    if level == 0 || level >= usize::BITS {
        return Err(DetectError::config(format!("invalid SWT level {level}")));
    }
    let multiple = 1usize << level;
    if data.is_empty() || data.len() % multiple != 0 {
        return Err(DetectError::config(format!(
            "SWT level {level} needs a length divisible by {multiple}, got {}",
            data.len()
        )));
    }
    let mut approx = data.to_vec();
    let mut detail = Vec::new();
    for j in 1..=level {
        let step = 1usize << (j - 1);
        detail = periodic_filter(&approx, wavelet.dec_hi(), step);
        approx = periodic_filter(&approx, wavelet.dec_lo(), step);
    }
    Ok(detail)
}

fn periodic_filter(x: &[f64], taps: &[f64], step: usize) -> Vec<f64> {
    let n = x.len();
    let shift = taps.len() * step / 2;
    (0..n)
        .map(|o| {
            taps.iter()
                .enumerate()
                .map(|(j, h)| {
                    let back = (j * step) % n;
                    let idx = (o + shift % n + n - back) % n;
                    h * x[idx]
                })
                .sum()
        })
        .collect()
}

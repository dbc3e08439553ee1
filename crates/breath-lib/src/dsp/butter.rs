//! Digital Butterworth design and zero-phase (forward-backward) filtering.
//!
//! Design follows the classic zero/pole/gain route: analog prototype poles,
//! frequency transform (low-pass or band-pass), bilinear transform, then
//! expansion into transfer-function coefficients. Cutoffs are normalised to
//! the Nyquist frequency.

use crate::error::{RespError, Result};
use crate::numeric::{poly, solve_dense};
use num_complex::Complex64;
use std::f64::consts::PI;

/// Transfer function `b(z) / a(z)`, coefficients highest power first and
/// `a[0] == 1`.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferFunction {
    pub b: Vec<f64>,
    pub a: Vec<f64>,
}

impl TransferFunction {
    /// Low-pass Butterworth with `cutoff_hz` at sampling rate `fs`.
    pub fn butter_lowpass(order: usize, cutoff_hz: f64, fs: f64) -> Result<Self> {
        let wn = normalized_cutoff(cutoff_hz, fs)?;
        let (z, p, k) = prototype(order)?;
        let warped = prewarp(wn, 2.0);
        let degree = p.len() - z.len();
        let p: Vec<Complex64> = p.iter().map(|&pole| pole * warped).collect();
        let k = k * warped.powi(degree as i32);
        Ok(bilinear(&z, &p, k))
    }

    /// Band-pass Butterworth passing `[low_hz, high_hz]`. The resulting
    /// transfer function has order `2 * order`.
    pub fn butter_bandpass(order: usize, low_hz: f64, high_hz: f64, fs: f64) -> Result<Self> {
        if low_hz >= high_hz {
            return Err(RespError::InvalidConfiguration(format!(
                "band edges out of order: [{low_hz}, {high_hz}] Hz"
            )));
        }
        let w_low = prewarp(normalized_cutoff(low_hz, fs)?, 2.0);
        let w_high = prewarp(normalized_cutoff(high_hz, fs)?, 2.0);
        let bw = w_high - w_low;
        let wo = (w_low * w_high).sqrt();

        let (z, p, k) = prototype(order)?;
        let degree = p.len() - z.len();
        let scaled: Vec<Complex64> = p.iter().map(|&pole| pole * (bw / 2.0)).collect();
        let mut poles = Vec::with_capacity(2 * scaled.len());
        for &pole in &scaled {
            poles.push(pole + (pole * pole - wo * wo).sqrt());
        }
        for &pole in &scaled {
            poles.push(pole - (pole * pole - wo * wo).sqrt());
        }
        let zeros = vec![Complex64::new(0.0, 0.0); degree];
        let k = k * bw.powi(degree as i32);
        Ok(bilinear(&zeros, &poles, k))
    }

    /// Edge padding used by [`filtfilt`](Self::filtfilt).
    pub fn padlen(&self) -> usize {
        3 * self.a.len().max(self.b.len())
    }

    /// Direct form II transposed filtering starting from state `zi`.
    pub fn lfilter(&self, x: &[f64], zi: &[f64]) -> Vec<f64> {
        let n = self.a.len().max(self.b.len());
        let b = padded(&self.b, n);
        let a = padded(&self.a, n);
        let mut z = zi.to_vec();
        z.resize(n - 1, 0.0);
        let mut out = Vec::with_capacity(x.len());
        for &sample in x {
            let y = b[0] * sample + z.first().copied().unwrap_or(0.0);
            for i in 0..n.saturating_sub(2) {
                z[i] = b[i + 1] * sample + z[i + 1] - a[i + 1] * y;
            }
            if n >= 2 {
                z[n - 2] = b[n - 1] * sample - a[n - 1] * y;
            }
            out.push(y);
        }
        out
    }

    /// Initial state matching the steady state of a unit step.
    pub fn lfilter_zi(&self) -> Result<Vec<f64>> {
        let n = self.a.len().max(self.b.len());
        if n < 2 {
            return Ok(Vec::new());
        }
        let b = padded(&self.b, n);
        let a = padded(&self.a, n);
        let m = n - 1;
        let mut lhs = vec![vec![0.0; m]; m];
        for (i, row) in lhs.iter_mut().enumerate() {
            row[i] = 1.0;
            row[0] += a[i + 1];
            if i + 1 < m {
                row[i + 1] -= 1.0;
            }
        }
        let rhs: Vec<f64> = (0..m).map(|i| b[i + 1] - a[i + 1] * b[0]).collect();
        solve_dense(lhs, rhs)
    }

    /// Zero-phase filtering: forward pass, then backward pass, with odd
    /// extension of `padlen()` samples at both ends.
    pub fn filtfilt(&self, x: &[f64]) -> Result<Vec<f64>> {
        let pad = self.padlen();
        if x.len() <= pad {
            return Err(RespError::TooFewSamples {
                needed: pad + 1,
                actual: x.len(),
            });
        }
        let n = x.len();
        let mut ext = Vec::with_capacity(n + 2 * pad);
        ext.extend((1..=pad).rev().map(|i| 2.0 * x[0] - x[i]));
        ext.extend_from_slice(x);
        ext.extend((0..pad).map(|i| 2.0 * x[n - 1] - x[n - 2 - i]));

        let zi = self.lfilter_zi()?;
        let x0 = ext[0];
        let forward = self.lfilter(&ext, &scaled(&zi, x0));
        let y0 = forward.last().copied().unwrap_or(0.0);
        let reversed: Vec<f64> = forward.into_iter().rev().collect();
        let mut backward = self.lfilter(&reversed, &scaled(&zi, y0));
        backward.reverse();
        Ok(backward[pad..pad + n].to_vec())
    }

    /// Complex response at `freq_hz` for sampling rate `fs`.
    pub fn response(&self, freq_hz: f64, fs: f64) -> Complex64 {
        let w = 2.0 * PI * freq_hz / fs;
        let z_inv = Complex64::from_polar(1.0, -w);
        let eval = |coeffs: &[f64]| {
            coeffs
                .iter()
                .rev()
                .fold(Complex64::new(0.0, 0.0), |acc, &c| acc * z_inv + c)
        };
        eval(&self.b) / eval(&self.a)
    }
}

fn normalized_cutoff(cutoff_hz: f64, fs: f64) -> Result<f64> {
    let nyq = 0.5 * fs;
    let wn = cutoff_hz / nyq;
    if !(wn > 0.0 && wn < 1.0) {
        return Err(RespError::InvalidConfiguration(format!(
            "cutoff {cutoff_hz} Hz must lie strictly between 0 and the Nyquist frequency {nyq} Hz"
        )));
    }
    Ok(wn)
}

/// Analog prototype: no zeros, poles on the left half of the unit circle,
/// unit gain.
fn prototype(order: usize) -> Result<(Vec<Complex64>, Vec<Complex64>, f64)> {
    if order == 0 {
        return Err(RespError::InvalidConfiguration(
            "filter order must be at least 1".into(),
        ));
    }
    Ok((Vec::new(), butterworth_poles(order), 1.0))
}

fn butterworth_poles(order: usize) -> Vec<Complex64> {
    let n = order as i64;
    (0..order as i64)
        .map(|i| {
            let m = -n + 1 + 2 * i;
            let theta = PI * m as f64 / (2 * n) as f64;
            -Complex64::from_polar(1.0, theta)
        })
        .collect()
}

/// Pre-warp a frequency for the bilinear transform.
fn prewarp(freq: f64, sample_rate: f64) -> f64 {
    2.0 * sample_rate * (PI * freq / sample_rate).tan()
}

/// Bilinear transform at the normalised sampling rate (fs = 2) and expansion
/// to transfer-function coefficients.
fn bilinear(zeros: &[Complex64], poles: &[Complex64], gain: f64) -> TransferFunction {
    let fs2 = Complex64::new(4.0, 0.0);
    let degree = poles.len() - zeros.len();
    let mut z_digital: Vec<Complex64> = zeros.iter().map(|&z| (fs2 + z) / (fs2 - z)).collect();
    z_digital.extend(std::iter::repeat(Complex64::new(-1.0, 0.0)).take(degree));
    let p_digital: Vec<Complex64> = poles.iter().map(|&p| (fs2 + p) / (fs2 - p)).collect();

    let num: Complex64 = zeros.iter().map(|&z| fs2 - z).product();
    let den: Complex64 = poles.iter().map(|&p| fs2 - p).product();
    let k = gain * (num / den).re;

    let b = poly(&z_digital).iter().map(|c| k * c.re).collect();
    let a = poly(&p_digital).iter().map(|c| c.re).collect();
    TransferFunction { b, a }
}

fn padded(coeffs: &[f64], n: usize) -> Vec<f64> {
    let mut out = coeffs.to_vec();
    out.resize(n, 0.0);
    out
}

fn scaled(values: &[f64], factor: f64) -> Vec<f64> {
    values.iter().map(|v| v * factor).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f64, expected: f64, tol: f64) {
        let diff = (actual - expected).abs();
        assert!(
            diff <= tol,
            "expected {expected}, got {actual} (diff {diff} > tol {tol})"
        );
    }

    #[test]
    fn lowpass_coefficients_snapshot() {
        let tf = TransferFunction::butter_lowpass(2, 0.2, 50.0).unwrap();
        let b = [0.0001551484234756991, 0.0003102968469513982, 0.0001551484234756991];
        let a = [1.0, -1.9644605802052322, 0.9650811738991351];
        for (x, y) in tf.b.iter().zip(b) {
            assert_close(*x, y, 1e-12);
        }
        for (x, y) in tf.a.iter().zip(a) {
            assert_close(*x, y, 1e-12);
        }
    }

    #[test]
    fn bandpass_coefficients_snapshot() {
        let tf = TransferFunction::butter_bandpass(2, 0.05, 1.0, 50.0).unwrap();
        assert_eq!(tf.b.len(), 5);
        assert_eq!(tf.a.len(), 5);
        let b = [
            0.0032822822532476282,
            0.0,
            -0.0065645645064952565,
            0.0,
            0.0032822822532476282,
        ];
        let a = [
            1.0,
            -3.8300101337703834,
            5.50479722355253,
            -3.5194401029102935,
            0.844653587365286,
        ];
        for (x, y) in tf.b.iter().zip(b) {
            assert_close(*x, y, 1e-12);
        }
        for (x, y) in tf.a.iter().zip(a) {
            assert_close(*x, y, 1e-10);
        }
    }

    #[test]
    fn bandpass_blocks_dc_and_passes_breathing_band() {
        let fs = 50.0;
        let tf = TransferFunction::butter_bandpass(2, 0.05, 1.0, fs).unwrap();
        assert!(tf.response(0.0, fs).norm() < 1e-9);
        let centre = tf.response((0.05f64 * 1.0).sqrt(), fs).norm();
        assert_close(centre, 1.0, 1e-3);
        assert!(tf.response(5.0, fs).norm() < 0.05);
    }

    #[test]
    fn lowpass_has_unit_dc_gain() {
        let tf = TransferFunction::butter_lowpass(2, 0.2, 25.0).unwrap();
        assert_close(tf.response(0.0, 25.0).norm(), 1.0, 1e-9);
    }

    #[test]
    fn rejects_cutoff_above_nyquist() {
        let err = TransferFunction::butter_bandpass(2, 0.05, 1.0, 2.0).unwrap_err();
        assert!(matches!(err, RespError::InvalidConfiguration(_)));
        assert!(TransferFunction::butter_lowpass(2, 0.0, 50.0).is_err());
    }

    #[test]
    fn filtfilt_keeps_constant_for_lowpass() {
        let tf = TransferFunction::butter_lowpass(2, 0.2, 50.0).unwrap();
        let y = tf.filtfilt(&vec![3.0; 200]).unwrap();
        assert_eq!(y.len(), 200);
        for v in y {
            assert_close(v, 3.0, 1e-9);
        }
    }

    #[test]
    fn filtfilt_is_zero_phase_in_passband() {
        let fs = 50.0;
        let tf = TransferFunction::butter_bandpass(2, 0.05, 1.0, fs).unwrap();
        let x: Vec<f64> = (0..3000)
            .map(|i| (2.0 * PI * 0.25 * i as f64 / fs).sin())
            .collect();
        let y = tf.filtfilt(&x).unwrap();
        // Away from the edges the output tracks the input without lag.
        for i in 1000..2000 {
            assert_close(y[i], x[i], 0.05);
        }
    }

    #[test]
    fn filtfilt_needs_more_than_padlen_samples() {
        let tf = TransferFunction::butter_bandpass(2, 0.05, 1.0, 50.0).unwrap();
        assert_eq!(tf.padlen(), 15);
        let err = tf.filtfilt(&[1.0; 15]).unwrap_err();
        assert_eq!(
            err,
            RespError::TooFewSamples {
                needed: 16,
                actual: 15
            }
        );
    }
}

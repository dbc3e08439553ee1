//! One-dimensional interpolation with an explicit extrapolation policy.
//!
//! An [`Interpolator`] is the strategy (kind + policy) chosen per call;
//! [`Interpolator::fit`] binds it to knots and returns an [`Interpolant`].
//!
//! Knot values may be `NaN` ("undefined"). Local kinds (step and linear)
//! propagate an undefined knot only into the pieces that touch it. Spline
//! kinds are global, so they are fitted on the defined knots alone.

use crate::error::{RespError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterpKind {
    Linear,
    Nearest,
    /// Order-0 spline: holds each value until the next knot, and the first
    /// value before the first knot.
    Zero,
    /// Order-1 spline (same values as `Linear`).
    Slinear,
    Quadratic,
    Cubic,
    /// Holds each value until the next knot.
    #[default]
    Previous,
    /// Takes the value of the next knot.
    Next,
}

impl InterpKind {
    pub const ALL: [InterpKind; 8] = [
        InterpKind::Linear,
        InterpKind::Nearest,
        InterpKind::Zero,
        InterpKind::Slinear,
        InterpKind::Quadratic,
        InterpKind::Cubic,
        InterpKind::Previous,
        InterpKind::Next,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            InterpKind::Linear => "linear",
            InterpKind::Nearest => "nearest",
            InterpKind::Zero => "zero",
            InterpKind::Slinear => "slinear",
            InterpKind::Quadratic => "quadratic",
            InterpKind::Cubic => "cubic",
            InterpKind::Previous => "previous",
            InterpKind::Next => "next",
        }
    }

    fn spline_degree(&self) -> Option<usize> {
        match self {
            InterpKind::Quadratic => Some(2),
            InterpKind::Cubic => Some(3),
            _ => None,
        }
    }

    fn min_knots(&self) -> usize {
        match self {
            InterpKind::Linear | InterpKind::Slinear => 2,
            InterpKind::Quadratic => 3,
            InterpKind::Cubic => 4,
            _ => 1,
        }
    }
}

impl fmt::Display for InterpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InterpKind {
    type Err = RespError;

    fn from_str(s: &str) -> Result<Self> {
        InterpKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                RespError::InvalidConfiguration(format!("unsupported interpolation kind: {s}"))
            })
    }
}

/// What to do with queries outside the knot range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Extrapolation {
    /// Continue the edge piece of the interpolant (see [`InterpKind`] for the
    /// step kinds).
    #[default]
    Extend,
    /// Hold the first / last knot value.
    Clamp,
    /// Refuse with [`RespError::OutOfRange`].
    Error,
}

impl Extrapolation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Extrapolation::Extend => "extend",
            Extrapolation::Clamp => "clamp",
            Extrapolation::Error => "error",
        }
    }
}

impl fmt::Display for Extrapolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Extrapolation {
    type Err = RespError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "extend" | "extrapolate" => Ok(Extrapolation::Extend),
            "clamp" => Ok(Extrapolation::Clamp),
            "error" => Ok(Extrapolation::Error),
            other => Err(RespError::InvalidConfiguration(format!(
                "unsupported extrapolation policy: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Interpolator {
    pub kind: InterpKind,
    pub extrapolation: Extrapolation,
}

impl Interpolator {
    pub fn new(kind: InterpKind, extrapolation: Extrapolation) -> Self {
        Self {
            kind,
            extrapolation,
        }
    }

    /// Linear interpolation extended past both ends.
    pub fn linear() -> Self {
        Self::new(InterpKind::Linear, Extrapolation::Extend)
    }

    pub fn fit(&self, xs: &[f64], ys: &[f64]) -> Result<Interpolant> {
        if xs.len() != ys.len() {
            return Err(RespError::InvalidConfiguration(format!(
                "{} knots for {} values",
                xs.len(),
                ys.len()
            )));
        }
        if xs.iter().any(|x| !x.is_finite()) || xs.windows(2).any(|w| w[1] <= w[0]) {
            return Err(RespError::InvalidConfiguration(
                "knots must be finite and strictly increasing".into(),
            ));
        }

        let (xs, ys, spline) = match self.kind.spline_degree() {
            Some(k) => {
                let (dx, dy): (Vec<f64>, Vec<f64>) = xs
                    .iter()
                    .zip(ys)
                    .filter(|(_, y)| y.is_finite())
                    .map(|(x, y)| (*x, *y))
                    .unzip();
                check_knots(self.kind, dx.len())?;
                let spline = BSpline::interpolating(&dx, &dy, k)?;
                (dx, dy, Some(spline))
            }
            None => {
                check_knots(self.kind, xs.len())?;
                (xs.to_vec(), ys.to_vec(), None)
            }
        };

        Ok(Interpolant {
            kind: self.kind,
            extrapolation: self.extrapolation,
            xs,
            ys,
            spline,
        })
    }
}

fn check_knots(kind: InterpKind, actual: usize) -> Result<()> {
    let needed = kind.min_knots();
    if actual < needed {
        return Err(RespError::TooFewSamples { needed, actual });
    }
    Ok(())
}

/// Interpolator bound to its knots. `NaN` results mean "undefined here".
#[derive(Debug, Clone, PartialEq)]
pub struct Interpolant {
    kind: InterpKind,
    extrapolation: Extrapolation,
    xs: Vec<f64>,
    ys: Vec<f64>,
    spline: Option<BSpline>,
}

impl Interpolant {
    pub fn kind(&self) -> InterpKind {
        self.kind
    }

    pub fn domain(&self) -> (f64, f64) {
        (self.xs[0], self.xs[self.xs.len() - 1])
    }

    pub fn eval(&self, x: f64) -> Result<f64> {
        if x.is_nan() {
            return Ok(f64::NAN);
        }
        let (lo, hi) = self.domain();
        if x < lo || x > hi {
            match self.extrapolation {
                Extrapolation::Error => return Err(RespError::OutOfRange { x, lo, hi }),
                Extrapolation::Clamp => {
                    let edge = if x < lo { 0 } else { self.ys.len() - 1 };
                    return Ok(self.ys[edge]);
                }
                Extrapolation::Extend => {}
            }
        }
        Ok(match self.kind {
            InterpKind::Linear | InterpKind::Slinear => self.linear(x),
            InterpKind::Nearest => self.nearest(x),
            InterpKind::Zero => {
                let count = self.xs.partition_point(|&k| k <= x);
                self.ys[count.saturating_sub(1)]
            }
            InterpKind::Previous => {
                let count = self.xs.partition_point(|&k| k <= x);
                if count == 0 {
                    f64::NAN
                } else {
                    self.ys[count - 1]
                }
            }
            InterpKind::Next => {
                let count = self.xs.partition_point(|&k| k < x);
                self.ys.get(count).copied().unwrap_or(f64::NAN)
            }
            InterpKind::Quadratic | InterpKind::Cubic => match &self.spline {
                Some(spline) => spline.eval(x),
                None => f64::NAN,
            },
        })
    }

    pub fn eval_many(&self, xs: &[f64]) -> Result<Vec<f64>> {
        xs.iter().map(|&x| self.eval(x)).collect()
    }

    fn linear(&self, x: f64) -> f64 {
        let n = self.xs.len();
        let hi = self.xs.partition_point(|&k| k < x).clamp(1, n - 1);
        let lo = hi - 1;
        let slope = (self.ys[hi] - self.ys[lo]) / (self.xs[hi] - self.xs[lo]);
        slope * (x - self.xs[lo]) + self.ys[lo]
    }

    fn nearest(&self, x: f64) -> f64 {
        // Ties at a midpoint resolve to the lower knot.
        let idx = self
            .xs
            .windows(2)
            .map(|w| 0.5 * (w[0] + w[1]))
            .take_while(|&mid| mid < x)
            .count();
        self.ys[idx.min(self.ys.len() - 1)]
    }
}

/// Interpolating B-spline with not-a-knot style knot vector.
#[derive(Debug, Clone, PartialEq)]
struct BSpline {
    t: Vec<f64>,
    c: Vec<f64>,
    k: usize,
}

impl BSpline {
    fn interpolating(xs: &[f64], ys: &[f64], k: usize) -> Result<Self> {
        let n = xs.len();
        let first = xs[0];
        let last = xs[n - 1];
        let mut t = vec![first; k + 1];
        match k {
            2 => {
                // Interior knots at the midpoints, skipping the outermost two.
                let mids: Vec<f64> = xs.windows(2).map(|w| 0.5 * (w[0] + w[1])).collect();
                t.extend_from_slice(&mids[1..mids.len() - 1]);
            }
            _ => {
                let skip = (k - 1) / 2 + 1;
                t.extend_from_slice(&xs[skip..n - skip]);
            }
        }
        t.extend(std::iter::repeat(last).take(k + 1));

        let mut spline = BSpline {
            t,
            c: vec![0.0; n],
            k,
        };
        let mut collocation = vec![vec![0.0; n]; n];
        for (row, &x) in collocation.iter_mut().zip(xs) {
            let m = spline.find_interval(x);
            for (j, b) in spline.basis(x, m).into_iter().enumerate() {
                row[m - k + j] = b;
            }
        }
        spline.c = crate::numeric::solve_dense(collocation, ys.to_vec())?;
        Ok(spline)
    }

    fn n_coeffs(&self) -> usize {
        self.t.len() - self.k - 1
    }

    /// Index `m` of the knot span used for `x`; outside the base interval
    /// the edge spans are used, which extends the edge polynomials.
    fn find_interval(&self, x: f64) -> usize {
        let nc = self.n_coeffs();
        let mut l = self.k + 1;
        while l != nc && x >= self.t[l] {
            l += 1;
        }
        l - 1
    }

    /// Values of the `k + 1` basis functions that are non-zero on span `m`.
    fn basis(&self, x: f64, m: usize) -> Vec<f64> {
        let k = self.k;
        let mut h = vec![0.0; k + 1];
        let mut hh = vec![0.0; k];
        h[0] = 1.0;
        for j in 1..=k {
            hh[..j].copy_from_slice(&h[..j]);
            h[0] = 0.0;
            for n in 1..=j {
                let xb = self.t[m + n];
                let xa = self.t[m + n - j];
                if xb == xa {
                    h[n] = 0.0;
                    continue;
                }
                let w = hh[n - 1] / (xb - xa);
                h[n - 1] += w * (xb - x);
                h[n] = w * (x - xa);
            }
        }
        h
    }

    fn eval(&self, x: f64) -> f64 {
        let m = self.find_interval(x);
        self.basis(x, m)
            .iter()
            .enumerate()
            .map(|(i, b)| self.c[m - self.k + i] * b)
            .sum()
    }
}

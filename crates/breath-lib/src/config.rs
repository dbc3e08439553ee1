use crate::dsp::interp::{Extrapolation, InterpKind, Interpolator};
use crate::error::{RespError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Output scaling of the normaliser.
///
/// Numerically `0` selects autoscaling by median velocity, `1` keeps the
/// input units and any other value multiplies the filtered signal.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub enum Scaling {
    #[default]
    Auto,
    Preserve,
    Factor(f64),
}

impl Scaling {
    /// Multiplier applied to the filtered signal, `None` for autoscaling.
    pub fn factor(&self) -> Option<f64> {
        match self {
            Scaling::Auto => None,
            Scaling::Preserve => Some(1.0),
            Scaling::Factor(c) => Some(*c),
        }
    }
}

impl TryFrom<f64> for Scaling {
    type Error = RespError;

    fn try_from(value: f64) -> Result<Self> {
        if !value.is_finite() {
            return Err(RespError::InvalidConfiguration(format!(
                "scaling must be a finite number, got {value}"
            )));
        }
        Ok(if value == 0.0 {
            Scaling::Auto
        } else if value == 1.0 {
            Scaling::Preserve
        } else {
            Scaling::Factor(value)
        })
    }
}

impl From<Scaling> for f64 {
    fn from(scaling: Scaling) -> f64 {
        match scaling {
            Scaling::Auto => 0.0,
            Scaling::Preserve => 1.0,
            Scaling::Factor(c) => c,
        }
    }
}

impl FromStr for Scaling {
    type Err = RespError;

    fn from_str(s: &str) -> Result<Self> {
        if s.trim().eq_ignore_ascii_case("auto") {
            return Ok(Scaling::Auto);
        }
        let value: f64 = s.trim().parse().map_err(|_| {
            RespError::InvalidConfiguration(format!("scaling must be numeric, got {s:?}"))
        })?;
        Scaling::try_from(value)
    }
}

impl fmt::Display for Scaling {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", f64::from(*self))
    }
}

/// Options shared by the analysis entry points.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalysisConfig {
    pub scaling: Scaling,
    /// Input is already band-passed; skip the normaliser.
    pub filtered: bool,
    pub interp_kind: InterpKind,
    pub extrapolation: Extrapolation,
}

impl AnalysisConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| RespError::InvalidConfiguration(e.to_string()))
    }

    pub fn interpolator(&self) -> Interpolator {
        Interpolator::new(self.interp_kind, self.extrapolation)
    }
}

use serde::{Deserialize, Serialize};

/// Coarse classification of [`RespError`], used by callers that only care
/// about the failure family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    InsufficientData,
    DegenerateSignal,
    InvalidConfiguration,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RespError {
    #[error("need at least {needed} valid samples, got {actual}")]
    TooFewSamples { needed: usize, actual: usize },

    #[error("no complete breath detected")]
    NoBreathsDetected,

    #[error("degenerate signal: {0}")]
    DegenerateSignal(String),

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("{x} lies outside the interpolation range [{lo}, {hi}]")]
    OutOfRange { x: f64, lo: f64, hi: f64 },
}

impl RespError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RespError::TooFewSamples { .. } | RespError::NoBreathsDetected => {
                ErrorKind::InsufficientData
            }
            RespError::DegenerateSignal(_) => ErrorKind::DegenerateSignal,
            RespError::InvalidConfiguration(_) | RespError::OutOfRange { .. } => {
                ErrorKind::InvalidConfiguration
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, RespError>;

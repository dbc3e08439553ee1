//! Breath onset detection and breath-wise features for chest-expansion
//! (respiration belt) recordings.

pub mod config;
pub mod detectors;
pub mod dsp;
pub mod error;
pub mod metrics;
pub mod numeric;
pub mod signal;

pub use config::{AnalysisConfig, Scaling};
pub use detectors::{extract_onsets, extract_onsets_recording, Breaths};
pub use dsp::{
    derivative, derivative_with, differentiate, normalize_filter, normalize_recording,
    Extrapolation, InterpKind, Interpolant, Interpolator, TransferFunction,
};
pub use error::{ErrorKind, RespError, Result};
pub use metrics::{
    breath_features, breath_features_recording, continuous_features,
    continuous_features_recording, BreathFeatures, BreathRow, BreathStatus, ContinuousFeatures,
    Feature, FeatureColumn, OnsetAnchor,
};
pub use signal::*;

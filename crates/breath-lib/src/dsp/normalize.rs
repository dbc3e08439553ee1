use crate::config::Scaling;
use crate::dsp::butter::TransferFunction;
use crate::error::{RespError, Result};
use crate::numeric::median;
use crate::signal::{PerChannel, Recording, TimeSeries};

/// Respiration pass band (Hz).
pub const BAND_LOW_HZ: f64 = 0.05;
pub const BAND_HIGH_HZ: f64 = 1.0;
pub const FILTER_ORDER: usize = 2;

/// Zero-mean, zero-phase band-passed copy of `ts`, rescaled per `scaling`.
///
/// The output index holds only the timestamps where the input had a value.
/// With [`Scaling::Auto`] the signal is divided by `fs * median(|Δy|)`, the
/// median absolute sample-to-sample velocity of the filtered channel.
pub fn normalize_filter(ts: &TimeSeries, scaling: Scaling) -> Result<TimeSeries> {
    let fs = ts.sampling_rate()?;
    let valid = ts.demeaned().dropna();
    if valid.is_empty() {
        return Err(RespError::TooFewSamples {
            needed: 1,
            actual: 0,
        });
    }
    let tf = TransferFunction::butter_bandpass(FILTER_ORDER, BAND_LOW_HZ, BAND_HIGH_HZ, fs)?;
    let filtered = tf.filtfilt(&valid.values)?;

    let values = match scaling.factor() {
        Some(c) => filtered.iter().map(|v| c * v).collect(),
        None => {
            let velocity: Vec<f64> = filtered.windows(2).map(|w| (w[1] - w[0]).abs()).collect();
            let med = median(&velocity).unwrap_or(0.0);
            let denom = fs * med;
            if !(denom.is_finite() && denom > 0.0) {
                return Err(RespError::DegenerateSignal(
                    "median velocity is zero, cannot autoscale".into(),
                ));
            }
            filtered.iter().map(|v| v / denom).collect()
        }
    };
    log::debug!(
        "normalised {} of {} samples at {} Hz ({:?})",
        valid.len(),
        ts.len(),
        fs,
        scaling
    );
    Ok(TimeSeries {
        times: valid.times,
        values,
    })
}

/// [`normalize_filter`] for every channel; each channel is scaled on its own.
pub fn normalize_recording(rec: &Recording, scaling: Scaling) -> PerChannel<TimeSeries> {
    rec.map_channels(|ts| normalize_filter(ts, scaling))
}

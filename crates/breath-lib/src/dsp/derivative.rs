use crate::dsp::interp::Interpolator;
use crate::error::{RespError, Result};
use crate::signal::{PerChannel, Recording, TimeSeries};

/// Sample-to-sample difference re-aligned onto the input timestamps.
///
/// Each difference belongs halfway between its two samples (`t - dt/2`);
/// the values at the input timestamps are read back from those
/// half-shifted knots by linear interpolation, extended past both ends, so
/// the output has the input's index and no leading gap. Missing samples are
/// skipped before differencing.
pub fn derivative(ts: &TimeSeries) -> Result<TimeSeries> {
    derivative_with(ts, &Interpolator::linear())
}

/// [`derivative`] with a caller-selected reinterpolation strategy.
pub fn derivative_with(ts: &TimeSeries, interpolator: &Interpolator) -> Result<TimeSeries> {
    let valid = ts.dropna();
    if valid.len() < 2 {
        return Err(RespError::TooFewSamples {
            needed: 2,
            actual: valid.len(),
        });
    }
    let dt = ts.sample_interval().ok_or(RespError::TooFewSamples {
        needed: 2,
        actual: ts.len(),
    })?;

    let knots: Vec<f64> = valid.times[1..].iter().map(|t| t - 0.5 * dt).collect();
    let diffs: Vec<f64> = valid.values.windows(2).map(|w| w[1] - w[0]).collect();

    let values = if diffs.len() == 1 {
        vec![diffs[0]; ts.len()]
    } else {
        interpolator.fit(&knots, &diffs)?.eval_many(&ts.times)?
    };
    Ok(TimeSeries {
        times: ts.times.clone(),
        values,
    })
}

/// [`derivative`] for every channel of a recording.
pub fn differentiate(rec: &Recording) -> PerChannel<TimeSeries> {
    rec.map_channels(derivative)
}

use crate::config::Scaling;
use crate::detectors::intervals::{edges, pair_edges, partition_by_marks, suppress, Interval};
use crate::dsp::butter::TransferFunction;
use crate::dsp::derivative::derivative;
use crate::dsp::normalize::normalize_filter;
use crate::error::{RespError, Result};
use crate::numeric::sign;
use crate::signal::{PerChannel, Recording, TimeSeries};
use serde::{Deserialize, Serialize};

/// Fraction of the mean positive velocity an inspiration must reach.
pub const VELOCITY_THRESHOLD_FACTOR: f64 = 0.55;
/// Cutoff of the baseline the zero crossings are taken against (Hz).
pub const BASELINE_CUTOFF_HZ: f64 = 0.2;
pub const BASELINE_ORDER: usize = 2;
/// Samples the first-pass interval starts are pulled back by.
const ONSET_LEAD_SAMPLES: f64 = 2.0;

/// Paired inspiration / expiration onset times, `In[i] < Ex[i] < In[i+1]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Breaths {
    #[serde(rename = "In")]
    pub inspirations: Vec<f64>,
    #[serde(rename = "Ex")]
    pub expirations: Vec<f64>,
}

impl Breaths {
    pub fn len(&self) -> usize {
        self.inspirations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inspirations.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.inspirations
            .iter()
            .copied()
            .zip(self.expirations.iter().copied())
    }

    fn from_intervals(intervals: &[Interval]) -> Self {
        Self {
            inspirations: intervals.iter().map(|iv| iv.start).collect(),
            expirations: intervals.iter().map(|iv| iv.end).collect(),
        }
    }
}

/// Detect inspiration and expiration onsets in a chest-expansion signal.
///
/// Inspirations are runs where the expansion velocity stays above
/// [`VELOCITY_THRESHOLD_FACTOR`] times its mean positive value; a run only
/// counts if the signal rises through its own 0.2 Hz baseline somewhere
/// inside it. The onset is the start of the run, the expiration onset its
/// end. Incomplete runs at the edges of the record are discarded.
///
/// With `filtered == false` the signal is band-passed first (units
/// preserved); otherwise it is taken as already filtered.
pub fn extract_onsets(ts: &TimeSeries, filtered: bool) -> Result<Breaths> {
    let fs = ts.sampling_rate()?;
    let filt = prepare(ts, filtered)?;
    let times = &filt.times;

    let velocity = derivative(&filt)?;
    let positive: Vec<f64> = velocity.values.iter().copied().filter(|&v| v > 0.0).collect();
    if positive.is_empty() {
        return Err(RespError::NoBreathsDetected);
    }
    let threshold =
        positive.iter().sum::<f64>() / positive.len() as f64 * VELOCITY_THRESHOLD_FACTOR;

    let crossings = rising_crossings(&filt, fs)?;
    let active: Vec<bool> = velocity.values.iter().map(|&v| v >= threshold).collect();

    let first = edges(&active);
    let lead = ONSET_LEAD_SAMPLES / fs;
    let starts: Vec<f64> = first.rises.iter().map(|&i| times[i] - lead).collect();
    let ends: Vec<f64> = first.falls.iter().map(|&i| times[i]).collect();
    let candidates = pair_edges(&starts, &ends);
    if candidates.intervals.is_empty() {
        return Err(RespError::NoBreathsDetected);
    }

    let (kept, mut cuts) = partition_by_marks(&candidates.intervals, &crossings);
    log::debug!(
        "{} rising crossings, {} candidate inspirations, {} without a crossing",
        crossings.len(),
        candidates.intervals.len(),
        cuts.len()
    );
    if let Some(cut) = candidates.leading_cut {
        cuts.push(Interval::until(cut));
    }
    let active = suppress(&active, times, &cuts);

    let last = edges(&active);
    let starts: Vec<f64> = last.rises.iter().map(|&i| times[i]).collect();
    let ends: Vec<f64> = last.falls.iter().map(|&i| times[i]).collect();
    let breaths = Breaths::from_intervals(&pair_edges(&starts, &ends).intervals);
    log::debug!(
        "{} breaths ({} first-pass intervals kept)",
        breaths.len(),
        kept.len()
    );
    if breaths.is_empty() {
        return Err(RespError::NoBreathsDetected);
    }
    Ok(breaths)
}

/// [`extract_onsets`] for every channel of a recording.
pub fn extract_onsets_recording(rec: &Recording, filtered: bool) -> PerChannel<Breaths> {
    rec.map_channels(|ts| extract_onsets(ts, filtered))
}

/// De-meaned valid samples, band-passed unless `filtered`.
fn prepare(ts: &TimeSeries, filtered: bool) -> Result<TimeSeries> {
    let demeaned = ts.demeaned().dropna();
    let span = demeaned.values.iter().fold(0.0f64, |m, v| m.max(v.abs()));
    let level = ts
        .values
        .iter()
        .filter(|v| !v.is_nan())
        .fold(0.0f64, |m, v| m.max(v.abs()));
    if demeaned.len() >= 2 && span <= 1e-9 * level {
        return Err(RespError::NoBreathsDetected);
    }
    if filtered {
        Ok(demeaned)
    } else {
        normalize_filter(&demeaned, Scaling::Preserve)
    }
}

/// Times where the signal rises through its low-passed baseline.
fn rising_crossings(filt: &TimeSeries, fs: f64) -> Result<Vec<f64>> {
    let lowpass = TransferFunction::butter_lowpass(BASELINE_ORDER, BASELINE_CUTOFF_HZ, fs)?;
    let baseline = lowpass.filtfilt(&filt.values)?;
    let signs: Vec<i8> = filt
        .values
        .iter()
        .zip(&baseline)
        .map(|(v, b)| sign(v - b))
        .collect();
    Ok(signs
        .windows(2)
        .zip(&filt.times[1..])
        .filter(|(w, _)| w[1] - w[0] == 2)
        .map(|(_, &t)| t)
        .collect())
}

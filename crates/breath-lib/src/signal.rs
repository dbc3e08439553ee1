use crate::error::{RespError, Result};
use serde::{Deserialize, Serialize};

/// A single channel on its timestamp index. `NaN` marks a missing sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeries {
    /// Sample timestamps in seconds, strictly increasing.
    pub times: Vec<f64>,
    /// Samples, `NaN` where the recording has a gap.
    pub values: Vec<f64>,
}

impl TimeSeries {
    pub fn new(times: Vec<f64>, values: Vec<f64>) -> Result<Self> {
        if times.len() != values.len() {
            return Err(RespError::InvalidConfiguration(format!(
                "{} timestamps for {} samples",
                times.len(),
                values.len()
            )));
        }
        Ok(Self { times, values })
    }

    /// Evenly sampled series starting at t = 0.
    pub fn from_rate(fs: f64, values: Vec<f64>) -> Self {
        let times = (0..values.len()).map(|i| i as f64 / fs).collect();
        Self { times, values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Number of non-missing samples.
    pub fn valid_len(&self) -> usize {
        self.values.iter().filter(|v| !v.is_nan()).count()
    }

    /// Mean spacing of the timestamp index.
    pub fn sample_interval(&self) -> Option<f64> {
        sample_interval(&self.times)
    }

    /// Nominal sampling rate, `round(1 / dt)`.
    pub fn sampling_rate(&self) -> Result<f64> {
        sampling_rate(&self.times)
    }

    /// Copy without the missing samples. Gaps are dropped, never imputed.
    pub fn dropna(&self) -> TimeSeries {
        let (times, values) = self
            .times
            .iter()
            .zip(&self.values)
            .filter(|(_, v)| !v.is_nan())
            .map(|(t, v)| (*t, *v))
            .unzip();
        TimeSeries { times, values }
    }

    /// Copy with the mean of the valid samples removed.
    pub fn demeaned(&self) -> TimeSeries {
        let mean = crate::numeric::nan_mean(&self.values).unwrap_or(0.0);
        TimeSeries {
            times: self.times.clone(),
            values: self.values.iter().map(|v| v - mean).collect(),
        }
    }

    /// Value stored at exactly `t`, if `t` is on the index.
    pub fn value_at(&self, t: f64) -> Option<f64> {
        self.index_of(t).map(|idx| self.values[idx])
    }

    pub fn index_of(&self, t: f64) -> Option<usize> {
        self.times.binary_search_by(|probe| probe.total_cmp(&t)).ok()
    }

    /// Values placed on `times`, a superset of this index. Timestamps this
    /// series lacks, and missing samples, come back as `None`.
    pub fn reindex(&self, times: &[f64]) -> Vec<Option<f64>> {
        let mut out = Vec::with_capacity(times.len());
        let mut j = 0;
        for &t in times {
            while j < self.len() && self.times[j] < t {
                j += 1;
            }
            let value = match self.times.get(j) {
                Some(&own) if own == t => Some(self.values[j]).filter(|v| !v.is_nan()),
                _ => None,
            };
            out.push(value);
        }
        out
    }
}

pub fn sample_interval(times: &[f64]) -> Option<f64> {
    if times.len() < 2 {
        return None;
    }
    let diffs: Vec<f64> = times.windows(2).map(|w| w[1] - w[0]).collect();
    crate::numeric::nan_mean(&diffs)
}

pub fn sampling_rate(times: &[f64]) -> Result<f64> {
    let dt = sample_interval(times).ok_or(RespError::TooFewSamples {
        needed: 2,
        actual: times.len(),
    })?;
    if !(dt.is_finite() && dt > 0.0) {
        return Err(RespError::InvalidConfiguration(format!(
            "timestamps must be strictly increasing (mean spacing {dt})"
        )));
    }
    let fs = (1.0 / dt).round_ties_even();
    if fs < 1.0 {
        return Err(RespError::InvalidConfiguration(format!(
            "sampling interval {dt} s is too coarse"
        )));
    }
    Ok(fs)
}

/// One named channel of a [`Recording`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    pub name: String,
    pub values: Vec<f64>,
}

/// Several channels sharing one timestamp index.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Recording {
    pub times: Vec<f64>,
    pub channels: Vec<Channel>,
}

impl Recording {
    pub fn new(times: Vec<f64>) -> Self {
        Self {
            times,
            channels: Vec::new(),
        }
    }

    pub fn push_channel(&mut self, name: impl Into<String>, values: Vec<f64>) -> Result<()> {
        let name = name.into();
        if values.len() != self.times.len() {
            return Err(RespError::InvalidConfiguration(format!(
                "channel {name} has {} samples for {} timestamps",
                values.len(),
                self.times.len()
            )));
        }
        self.channels.push(Channel { name, values });
        Ok(())
    }

    pub fn with_channel(mut self, name: impl Into<String>, values: Vec<f64>) -> Result<Self> {
        self.push_channel(name, values)?;
        Ok(self)
    }

    pub fn channel_names(&self) -> impl Iterator<Item = &str> {
        self.channels.iter().map(|c| c.name.as_str())
    }

    pub fn channel(&self, name: &str) -> Option<TimeSeries> {
        self.channels
            .iter()
            .find(|c| c.name == name)
            .map(|c| TimeSeries {
                times: self.times.clone(),
                values: c.values.clone(),
            })
    }

    /// Run `f` on every channel independently. A failing channel is reported
    /// in its own slot and does not stop the others.
    pub fn map_channels<T, F>(&self, f: F) -> PerChannel<T>
    where
        F: Fn(&TimeSeries) -> Result<T>,
    {
        let reports = self
            .channels
            .iter()
            .map(|c| {
                let ts = TimeSeries {
                    times: self.times.clone(),
                    values: c.values.clone(),
                };
                let result = f(&ts);
                if let Err(err) = &result {
                    log::warn!("channel {}: {}", c.name, err);
                }
                ChannelReport {
                    channel: c.name.clone(),
                    result,
                }
            })
            .collect();
        PerChannel { reports }
    }
}

/// Outcome of one channel in a multi-channel call.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelReport<T> {
    pub channel: String,
    pub result: Result<T>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PerChannel<T> {
    pub reports: Vec<ChannelReport<T>>,
}

impl<T> PerChannel<T> {
    pub fn len(&self) -> usize {
        self.reports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reports.is_empty()
    }

    pub fn get(&self, channel: &str) -> Option<&Result<T>> {
        self.reports
            .iter()
            .find(|r| r.channel == channel)
            .map(|r| &r.result)
    }

    pub fn successes(&self) -> impl Iterator<Item = (&str, &T)> {
        self.reports
            .iter()
            .filter_map(|r| r.result.as_ref().ok().map(|v| (r.channel.as_str(), v)))
    }

    pub fn failures(&self) -> impl Iterator<Item = (&str, &RespError)> {
        self.reports
            .iter()
            .filter_map(|r| r.result.as_ref().err().map(|e| (r.channel.as_str(), e)))
    }

    pub fn all_ok(&self) -> bool {
        self.reports.iter().all(|r| r.result.is_ok())
    }
}

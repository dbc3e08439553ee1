use crate::config::Scaling;
use crate::detectors::breath::{extract_onsets, Breaths};
use crate::dsp::normalize::normalize_filter;
use crate::error::{RespError, Result};
use crate::signal::{PerChannel, Recording, TimeSeries};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Onset a breath-wise feature is keyed on when spread over time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OnsetAnchor {
    Inspiration,
    Expiration,
}

/// Breath-wise feature columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Feature {
    /// Signal change from inspiration onset to expiration onset.
    Depth,
    /// `Ex - In`.
    InspT,
    /// Time to the next inspiration onset.
    PeriodT,
    /// `Period_T - Insp_T`.
    ExpT,
    /// `Insp_T / Exp_T`, usually within `[0.2, 1]`.
    IeRatio,
    /// Mean inspiration velocity, a bit under the modal velocity.
    InspV,
    /// Mean expiration velocity, usually over the modal velocity.
    ExpV,
}

impl Feature {
    pub const ALL: [Feature; 7] = [
        Feature::Depth,
        Feature::InspT,
        Feature::PeriodT,
        Feature::ExpT,
        Feature::IeRatio,
        Feature::InspV,
        Feature::ExpV,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Feature::Depth => "Depth",
            Feature::InspT => "Insp_T",
            Feature::PeriodT => "Period_T",
            Feature::ExpT => "Exp_T",
            Feature::IeRatio => "IE_Ratio",
            Feature::InspV => "Insp_V",
            Feature::ExpV => "Exp_V",
        }
    }

    pub fn anchor(&self) -> OnsetAnchor {
        match self {
            Feature::ExpT | Feature::ExpV => OnsetAnchor::Expiration,
            _ => OnsetAnchor::Inspiration,
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BreathStatus {
    Complete,
    /// Final breath: no following inspiration, period-based columns unset.
    Last,
    /// Expiration phase of zero length or a non-finite ratio; ratio columns
    /// unset.
    Degenerate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreathRow {
    #[serde(rename = "In")]
    pub inspiration: f64,
    #[serde(rename = "Ex")]
    pub expiration: f64,
    #[serde(rename = "Depth")]
    pub depth: f64,
    #[serde(rename = "Insp_T")]
    pub insp_t: f64,
    #[serde(rename = "Period_T")]
    pub period_t: Option<f64>,
    #[serde(rename = "Exp_T")]
    pub exp_t: Option<f64>,
    #[serde(rename = "IE_Ratio")]
    pub ie_ratio: Option<f64>,
    #[serde(rename = "Insp_V")]
    pub insp_v: f64,
    #[serde(rename = "Exp_V")]
    pub exp_v: Option<f64>,
    pub status: BreathStatus,
}

impl BreathRow {
    fn new(inspiration: f64, expiration: f64, next: Option<f64>, depth: f64) -> Self {
        let insp_t = expiration - inspiration;
        let period_t = next.map(|n| n - inspiration);
        let exp_t = period_t.map(|p| p - insp_t);
        let mut row = Self {
            inspiration,
            expiration,
            depth,
            insp_t,
            period_t,
            exp_t,
            ie_ratio: None,
            insp_v: depth / insp_t,
            exp_v: None,
            status: BreathStatus::Last,
        };
        if let Some(exp_t) = exp_t {
            let ie_ratio = insp_t / exp_t;
            let exp_v = depth / exp_t;
            if exp_t > 0.0 && ie_ratio.is_finite() && exp_v.is_finite() {
                row.ie_ratio = Some(ie_ratio);
                row.exp_v = Some(exp_v);
                row.status = BreathStatus::Complete;
            } else {
                log::warn!(
                    "degenerate breath at {inspiration}: Exp_T {exp_t}, depth {depth}"
                );
                row.status = BreathStatus::Degenerate;
            }
        }
        row
    }

    /// Value of one feature column, `None` where the row leaves it unset.
    pub fn value(&self, feature: Feature) -> Option<f64> {
        match feature {
            Feature::Depth => Some(self.depth),
            Feature::InspT => Some(self.insp_t),
            Feature::PeriodT => self.period_t,
            Feature::ExpT => self.exp_t,
            Feature::IeRatio => self.ie_ratio,
            Feature::InspV => Some(self.insp_v),
            Feature::ExpV => self.exp_v,
        }
    }
}

/// One row per detected breath.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BreathFeatures {
    pub rows: Vec<BreathRow>,
}

impl BreathFeatures {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn onsets(&self, anchor: OnsetAnchor) -> Vec<f64> {
        self.rows
            .iter()
            .map(|r| match anchor {
                OnsetAnchor::Inspiration => r.inspiration,
                OnsetAnchor::Expiration => r.expiration,
            })
            .collect()
    }

    pub fn column(&self, feature: Feature) -> Vec<Option<f64>> {
        self.rows.iter().map(|r| r.value(feature)).collect()
    }
}

/// Breath-wise depth, timing and velocity.
///
/// Onsets come from [`extract_onsets`]. Depth is read from the signal
/// normalised with `scaling`, or from the input itself when `filtered`.
pub fn breath_features(ts: &TimeSeries, scaling: Scaling, filtered: bool) -> Result<BreathFeatures> {
    let breaths = extract_onsets(ts, filtered)?;
    let filt = if filtered {
        ts.clone()
    } else {
        normalize_filter(ts, scaling)?
    };
    rows_from_onsets(&breaths, &filt)
}

/// [`breath_features`] for every channel of a recording.
pub fn breath_features_recording(
    rec: &Recording,
    scaling: Scaling,
    filtered: bool,
) -> PerChannel<BreathFeatures> {
    rec.map_channels(|ts| breath_features(ts, scaling, filtered))
}

fn rows_from_onsets(breaths: &Breaths, filt: &TimeSeries) -> Result<BreathFeatures> {
    let level = |t: f64| {
        filt.value_at(t)
            .filter(|v| !v.is_nan())
            .ok_or_else(|| RespError::DegenerateSignal(format!("no sample at onset {t}")))
    };
    let rows = breaths
        .iter()
        .enumerate()
        .map(|(i, (ins, ex))| {
            let depth = level(ex)? - level(ins)?;
            let next = breaths.inspirations.get(i + 1).copied();
            Ok(BreathRow::new(ins, ex, next, depth))
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(BreathFeatures { rows })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detectors::breath::tests::{sine_breathing, two_breaths};

    fn assert_close(a: f64, b: f64, tol: f64) {
        assert!((a - b).abs() <= tol, "{a} vs {b}");
    }

    #[test]
    fn period_is_inspiration_plus_expiration() {
        let ts = sine_breathing(50.0, 60.0, 0.25);
        let table = breath_features(&ts, Scaling::Auto, false).unwrap();
        let (last, rest) = table.rows.split_last().unwrap();
        for row in rest {
            assert_eq!(row.status, BreathStatus::Complete);
            let period = row.period_t.unwrap();
            assert_close(period, row.insp_t + row.exp_t.unwrap(), 1e-9);
            assert_close(period, 4.0, 0.1);
            assert!(row.depth > 0.0);
        }
        assert_eq!(last.status, BreathStatus::Last);
        assert_eq!(last.period_t, None);
        assert_eq!(last.exp_v, None);
    }

    #[test]
    fn two_breaths_show_passive_expiration() {
        let table = breath_features(&two_breaths(), Scaling::Auto, false).unwrap();
        assert_eq!(table.len(), 2);
        assert!(table.rows.iter().all(|r| r.depth > 0.0));
        let first = &table.rows[0];
        assert!(first.insp_t < first.exp_t.unwrap());
        assert!(first.ie_ratio.unwrap() < 1.0);
        assert_close(first.insp_v, first.depth / first.insp_t, 1e-12);
    }

    #[test]
    fn depth_follows_scaling() {
        let ts = sine_breathing(50.0, 60.0, 0.25);
        let one = breath_features(&ts, Scaling::Preserve, false).unwrap();
        let three = breath_features(&ts, Scaling::Factor(3.0), false).unwrap();
        assert_eq!(one.onsets(OnsetAnchor::Inspiration), three.onsets(OnsetAnchor::Inspiration));
        for (a, b) in one.rows.iter().zip(&three.rows) {
            assert_close(3.0 * a.depth, b.depth, 1e-9);
            assert_close(a.insp_t, b.insp_t, 0.0);
        }
    }

    #[test]
    fn zero_length_expiration_is_degenerate() {
        let row = BreathRow::new(1.0, 2.0, Some(2.0), 0.5);
        assert_eq!(row.status, BreathStatus::Degenerate);
        assert_eq!(row.exp_t, Some(0.0));
        assert_eq!(row.ie_ratio, None);
        assert_eq!(row.exp_v, None);
        assert_eq!(row.value(Feature::InspV), Some(0.5));
    }

    #[test]
    fn anchors_follow_feature_kind() {
        let expiration: Vec<_> = Feature::ALL
            .iter()
            .filter(|f| f.anchor() == OnsetAnchor::Expiration)
            .map(|f| f.name())
            .collect();
        assert_eq!(expiration, vec!["Exp_T", "Exp_V"]);
        assert_eq!(Feature::IeRatio.anchor(), OnsetAnchor::Inspiration);
    }

    #[test]
    fn rows_serialise_with_column_names() {
        let row = BreathRow::new(1.0, 2.0, None, 0.5);
        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["Insp_T"], 1.0);
        assert!(json["Period_T"].is_null());
        assert_eq!(json["status"], "last");
    }
}

use crate::config::{AnalysisConfig, Scaling};
use crate::dsp::normalize::normalize_filter;
use crate::error::Result;
use crate::metrics::breath::{breath_features, BreathFeatures, Feature, OnsetAnchor};
use crate::signal::{PerChannel, Recording, TimeSeries};
use serde::{Deserialize, Serialize};

/// A breath-wise feature spread over the sample index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureColumn {
    pub feature: Feature,
    pub anchor: OnsetAnchor,
    pub values: Vec<Option<f64>>,
}

/// Sample-aligned signal and feature channels. Every vector has one entry
/// per timestamp of the input; `None` marks a gap or an undefined value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContinuousFeatures {
    pub times: Vec<f64>,
    /// De-meaned input, absent when the input was already filtered.
    pub raw: Option<Vec<Option<f64>>>,
    /// Band-passed signal in input units, regardless of the feature scaling.
    pub filt: Vec<Option<f64>>,
    pub columns: Vec<FeatureColumn>,
}

impl ContinuousFeatures {
    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    pub fn column(&self, feature: Feature) -> Option<&[Option<f64>]> {
        self.columns
            .iter()
            .find(|c| c.feature == feature)
            .map(|c| c.values.as_slice())
    }

    /// Output columns in order: `Raw` (if present), `Filt`, then features.
    pub fn named_columns(&self) -> Vec<(&'static str, &[Option<f64>])> {
        let mut out = Vec::with_capacity(self.columns.len() + 2);
        if let Some(raw) = &self.raw {
            out.push(("Raw", raw.as_slice()));
        }
        out.push(("Filt", self.filt.as_slice()));
        out.extend(
            self.columns
                .iter()
                .map(|c| (c.feature.name(), c.values.as_slice())),
        );
        out
    }

    pub fn column_names(&self) -> Vec<&'static str> {
        self.named_columns().into_iter().map(|(name, _)| name).collect()
    }
}

/// Breath-wise features held over the sample index.
///
/// Each feature is interpolated from its anchor onsets (inspiration, or
/// expiration for `Exp_T` / `Exp_V`) with the configured interpolator. With
/// the default `previous` kind a value holds from its onset until the next
/// one, so the table reproduces [`breath_features`] exactly at the onsets.
pub fn continuous_features(ts: &TimeSeries, cfg: &AnalysisConfig) -> Result<ContinuousFeatures> {
    let table = breath_features(ts, cfg.scaling, cfg.filtered)?;
    let demeaned = ts.demeaned();
    let (raw, filt) = if cfg.filtered {
        (None, demeaned)
    } else {
        let filt = normalize_filter(ts, Scaling::Preserve)?;
        (Some(present(&demeaned.values)), filt)
    };
    let columns = spread(&table, &ts.times, cfg)?;
    Ok(ContinuousFeatures {
        times: ts.times.clone(),
        raw,
        filt: filt.reindex(&ts.times),
        columns,
    })
}

/// [`continuous_features`] for every channel of a recording.
pub fn continuous_features_recording(
    rec: &Recording,
    cfg: &AnalysisConfig,
) -> PerChannel<ContinuousFeatures> {
    rec.map_channels(|ts| continuous_features(ts, cfg))
}

fn spread(table: &BreathFeatures, times: &[f64], cfg: &AnalysisConfig) -> Result<Vec<FeatureColumn>> {
    let interpolator = cfg.interpolator();
    Feature::ALL
        .iter()
        .map(|&feature| {
            let anchor = feature.anchor();
            let knots = table.onsets(anchor);
            let values: Vec<f64> = table
                .column(feature)
                .into_iter()
                .map(|v| v.unwrap_or(f64::NAN))
                .collect();
            let interpolant = interpolator.fit(&knots, &values)?;
            Ok(FeatureColumn {
                feature,
                anchor,
                values: present(&interpolant.eval_many(times)?),
            })
        })
        .collect()
}

fn present(values: &[f64]) -> Vec<Option<f64>> {
    values
        .iter()
        .map(|&v| if v.is_nan() { None } else { Some(v) })
        .collect()
}

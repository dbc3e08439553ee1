pub mod breath;
pub mod continuous;

pub use breath::{
    breath_features, breath_features_recording, BreathFeatures, BreathRow, BreathStatus, Feature,
    OnsetAnchor,
};
pub use continuous::{
    continuous_features, continuous_features_recording, ContinuousFeatures, FeatureColumn,
};

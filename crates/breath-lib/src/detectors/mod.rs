pub mod breath;
pub mod intervals;

pub use breath::{extract_onsets, extract_onsets_recording, Breaths};

//! Interval-list passes used by the onset detector.
//!
//! Each pass takes its inputs by reference and returns a fresh value, so the
//! detector is a straight pipeline: activity mask -> edges -> paired
//! intervals -> validated intervals -> suppressed mask -> edges again.

use serde::{Deserialize, Serialize};

/// Closed time interval `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Interval {
    pub start: f64,
    pub end: f64,
}

impl Interval {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    /// Everything up to and including `end`.
    pub fn until(end: f64) -> Self {
        Self::new(f64::NEG_INFINITY, end)
    }

    pub fn contains(&self, t: f64) -> bool {
        self.start <= t && t <= self.end
    }
}

/// Sample indices where a boolean mask switches on (`rises`) and off
/// (`falls`). The first sample never counts as an edge.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Edges {
    pub rises: Vec<usize>,
    pub falls: Vec<usize>,
}

pub fn edges(mask: &[bool]) -> Edges {
    let mut out = Edges::default();
    for (i, w) in mask.windows(2).enumerate() {
        match (w[0], w[1]) {
            (false, true) => out.rises.push(i + 1),
            (true, false) => out.falls.push(i + 1),
            _ => {}
        }
    }
    out
}

/// Start/end times paired into intervals.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pairing {
    pub intervals: Vec<Interval>,
    /// Set when the first end preceded the first start: the run that was
    /// already active at the beginning of the record, ending here.
    pub leading_cut: Option<f64>,
}

/// Pair starts with ends in order. An end that comes before the first start
/// closes an incomplete leading run and is dropped; unmatched trailing
/// starts or ends are dropped as well.
pub fn pair_edges(starts: &[f64], ends: &[f64]) -> Pairing {
    let (leading_cut, ends) = match (starts.first(), ends.first()) {
        (Some(&first_start), Some(&first_end)) if first_end < first_start => {
            (Some(first_end), &ends[1..])
        }
        _ => (None, ends),
    };
    let intervals = starts
        .iter()
        .zip(ends)
        .map(|(&s, &e)| Interval::new(s, e))
        .collect();
    Pairing {
        intervals,
        leading_cut,
    }
}

/// Split `intervals` into those containing at least one of `marks` and those
/// that contain none. Marks at or before the first interval start are
/// ignored.
pub fn partition_by_marks(intervals: &[Interval], marks: &[f64]) -> (Vec<Interval>, Vec<Interval>) {
    let Some(first) = intervals.first() else {
        return (Vec::new(), Vec::new());
    };
    let marks: Vec<f64> = marks.iter().copied().filter(|&m| m > first.start).collect();
    intervals
        .iter()
        .partition(|iv| marks.iter().any(|&m| iv.contains(m)))
}

/// Copy of `mask` switched off at every sample whose time lies in one of
/// `cuts`.
pub fn suppress(mask: &[bool], times: &[f64], cuts: &[Interval]) -> Vec<bool> {
    mask.iter()
        .zip(times)
        .map(|(&on, &t)| on && !cuts.iter().any(|cut| cut.contains(t)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edges_skip_the_first_sample() {
        let mask = [true, true, false, true, true, false, false, true];
        let e = edges(&mask);
        assert_eq!(e.rises, vec![3, 7]);
        assert_eq!(e.falls, vec![2, 5]);
        assert_eq!(edges(&[]), Edges::default());
    }

    #[test]
    fn leading_end_is_cut() {
        let p = pair_edges(&[3.0, 7.0], &[2.0, 5.0]);
        assert_eq!(p.leading_cut, Some(2.0));
        assert_eq!(p.intervals, vec![Interval::new(3.0, 5.0)]);
    }

    #[test]
    fn trailing_start_is_dropped() {
        let p = pair_edges(&[1.0, 4.0, 8.0], &[2.0, 6.0]);
        assert_eq!(p.leading_cut, None);
        assert_eq!(
            p.intervals,
            vec![Interval::new(1.0, 2.0), Interval::new(4.0, 6.0)]
        );
    }

    #[test]
    fn empty_inputs_pair_to_nothing() {
        assert!(pair_edges(&[], &[1.0]).intervals.is_empty());
        assert!(pair_edges(&[1.0], &[]).intervals.is_empty());
    }

    #[test]
    fn intervals_without_marks_are_rejected() {
        let ivs = [
            Interval::new(1.0, 2.0),
            Interval::new(4.0, 6.0),
            Interval::new(8.0, 9.0),
        ];
        let (kept, rejected) = partition_by_marks(&ivs, &[0.5, 1.0, 6.0, 8.5]);
        assert_eq!(kept, vec![ivs[1], ivs[2]]);
        assert_eq!(rejected, vec![ivs[0]]);
    }

    #[test]
    fn suppress_is_inclusive() {
        let times = [0.0, 1.0, 2.0, 3.0, 4.0];
        let mask = [true; 5];
        let out = suppress(&mask, &times, &[Interval::new(1.0, 2.0), Interval::until(0.0)]);
        assert_eq!(out, vec![false, false, false, true, true]);
        assert_eq!(mask, [true; 5]);
    }
}

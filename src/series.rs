//! Rolling plot series segmented by the PHY that was active per sample.
//!
//! The telemetry plots advance by one sample per plot interval and show a
//! fixed number of samples, so the series is a bounded ring of values tagged
//! with a segment id (the active PHY index at sampling time). Rendering
//! yields one point run per contiguous segment, with each run's first point
//! replicated from the previous run so the drawn line has no gaps at
//! protocol switches.
//!
//! X-coordinates are sample ages in plot intervals: the newest sample sits at
//! `x = 0`, its predecessor at `x = -1`, and so on.

use std::collections::VecDeque;

/// Bounded rolling series of `(value, segment id)` samples.
#[derive(Debug, Clone)]
pub struct SegmentedSeries {
    capacity: usize,
    samples: VecDeque<(f64, u8)>,
}

impl SegmentedSeries {
    /// `capacity` is the number of displayed samples (plot window length).
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0);
        Self {
            capacity,
            samples: VecDeque::with_capacity(capacity),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Most recent value, if any.
    pub fn last(&self) -> Option<f64> {
        self.samples.back().map(|&(v, _)| v)
    }

    /// Append a sample, evicting the oldest one once at capacity.
    pub fn push(&mut self, value: f64, segment: u8) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back((value, segment));
    }

    /// Contiguous same-segment runs as plottable point lists.
    ///
    /// Each run after the first starts with a copy of the previous run's last
    /// point, so consecutive runs share a vertex.
    pub fn segments(&self) -> Vec<(u8, Vec<[f64; 2]>)> {
        let mut runs: Vec<(u8, Vec<[f64; 2]>)> = Vec::new();
        let newest = self.samples.len() as f64 - 1.0;
        for (i, &(value, segment)) in self.samples.iter().enumerate() {
            let point = [i as f64 - newest, value];
            match runs.last_mut() {
                Some((seg, run)) if *seg == segment => run.push(point),
                _ => {
                    let mut run = Vec::new();
                    if let Some((_, prev)) = runs.last() {
                        if let Some(&last) = prev.last() {
                            run.push(last);
                        }
                    }
                    run.push(point);
                    runs.push((segment, run));
                }
            }
        }
        runs
    }

    /// Oldest displayed x-coordinate (left plot edge).
    pub fn x_min(&self) -> f64 {
        -(self.capacity as f64 - 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn newest_sample_is_at_x_zero() {
        let mut s = SegmentedSeries::new(4);
        s.push(1.0, 0);
        s.push(2.0, 0);
        s.push(3.0, 0);
        let runs = s.segments();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].1, vec![[-2.0, 1.0], [-1.0, 2.0], [0.0, 3.0]]);
    }

    #[test]
    fn capacity_evicts_oldest() {
        let mut s = SegmentedSeries::new(3);
        for v in 0..5 {
            s.push(v as f64, 0);
        }
        assert_eq!(s.len(), 3);
        let runs = s.segments();
        assert_eq!(runs[0].1, vec![[-2.0, 2.0], [-1.0, 3.0], [0.0, 4.0]]);
    }

    #[test]
    fn segment_change_replicates_joint_point() {
        let mut s = SegmentedSeries::new(8);
        s.push(0.9, 0);
        s.push(0.8, 0);
        s.push(0.4, 1);
        s.push(0.5, 1);
        let runs = s.segments();
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].0, 0);
        assert_eq!(runs[1].0, 1);
        // The second run starts where the first one ended.
        assert_eq!(runs[0].1.last().unwrap(), &[-2.0, 0.8]);
        assert_eq!(runs[1].1, vec![[-2.0, 0.8], [-1.0, 0.4], [0.0, 0.5]]);
    }

    #[test]
    fn segment_can_reappear() {
        let mut s = SegmentedSeries::new(8);
        s.push(1.0, 0);
        s.push(2.0, 1);
        s.push(3.0, 0);
        let runs = s.segments();
        assert_eq!(runs.len(), 3);
        assert_eq!(runs[0].0, 0);
        assert_eq!(runs[1].0, 1);
        assert_eq!(runs[2].0, 0);
    }

    #[test]
    fn last_and_bounds() {
        let mut s = SegmentedSeries::new(120);
        assert!(s.last().is_none());
        s.push(7.5, 0);
        assert_eq!(s.last(), Some(7.5));
        assert_eq!(s.x_min(), -119.0);
    }
}

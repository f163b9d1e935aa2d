//! Throughput sample statistics
//!
//! The load generator optionally reports one throughput sample per
//! interval of the measurement window. `RateStats` folds those samples
//! into the min/avg/max line shown in the report.

/// Min/avg/max over the per-interval throughput samples of one run
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RateStats {
    pub min: f64,
    pub max: f64,
    pub avg: f64,
    /// Finite samples that contributed to the fold
    pub count: usize,
}

impl RateStats {
    /// Fold a run's throughput samples, ignoring NaN and infinities.
    pub fn from_samples(samples: &[f64]) -> Self {
        let mut stats = Self::default();
        let mut sum = 0.0;
        for &sample in samples {
            if !sample.is_finite() {
                continue;
            }
            if stats.count == 0 || sample < stats.min {
                stats.min = sample;
            }
            if stats.count == 0 || sample > stats.max {
                stats.max = sample;
            }
            sum += sample;
            stats.count += 1;
        }
        if stats.count > 0 {
            stats.avg = sum / stats.count as f64;
        }
        stats
    }

    /// True when no finite samples were seen
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_stats() {
        let stats = RateStats::from_samples(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(stats.min, 1.0);
        assert_eq!(stats.max, 5.0);
        assert_eq!(stats.avg, 3.0);
        assert_eq!(stats.count, 5);
    }

    #[test]
    fn test_filters_non_finite() {
        let stats = RateStats::from_samples(&[1.0, f64::NAN, 3.0, f64::INFINITY]);
        assert_eq!(stats.count, 2);
        assert_eq!(stats.avg, 2.0);
    }

    #[test]
    fn test_single_sample_collapses() {
        let stats = RateStats::from_samples(&[4200.0]);
        assert_eq!(stats.min, 4200.0);
        assert_eq!(stats.max, 4200.0);
        assert_eq!(stats.avg, 4200.0);
        assert_eq!(stats.count, 1);
    }

    #[test]
    fn test_empty() {
        let stats = RateStats::from_samples(&[]);
        assert!(stats.is_empty());
        assert_eq!(stats, RateStats::default());
    }
}

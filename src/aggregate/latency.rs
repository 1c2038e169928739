use std::collections::VecDeque;

/// Number of accepted samples kept in the rolling window.
pub const LATENCY_SMOOTH: usize = 5;
/// Delays above this are treated as replayed history, not network latency.
pub const LATENCY_OUTLIER_MS: i64 = 1_000;

/// Smoothed feed latency over the last few accepted samples.
#[derive(Debug, Clone)]
pub struct LatencyEstimator {
    window: VecDeque<i64>,
    capacity: usize,
    outlier_ms: i64,
    average: i64,
}

impl Default for LatencyEstimator {
    fn default() -> Self {
        Self::new(LATENCY_SMOOTH, LATENCY_OUTLIER_MS)
    }
}

impl LatencyEstimator {
    pub fn new(capacity: usize, outlier_ms: i64) -> Self {
        assert!(capacity > 0, "latency window must be > 0");
        Self {
            window: VecDeque::with_capacity(capacity),
            capacity,
            outlier_ms,
            average: 0,
        }
    }

    /// Feed one observed delay, returning the latency to pad the boundary with.
    ///
    /// Outliers return 0 and leave the window untouched.
    pub fn update(&mut self, observed_delay_ms: i64) -> i64 {
        if observed_delay_ms > self.outlier_ms {
            tracing::trace!(delay_ms = observed_delay_ms, "Ignoring latency outlier");
            return 0;
        }

        if self.window.len() == self.capacity {
            self.window.pop_front();
        }
        self.window.push_back(observed_delay_ms);

        let sum: i128 = self.window.iter().map(|&d| i128::from(d)).sum();
        self.average = (sum as f64 / self.window.len() as f64).round() as i64;
        self.average
    }

    /// Last smoothed value, unaffected by ignored outliers.
    pub fn current(&self) -> i64 {
        self.average
    }
}

//! Metric normalization
//!
//! Rescales raw follower statistics into comparable dimensions:
//! - frequency: hits / distinct leader buys
//! - breadth: distinct tokens / hits
//! - speed: 1.0 up to the speed threshold, falling linearly to 0.0 at the
//!   window edge

use tracing::warn;

use crate::engine::config::EngineConfig;
use crate::engine::types::{FollowerMetrics, NormalizedMetrics};

/// Piecewise-linear speed score of an average delay
pub fn speed_norm(avg_delay: f64, threshold: f64, window: f64) -> f64 {
    if avg_delay <= threshold {
        return 1.0;
    }
    (1.0 - (avg_delay - threshold) / (window - threshold)).max(0.0)
}

/// Rescales follower metrics
#[derive(Debug, Clone)]
pub struct MetricNormalizer {
    threshold: f64,
    window: f64,
}

impl MetricNormalizer {
    /// `config` must already have passed [`EngineConfig::validate`], which
    /// keeps the speed denominator positive.
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            threshold: config.speed_threshold_slots,
            window: config.window_slots as f64,
        }
    }

    pub fn speed(&self, avg_delay: f64) -> f64 {
        speed_norm(avg_delay, self.threshold, self.window)
    }

    /// Normalize against the number of distinct leader buys in the same
    /// cleaned set the metrics came from.
    ///
    /// Zero leader buys or zero-hit rows are insufficient data and yield no
    /// output rather than an error.
    pub fn normalize(
        &self,
        metrics: Vec<FollowerMetrics>,
        total_lead_buys: usize,
    ) -> Vec<NormalizedMetrics> {
        if total_lead_buys == 0 {
            if !metrics.is_empty() {
                warn!(
                    followers = metrics.len(),
                    "No leader activity in cleaned set, skipping normalization"
                );
            }
            return Vec::new();
        }

        metrics
            .into_iter()
            .filter_map(|m| {
                if m.hits == 0 {
                    warn!(address = %m.address, "Follower with zero hits, skipping");
                    return None;
                }
                let freq_norm = m.hits as f64 / total_lead_buys as f64;
                let breadth_norm = m.breadth as f64 / m.hits as f64;
                let speed_norm = self.speed(m.avg_delay);
                Some(NormalizedMetrics {
                    metrics: m,
                    freq_norm,
                    breadth_norm,
                    speed_norm,
                })
            })
            .collect()
    }
}

//! Follower scoring and tiering
//!
//! Score formula (default weights):
//! - Frequency (60%): share of the leader's buys the follower copied
//! - Speed (30%): how quickly it copied
//! - Breadth (10%): how many different tokens it copied

use std::cmp::Ordering;

use crate::engine::config::{EngineConfig, ScoreWeights, TierBoundaries};
use crate::engine::types::{FollowerScore, NormalizedMetrics, Tier};

impl TierBoundaries {
    /// Map a score to its tier, checking the highest boundary first
    pub fn classify(&self, score: f64) -> Tier {
        if score >= self.gold {
            Tier::Gold
        } else if score >= self.silver {
            Tier::Silver
        } else if score >= self.bronze {
            Tier::Bronze
        } else {
            Tier::Unranked
        }
    }
}

/// Order by score descending, address ascending on ties
pub fn rank_order(a: &FollowerScore, b: &FollowerScore) -> Ordering {
    b.score
        .partial_cmp(&a.score)
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.address().cmp(b.address()))
}

/// Combines normalized metrics into a score and tier
#[derive(Debug, Clone)]
pub struct Scorer {
    weights: ScoreWeights,
    tiers: TierBoundaries,
}

impl Scorer {
    /// Expects a config that passed [`EngineConfig::validate`]
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            weights: config.weights,
            tiers: config.tiers,
        }
    }

    /// Weighted sum of the three dimensions
    pub fn composite(&self, freq_norm: f64, speed_norm: f64, breadth_norm: f64) -> f64 {
        self.weights.frequency * freq_norm
            + self.weights.speed * speed_norm
            + self.weights.breadth * breadth_norm
    }

    pub fn tier(&self, score: f64) -> Tier {
        self.tiers.classify(score)
    }

    pub fn score_one(&self, n: NormalizedMetrics) -> FollowerScore {
        let score = self.composite(n.freq_norm, n.speed_norm, n.breadth_norm);
        FollowerScore {
            metrics: n.metrics,
            freq_norm: n.freq_norm,
            breadth_norm: n.breadth_norm,
            speed_norm: n.speed_norm,
            score,
            tier: self.tier(score),
        }
    }

    /// Score all followers, best first
    pub fn score(&self, normalized: Vec<NormalizedMetrics>) -> Vec<FollowerScore> {
        let mut scores: Vec<FollowerScore> =
            normalized.into_iter().map(|n| self.score_one(n)).collect();
        scores.sort_by(rank_order);
        scores
    }
}

//! Engine parameters
//!
//! Every stage of the copy-trade engine reads its constants from an
//! [`EngineConfig`] passed in at construction. Two parameter sets have been
//! used in practice; the current one is the default and the older one is
//! available through [`EngineConfig::legacy`].

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Maximum slot delay for a follower buy to count as a copy
pub const WINDOW_SLOTS: i64 = 10;

/// Average delay at or below which speed scores a full 1.0
pub const SPEED_THRESHOLD_SLOTS: f64 = 4.0;

/// Speed threshold of the earlier scoring runs
pub const LEGACY_SPEED_THRESHOLD_SLOTS: f64 = 3.0;

/// Minimum cleaned trades for a follower to be scored
pub const MIN_HITS: u32 = 3;

/// Gold tier lower bound
pub const GOLD_BOUNDARY: f64 = 0.75;

/// Gold tier lower bound of the earlier scoring runs
pub const LEGACY_GOLD_BOUNDARY: f64 = 0.8;

/// Silver tier lower bound
pub const SILVER_BOUNDARY: f64 = 0.5;

/// Bronze tier lower bound
pub const BRONZE_BOUNDARY: f64 = 0.3;

/// How repeated (follower, leader buy) rows count toward `hits`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HitCounting {
    /// Collapse duplicate (follower, leader signature) rows, keeping the
    /// fastest one. Keeps `freq_norm` within [0, 1].
    #[default]
    DistinctLeadBuys,
    /// Count every matched row, duplicates included
    Rows,
}

/// Weights of the composite score (must sum to 1.0)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreWeights {
    #[serde(default = "default_weight_frequency")]
    pub frequency: f64,
    #[serde(default = "default_weight_speed")]
    pub speed: f64,
    #[serde(default = "default_weight_breadth")]
    pub breadth: f64,
}

fn default_weight_frequency() -> f64 {
    0.6
}
fn default_weight_speed() -> f64 {
    0.3
}
fn default_weight_breadth() -> f64 {
    0.1
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            frequency: default_weight_frequency(),
            speed: default_weight_speed(),
            breadth: default_weight_breadth(),
        }
    }
}

impl ScoreWeights {
    pub fn sum(&self) -> f64 {
        self.frequency + self.speed + self.breadth
    }
}

/// Lower bounds of each reputation tier, checked highest first
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TierBoundaries {
    #[serde(default = "default_gold")]
    pub gold: f64,
    #[serde(default = "default_silver")]
    pub silver: f64,
    #[serde(default = "default_bronze")]
    pub bronze: f64,
}

fn default_gold() -> f64 {
    GOLD_BOUNDARY
}
fn default_silver() -> f64 {
    SILVER_BOUNDARY
}
fn default_bronze() -> f64 {
    BRONZE_BOUNDARY
}

impl Default for TierBoundaries {
    fn default() -> Self {
        Self {
            gold: default_gold(),
            silver: default_silver(),
            bronze: default_bronze(),
        }
    }
}

/// Configuration for the copy-trade engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Maximum delay (slots) between leader and follower buy
    #[serde(default = "default_window_slots")]
    pub window_slots: i64,

    /// Average delay (slots) up to which speed is not penalised
    #[serde(default = "default_speed_threshold_slots")]
    pub speed_threshold_slots: f64,

    /// Followers with fewer hits are dropped before scoring
    #[serde(default = "default_min_hits")]
    pub min_hits: u32,

    #[serde(default)]
    pub weights: ScoreWeights,

    #[serde(default)]
    pub tiers: TierBoundaries,

    #[serde(default)]
    pub hit_counting: HitCounting,

    /// Drop swaps made by the tracked wallet itself
    #[serde(default = "default_true")]
    pub exclude_leader: bool,
}

fn default_window_slots() -> i64 {
    WINDOW_SLOTS
}
fn default_speed_threshold_slots() -> f64 {
    SPEED_THRESHOLD_SLOTS
}
fn default_min_hits() -> u32 {
    MIN_HITS
}
fn default_true() -> bool {
    true
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            window_slots: default_window_slots(),
            speed_threshold_slots: default_speed_threshold_slots(),
            min_hits: default_min_hits(),
            weights: ScoreWeights::default(),
            tiers: TierBoundaries::default(),
            hit_counting: HitCounting::default(),
            exclude_leader: true,
        }
    }
}

impl EngineConfig {
    /// Parameters of the earlier scoring runs (T1 = 3, Gold = 0.8)
    pub fn legacy() -> Self {
        Self {
            speed_threshold_slots: LEGACY_SPEED_THRESHOLD_SLOTS,
            tiers: TierBoundaries {
                gold: LEGACY_GOLD_BOUNDARY,
                ..TierBoundaries::default()
            },
            ..Self::default()
        }
    }

    /// Refuse parameter sets that would make scores meaningless
    pub fn validate(&self) -> Result<()> {
        if self.window_slots <= 0 {
            return Err(Error::InvalidEngineConfig(format!(
                "window_slots must be positive, got {}",
                self.window_slots
            )));
        }

        if !self.speed_threshold_slots.is_finite() || self.speed_threshold_slots < 0.0 {
            return Err(Error::InvalidEngineConfig(format!(
                "speed_threshold_slots must be a non-negative number, got {}",
                self.speed_threshold_slots
            )));
        }

        // speed_norm divides by (window - t1)
        if self.window_slots as f64 <= self.speed_threshold_slots {
            return Err(Error::InvalidEngineConfig(format!(
                "window_slots ({}) must exceed speed_threshold_slots ({})",
                self.window_slots, self.speed_threshold_slots
            )));
        }

        if self.min_hits == 0 {
            return Err(Error::InvalidEngineConfig(
                "min_hits must be at least 1".to_string(),
            ));
        }

        let w = &self.weights;
        for (name, value) in [
            ("frequency", w.frequency),
            ("speed", w.speed),
            ("breadth", w.breadth),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(Error::InvalidEngineConfig(format!(
                    "weight {} must be within [0, 1], got {}",
                    name, value
                )));
            }
        }
        if (w.sum() - 1.0).abs() > 1e-6 {
            return Err(Error::InvalidEngineConfig(format!(
                "weights must sum to 1.0, got {:.6}",
                w.sum()
            )));
        }

        let t = &self.tiers;
        if !(t.gold > t.silver && t.silver > t.bronze && t.bronze >= 0.0) {
            return Err(Error::InvalidEngineConfig(format!(
                "tier boundaries must satisfy gold > silver > bronze >= 0, got {} / {} / {}",
                t.gold, t.silver, t.bronze
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.window_slots, 10);
        assert_eq!(config.speed_threshold_slots, 4.0);
        assert_eq!(config.tiers.gold, 0.75);
        assert_eq!(config.hit_counting, HitCounting::DistinctLeadBuys);
    }

    #[test]
    fn test_legacy_parameters() {
        let config = EngineConfig::legacy();
        assert!(config.validate().is_ok());
        assert_eq!(config.speed_threshold_slots, 3.0);
        assert_eq!(config.tiers.gold, 0.8);
        assert_eq!(config.tiers.silver, 0.5);
    }

    #[test]
    fn test_window_must_exceed_threshold() {
        let config = EngineConfig {
            window_slots: 4,
            speed_threshold_slots: 4.0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(Error::InvalidEngineConfig(_))
        ));

        let config = EngineConfig {
            window_slots: 0,
            speed_threshold_slots: 0.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_weights_must_sum_to_one() {
        let config = EngineConfig {
            weights: ScoreWeights {
                frequency: 0.6,
                speed: 0.3,
                breadth: 0.2,
            },
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_tiers_must_descend() {
        let config = EngineConfig {
            tiers: TierBoundaries {
                gold: 0.5,
                silver: 0.5,
                bronze: 0.3,
            },
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_deserialize_uses_defaults() {
        let json = r#"{"window_slots": 12, "hit_counting": "rows", "tiers": {"gold": 0.8}}"#;
        let config: EngineConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.window_slots, 12);
        assert_eq!(config.hit_counting, HitCounting::Rows);
        assert_eq!(config.tiers.gold, 0.8);
        assert_eq!(config.tiers.silver, 0.5);
        assert!(config.exclude_leader);
        assert!(config.validate().is_ok());
    }
}

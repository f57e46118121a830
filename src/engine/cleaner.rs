//! Trade cleaning
//!
//! Keeps only candidates that can be a genuine copy: the follower bought at
//! or after the leader's slot and no later than the configured window.

use tracing::debug;

use crate::engine::config::EngineConfig;
use crate::engine::types::{CleanedCopyTrade, CopyTradeCandidate};

/// Why a candidate was dropped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// Follower slot before the leader's
    FrontRun,
    /// Delay beyond the window
    OutsideWindow,
    /// The tracked wallet's own swap
    SelfMatch,
}

/// Counts of dropped candidates by reason
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleaningStats {
    pub kept: usize,
    pub front_run: usize,
    pub outside_window: usize,
    pub self_match: usize,
}

impl CleaningStats {
    pub fn dropped(&self) -> usize {
        self.front_run + self.outside_window + self.self_match
    }
}

/// Filters candidates down to plausible copies
#[derive(Debug, Clone)]
pub struct TradeCleaner {
    window_slots: i64,
    leader: Option<String>,
}

impl TradeCleaner {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            window_slots: config.window_slots,
            leader: None,
        }
    }

    /// Drop the tracked wallet's own swaps when `exclude_leader` is set
    pub fn with_leader(mut self, config: &EngineConfig, leader: impl Into<String>) -> Self {
        if config.exclude_leader {
            self.leader = Some(leader.into());
        }
        self
    }

    /// Classify a candidate; `None` means keep
    pub fn check(&self, candidate: &CopyTradeCandidate) -> Option<Rejection> {
        if candidate.delay_slots < 0 {
            return Some(Rejection::FrontRun);
        }
        if candidate.delay_slots > self.window_slots {
            return Some(Rejection::OutsideWindow);
        }
        if self.leader.as_deref() == Some(candidate.follower_address.as_str()) {
            return Some(Rejection::SelfMatch);
        }
        None
    }

    /// Filter candidates, preserving input order
    pub fn clean(&self, candidates: Vec<CopyTradeCandidate>) -> Vec<CleanedCopyTrade> {
        self.clean_with_stats(candidates).0
    }

    pub fn clean_with_stats(
        &self,
        candidates: Vec<CopyTradeCandidate>,
    ) -> (Vec<CleanedCopyTrade>, CleaningStats) {
        let mut stats = CleaningStats::default();
        let mut cleaned = Vec::with_capacity(candidates.len());

        for candidate in candidates {
            match self.check(&candidate) {
                None => {
                    stats.kept += 1;
                    cleaned.push(CleanedCopyTrade::new(candidate));
                }
                Some(Rejection::FrontRun) => stats.front_run += 1,
                Some(Rejection::OutsideWindow) => stats.outside_window += 1,
                Some(Rejection::SelfMatch) => stats.self_match += 1,
            }
        }

        debug!(
            kept = stats.kept,
            front_run = stats.front_run,
            outside_window = stats.outside_window,
            self_match = stats.self_match,
            "Cleaned copy-trade candidates"
        );

        (cleaned, stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(follower: &str, delay: i64) -> CopyTradeCandidate {
        CopyTradeCandidate {
            leader_signature: "AAAAAAAA".to_string(),
            token_mint: "TOKEN1".to_string(),
            follower_address: follower.to_string(),
            leader_slot: 100,
            follower_slot: (100 + delay) as u64,
            delay_slots: delay,
            timestamp: 1_700_000_000,
        }
    }

    #[test]
    fn test_window_bounds_inclusive() {
        let cleaner = TradeCleaner::new(&EngineConfig::default());
        let cleaned = cleaner.clean(vec![
            candidate("A", 0),
            candidate("B", 10),
            candidate("C", 11),
            candidate("D", 3),
        ]);

        let kept: Vec<_> = cleaned.iter().map(|t| t.follower_address.as_str()).collect();
        assert_eq!(kept, vec!["A", "B", "D"]);
        assert!(cleaned
            .iter()
            .all(|t| t.delay_slots >= 0 && t.delay_slots <= 10));
    }

    #[test]
    fn test_negative_delay_always_dropped() {
        let cleaner = TradeCleaner::new(&EngineConfig::default());
        let (cleaned, stats) = cleaner.clean_with_stats(vec![candidate("X", -2), candidate("Y", -1)]);
        assert!(cleaned.is_empty());
        assert_eq!(stats.front_run, 2);
    }

    #[test]
    fn test_scenario_one_keeps_only_fast_follower() {
        let cleaner = TradeCleaner::new(&EngineConfig::default());
        let cleaned = cleaner.clean(vec![candidate("X", 3), candidate("Y", 15)]);
        assert_eq!(cleaned.len(), 1);
        assert_eq!(cleaned[0].follower_address, "X");
    }

    #[test]
    fn test_leader_self_match() {
        let config = EngineConfig::default();
        let cleaner = TradeCleaner::new(&config).with_leader(&config, "LEADER");
        let (cleaned, stats) =
            cleaner.clean_with_stats(vec![candidate("LEADER", 0), candidate("F", 1)]);
        assert_eq!(cleaned.len(), 1);
        assert_eq!(stats.self_match, 1);
        assert_eq!(stats.dropped(), 1);

        let config = EngineConfig {
            exclude_leader: false,
            ..Default::default()
        };
        let cleaner = TradeCleaner::new(&config).with_leader(&config, "LEADER");
        assert_eq!(cleaner.clean(vec![candidate("LEADER", 0)]).len(), 1);
    }

    #[test]
    fn test_empty_input() {
        let cleaner = TradeCleaner::new(&EngineConfig::default());
        assert!(cleaner.clean(Vec::new()).is_empty());
    }
}

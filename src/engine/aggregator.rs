//! Follower aggregation
//!
//! Groups cleaned trades by follower address into hit count, token breadth
//! and delay statistics. Followers below `min_hits` are dropped.

use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::debug;

use crate::engine::config::{EngineConfig, HitCounting};
use crate::engine::types::{CleanedCopyTrade, FollowerMetrics};

/// Running totals for one follower
#[derive(Debug, Default)]
struct FollowerAccumulator<'a> {
    tokens: HashSet<&'a str>,
    delays: Vec<i64>,
}

impl<'a> FollowerAccumulator<'a> {
    fn push(&mut self, trade: &'a CleanedCopyTrade) {
        self.tokens.insert(trade.token_mint.as_str());
        self.delays.push(trade.delay_slots);
    }

    fn hits(&self) -> u32 {
        self.delays.len() as u32
    }

    fn finish(mut self, address: &str) -> FollowerMetrics {
        let hits = self.delays.len();
        let avg_delay = self.delays.iter().sum::<i64>() as f64 / hits as f64;
        self.delays.sort_unstable();
        FollowerMetrics {
            address: address.to_string(),
            hits: hits as u32,
            breadth: self.tokens.len() as u32,
            avg_delay,
            med_delay: median_sorted(&self.delays),
        }
    }
}

/// Median of sorted values; mean of the middle pair for even counts
fn median_sorted(sorted: &[i64]) -> f64 {
    let n = sorted.len();
    if n == 0 {
        return 0.0;
    }
    if n % 2 == 1 {
        sorted[n / 2] as f64
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) as f64 / 2.0
    }
}

/// Number of distinct leader buys present in a cleaned set
pub fn total_lead_buys(trades: &[CleanedCopyTrade]) -> usize {
    trades
        .iter()
        .map(|t| t.leader_signature.as_str())
        .collect::<HashSet<_>>()
        .len()
}

/// Collapse repeated (follower, leader signature) rows to the fastest one.
///
/// Output keeps the position of each pair's first appearance.
pub fn collapse_duplicates(trades: &[CleanedCopyTrade]) -> Vec<&CleanedCopyTrade> {
    let mut index: HashMap<(&str, &str), usize> = HashMap::new();
    let mut kept: Vec<&CleanedCopyTrade> = Vec::new();

    for trade in trades {
        let key = (trade.follower_address.as_str(), trade.leader_signature.as_str());
        match index.get(&key).copied() {
            Some(i) => {
                if trade.delay_slots < kept[i].delay_slots {
                    kept[i] = trade;
                }
            }
            None => {
                index.insert(key, kept.len());
                kept.push(trade);
            }
        }
    }

    kept
}

/// Groups cleaned trades into per-follower metrics
#[derive(Debug, Clone)]
pub struct FollowerAggregator {
    min_hits: u32,
    hit_counting: HitCounting,
}

impl FollowerAggregator {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            min_hits: config.min_hits,
            hit_counting: config.hit_counting,
        }
    }

    /// Aggregate by follower, ordered by address
    pub fn aggregate(&self, trades: &[CleanedCopyTrade]) -> Vec<FollowerMetrics> {
        let rows: Vec<&CleanedCopyTrade> = match self.hit_counting {
            HitCounting::DistinctLeadBuys => collapse_duplicates(trades),
            HitCounting::Rows => trades.iter().collect(),
        };

        let mut groups: BTreeMap<&str, FollowerAccumulator> = BTreeMap::new();
        for trade in rows {
            groups
                .entry(trade.follower_address.as_str())
                .or_default()
                .push(trade);
        }

        let followers = groups.len();
        let metrics: Vec<FollowerMetrics> = groups
            .into_iter()
            .filter(|(_, acc)| acc.hits() >= self.min_hits)
            .map(|(address, acc)| acc.finish(address))
            .collect();

        debug!(
            followers,
            retained = metrics.len(),
            min_hits = self.min_hits,
            "Aggregated follower metrics"
        );

        metrics
    }
}

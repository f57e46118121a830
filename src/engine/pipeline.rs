//! Copy-trade engine
//!
//! Runs matcher → cleaner → aggregator → normalizer → scorer over one closed
//! batch. The engine holds only validated parameters, so a single instance
//! can be reused across wallets.

use std::cmp::Ordering;
use tracing::{debug, info};

use crate::engine::aggregator::{total_lead_buys, FollowerAggregator};
use crate::engine::cleaner::{CleaningStats, TradeCleaner};
use crate::engine::config::EngineConfig;
use crate::engine::matcher::{match_all, LeaderActivity};
use crate::engine::normalizer::MetricNormalizer;
use crate::engine::scorer::Scorer;
use crate::engine::types::{CleanedCopyTrade, CopyTradeCandidate, FollowerScore, Tier};
use crate::error::Result;

/// Everything one engine run produces
#[derive(Debug, Clone)]
pub struct EngineOutput {
    /// Cleaned trades in presentation order
    pub copy_trades: Vec<CleanedCopyTrade>,
    /// Distinct leader buys in `copy_trades`
    pub total_lead_buys: usize,
    /// Scored followers, best first
    pub followers: Vec<FollowerScore>,
    pub cleaning: CleaningStats,
}

impl EngineOutput {
    /// No leader buy survived cleaning
    pub fn no_leader_activity(&self) -> bool {
        self.total_lead_buys == 0
    }

    pub fn followers_in(&self, tier: Tier) -> impl Iterator<Item = &FollowerScore> {
        self.followers.iter().filter(move |f| f.tier == tier)
    }
}

/// Stable sort by (leader signature, delay ascending)
pub fn sort_for_presentation(trades: &mut [CleanedCopyTrade]) {
    trades.sort_by(|a, b| match a.leader_signature.cmp(&b.leader_signature) {
        Ordering::Equal => a.delay_slots.cmp(&b.delay_slots),
        other => other,
    });
}

/// Copy-trade detection and follower scoring over a batch of leader activity
#[derive(Debug, Clone)]
pub struct CopyTradeEngine {
    config: EngineConfig,
    aggregator: FollowerAggregator,
    normalizer: MetricNormalizer,
    scorer: Scorer,
}

impl CopyTradeEngine {
    /// Refuses invalid parameter sets; the stages are built only from a
    /// config that passed validation.
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            aggregator: FollowerAggregator::new(&config),
            normalizer: MetricNormalizer::new(&config),
            scorer: Scorer::new(&config),
            config,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn cleaner(&self, leader: Option<&str>) -> TradeCleaner {
        let cleaner = TradeCleaner::new(&self.config);
        match leader {
            Some(leader) => cleaner.with_leader(&self.config, leader),
            None => cleaner,
        }
    }

    /// Match and clean, returning trades in presentation order
    pub fn copy_trades(
        &self,
        activity: &[LeaderActivity],
        leader: Option<&str>,
    ) -> (Vec<CleanedCopyTrade>, CleaningStats) {
        let candidates = match_all(activity);
        debug!(
            leader_buys = activity.len(),
            candidates = candidates.len(),
            "Matched leader buys against swaps"
        );

        self.clean(candidates, leader)
    }

    /// Clean candidates from any source, returning presentation order
    pub fn clean(
        &self,
        candidates: Vec<CopyTradeCandidate>,
        leader: Option<&str>,
    ) -> (Vec<CleanedCopyTrade>, CleaningStats) {
        let (mut cleaned, stats) = self.cleaner(leader).clean_with_stats(candidates);
        sort_for_presentation(&mut cleaned);
        (cleaned, stats)
    }

    /// Aggregate, normalize and score an already-cleaned set
    pub fn score_followers(&self, trades: &[CleanedCopyTrade]) -> Vec<FollowerScore> {
        let total = total_lead_buys(trades);
        if total == 0 {
            debug!("No leader activity in cleaned set");
            return Vec::new();
        }

        let metrics = self.aggregator.aggregate(trades);
        if metrics.is_empty() {
            debug!(total_lead_buys = total, "No followers cleared the hit floor");
            return Vec::new();
        }

        let normalized = self.normalizer.normalize(metrics, total);
        self.scorer.score(normalized)
    }

    /// Full run over one batch
    pub fn run(&self, activity: &[LeaderActivity], leader: Option<&str>) -> EngineOutput {
        let (copy_trades, cleaning) = self.copy_trades(activity, leader);
        let total_lead_buys = total_lead_buys(&copy_trades);
        let followers = self.score_followers(&copy_trades);

        info!(
            copy_trades = copy_trades.len(),
            total_lead_buys,
            followers = followers.len(),
            dropped = cleaning.dropped(),
            "Copy-trade analysis complete"
        );

        EngineOutput {
            copy_trades,
            total_lead_buys,
            followers,
            cleaning,
        }
    }
}

//! Copy-trade detection engine
//!
//! Pure batch stages over in-memory collections:
//! extractor → matcher → cleaner → aggregator → normalizer → scorer.
//! No stage performs I/O.

pub mod aggregator;
pub mod cleaner;
pub mod config;
pub mod extractor;
pub mod lookup;
pub mod matcher;
pub mod normalizer;
pub mod pipeline;
pub mod scorer;
pub mod summary;
pub mod types;

pub use aggregator::{total_lead_buys, FollowerAggregator};
pub use cleaner::{CleaningStats, TradeCleaner};
pub use config::{EngineConfig, HitCounting, ScoreWeights, TierBoundaries};
pub use extractor::{Extraction, LeaderBuyExtractor, NON_MEMECOINS};
pub use lookup::{copy_transactions, CopyTransaction, DelayClass};
pub use matcher::{match_all, match_buy, LeaderActivity};
pub use normalizer::{speed_norm, MetricNormalizer};
pub use pipeline::{sort_for_presentation, CopyTradeEngine, EngineOutput};
pub use scorer::Scorer;
pub use summary::{ScoreSummary, TradeSummary};
pub use types::{
    CleanedCopyTrade, CopyTradeCandidate, FollowerMetrics, FollowerScore, LeaderBuyEvent,
    NormalizedMetrics, RecordKind, SkippedRecord, SwapEvent, Tier,
};

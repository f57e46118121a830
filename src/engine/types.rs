//! Records flowing through the copy-trade engine
//!
//! All records are immutable facts or values derived from them. Each stage
//! consumes the previous stage's output and produces a new collection.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Deref;

/// A memecoin purchase made by the tracked wallet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderBuyEvent {
    /// Transaction signature (unique)
    pub signature: String,
    pub token_mint: String,
    pub slot: u64,
    /// Block time, unix seconds
    pub timestamp: i64,
    /// Tokens received
    pub amount: f64,
}

/// One wallet's purchase of a token, as reported by the swap collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwapEvent {
    pub wallet_address: String,
    pub token_mint: String,
    pub slot: u64,
    pub transaction_id: String,
    pub bought_amount: f64,
    pub bought_usd_value: f64,
}

/// Pairing of a leader buy with one swap on the same token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CopyTradeCandidate {
    pub leader_signature: String,
    pub token_mint: String,
    pub follower_address: String,
    pub leader_slot: u64,
    pub follower_slot: u64,
    /// `follower_slot - leader_slot`, negative when the follower was first
    pub delay_slots: i64,
    /// Leader buy time, unix seconds
    pub timestamp: i64,
}

/// A candidate that passed cleaning: `0 <= delay_slots <= window`.
///
/// Only the trade cleaner constructs these.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct CleanedCopyTrade(CopyTradeCandidate);

impl CleanedCopyTrade {
    pub(crate) fn new(candidate: CopyTradeCandidate) -> Self {
        Self(candidate)
    }

    pub fn into_inner(self) -> CopyTradeCandidate {
        self.0
    }
}

impl Deref for CleanedCopyTrade {
    type Target = CopyTradeCandidate;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Per-follower statistics over the cleaned trades
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FollowerMetrics {
    pub address: String,
    pub hits: u32,
    /// Distinct tokens copied
    pub breadth: u32,
    pub avg_delay: f64,
    pub med_delay: f64,
}

/// Follower metrics rescaled to comparable dimensions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedMetrics {
    #[serde(flatten)]
    pub metrics: FollowerMetrics,
    pub freq_norm: f64,
    pub breadth_norm: f64,
    pub speed_norm: f64,
}

/// Final scored follower
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FollowerScore {
    #[serde(flatten)]
    pub metrics: FollowerMetrics,
    pub freq_norm: f64,
    pub breadth_norm: f64,
    pub speed_norm: f64,
    pub score: f64,
    pub tier: Tier,
}

impl FollowerScore {
    pub fn address(&self) -> &str {
        &self.metrics.address
    }
}

/// Reputation bucket derived from the score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Tier {
    Gold,
    Silver,
    Bronze,
    Unranked,
}

impl Tier {
    pub const ALL: [Tier; 4] = [Tier::Gold, Tier::Silver, Tier::Bronze, Tier::Unranked];

    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Gold => "Gold",
            Tier::Silver => "Silver",
            Tier::Bronze => "Bronze",
            Tier::Unranked => "Unranked",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Tier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "gold" => Ok(Tier::Gold),
            "silver" => Ok(Tier::Silver),
            "bronze" => Ok(Tier::Bronze),
            "unranked" => Ok(Tier::Unranked),
            other => Err(format!("unknown tier: {}", other)),
        }
    }
}

/// Kind of input record that was skipped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Transaction,
    Swap,
    LeaderBuy,
}

/// An input record dropped because it could not be decoded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedRecord {
    pub kind: RecordKind,
    /// Signature, file name or index; whatever identifies the record
    pub id: String,
    pub reason: String,
}

impl SkippedRecord {
    pub fn new(kind: RecordKind, id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
            reason: reason.into(),
        }
    }
}

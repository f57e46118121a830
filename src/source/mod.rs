//! External data collaborators
//!
//! The engine never performs I/O. These traits are the seams through which
//! the service collects the leader's raw history and the swaps around each
//! leader buy.

pub mod helius;
pub mod moralis;

use async_trait::async_trait;
use serde_json::Value;

use crate::engine::types::SwapEvent;
use crate::error::Result;

pub use helius::HeliusClient;
pub use moralis::{decode_swaps, MoralisClient, SwapBatch};

/// Source of a wallet's recent raw transactions
#[async_trait]
pub trait TransactionSource: Send + Sync {
    /// Name for logging
    fn name(&self) -> &'static str;

    /// Enhanced transaction records, newest first
    async fn recent_transactions(&self, wallet: &str) -> Result<Vec<Value>>;
}

/// Source of token swaps within a time window
#[async_trait]
pub trait SwapSource: Send + Sync {
    fn name(&self) -> &'static str;

    /// Purchases of `mint` between `from_ts` and `to_ts` (unix seconds)
    async fn swaps_for(&self, mint: &str, from_ts: i64, to_ts: i64) -> Result<SwapBatch>;
}

//! Candidate matching
//!
//! Pairs each leader buy with every swap recorded on the same token in the
//! post-purchase window. No business rules apply here: self-swaps and
//! negative delays still produce candidates and are dealt with by the
//! cleaner.

use crate::engine::types::{CopyTradeCandidate, LeaderBuyEvent, SwapEvent};

/// A leader buy together with the swaps collected for its window
#[derive(Debug, Clone, PartialEq)]
pub struct LeaderActivity {
    pub buy: LeaderBuyEvent,
    pub swaps: Vec<SwapEvent>,
}

impl LeaderActivity {
    pub fn new(buy: LeaderBuyEvent, swaps: Vec<SwapEvent>) -> Self {
        Self { buy, swaps }
    }
}

/// Highest slot the engine accepts; delays are signed 64-bit
pub const MAX_SLOT: u64 = i64::MAX as u64;

/// Slot delay of `follower_slot` relative to `leader_slot`.
///
/// Saturates at the `i64` bounds; such delays fall outside any window.
pub fn delay_slots(leader_slot: u64, follower_slot: u64) -> i64 {
    let delay = follower_slot as i128 - leader_slot as i128;
    delay.clamp(i64::MIN as i128, i64::MAX as i128) as i64
}

/// Pair one leader buy with each of its swaps
pub fn match_buy(buy: &LeaderBuyEvent, swaps: &[SwapEvent]) -> Vec<CopyTradeCandidate> {
    swaps
        .iter()
        .map(|swap| CopyTradeCandidate {
            leader_signature: buy.signature.clone(),
            token_mint: buy.token_mint.clone(),
            follower_address: swap.wallet_address.clone(),
            leader_slot: buy.slot,
            follower_slot: swap.slot,
            delay_slots: delay_slots(buy.slot, swap.slot),
            timestamp: buy.timestamp,
        })
        .collect()
}

/// Match every leader buy; buys without swaps contribute nothing
pub fn match_all(activity: &[LeaderActivity]) -> Vec<CopyTradeCandidate> {
    activity
        .iter()
        .flat_map(|a| match_buy(&a.buy, &a.swaps))
        .collect()
}

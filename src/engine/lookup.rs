//! Per-follower transaction lookup
//!
//! Joins a follower's cleaned copy trades back to the leader buys and swaps
//! they came from, for display. Upstream matching can repeat a
//! (follower, token, leader buy) row; only the first one is returned.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::engine::matcher::LeaderActivity;
use crate::engine::types::{CleanedCopyTrade, LeaderBuyEvent, SwapEvent};

/// Speed label of a single copy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DelayClass {
    VeryFast,
    Fast,
    Average,
    Slow,
}

impl DelayClass {
    pub fn from_delay(delay_slots: i64) -> Self {
        match delay_slots {
            d if d <= 3 => DelayClass::VeryFast,
            d if d <= 6 => DelayClass::Fast,
            d if d <= 10 => DelayClass::Average,
            _ => DelayClass::Slow,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DelayClass::VeryFast => "Very Fast",
            DelayClass::Fast => "Fast",
            DelayClass::Average => "Average",
            DelayClass::Slow => "Slow",
        }
    }
}

impl fmt::Display for DelayClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One side of a copy trade
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeLeg {
    pub slot: u64,
    pub signature: Option<String>,
    pub amount: Option<f64>,
    pub usd_value: Option<f64>,
}

/// A leader buy paired with the follower's copy of it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CopyTransaction {
    pub token_mint: String,
    pub leader: TradeLeg,
    pub follower: TradeLeg,
    pub delay_slots: i64,
    pub delay_class: DelayClass,
    pub timestamp: i64,
}

/// Copy trades of `follower`, in the order of `trades`.
///
/// `activity` supplies amounts and signatures when available; trades whose
/// leader buy is missing from it are still returned with bare slots.
/// `leader_wallet` locates the leader's own swap for its USD value.
pub fn copy_transactions(
    follower: &str,
    trades: &[CleanedCopyTrade],
    activity: &[LeaderActivity],
    leader_wallet: Option<&str>,
) -> Vec<CopyTransaction> {
    let by_signature: HashMap<&str, &LeaderActivity> = activity
        .iter()
        .map(|a| (a.buy.signature.as_str(), a))
        .collect();

    let mut seen: HashSet<(&str, &str, &str)> = HashSet::new();
    let mut out = Vec::new();

    for trade in trades.iter().filter(|t| t.follower_address == follower) {
        let key = (
            trade.follower_address.as_str(),
            trade.token_mint.as_str(),
            trade.leader_signature.as_str(),
        );
        if !seen.insert(key) {
            continue;
        }

        let source = by_signature.get(trade.leader_signature.as_str()).copied();
        let buy = source.map(|a| &a.buy);
        let follower_swap = source.and_then(|a| {
            a.swaps
                .iter()
                .find(|s| s.wallet_address == follower && s.slot == trade.follower_slot)
        });
        let leader_swap = source.zip(leader_wallet).and_then(|(a, wallet)| {
            a.swaps.iter().find(|s| s.wallet_address == wallet)
        });

        out.push(CopyTransaction {
            token_mint: trade.token_mint.clone(),
            leader: leader_leg(trade, buy, leader_swap),
            follower: follower_leg(trade, follower_swap),
            delay_slots: trade.delay_slots,
            delay_class: DelayClass::from_delay(trade.delay_slots),
            timestamp: trade.timestamp,
        });
    }

    out
}

fn leader_leg(
    trade: &CleanedCopyTrade,
    buy: Option<&LeaderBuyEvent>,
    own_swap: Option<&SwapEvent>,
) -> TradeLeg {
    TradeLeg {
        slot: trade.leader_slot,
        signature: Some(trade.leader_signature.clone()),
        amount: buy.map(|b| b.amount),
        usd_value: own_swap.map(|s| s.bought_usd_value),
    }
}

fn follower_leg(trade: &CleanedCopyTrade, swap: Option<&SwapEvent>) -> TradeLeg {
    TradeLeg {
        slot: trade.follower_slot,
        signature: swap.map(|s| s.transaction_id.clone()),
        amount: swap.map(|s| s.bought_amount),
        usd_value: swap.map(|s| s.bought_usd_value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::types::CopyTradeCandidate;

    fn trade(follower: &str, leader_sig: &str, delay: i64) -> CleanedCopyTrade {
        CleanedCopyTrade::new(CopyTradeCandidate {
            leader_signature: leader_sig.to_string(),
            token_mint: "TOKEN1".to_string(),
            follower_address: follower.to_string(),
            leader_slot: 100,
            follower_slot: 100 + delay as u64,
            delay_slots: delay,
            timestamp: 1_700_000_000,
        })
    }

    fn swap(wallet: &str, slot: u64, usd: f64) -> SwapEvent {
        SwapEvent {
            wallet_address: wallet.to_string(),
            token_mint: "TOKEN1".to_string(),
            slot,
            transaction_id: format!("sig-{}-{}", wallet, slot),
            bought_amount: 42.0,
            bought_usd_value: usd,
        }
    }

    #[test]
    fn test_delay_classes() {
        assert_eq!(DelayClass::from_delay(0), DelayClass::VeryFast);
        assert_eq!(DelayClass::from_delay(3), DelayClass::VeryFast);
        assert_eq!(DelayClass::from_delay(4), DelayClass::Fast);
        assert_eq!(DelayClass::from_delay(6), DelayClass::Fast);
        assert_eq!(DelayClass::from_delay(10), DelayClass::Average);
        assert_eq!(DelayClass::from_delay(11), DelayClass::Slow);
        assert_eq!(DelayClass::VeryFast.to_string(), "Very Fast");
    }

    #[test]
    fn test_duplicates_collapse_to_first() {
        let trades = vec![trade("F", "L1", 2), trade("F", "L1", 5), trade("G", "L1", 1)];
        let rows = copy_transactions("F", &trades, &[], None);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].delay_slots, 2);
        assert!(rows[0].follower.signature.is_none());
        assert_eq!(rows[0].leader.signature.as_deref(), Some("L1"));
    }

    #[test]
    fn test_joins_activity_details() {
        let buy = LeaderBuyEvent {
            signature: "L1".to_string(),
            token_mint: "TOKEN1".to_string(),
            slot: 100,
            timestamp: 1_700_000_000,
            amount: 1000.0,
        };
        let activity = vec![LeaderActivity::new(
            buy,
            vec![swap("LEADER", 100, 12.5), swap("F", 103, 3.0)],
        )];
        let trades = vec![trade("F", "L1", 3)];

        let rows = copy_transactions("F", &trades, &activity, Some("LEADER"));

        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.leader.amount, Some(1000.0));
        assert_eq!(row.leader.usd_value, Some(12.5));
        assert_eq!(row.follower.signature.as_deref(), Some("sig-F-103"));
        assert_eq!(row.follower.usd_value, Some(3.0));
        assert_eq!(row.delay_class, DelayClass::VeryFast);
    }

    #[test]
    fn test_unknown_follower() {
        let trades = vec![trade("F", "L1", 2)];
        assert!(copy_transactions("nobody", &trades, &[], None).is_empty());
    }
}

//! Leader buy extraction
//!
//! Scans the tracked wallet's enhanced transactions for memecoin purchases:
//! transactions paid for by the wallet in which it receives a token that is
//! not SOL or a stablecoin.

use serde::Deserialize;
use serde_json::Value;
use std::collections::HashSet;
use tracing::{debug, warn};

use crate::engine::matcher::MAX_SLOT;
use crate::engine::types::{LeaderBuyEvent, RecordKind, SkippedRecord};

/// Native SOL and common stablecoin / liquid-staking mints
pub const NON_MEMECOINS: [&str; 4] = [
    "So11111111111111111111111111111111111111112",  // SOL
    "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v", // USDC
    "Es9vMFrzaCERmJfrF4H2FYD4KCoNkY11McCe8BenwNYB", // USDT
    "mSoLzYCxHdYgdzU16g5QSh3i5K3z3KZK7ytfqcJm7So",  // mSOL
];

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EnhancedTransaction {
    signature: Option<String>,
    slot: Option<u64>,
    timestamp: Option<i64>,
    fee_payer: Option<String>,
    #[serde(default)]
    token_transfers: Vec<TokenTransfer>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenTransfer {
    to_user_account: Option<String>,
    mint: Option<String>,
    #[serde(default)]
    token_amount: f64,
}

/// Result of scanning a batch of transactions
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub buys: Vec<LeaderBuyEvent>,
    pub skipped: Vec<SkippedRecord>,
    /// Records looked at, skipped ones included
    pub scanned: usize,
}

impl Extraction {
    /// Share of scanned transactions that were memecoin buys, in percent
    pub fn buy_percentage(&self) -> f64 {
        if self.scanned == 0 {
            return 0.0;
        }
        self.buys.len() as f64 / self.scanned as f64 * 100.0
    }
}

/// Finds the tracked wallet's memecoin purchases
pub struct LeaderBuyExtractor {
    leader: String,
    excluded_mints: HashSet<String>,
}

impl LeaderBuyExtractor {
    /// Create an extractor using the built-in non-memecoin list
    pub fn new(leader: impl Into<String>) -> Self {
        Self::with_excluded_mints(leader, NON_MEMECOINS.iter().map(|m| m.to_string()))
    }

    /// Create an extractor with a custom list of mints to ignore
    pub fn with_excluded_mints<I>(leader: impl Into<String>, mints: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        Self {
            leader: leader.into(),
            excluded_mints: mints.into_iter().collect(),
        }
    }

    pub fn leader(&self) -> &str {
        &self.leader
    }

    /// Scan raw enhanced transactions, skipping undecodable ones
    pub fn extract(&self, records: &[Value]) -> Extraction {
        let mut extraction = Extraction {
            scanned: records.len(),
            ..Default::default()
        };

        for record in records {
            match self.analyze(record) {
                Ok(Some(buy)) => extraction.buys.push(buy),
                Ok(None) => {}
                Err(skipped) => {
                    warn!(id = %skipped.id, reason = %skipped.reason, "Skipping transaction");
                    extraction.skipped.push(skipped);
                }
            }
        }

        debug!(
            scanned = extraction.scanned,
            buys = extraction.buys.len(),
            skipped = extraction.skipped.len(),
            "Extracted leader buys"
        );

        extraction
    }

    /// Analyze one transaction. `Ok(None)` means "not a memecoin buy".
    fn analyze(&self, record: &Value) -> std::result::Result<Option<LeaderBuyEvent>, SkippedRecord> {
        let id = record
            .get("signature")
            .and_then(Value::as_str)
            .unwrap_or("<unknown>")
            .to_string();

        let tx: EnhancedTransaction = serde_json::from_value(record.clone())
            .map_err(|e| SkippedRecord::new(RecordKind::Transaction, id.clone(), e.to_string()))?;

        if tx.fee_payer.as_deref() != Some(self.leader.as_str()) {
            return Ok(None);
        }

        let transfer = tx.token_transfers.iter().find(|t| {
            t.to_user_account.as_deref() == Some(self.leader.as_str())
                && t.mint
                    .as_deref()
                    .map(|m| !m.is_empty() && !self.excluded_mints.contains(m))
                    .unwrap_or(false)
        });

        let Some(transfer) = transfer else {
            return Ok(None);
        };

        let missing = |field: &str| {
            SkippedRecord::new(RecordKind::Transaction, id.clone(), format!("missing {}", field))
        };

        let signature = tx.signature.filter(|s| !s.is_empty()).ok_or_else(|| missing("signature"))?;
        let slot = tx.slot.ok_or_else(|| missing("slot"))?;
        if slot > MAX_SLOT {
            return Err(SkippedRecord::new(
                RecordKind::Transaction,
                id.clone(),
                "slot out of range",
            ));
        }
        let timestamp = tx.timestamp.ok_or_else(|| missing("timestamp"))?;

        Ok(Some(LeaderBuyEvent {
            signature,
            token_mint: transfer.mint.clone().unwrap_or_default(),
            slot,
            timestamp,
            amount: transfer.token_amount,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const LEADER: &str = "DNfuF1L62WWyW3pNakVkyGGFzVVhj4Yr52jSmdTyeBHm";

    fn buy_tx(signature: &str, mint: &str) -> Value {
        json!({
            "signature": signature,
            "slot": 300_000_000u64,
            "timestamp": 1_746_000_000i64,
            "feePayer": LEADER,
            "type": "SWAP",
            "tokenTransfers": [
                {
                    "fromUserAccount": LEADER,
                    "toUserAccount": "pool",
                    "mint": NON_MEMECOINS[0],
                    "tokenAmount": 1.5
                },
                {
                    "fromUserAccount": "pool",
                    "toUserAccount": LEADER,
                    "mint": mint,
                    "tokenAmount": 123456.0
                }
            ]
        })
    }

    #[test]
    fn test_extracts_memecoin_buy() {
        let extractor = LeaderBuyExtractor::new(LEADER);
        let extraction = extractor.extract(&[buy_tx("sig1", "MEME111")]);

        assert_eq!(extraction.buys.len(), 1);
        let buy = &extraction.buys[0];
        assert_eq!(buy.signature, "sig1");
        assert_eq!(buy.token_mint, "MEME111");
        assert_eq!(buy.slot, 300_000_000);
        assert!((buy.amount - 123456.0).abs() < 1e-9);
        assert!((extraction.buy_percentage() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_ignores_stablecoin_and_foreign_payer() {
        let extractor = LeaderBuyExtractor::new(LEADER);

        let usdc_buy = buy_tx("sig2", NON_MEMECOINS[1]);
        let mut other_payer = buy_tx("sig3", "MEME222");
        other_payer["feePayer"] = json!("someone-else");

        let extraction = extractor.extract(&[usdc_buy, other_payer]);
        assert!(extraction.buys.is_empty());
        assert!(extraction.skipped.is_empty());
        assert_eq!(extraction.scanned, 2);
    }

    #[test]
    fn test_malformed_records_are_skipped_not_fatal() {
        let extractor = LeaderBuyExtractor::new(LEADER);

        let mut no_slot = buy_tx("sig4", "MEME333");
        no_slot.as_object_mut().unwrap().remove("slot");
        let garbage = json!({"signature": "sig5", "slot": "not-a-number"});

        let extraction = extractor.extract(&[no_slot, garbage, buy_tx("sig6", "MEME444")]);

        assert_eq!(extraction.buys.len(), 1);
        assert_eq!(extraction.buys[0].signature, "sig6");
        assert_eq!(extraction.skipped.len(), 2);
        assert_eq!(extraction.skipped[0].id, "sig4");
        assert_eq!(extraction.skipped[0].kind, RecordKind::Transaction);
    }

    #[test]
    fn test_out_of_range_slot_skipped() {
        let extractor = LeaderBuyExtractor::new(LEADER);

        let mut huge = buy_tx("sig8", "MEME666");
        huge["slot"] = json!(9_223_372_036_854_775_808u64);

        let extraction = extractor.extract(&[huge, buy_tx("sig9", "MEME777")]);

        assert_eq!(extraction.buys.len(), 1);
        assert_eq!(extraction.buys[0].signature, "sig9");
        assert_eq!(extraction.skipped.len(), 1);
        assert_eq!(extraction.skipped[0].reason, "slot out of range");
    }

    #[test]
    fn test_custom_excluded_mints() {
        let extractor =
            LeaderBuyExtractor::with_excluded_mints(LEADER, vec!["MEME555".to_string()]);
        let extraction = extractor.extract(&[buy_tx("sig7", "MEME555")]);
        assert!(extraction.buys.is_empty());
    }
}

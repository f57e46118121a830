//! Moralis Solana gateway client for token swaps
//!
//! Swap records look like:
//! ```json
//! {"transactionHash": "...", "transactionType": "buy", "blockNumber": 331234567,
//!  "walletAddress": "...", "bought": {"address": "...", "amount": "1200.5", "usdAmount": 3.2}}
//! ```

use async_trait::async_trait;
use backoff::{future::retry, ExponentialBackoff};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::MoralisConfig;
use crate::engine::matcher::MAX_SLOT;
use crate::engine::types::{RecordKind, SkippedRecord, SwapEvent};
use crate::error::{Error, Result};
use crate::source::SwapSource;

const SERVICE: &str = "moralis";

/// Swaps returned for one window, plus the raw records for persistence
#[derive(Debug, Clone, Default)]
pub struct SwapBatch {
    pub raw: Vec<Value>,
    pub swaps: Vec<SwapEvent>,
    pub skipped: Vec<SkippedRecord>,
}

#[derive(Debug, Deserialize)]
struct SwapPage {
    #[serde(default)]
    result: Vec<Value>,
    #[serde(default)]
    cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSwap {
    wallet_address: Option<String>,
    block_number: Option<Value>,
    #[serde(default)]
    transaction_hash: Option<String>,
    #[serde(default)]
    transaction_type: Option<String>,
    #[serde(default)]
    bought: Option<RawSide>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSide {
    #[serde(default)]
    amount: Option<Value>,
    #[serde(default)]
    usd_amount: Option<Value>,
}

/// Numbers arrive as JSON numbers or decimal strings; anything else is 0
fn lenient_f64(value: Option<&Value>) -> f64 {
    match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

fn parse_slot(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Decode raw swap records for `mint`.
///
/// Sells are not purchases and are dropped silently; records without a
/// wallet or block are recorded as skipped.
pub fn decode_swaps(mint: &str, records: &[Value]) -> (Vec<SwapEvent>, Vec<SkippedRecord>) {
    let mut swaps = Vec::with_capacity(records.len());
    let mut skipped = Vec::new();

    for (index, record) in records.iter().enumerate() {
        let id = record
            .get("transactionHash")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| format!("{}#{}", mint, index));

        let raw: RawSwap = match serde_json::from_value(record.clone()) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(id = %id, error = %e, "Skipping undecodable swap record");
                skipped.push(SkippedRecord::new(RecordKind::Swap, id, e.to_string()));
                continue;
            }
        };

        if raw
            .transaction_type
            .as_deref()
            .is_some_and(|t| t.eq_ignore_ascii_case("sell"))
        {
            continue;
        }

        let Some(wallet) = raw.wallet_address.filter(|w| !w.is_empty()) else {
            warn!(id = %id, "Skipping swap without walletAddress");
            skipped.push(SkippedRecord::new(RecordKind::Swap, id, "missing walletAddress"));
            continue;
        };

        let Some(slot) = raw.block_number.as_ref().and_then(parse_slot) else {
            warn!(id = %id, "Skipping swap without usable blockNumber");
            skipped.push(SkippedRecord::new(RecordKind::Swap, id, "missing blockNumber"));
            continue;
        };

        if slot > MAX_SLOT {
            warn!(id = %id, slot, "Skipping swap with out-of-range blockNumber");
            skipped.push(SkippedRecord::new(RecordKind::Swap, id, "blockNumber out of range"));
            continue;
        }

        let (bought_amount, bought_usd_value) = match &raw.bought {
            Some(side) => (
                lenient_f64(side.amount.as_ref()),
                lenient_f64(side.usd_amount.as_ref()),
            ),
            None => (0.0, 0.0),
        };

        swaps.push(SwapEvent {
            wallet_address: wallet,
            token_mint: mint.to_string(),
            slot,
            transaction_id: raw.transaction_hash.unwrap_or(id),
            bought_amount,
            bought_usd_value,
        });
    }

    (swaps, skipped)
}

/// Moralis API client
pub struct MoralisClient {
    client: Client,
    config: MoralisConfig,
}

impl MoralisClient {
    pub fn new(config: MoralisConfig) -> Result<Self> {
        if config.api_key.is_empty() {
            return Err(Error::MissingApiKey(SERVICE));
        }

        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| Error::Http(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    /// Configured post-purchase window length
    pub fn window_secs(&self) -> i64 {
        self.config.window_secs
    }

    fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff {
            initial_interval: Duration::from_millis(500),
            max_interval: Duration::from_secs(8),
            max_elapsed_time: Some(Duration::from_millis(self.config.retry_max_elapsed_ms)),
            ..Default::default()
        }
    }

    async fn fetch_page_once(
        &self,
        mint: &str,
        from_ts: i64,
        to_ts: i64,
        cursor: Option<&str>,
    ) -> Result<SwapPage> {
        let url = format!("{}/token/mainnet/{}/swaps", self.config.base_url, mint);

        let mut query = vec![
            ("fromDate", from_ts.to_string()),
            ("toDate", to_ts.to_string()),
            ("order", "DESC".to_string()),
        ];
        if let Some(cursor) = cursor {
            query.push(("cursor", cursor.to_string()));
        }

        let response = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .header("X-API-Key", &self.config.api_key)
            .query(&query)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(Error::RateLimited { service: SERVICE });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Api {
                service: SERVICE,
                status: status.as_u16(),
                body,
            });
        }

        let page: SwapPage = response.json().await?;
        Ok(page)
    }

    async fn fetch_page(
        &self,
        mint: &str,
        from_ts: i64,
        to_ts: i64,
        cursor: Option<&str>,
    ) -> Result<SwapPage> {
        retry(self.backoff(), || async {
            match self.fetch_page_once(mint, from_ts, to_ts, cursor).await {
                Ok(page) => Ok(page),
                Err(e) if e.is_retryable() => {
                    warn!(mint, error = %e, "Retryable Moralis error");
                    Err(backoff::Error::transient(e))
                }
                Err(e) => Err(backoff::Error::permanent(e)),
            }
        })
        .await
    }
}

#[async_trait]
impl SwapSource for MoralisClient {
    fn name(&self) -> &'static str {
        SERVICE
    }

    async fn swaps_for(&self, mint: &str, from_ts: i64, to_ts: i64) -> Result<SwapBatch> {
        let mut raw: Vec<Value> = Vec::new();
        let mut cursor: Option<String> = None;

        for page_number in 0..self.config.max_pages {
            let page = self
                .fetch_page(mint, from_ts, to_ts, cursor.as_deref())
                .await?;
            raw.extend(page.result);

            cursor = page.cursor.filter(|c| !c.is_empty());
            if cursor.is_none() {
                break;
            }
            if page_number + 1 == self.config.max_pages {
                warn!(mint, pages = self.config.max_pages, "Swap page cap reached");
            }
        }

        let (swaps, skipped) = decode_swaps(mint, &raw);
        debug!(
            mint,
            records = raw.len(),
            swaps = swaps.len(),
            skipped = skipped.len(),
            "Fetched token swaps"
        );

        Ok(SwapBatch {
            raw,
            swaps,
            skipped,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_buy_records() {
        let records = vec![
            json!({
                "transactionHash": "tx1",
                "transactionType": "buy",
                "blockNumber": 331000103,
                "walletAddress": "X",
                "bought": {"address": "MINT", "amount": "1200.5", "usdAmount": 3.25}
            }),
            json!({
                "transactionHash": "tx2",
                "blockNumber": "331000105",
                "walletAddress": "Y",
                "bought": {"amount": 7, "usdAmount": "not-a-number"}
            }),
        ];

        let (swaps, skipped) = decode_swaps("MINT", &records);

        assert!(skipped.is_empty());
        assert_eq!(swaps.len(), 2);
        assert_eq!(swaps[0].wallet_address, "X");
        assert_eq!(swaps[0].slot, 331000103);
        assert_eq!(swaps[0].token_mint, "MINT");
        assert!((swaps[0].bought_amount - 1200.5).abs() < 1e-9);
        assert!((swaps[0].bought_usd_value - 3.25).abs() < 1e-9);
        assert_eq!(swaps[1].slot, 331000105);
        assert_eq!(swaps[1].bought_usd_value, 0.0);
    }

    #[test]
    fn test_sells_dropped_and_malformed_recorded() {
        let records = vec![
            json!({"transactionHash": "s", "transactionType": "sell", "blockNumber": 1, "walletAddress": "A"}),
            json!({"transactionHash": "nw", "blockNumber": 5}),
            json!({"transactionHash": "nb", "walletAddress": "B"}),
            json!({"walletAddress": "C", "blockNumber": 9}),
        ];

        let (swaps, skipped) = decode_swaps("MINT", &records);

        assert_eq!(swaps.len(), 1);
        assert_eq!(swaps[0].wallet_address, "C");
        assert_eq!(swaps[0].bought_amount, 0.0);
        assert_eq!(swaps[0].transaction_id, "MINT#3");
        assert_eq!(skipped.len(), 2);
        assert_eq!(skipped[0].id, "nw");
        assert_eq!(skipped[1].id, "nb");
        assert!(skipped.iter().all(|s| s.kind == RecordKind::Swap));
    }

    #[test]
    fn test_out_of_range_block_skipped() {
        let records = vec![
            json!({"transactionHash": "big", "walletAddress": "X", "blockNumber": "9223372036854775808"}),
            json!({"transactionHash": "ok", "walletAddress": "X", "blockNumber": 103}),
        ];

        let (swaps, skipped) = decode_swaps("TOKEN1", &records);

        assert_eq!(swaps.len(), 1);
        assert_eq!(swaps[0].slot, 103);
        assert_eq!(skipped.len(), 1);
        assert_eq!(skipped[0].id, "big");
        assert_eq!(skipped[0].reason, "blockNumber out of range");

        let leader = crate::engine::types::LeaderBuyEvent {
            signature: "AAAAAAAA".to_string(),
            token_mint: "TOKEN1".to_string(),
            slot: 100,
            timestamp: 0,
            amount: 1.0,
        };
        let candidates = crate::engine::matcher::match_buy(&leader, &swaps);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].delay_slots, 3);
    }

    #[test]
    fn test_requires_api_key() {
        assert!(matches!(
            MoralisClient::new(MoralisConfig::default()),
            Err(Error::MissingApiKey("moralis"))
        ));
    }

    #[test]
    fn test_page_without_cursor() {
        let page: SwapPage = serde_json::from_value(json!({"result": [{"a": 1}]})).unwrap();
        assert_eq!(page.result.len(), 1);
        assert!(page.cursor.is_none());
    }
}

//! Copy-trader analysis service
//!
//! Sequences fetch → filter → swaps → engine → persist for one tracked
//! wallet. Each step is also exposed on its own for the CLI.

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::Config;
use crate::engine::extractor::{Extraction, LeaderBuyExtractor};
use crate::engine::lookup::{copy_transactions, CopyTransaction};
use crate::engine::matcher::LeaderActivity;
use crate::engine::pipeline::{CopyTradeEngine, EngineOutput};
use crate::engine::types::{
    CleanedCopyTrade, FollowerScore, LeaderBuyEvent, RecordKind, SkippedRecord,
};
use crate::error::{Error, Result};
use crate::source::{HeliusClient, MoralisClient, SwapBatch, SwapSource, TransactionSource};
use crate::store::WalletStore;

/// Result of a full analysis of one wallet
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub wallet: String,
    pub followers: Vec<FollowerScore>,
    pub transactions_scanned: usize,
    pub leader_buys: usize,
    pub copy_trade_count: usize,
    pub total_lead_buys: usize,
    pub skipped: Vec<SkippedRecord>,
    pub analyzed_at: DateTime<Utc>,
}

impl AnalysisReport {
    /// No leader buy had a follower inside the window
    pub fn no_leader_activity(&self) -> bool {
        self.total_lead_buys == 0
    }
}

/// Runs copy-trade analysis against configured collaborators
pub struct CopyTraderService {
    transactions: Option<Arc<dyn TransactionSource>>,
    swaps: Option<Arc<dyn SwapSource>>,
    engine: CopyTradeEngine,
    excluded_mints: Vec<String>,
    window_secs: i64,
    max_concurrent_requests: usize,
    data_dir: PathBuf,
}

impl CopyTraderService {
    /// Service without network sources; enough for offline steps
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            transactions: None,
            swaps: None,
            engine: CopyTradeEngine::new(config.engine.clone())?,
            excluded_mints: config.tokens.non_memecoins.clone(),
            window_secs: config.moralis.window_secs,
            max_concurrent_requests: config.service.max_concurrent_requests.max(1),
            data_dir: config.storage.data_dir.clone(),
        })
    }

    /// Service backed by the Helius and Moralis clients
    pub fn from_config(config: &Config) -> Result<Self> {
        let helius = HeliusClient::new(config.helius.clone())?;
        let moralis = MoralisClient::new(config.moralis.clone())?;
        Ok(Self::new(config)?
            .with_transaction_source(Arc::new(helius))
            .with_swap_source(Arc::new(moralis)))
    }

    pub fn with_transaction_source(mut self, source: Arc<dyn TransactionSource>) -> Self {
        self.transactions = Some(source);
        self
    }

    pub fn with_swap_source(mut self, source: Arc<dyn SwapSource>) -> Self {
        self.swaps = Some(source);
        self
    }

    pub fn engine(&self) -> &CopyTradeEngine {
        &self.engine
    }

    pub fn store(&self, wallet: &str) -> WalletStore {
        WalletStore::new(&self.data_dir, wallet)
    }

    fn transaction_source(&self) -> Result<&Arc<dyn TransactionSource>> {
        self.transactions
            .as_ref()
            .ok_or_else(|| Error::Config("no transaction source configured".to_string()))
    }

    fn swap_source(&self) -> Result<&Arc<dyn SwapSource>> {
        self.swaps
            .as_ref()
            .ok_or_else(|| Error::Config("no swap source configured".to_string()))
    }

    fn leader(&self, wallet: &str) -> Option<String> {
        self.engine
            .config()
            .exclude_leader
            .then(|| wallet.to_string())
    }

    /// Fetch and persist the wallet's recent transactions
    pub async fn fetch_transactions(&self, wallet: &str) -> Result<Vec<Value>> {
        let source = self.transaction_source()?;
        let transactions = source.recent_transactions(wallet).await?;
        self.store(wallet).save_transactions(&transactions).await?;
        Ok(transactions)
    }

    /// Isolate memecoin buys from raw records
    pub fn extract_buys(&self, wallet: &str, transactions: &[Value]) -> Extraction {
        LeaderBuyExtractor::with_excluded_mints(wallet, self.excluded_mints.iter().cloned())
            .extract(transactions)
    }

    /// Extract leader buys from saved transactions and persist them
    pub async fn filter_transactions(&self, wallet: &str) -> Result<Extraction> {
        let store = self.store(wallet);
        let (transactions, skipped) = store.load_transactions().await?;
        if transactions.is_empty() {
            return Err(Error::NoData(format!(
                "no saved transactions for {}",
                wallet
            )));
        }

        let mut extraction = self.extract_buys(wallet, &transactions);
        extraction.skipped.extend(skipped);
        store.save_leader_buys(&extraction.buys).await?;

        info!(
            wallet,
            scanned = extraction.scanned,
            buys = extraction.buys.len(),
            "Filtered leader buys"
        );
        Ok(extraction)
    }

    async fn swaps_for_buy(&self, source: &dyn SwapSource, buy: &LeaderBuyEvent) -> Result<SwapBatch> {
        source
            .swaps_for(&buy.token_mint, buy.timestamp, buy.timestamp + self.window_secs)
            .await
    }

    /// Collect swaps for each buy with bounded concurrency.
    ///
    /// A failed request is logged and leaves that buy with no swaps.
    pub async fn collect_swaps(
        &self,
        store: &WalletStore,
        buys: Vec<LeaderBuyEvent>,
    ) -> Result<(Vec<LeaderActivity>, Vec<SkippedRecord>)> {
        let source = self.swap_source()?.clone();

        let batches: Vec<(LeaderBuyEvent, Result<SwapBatch>)> = stream::iter(buys)
            .map(|buy| {
                let source = source.clone();
                async move {
                    let batch = self.swaps_for_buy(source.as_ref(), &buy).await;
                    (buy, batch)
                }
            })
            .buffered(self.max_concurrent_requests)
            .collect()
            .await;

        let mut activity = Vec::with_capacity(batches.len());
        let mut skipped = Vec::new();

        for (buy, batch) in batches {
            match batch {
                Ok(batch) => {
                    store.save_swaps(&buy, &batch.raw).await?;
                    skipped.extend(batch.skipped);
                    activity.push(LeaderActivity::new(buy, batch.swaps));
                }
                Err(e) => {
                    warn!(
                        signature = %buy.signature,
                        mint = %buy.token_mint,
                        error = %e,
                        "Swap fetch failed, leader buy contributes no candidates"
                    );
                    skipped.push(SkippedRecord::new(
                        RecordKind::LeaderBuy,
                        buy.signature.clone(),
                        e.to_string(),
                    ));
                    activity.push(LeaderActivity::new(buy, Vec::new()));
                }
            }
        }

        Ok((activity, skipped))
    }

    /// Fetch swaps for every saved leader buy
    pub async fn fetch_swaps(&self, wallet: &str) -> Result<(Vec<LeaderActivity>, Vec<SkippedRecord>)> {
        let store = self.store(wallet);
        let (buys, mut skipped) = store.load_leader_buys().await?;
        let (activity, more) = self.collect_swaps(&store, buys).await?;
        skipped.extend(more);
        Ok((activity, skipped))
    }

    /// Match saved buys and swaps, persist and return the cleaned table
    pub async fn analyze_copy_trades(
        &self,
        wallet: &str,
    ) -> Result<(EngineOutput, Vec<SkippedRecord>)> {
        let store = self.store(wallet);
        let (activity, skipped) = store.load_activity().await?;
        let leader = self.leader(wallet);
        let output = self.engine.run(&activity, leader.as_deref());
        store.save_copy_trades(&output.copy_trades).await?;
        Ok((output, skipped))
    }

    /// Latest saved copy-trade table, cleaned again under current parameters
    pub async fn load_copy_trades(&self, wallet: &str) -> Result<Vec<CleanedCopyTrade>> {
        let candidates = self
            .store(wallet)
            .load_latest_copy_trades()
            .await?
            .ok_or_else(|| Error::NoData(format!("no copy-trade table for {}", wallet)))?;
        let leader = self.leader(wallet);
        Ok(self.engine.clean(candidates, leader.as_deref()).0)
    }

    /// Score the latest saved copy-trade table and persist the scores
    pub async fn score_wallet(&self, wallet: &str) -> Result<Vec<FollowerScore>> {
        let trades = self.load_copy_trades(wallet).await?;
        let scores = self.engine.score_followers(&trades);
        self.store(wallet).save_scores(&scores).await?;
        Ok(scores)
    }

    /// Copy transactions of one follower from the latest saved table
    pub async fn follower_transactions(
        &self,
        wallet: &str,
        follower: &str,
    ) -> Result<Vec<CopyTransaction>> {
        let trades = self.load_copy_trades(wallet).await?;
        let (activity, _) = self.store(wallet).load_activity().await?;
        Ok(copy_transactions(follower, &trades, &activity, Some(wallet)))
    }

    /// Full analysis of one wallet
    pub async fn analyze_wallet(&self, wallet: &str) -> Result<AnalysisReport> {
        info!(wallet, "Starting copy-trader analysis");
        let store = self.store(wallet);

        let transactions = self.fetch_transactions(wallet).await?;
        let extraction = self.extract_buys(wallet, &transactions);
        store.save_leader_buys(&extraction.buys).await?;
        let mut skipped = extraction.skipped;

        let leader_buys = extraction.buys.len();
        let (activity, more) = self.collect_swaps(&store, extraction.buys).await?;
        skipped.extend(more);

        let leader = self.leader(wallet);
        let output = self.engine.run(&activity, leader.as_deref());
        store.save_copy_trades(&output.copy_trades).await?;
        store.save_scores(&output.followers).await?;

        if output.no_leader_activity() {
            info!(wallet, "No leader activity found");
        } else if output.followers.is_empty() {
            info!(wallet, "No followers found");
        }

        Ok(AnalysisReport {
            wallet: wallet.to_string(),
            transactions_scanned: extraction.scanned,
            leader_buys,
            copy_trade_count: output.copy_trades.len(),
            total_lead_buys: output.total_lead_buys,
            followers: output.followers,
            skipped,
            analyzed_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::HashMap;

    const LEADER: &str = "LEADERxxxxxxxxxxxxxxxxxxxxxxxxxxxx";

    struct FakeTransactions(Vec<Value>);

    #[async_trait]
    impl TransactionSource for FakeTransactions {
        fn name(&self) -> &'static str {
            "fake"
        }

        async fn recent_transactions(&self, _wallet: &str) -> Result<Vec<Value>> {
            Ok(self.0.clone())
        }
    }

    /// Swap records keyed by mint; unknown mints fail
    struct FakeSwaps(HashMap<String, Vec<Value>>);

    #[async_trait]
    impl SwapSource for FakeSwaps {
        fn name(&self) -> &'static str {
            "fake"
        }

        async fn swaps_for(&self, mint: &str, _from_ts: i64, _to_ts: i64) -> Result<SwapBatch> {
            let raw = self.0.get(mint).cloned().ok_or(Error::Api {
                service: "fake",
                status: 500,
                body: "boom".to_string(),
            })?;
            let (swaps, skipped) = crate::source::decode_swaps(mint, &raw);
            Ok(SwapBatch { raw, swaps, skipped })
        }
    }

    fn leader_tx(signature: &str, mint: &str, slot: u64) -> Value {
        json!({
            "signature": signature,
            "slot": slot,
            "timestamp": 1_700_000_000u64 + slot,
            "feePayer": LEADER,
            "tokenTransfers": [
                {"mint": mint, "toUserAccount": LEADER, "tokenAmount": 1000.0}
            ]
        })
    }

    fn swap(wallet: &str, slot: u64) -> Value {
        json!({"walletAddress": wallet, "blockNumber": slot, "transactionHash": format!("{}-{}", wallet, slot)})
    }

    fn service(data_dir: &std::path::Path) -> CopyTraderService {
        let config = Config {
            storage: crate::config::StorageConfig {
                data_dir: data_dir.to_path_buf(),
            },
            ..Default::default()
        };

        let transactions = FakeTransactions(vec![
            leader_tx("SIGONExxxxxx", "TOKEN1xxxxxx", 100),
            leader_tx("SIGTWOxxxxxx", "TOKEN1xxxxxx", 200),
            leader_tx("SIGTHREExxxx", "TOKEN2xxxxxx", 300),
            leader_tx("SIGFOURxxxxx", "BROKENxxxxxx", 400),
        ]);

        let mut swaps = HashMap::new();
        swaps.insert(
            "TOKEN1xxxxxx".to_string(),
            vec![
                swap("F", 102),
                swap("F", 203),
                swap(LEADER, 100),
                swap("LATE", 150),
            ],
        );
        swaps.insert("TOKEN2xxxxxx".to_string(), vec![swap("F", 305), swap("EARLY", 299)]);

        CopyTraderService::new(&config)
            .unwrap()
            .with_transaction_source(Arc::new(transactions))
            .with_swap_source(Arc::new(FakeSwaps(swaps)))
    }

    #[tokio::test]
    async fn test_analyze_wallet_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(dir.path());

        let report = service.analyze_wallet(LEADER).await.unwrap();

        assert_eq!(report.transactions_scanned, 4);
        assert_eq!(report.leader_buys, 4);
        assert_eq!(report.total_lead_buys, 3);
        assert_eq!(report.followers.len(), 1);

        let f = &report.followers[0];
        assert_eq!(f.address(), "F");
        assert!(f.metrics.hits >= 3);
        assert_eq!(f.tier, crate::engine::types::Tier::Gold);

        // The failing mint is recorded, not fatal
        assert!(report
            .skipped
            .iter()
            .any(|s| s.kind == RecordKind::LeaderBuy && s.id == "SIGFOURxxxxx"));

        let store = service.store(LEADER);
        assert!(store.load_latest_scores().await.unwrap().is_some());
        assert!(store.root().join("token_swaps/swaps_TOKEN1xx_SIGONExx.json").exists());
    }

    #[tokio::test]
    async fn test_step_by_step_matches_full_run() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(dir.path());

        service.fetch_transactions(LEADER).await.unwrap();
        let extraction = service.filter_transactions(LEADER).await.unwrap();
        assert_eq!(extraction.buys.len(), 4);

        service.fetch_swaps(LEADER).await.unwrap();
        let (output, _) = service.analyze_copy_trades(LEADER).await.unwrap();
        assert!(output.copy_trades.iter().all(|t| t.follower_address != LEADER));

        let scores = service.score_wallet(LEADER).await.unwrap();
        assert_eq!(scores, output.followers);

        let rows = service.follower_transactions(LEADER, "F").await.unwrap();
        assert!(!rows.is_empty());
        assert!(rows.iter().all(|r| r.follower.signature.is_some()));
    }

    #[test]
    fn test_offline_service_refuses_network_steps() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            storage: crate::config::StorageConfig {
                data_dir: dir.path().to_path_buf(),
            },
            ..Default::default()
        };
        let service = CopyTraderService::new(&config).unwrap();

        let result = tokio_test::block_on(service.fetch_transactions(LEADER));
        assert!(matches!(result, Err(Error::Config(_))));

        let result = tokio_test::block_on(service.filter_transactions(LEADER));
        assert!(matches!(result, Err(Error::NoData(_))));
    }

    #[tokio::test]
    async fn test_no_leader_activity_is_empty_report() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            storage: crate::config::StorageConfig {
                data_dir: dir.path().to_path_buf(),
            },
            ..Default::default()
        };
        let service = CopyTraderService::new(&config)
            .unwrap()
            .with_transaction_source(Arc::new(FakeTransactions(Vec::new())))
            .with_swap_source(Arc::new(FakeSwaps(HashMap::new())));

        let report = service.analyze_wallet(LEADER).await.unwrap();
        assert!(report.no_leader_activity());
        assert!(report.followers.is_empty());
    }
}

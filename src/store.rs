//! Per-wallet JSON persistence
//!
//! Layout under `data_dir/<wallet>/`:
//! - `transactions/<sig[..8]>.json`: raw enhanced transactions
//! - `filtered_transactions/<sig[..8]>.json`: leader buys
//! - `token_swaps/swaps_<mint[..8]>_<sig[..8]>.json`: `{"result": [...]}`
//! - `copy_trades/copy_trades_<ts>.json`, `copy_trades/follower_scores_<ts>.json`

use chrono::Local;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::engine::matcher::LeaderActivity;
use crate::engine::types::{
    CleanedCopyTrade, CopyTradeCandidate, FollowerScore, LeaderBuyEvent, RecordKind,
    SkippedRecord,
};
use crate::error::{Error, Result};
use crate::source::moralis::decode_swaps;

const TRANSACTIONS_DIR: &str = "transactions";
const FILTERED_DIR: &str = "filtered_transactions";
const SWAPS_DIR: &str = "token_swaps";
const COPY_TRADES_DIR: &str = "copy_trades";

const COPY_TRADES_PREFIX: &str = "copy_trades_";
const SCORES_PREFIX: &str = "follower_scores_";

/// First 8 characters, used in file names
fn short(s: &str) -> &str {
    s.get(..8).unwrap_or(s)
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// Score with every derived number rounded to 3 decimals
fn rounded(score: &FollowerScore) -> FollowerScore {
    let mut out = score.clone();
    out.metrics.avg_delay = round3(out.metrics.avg_delay);
    out.metrics.med_delay = round3(out.metrics.med_delay);
    out.freq_norm = round3(out.freq_norm);
    out.breadth_norm = round3(out.breadth_norm);
    out.speed_norm = round3(out.speed_norm);
    out.score = round3(out.score);
    out
}

async fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let data = serde_json::to_string_pretty(value)?;
    tokio::fs::write(path, data)
        .await
        .map_err(|e| Error::Storage(format!("{}: {}", path.display(), e)))
}

async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let data = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| Error::Storage(format!("{}: {}", path.display(), e)))?;
    serde_json::from_str(&data)
        .map_err(|e| Error::Deserialization(format!("{}: {}", path.display(), e)))
}

/// `.json` files of a directory, sorted by name; missing directory is empty
async fn json_files(dir: &Path, prefix: &str) -> Result<Vec<PathBuf>> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(Error::Storage(format!("{}: {}", dir.display(), e))),
    };

    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let matches = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with(prefix) && n.ends_with(".json"));
        if matches {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Persistence for one tracked wallet
#[derive(Debug, Clone)]
pub struct WalletStore {
    root: PathBuf,
    wallet: String,
}

impl WalletStore {
    pub fn new(data_dir: impl Into<PathBuf>, wallet: impl Into<String>) -> Self {
        let wallet = wallet.into();
        Self {
            root: data_dir.into().join(&wallet),
            wallet,
        }
    }

    pub fn wallet(&self) -> &str {
        &self.wallet
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn dir(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// Create the wallet's directory tree
    pub async fn init(&self) -> Result<()> {
        for name in [TRANSACTIONS_DIR, FILTERED_DIR, SWAPS_DIR, COPY_TRADES_DIR] {
            let dir = self.dir(name);
            tokio::fs::create_dir_all(&dir)
                .await
                .map_err(|e| Error::Storage(format!("{}: {}", dir.display(), e)))?;
        }
        Ok(())
    }

    /// Save raw transactions one file per record; unsigned records are skipped
    pub async fn save_transactions(&self, transactions: &[Value]) -> Result<usize> {
        self.init().await?;
        let dir = self.dir(TRANSACTIONS_DIR);
        let mut saved = 0;

        for tx in transactions {
            let Some(signature) = tx.get("signature").and_then(Value::as_str) else {
                continue;
            };
            write_json(&dir.join(format!("{}.json", short(signature))), tx).await?;
            saved += 1;
        }

        debug!(wallet = %self.wallet, saved, "Saved raw transactions");
        Ok(saved)
    }

    /// Load raw transactions; unreadable files are recorded and skipped
    pub async fn load_transactions(&self) -> Result<(Vec<Value>, Vec<SkippedRecord>)> {
        self.load_records(TRANSACTIONS_DIR, RecordKind::Transaction)
            .await
    }

    pub async fn save_leader_buys(&self, buys: &[LeaderBuyEvent]) -> Result<usize> {
        self.init().await?;
        let dir = self.dir(FILTERED_DIR);
        for buy in buys {
            write_json(&dir.join(format!("{}.json", short(&buy.signature))), buy).await?;
        }
        debug!(wallet = %self.wallet, saved = buys.len(), "Saved leader buys");
        Ok(buys.len())
    }

    /// Load leader buys ordered by slot
    pub async fn load_leader_buys(&self) -> Result<(Vec<LeaderBuyEvent>, Vec<SkippedRecord>)> {
        let (mut buys, skipped) = self
            .load_records::<LeaderBuyEvent>(FILTERED_DIR, RecordKind::LeaderBuy)
            .await?;
        buys.sort_by(|a, b| a.slot.cmp(&b.slot).then_with(|| a.signature.cmp(&b.signature)));
        Ok((buys, skipped))
    }

    async fn load_records<T: DeserializeOwned>(
        &self,
        name: &str,
        kind: RecordKind,
    ) -> Result<(Vec<T>, Vec<SkippedRecord>)> {
        let mut records = Vec::new();
        let mut skipped = Vec::new();

        for path in json_files(&self.dir(name), "").await? {
            match read_json::<T>(&path).await {
                Ok(record) => records.push(record),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Skipping unreadable record");
                    let id = path
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_default();
                    skipped.push(SkippedRecord::new(kind, id, e.to_string()));
                }
            }
        }

        Ok((records, skipped))
    }

    fn swaps_path(&self, buy: &LeaderBuyEvent) -> PathBuf {
        self.dir(SWAPS_DIR).join(format!(
            "swaps_{}_{}.json",
            short(&buy.token_mint),
            short(&buy.signature)
        ))
    }

    /// Save the raw swap records collected for one leader buy
    pub async fn save_swaps(&self, buy: &LeaderBuyEvent, raw: &[Value]) -> Result<PathBuf> {
        self.init().await?;
        let path = self.swaps_path(buy);
        write_json(&path, &json!({ "result": raw })).await?;
        Ok(path)
    }

    /// Raw swap records of one leader buy, `None` when never fetched
    pub async fn load_swaps(&self, buy: &LeaderBuyEvent) -> Result<Option<Vec<Value>>> {
        let path = self.swaps_path(buy);
        if !tokio::fs::try_exists(&path).await? {
            return Ok(None);
        }
        let body: Value = read_json(&path).await?;
        let result = body
            .get("result")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        Ok(Some(result))
    }

    /// Rebuild matcher input from saved leader buys and swap files.
    ///
    /// A buy without a swap file contributes no swaps.
    pub async fn load_activity(&self) -> Result<(Vec<LeaderActivity>, Vec<SkippedRecord>)> {
        let (buys, mut skipped) = self.load_leader_buys().await?;
        let mut activity = Vec::with_capacity(buys.len());

        for buy in buys {
            let swaps = match self.load_swaps(&buy).await {
                Ok(Some(raw)) => {
                    let (swaps, bad) = decode_swaps(&buy.token_mint, &raw);
                    skipped.extend(bad);
                    swaps
                }
                Ok(None) => {
                    debug!(signature = %buy.signature, "No swap data for leader buy");
                    Vec::new()
                }
                Err(e) => {
                    warn!(signature = %buy.signature, error = %e, "Unreadable swap data");
                    skipped.push(SkippedRecord::new(
                        RecordKind::Swap,
                        buy.signature.clone(),
                        e.to_string(),
                    ));
                    Vec::new()
                }
            };
            activity.push(LeaderActivity::new(buy, swaps));
        }

        Ok((activity, skipped))
    }

    /// Fresh millisecond-stamped path. Saves landing in the same
    /// millisecond get a `_NNN` suffix, which still sorts after the bare name.
    async fn stamped(&self, prefix: &str) -> Result<PathBuf> {
        let stamp = Local::now().format("%Y%m%d_%H%M%S%3f").to_string();
        let dir = self.dir(COPY_TRADES_DIR);

        let mut path = dir.join(format!("{}{}.json", prefix, stamp));
        let mut n = 1;
        while tokio::fs::try_exists(&path).await? {
            path = dir.join(format!("{}{}_{:03}.json", prefix, stamp, n));
            n += 1;
        }
        Ok(path)
    }

    async fn latest(&self, prefix: &str) -> Result<Option<PathBuf>> {
        Ok(json_files(&self.dir(COPY_TRADES_DIR), prefix)
            .await?
            .pop())
    }

    /// Save a cleaned copy-trade table under a fresh timestamp
    pub async fn save_copy_trades(&self, trades: &[CleanedCopyTrade]) -> Result<PathBuf> {
        self.init().await?;
        let path = self.stamped(COPY_TRADES_PREFIX).await?;
        write_json(&path, trades).await?;
        info!(path = %path.display(), rows = trades.len(), "Saved copy trades");
        Ok(path)
    }

    /// Most recent copy-trade table; rows must be cleaned again before use
    pub async fn load_latest_copy_trades(&self) -> Result<Option<Vec<CopyTradeCandidate>>> {
        match self.latest(COPY_TRADES_PREFIX).await? {
            Some(path) => {
                debug!(path = %path.display(), "Loading copy trades");
                Ok(Some(read_json(&path).await?))
            }
            None => Ok(None),
        }
    }

    /// Save follower scores, rounded to 3 decimals
    pub async fn save_scores(&self, scores: &[FollowerScore]) -> Result<PathBuf> {
        self.init().await?;
        let path = self.stamped(SCORES_PREFIX).await?;
        let rows: Vec<FollowerScore> = scores.iter().map(rounded).collect();
        write_json(&path, &rows).await?;
        info!(path = %path.display(), followers = rows.len(), "Saved follower scores");
        Ok(path)
    }

    pub async fn load_latest_scores(&self) -> Result<Option<Vec<FollowerScore>>> {
        match self.latest(SCORES_PREFIX).await? {
            Some(path) => Ok(Some(read_json(&path).await?)),
            None => Ok(None),
        }
    }
}

//! Configuration loading and validation

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::engine::extractor::NON_MEMECOINS;

// Re-export engine parameters
pub use crate::engine::config::{EngineConfig, HitCounting, ScoreWeights, TierBoundaries};

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub helius: HeliusConfig,
    #[serde(default)]
    pub moralis: MoralisConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub tokens: TokensConfig,
    #[serde(default)]
    pub service: ServiceConfig,
}

/// Wallet transaction history (Helius enhanced transactions API)
#[derive(Debug, Clone, Deserialize)]
pub struct HeliusConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_helius_url")]
    pub base_url: String,
    /// Transaction types requested; all are sent with every page request
    #[serde(default = "default_tx_types")]
    pub tx_types: Vec<String>,
    /// Records per page (API maximum 100)
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    /// Stop paginating once this many records were collected
    #[serde(default = "default_max_transactions")]
    pub max_transactions: usize,
    /// Pause between pages
    #[serde(default = "default_page_delay_ms")]
    pub page_delay_ms: u64,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Give up retrying transient failures after this long
    #[serde(default = "default_retry_max_elapsed_ms")]
    pub retry_max_elapsed_ms: u64,
}

/// Token swap history (Moralis Solana gateway)
#[derive(Debug, Clone, Deserialize)]
pub struct MoralisConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_moralis_url")]
    pub base_url: String,
    /// Length of the post-purchase swap window
    #[serde(default = "default_window_secs")]
    pub window_secs: i64,
    /// Upper bound on cursor pages per leader buy
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_retry_max_elapsed_ms")]
    pub retry_max_elapsed_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Root of the per-wallet data directories
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokensConfig {
    /// Mints never treated as memecoin purchases
    #[serde(default = "default_non_memecoins")]
    pub non_memecoins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    /// Concurrent swap requests per analysis
    #[serde(default = "default_max_concurrent_requests")]
    pub max_concurrent_requests: usize,
    /// Followers listed in summaries
    #[serde(default = "default_top_n")]
    pub top_n: usize,
}

// Default value functions
fn default_helius_url() -> String {
    "https://api.helius.xyz".to_string()
}
fn default_tx_types() -> Vec<String> {
    vec!["SWAP".to_string(), "TRANSFER".to_string()]
}
fn default_page_size() -> u32 {
    100
}
fn default_max_transactions() -> usize {
    500
}
fn default_page_delay_ms() -> u64 {
    500
}
fn default_timeout_ms() -> u64 {
    30_000
}
fn default_retry_max_elapsed_ms() -> u64 {
    30_000
}
fn default_moralis_url() -> String {
    "https://solana-gateway.moralis.io".to_string()
}
fn default_window_secs() -> i64 {
    2
}
fn default_max_pages() -> u32 {
    20
}
fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}
fn default_non_memecoins() -> Vec<String> {
    NON_MEMECOINS.iter().map(|m| m.to_string()).collect()
}
fn default_max_concurrent_requests() -> usize {
    5
}
fn default_top_n() -> usize {
    5
}

impl Default for HeliusConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_helius_url(),
            tx_types: default_tx_types(),
            page_size: default_page_size(),
            max_transactions: default_max_transactions(),
            page_delay_ms: default_page_delay_ms(),
            timeout_ms: default_timeout_ms(),
            retry_max_elapsed_ms: default_retry_max_elapsed_ms(),
        }
    }
}

impl Default for MoralisConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_moralis_url(),
            window_secs: default_window_secs(),
            max_pages: default_max_pages(),
            timeout_ms: default_timeout_ms(),
            retry_max_elapsed_ms: default_retry_max_elapsed_ms(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

impl Default for TokensConfig {
    fn default() -> Self {
        Self {
            non_memecoins: default_non_memecoins(),
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            max_concurrent_requests: default_max_concurrent_requests(),
            top_n: default_top_n(),
        }
    }
}

impl Config {
    /// Load configuration from file and environment
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let settings = config::Config::builder()
            // Start with defaults
            .set_default("helius.base_url", default_helius_url())?
            .set_default("helius.page_size", default_page_size() as i64)?
            .set_default("moralis.base_url", default_moralis_url())?
            .set_default("moralis.window_secs", default_window_secs())?
            .set_default("storage.data_dir", "data")?
            // Load from file if exists
            .add_source(config::File::from(path).required(false))
            // Override with environment variables (prefix FOLLOWER_SCAN__)
            .add_source(
                config::Environment::with_prefix("FOLLOWER_SCAN")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to build configuration")?;

        let config: Config = settings
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.helius.page_size == 0 || self.helius.page_size > 100 {
            anyhow::bail!(
                "helius.page_size must be between 1 and 100, got {}",
                self.helius.page_size
            );
        }

        if self.helius.max_transactions == 0 {
            anyhow::bail!("helius.max_transactions must be positive");
        }

        if self.helius.tx_types.is_empty() {
            anyhow::bail!("helius.tx_types must name at least one transaction type");
        }

        if self.moralis.window_secs <= 0 {
            anyhow::bail!("moralis.window_secs must be positive");
        }

        if self.moralis.max_pages == 0 {
            anyhow::bail!("moralis.max_pages must be positive");
        }

        if self.service.max_concurrent_requests == 0 {
            anyhow::bail!("service.max_concurrent_requests must be positive");
        }

        self.engine
            .validate()
            .context("Invalid [engine] section")?;

        Ok(())
    }

    /// Helius key, required only by commands that hit the network
    pub fn helius_api_key(&self) -> crate::Result<&str> {
        if self.helius.api_key.is_empty() {
            return Err(crate::Error::MissingApiKey("helius"));
        }
        Ok(&self.helius.api_key)
    }

    /// Moralis key, required only by commands that hit the network
    pub fn moralis_api_key(&self) -> crate::Result<&str> {
        if self.moralis.api_key.is_empty() {
            return Err(crate::Error::MissingApiKey("moralis"));
        }
        Ok(&self.moralis.api_key)
    }

    /// Get masked configuration for display (hide secrets)
    pub fn masked_display(&self) -> String {
        format!(
            r#"Configuration:
  Helius:
    base_url: {}
    api_key: {}
    tx_types: {:?}
    page_size: {}
    max_transactions: {}
    page_delay: {}ms
  Moralis:
    base_url: {}
    api_key: {}
    window: {}s
    max_pages: {}
  Engine:
    window: {} slots
    speed_threshold: {} slots
    min_hits: {}
    weights: frequency={} speed={} breadth={}
    tiers: gold={} silver={} bronze={}
    hit_counting: {:?}
    exclude_leader: {}
  Storage:
    data_dir: {}
  Tokens:
    non_memecoins: {}
  Service:
    max_concurrent_requests: {}
"#,
            mask_url(&self.helius.base_url),
            mask_key(&self.helius.api_key),
            self.helius.tx_types,
            self.helius.page_size,
            self.helius.max_transactions,
            self.helius.page_delay_ms,
            mask_url(&self.moralis.base_url),
            mask_key(&self.moralis.api_key),
            self.moralis.window_secs,
            self.moralis.max_pages,
            self.engine.window_slots,
            self.engine.speed_threshold_slots,
            self.engine.min_hits,
            self.engine.weights.frequency,
            self.engine.weights.speed,
            self.engine.weights.breadth,
            self.engine.tiers.gold,
            self.engine.tiers.silver,
            self.engine.tiers.bronze,
            self.engine.hit_counting,
            self.engine.exclude_leader,
            self.storage.data_dir.display(),
            self.tokens.non_memecoins.len(),
            self.service.max_concurrent_requests,
        )
    }
}

/// Mask URL for display (hide API keys in query params)
fn mask_url(url: &str) -> String {
    if let Some(idx) = url.find('?') {
        format!("{}?***", &url[..idx])
    } else {
        url.to_string()
    }
}

/// Mask an API key, keeping a short prefix for recognition
fn mask_key(key: &str) -> String {
    if key.is_empty() {
        "(not set)".to_string()
    } else if key.chars().count() <= 8 {
        "***".to_string()
    } else {
        format!("{}***", key.chars().take(4).collect::<String>())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.helius.page_size, 100);
        assert_eq!(config.helius.max_transactions, 500);
        assert_eq!(config.moralis.window_secs, 2);
        assert_eq!(config.service.max_concurrent_requests, 5);
        assert_eq!(config.tokens.non_memecoins.len(), 4);
        assert_eq!(config.engine.window_slots, 10);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[helius]
api_key = "helius-test-key"
max_transactions = 200

[engine]
speed_threshold_slots = 3.0
hit_counting = "rows"

[engine.tiers]
gold = 0.8

[storage]
data_dir = "/tmp/scan"
"#
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.helius.api_key, "helius-test-key");
        assert_eq!(config.helius.max_transactions, 200);
        assert_eq!(config.helius.page_size, 100);
        assert_eq!(config.engine.speed_threshold_slots, 3.0);
        assert_eq!(config.engine.hit_counting, HitCounting::Rows);
        assert_eq!(config.engine.tiers.gold, 0.8);
        assert_eq!(config.engine.tiers.silver, 0.5);
        assert_eq!(config.storage.data_dir, PathBuf::from("/tmp/scan"));
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.helius.base_url, "https://api.helius.xyz");
        assert_eq!(config.moralis.base_url, "https://solana-gateway.moralis.io");
    }

    #[test]
    fn test_invalid_engine_rejected() {
        let mut config = Config::default();
        config.engine.window_slots = 3;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.helius.page_size = 250;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_api_keys_required_on_demand() {
        let mut config = Config::default();
        assert!(matches!(
            config.helius_api_key(),
            Err(crate::Error::MissingApiKey("helius"))
        ));
        config.moralis.api_key = "abc".to_string();
        assert_eq!(config.moralis_api_key().unwrap(), "abc");
    }

    #[test]
    fn test_masked_display_hides_keys() {
        let mut config = Config::default();
        config.helius.api_key = "0123456789abcdef".to_string();
        let shown = config.masked_display();
        assert!(shown.contains("0123***"));
        assert!(!shown.contains("0123456789abcdef"));
        assert!(shown.contains("api_key: (not set)"));
    }

    #[test]
    fn test_mask_key_multibyte() {
        assert_eq!(mask_key("abcé123456789"), "abcé***");
        assert_eq!(mask_key("ééééé"), "***");
        assert_eq!(mask_key(""), "(not set)");
    }

    #[test]
    fn test_mask_url() {
        assert_eq!(
            mask_url("https://api.example.com?key=secret"),
            "https://api.example.com?***"
        );
        assert_eq!(
            mask_url("https://api.example.com"),
            "https://api.example.com"
        );
    }
}

//! Helius API client for wallet transaction history
//!
//! Pages backwards through `/v0/addresses/{wallet}/transactions` using the
//! `before` signature cursor until the configured cap is reached.

use async_trait::async_trait;
use backoff::{future::retry, ExponentialBackoff};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::HeliusConfig;
use crate::error::{Error, Result};
use crate::source::TransactionSource;

const SERVICE: &str = "helius";

/// Helius API client
pub struct HeliusClient {
    /// HTTP client
    client: Client,
    config: HeliusConfig,
}

impl HeliusClient {
    pub fn new(config: HeliusConfig) -> Result<Self> {
        if config.api_key.is_empty() {
            return Err(Error::MissingApiKey(SERVICE));
        }

        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| Error::Http(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff {
            initial_interval: Duration::from_millis(500),
            max_interval: Duration::from_secs(8),
            max_elapsed_time: Some(Duration::from_millis(self.config.retry_max_elapsed_ms)),
            ..Default::default()
        }
    }

    fn page_query(&self, before: Option<&str>) -> Vec<(&'static str, String)> {
        let mut query = vec![
            ("api-key", self.config.api_key.clone()),
            ("limit", self.config.page_size.to_string()),
        ];
        for tx_type in &self.config.tx_types {
            query.push(("type", tx_type.clone()));
        }
        if let Some(before) = before {
            query.push(("before", before.to_string()));
        }
        query
    }

    /// Fetch one page (single attempt)
    async fn fetch_page_once(&self, wallet: &str, before: Option<&str>) -> Result<Vec<Value>> {
        let url = format!("{}/v0/addresses/{}/transactions", self.config.base_url, wallet);

        let response = self
            .client
            .get(&url)
            .query(&self.page_query(before))
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

        let page: Vec<Value> = response.json().await?;
        Ok(page)
    }

    /// Fetch one page with retry on transient failures
    async fn fetch_page(&self, wallet: &str, before: Option<&str>) -> Result<Vec<Value>> {
        retry(self.backoff(), || async {
            match self.fetch_page_once(wallet, before).await {
                Ok(page) => Ok(page),
                Err(e) if e.is_retryable() => {
                    warn!(wallet, error = %e, "Retryable Helius error");
                    Err(backoff::Error::transient(e))
                }
                Err(e) => Err(backoff::Error::permanent(e)),
            }
        })
        .await
    }
}

#[async_trait]
impl TransactionSource for HeliusClient {
    fn name(&self) -> &'static str {
        SERVICE
    }

    async fn recent_transactions(&self, wallet: &str) -> Result<Vec<Value>> {
        let cap = self.config.max_transactions;
        let mut all: Vec<Value> = Vec::new();
        let mut before: Option<String> = None;

        while all.len() < cap {
            let page = self.fetch_page(wallet, before.as_deref()).await?;
            if page.is_empty() {
                debug!(wallet, "No more transactions to fetch");
                break;
            }

            before = page
                .last()
                .and_then(|tx| tx.get("signature"))
                .and_then(Value::as_str)
                .map(str::to_string);
            all.extend(page);

            debug!(wallet, fetched = all.len(), "Fetched transaction page");

            if before.is_none() {
                warn!(wallet, "Last record of page has no signature, stopping pagination");
                break;
            }
            if all.len() < cap {
                tokio::time::sleep(Duration::from_millis(self.config.page_delay_ms)).await;
            }
        }

        all.truncate(cap);
        info!(wallet, count = all.len(), "Fetched wallet transactions");
        Ok(all)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> HeliusConfig {
        HeliusConfig {
            api_key: "test-key".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_requires_api_key() {
        assert!(matches!(
            HeliusClient::new(HeliusConfig::default()),
            Err(Error::MissingApiKey("helius"))
        ));
    }

    #[test]
    fn test_page_query_repeats_types() {
        let client = HeliusClient::new(config()).unwrap();
        let query = client.page_query(Some("SIG"));

        let types: Vec<_> = query
            .iter()
            .filter(|(k, _)| *k == "type")
            .map(|(_, v)| v.as_str())
            .collect();
        assert_eq!(types, vec!["SWAP", "TRANSFER"]);
        assert!(query.contains(&("limit", "100".to_string())));
        assert!(query.contains(&("before", "SIG".to_string())));
        assert!(!client.page_query(None).iter().any(|(k, _)| *k == "before"));
    }
}

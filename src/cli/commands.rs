//! CLI command implementations

use anyhow::{Context, Result};
use solana_sdk::pubkey::Pubkey;
use std::str::FromStr;
use tracing::{info, warn};

use crate::config::Config;
use crate::engine::summary::{ScoreSummary, TradeSummary};
use crate::engine::types::{FollowerScore, SkippedRecord, Tier};
use crate::error::Error;
use crate::service::CopyTraderService;

/// Check that `address` is a base58 Solana public key
pub fn validate_wallet(address: &str) -> crate::error::Result<Pubkey> {
    Pubkey::from_str(address).map_err(|e| Error::InvalidAddress(format!("{}: {}", address, e)))
}

/// clap value parser for wallet arguments
pub fn parse_wallet(s: &str) -> std::result::Result<String, String> {
    validate_wallet(s)
        .map(|_| s.to_string())
        .map_err(|e| e.to_string())
}

fn offline_service(config: &Config) -> Result<CopyTraderService> {
    CopyTraderService::new(config).context("Failed to initialise engine")
}

fn online_service(config: &Config) -> Result<CopyTraderService> {
    config.helius_api_key()?;
    config.moralis_api_key()?;
    CopyTraderService::from_config(config).context("Failed to initialise API clients")
}

fn report_skipped(skipped: &[SkippedRecord]) {
    if skipped.is_empty() {
        return;
    }
    warn!(count = skipped.len(), "Some records were skipped");
    for record in skipped.iter().take(10) {
        println!("  skipped {:?} {}: {}", record.kind, record.id, record.reason);
    }
    if skipped.len() > 10 {
        println!("  ... and {} more", skipped.len() - 10);
    }
}

fn print_scores(scores: &[FollowerScore], tier: Option<Tier>, top_n: usize) {
    let shown: Vec<FollowerScore> = match tier {
        Some(tier) => scores.iter().filter(|s| s.tier == tier).cloned().collect(),
        None => scores.to_vec(),
    };
    println!("{}", ScoreSummary::from_scores(&shown, top_n));
}

/// Fetch and save the wallet's recent transactions
pub async fn fetch(config: &Config, wallet: &str) -> Result<()> {
    let service = online_service(config)?;
    let transactions = service.fetch_transactions(wallet).await?;

    println!("\n=== FETCH ===\n");
    println!("Wallet: {}", wallet);
    println!("Transactions saved: {}", transactions.len());
    println!("Stored in: {}", service.store(wallet).root().display());
    Ok(())
}

/// Extract leader buys from saved transactions
pub async fn filter(config: &Config, wallet: &str) -> Result<()> {
    let service = offline_service(config)?;
    let extraction = service.filter_transactions(wallet).await?;

    println!("\n=== FILTER ===\n");
    println!("Transactions scanned: {}", extraction.scanned);
    println!("Memecoin buys:        {}", extraction.buys.len());
    println!("Buy percentage:       {:.2}%", extraction.buy_percentage());
    report_skipped(&extraction.skipped);
    Ok(())
}

/// Fetch swaps around every saved leader buy
pub async fn swaps(config: &Config, wallet: &str) -> Result<()> {
    let service = online_service(config)?;
    let (activity, skipped) = service.fetch_swaps(wallet).await?;

    let total: usize = activity.iter().map(|a| a.swaps.len()).sum();
    println!("\n=== SWAPS ===\n");
    println!("Leader buys processed: {}", activity.len());
    println!("Swaps collected:       {}", total);
    report_skipped(&skipped);
    Ok(())
}

/// Build and save the cleaned copy-trade table
pub async fn analyze(config: &Config, wallet: &str) -> Result<()> {
    let service = offline_service(config)?;
    let (output, skipped) = service.analyze_copy_trades(wallet).await?;

    println!("\n=== COPY TRADES ===\n");
    println!("{}", TradeSummary::from_trades(&output.copy_trades));
    println!(
        "\nDropped: {} front-run, {} outside window, {} self-match",
        output.cleaning.front_run, output.cleaning.outside_window, output.cleaning.self_match
    );
    report_skipped(&skipped);
    Ok(())
}

/// Score the latest copy-trade table
pub async fn score(config: &Config, wallet: &str, tier: Option<Tier>) -> Result<()> {
    let service = offline_service(config)?;
    let scores = service.score_wallet(wallet).await?;

    println!("\n=== FOLLOWER SCORES ===\n");
    print_scores(&scores, tier, config.service.top_n);
    Ok(())
}

/// Full analysis: fetch, filter, swaps, match and score
pub async fn run(config: &Config, wallet: &str, tier: Option<Tier>, json: bool) -> Result<()> {
    let service = online_service(config)?;
    let mut report = service.analyze_wallet(wallet).await?;

    if let Some(tier) = tier {
        report.followers.retain(|f| f.tier == tier);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("\n=== ANALYSIS: {} ===\n", report.wallet);
    println!("Transactions scanned: {}", report.transactions_scanned);
    println!("Leader buys:          {}", report.leader_buys);
    println!("Copy trades:          {}", report.copy_trade_count);
    println!("Lead buys copied:     {}", report.total_lead_buys);
    println!();
    if report.no_leader_activity() {
        println!("No leader activity found");
    } else {
        print_scores(&report.followers, None, config.service.top_n);
    }
    report_skipped(&report.skipped);
    info!(wallet, followers = report.followers.len(), "Analysis finished");
    Ok(())
}

/// Show the copy transactions of one follower
pub async fn show(config: &Config, wallet: &str, follower: &str) -> Result<()> {
    let service = offline_service(config)?;
    let rows = service.follower_transactions(wallet, follower).await?;

    println!("\n=== COPY TRANSACTIONS: {} ===\n", follower);
    if rows.is_empty() {
        println!("No copy trades found for this follower.");
        return Ok(());
    }

    for row in &rows {
        let usd = |v: Option<f64>| v.map(|v| format!("${:.2}", v)).unwrap_or_else(|| "-".to_string());
        println!(
            "{}  leader slot {} ({})  follower slot {} ({})  delay {} [{}]",
            row.token_mint,
            row.leader.slot,
            usd(row.leader.usd_value),
            row.follower.slot,
            usd(row.follower.usd_value),
            row.delay_slots,
            row.delay_class
        );
        if let Some(signature) = &row.follower.signature {
            println!("    tx: {}", signature);
        }
    }
    println!("\nTotal: {}", rows.len());
    Ok(())
}

/// Show configuration (secrets masked)
pub fn show_config(config: &Config) -> Result<()> {
    println!("{}", config.masked_display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_wallet() {
        let wallet = "DNfuF1L62WWyW3pNakVkyGGFzVVhj4Yr52jSmdTyeBHm";
        assert_eq!(parse_wallet(wallet).unwrap(), wallet);
        assert!(parse_wallet("not-a-wallet").is_err());
        assert!(parse_wallet("0OIl").is_err());
        assert!(parse_wallet("").is_err());
    }

    #[test]
    fn test_invalid_wallet_error() {
        assert!(matches!(
            validate_wallet("not-a-wallet"),
            Err(Error::InvalidAddress(_))
        ));
        let message = parse_wallet("not-a-wallet").unwrap_err();
        assert!(message.starts_with("Invalid wallet address: not-a-wallet"));
    }

    #[test]
    fn test_online_commands_need_keys() {
        let config = Config::default();
        assert!(online_service(&config).is_err());
    }
}

//! Follower Scan - copy-trader detection for Solana wallets
//!
//! Given a tracked wallet, finds the wallets that buy the same memecoins a
//! few slots after it does and ranks them by consistency, speed and breadth.

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::error;

// Use the library crate
use follower_scan::cli::commands::{self, parse_wallet};
use follower_scan::config::Config;
use follower_scan::engine::types::Tier;

/// Follower Scan - copy-trader detection
#[derive(Parser)]
#[command(name = "scan")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "follower-scan.toml")]
    config: String,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the wallet's recent SWAP and TRANSFER transactions
    Fetch {
        #[arg(value_parser = parse_wallet)]
        wallet: String,
    },

    /// Extract memecoin buys from saved transactions
    Filter {
        #[arg(value_parser = parse_wallet)]
        wallet: String,
    },

    /// Fetch token swaps in the window after each leader buy
    Swaps {
        #[arg(value_parser = parse_wallet)]
        wallet: String,
    },

    /// Match saved buys and swaps into a copy-trade table
    Analyze {
        #[arg(value_parser = parse_wallet)]
        wallet: String,
    },

    /// Score followers from the latest copy-trade table
    Score {
        #[arg(value_parser = parse_wallet)]
        wallet: String,

        /// Only list followers of this tier (gold, silver, bronze, unranked)
        #[arg(long)]
        tier: Option<Tier>,
    },

    /// Run the full analysis for a wallet
    Run {
        #[arg(value_parser = parse_wallet)]
        wallet: String,

        /// Only list followers of this tier (gold, silver, bronze, unranked)
        #[arg(long)]
        tier: Option<Tier>,

        /// Print the report as JSON
        #[arg(long)]
        report_json: bool,
    },

    /// Show the copy transactions of one follower
    Show {
        #[arg(value_parser = parse_wallet)]
        wallet: String,

        #[arg(value_parser = parse_wallet)]
        follower: String,
    },

    /// Show current configuration (secrets masked)
    Config,
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(
        "follower_scan=info"
            .parse()
            .unwrap_or_else(|_| tracing_subscriber::filter::LevelFilter::INFO.into()),
    );

    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Parse CLI arguments
    let cli = Cli::parse();

    init_tracing(cli.json);

    // Load configuration
    let config = match Config::load(&cli.config) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Failed to load configuration: {:#}", e);
            std::process::exit(1);
        }
    };

    // Execute command
    let result = match cli.command {
        Commands::Fetch { wallet } => commands::fetch(&config, &wallet).await,
        Commands::Filter { wallet } => commands::filter(&config, &wallet).await,
        Commands::Swaps { wallet } => commands::swaps(&config, &wallet).await,
        Commands::Analyze { wallet } => commands::analyze(&config, &wallet).await,
        Commands::Score { wallet, tier } => commands::score(&config, &wallet, tier).await,
        Commands::Run {
            wallet,
            tier,
            report_json,
        } => commands::run(&config, &wallet, tier, report_json).await,
        Commands::Show { wallet, follower } => commands::show(&config, &wallet, &follower).await,
        Commands::Config => commands::show_config(&config),
    };

    if let Err(e) = result {
        error!("Command failed: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

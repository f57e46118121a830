//! Follower Scan Library
//!
//! Detects wallets that copy-trade a tracked Solana wallet and scores them
//! by how consistently, quickly and broadly they follow it.

pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod service;
pub mod source;
pub mod store;

// Re-export commonly used types
pub use config::Config;
pub use engine::{CopyTradeEngine, EngineConfig, FollowerScore, Tier};
pub use error::{Error, Result};
pub use service::{AnalysisReport, CopyTraderService};

//! Run summaries for logs and CLI output

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;

use crate::engine::types::{CleanedCopyTrade, FollowerScore, Tier};

/// Descriptive statistics of a numeric column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation; `None` below two observations
    pub std: Option<f64>,
    pub min: f64,
    pub p25: f64,
    pub p50: f64,
    pub p75: f64,
    pub max: f64,
}

/// Linear-interpolated quantile of sorted values
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    let frac = pos - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * frac
}

impl Stats {
    pub fn from_values(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));

        let count = sorted.len();
        let mean = sorted.iter().sum::<f64>() / count as f64;
        let std = (count > 1).then(|| {
            let var = sorted.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (count - 1) as f64;
            var.sqrt()
        });

        Some(Self {
            count,
            mean,
            std,
            min: sorted[0],
            p25: quantile(&sorted, 0.25),
            p50: quantile(&sorted, 0.5),
            p75: quantile(&sorted, 0.75),
            max: sorted[count - 1],
        })
    }
}

impl fmt::Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "  count  {}", self.count)?;
        writeln!(f, "  mean   {:.3}", self.mean)?;
        match self.std {
            Some(std) => writeln!(f, "  std    {:.3}", std)?,
            None => writeln!(f, "  std    -")?,
        }
        writeln!(f, "  min    {:.3}", self.min)?;
        writeln!(f, "  25%    {:.3}", self.p25)?;
        writeln!(f, "  50%    {:.3}", self.p50)?;
        writeln!(f, "  75%    {:.3}", self.p75)?;
        write!(f, "  max    {:.3}", self.max)
    }
}

/// Overview of a cleaned copy-trade table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeSummary {
    pub total_copy_trades: usize,
    pub unique_lead_transactions: usize,
    pub unique_followers: usize,
    pub unique_tokens: usize,
    pub delay: Option<Stats>,
}

impl TradeSummary {
    pub fn from_trades(trades: &[CleanedCopyTrade]) -> Self {
        let leads: HashSet<&str> = trades.iter().map(|t| t.leader_signature.as_str()).collect();
        let followers: HashSet<&str> = trades.iter().map(|t| t.follower_address.as_str()).collect();
        let tokens: HashSet<&str> = trades.iter().map(|t| t.token_mint.as_str()).collect();
        let delays: Vec<f64> = trades.iter().map(|t| t.delay_slots as f64).collect();

        Self {
            total_copy_trades: trades.len(),
            unique_lead_transactions: leads.len(),
            unique_followers: followers.len(),
            unique_tokens: tokens.len(),
            delay: Stats::from_values(&delays),
        }
    }
}

impl fmt::Display for TradeSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Total copy trades:        {}", self.total_copy_trades)?;
        writeln!(f, "Unique lead transactions: {}", self.unique_lead_transactions)?;
        writeln!(f, "Unique followers:         {}", self.unique_followers)?;
        write!(f, "Unique tokens:            {}", self.unique_tokens)?;
        if let Some(delay) = &self.delay {
            write!(f, "\nDelay (slots):\n{}", delay)?;
        }
        Ok(())
    }
}

/// Overview of a scoring run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreSummary {
    pub followers_analyzed: usize,
    /// Count per tier, every tier present
    pub tiers: BTreeMap<Tier, usize>,
    pub score: Option<Stats>,
    pub top: Vec<FollowerScore>,
}

impl ScoreSummary {
    /// `scores` are expected best first, as the scorer returns them
    pub fn from_scores(scores: &[FollowerScore], top_n: usize) -> Self {
        let mut tiers: BTreeMap<Tier, usize> = Tier::ALL.iter().map(|t| (*t, 0)).collect();
        for s in scores {
            *tiers.entry(s.tier).or_default() += 1;
        }
        let values: Vec<f64> = scores.iter().map(|s| s.score).collect();

        Self {
            followers_analyzed: scores.len(),
            tiers,
            score: Stats::from_values(&values),
            top: scores.iter().take(top_n).cloned().collect(),
        }
    }
}

impl fmt::Display for ScoreSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Followers analyzed: {}", self.followers_analyzed)?;
        writeln!(f, "Tier distribution:")?;
        for (tier, count) in &self.tiers {
            writeln!(f, "  {:<9} {}", tier.as_str(), count)?;
        }
        if let Some(score) = &self.score {
            writeln!(f, "Score:\n{}", score)?;
        }
        if self.top.is_empty() {
            return write!(f, "No followers found");
        }
        write!(f, "Top {} followers:", self.top.len())?;
        for s in &self.top {
            write!(
                f,
                "\n  {}  score={:.3}  tier={}  hits={}  breadth={}  avg_delay={:.2}",
                s.address(),
                s.score,
                s.tier,
                s.metrics.hits,
                s.metrics.breadth,
                s.metrics.avg_delay
            )?;
        }
        Ok(())
    }
}

//! Shared types for the CALLSIGN agent.
//!
//! These types form the data model used across all modules.
//! They are designed to be stable so that provider, pipeline,
//! and posting modules can depend on them without circular references.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ---------------------------------------------------------------------------
// Risk report (TrenchBot bundle analysis)
// ---------------------------------------------------------------------------

/// Creator risk level as reported by the bundle analyser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskLevel::Low => write!(f, "LOW"),
            RiskLevel::Medium => write!(f, "MEDIUM"),
            RiskLevel::High => write!(f, "HIGH"),
        }
    }
}

impl FromStr for RiskLevel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "LOW" => Ok(RiskLevel::Low),
            "MEDIUM" | "MED" => Ok(RiskLevel::Medium),
            "HIGH" => Ok(RiskLevel::High),
            other => anyhow::bail!("Unknown risk level: {other}"),
        }
    }
}

/// Deployer (coin creator) holdings and history summary.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CreatorAnalysis {
    #[serde(default)]
    pub current_holdings: f64,
    #[serde(default)]
    pub holding_percentage: f64,
    /// Raw risk level string from the API: "LOW" | "MEDIUM" | "HIGH".
    #[serde(default)]
    pub risk_level: String,
}

impl CreatorAnalysis {
    /// Parsed risk level. Unparseable values are treated as `Medium`
    /// so a malformed response neither auto-rejects nor auto-passes.
    pub fn risk(&self) -> RiskLevel {
        self.risk_level.parse().unwrap_or(RiskLevel::Medium)
    }
}

/// Bundle-risk assessment for one mint.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RiskReport {
    #[serde(default)]
    pub bonded: bool,
    #[serde(default)]
    pub creator_analysis: CreatorAnalysis,
    #[serde(default)]
    pub total_bundles: u32,
    #[serde(default)]
    pub total_holding_amount: f64,
    #[serde(default)]
    pub total_holding_percentage: f64,
    /// Share of supply bought in bundles at launch (0–100).
    #[serde(default)]
    pub total_percentage_bundled: f64,
    #[serde(default)]
    pub total_sol_spent: f64,
    #[serde(default)]
    pub total_tokens_bundled: f64,
}

impl fmt::Display for RiskReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "bundled={:.1}% deployer={:.1}% ({})",
            self.total_percentage_bundled,
            self.creator_analysis.holding_percentage,
            self.creator_analysis.risk(),
        )
    }
}

// ---------------------------------------------------------------------------
// Market snapshot (launchpad profile + pair stats)
// ---------------------------------------------------------------------------

/// A metric observed over the standard trading windows.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct WindowedStat {
    #[serde(rename = "5min", default)]
    pub m5: f64,
    #[serde(rename = "1h", default)]
    pub h1: f64,
    #[serde(rename = "4h", default)]
    pub h4: f64,
    #[serde(rename = "24h", default)]
    pub h24: f64,
}

/// A trader/trade count observed over the standard trading windows.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct WindowedCount {
    #[serde(rename = "5min", default)]
    pub m5: u64,
    #[serde(rename = "1h", default)]
    pub h1: u64,
    #[serde(rename = "4h", default)]
    pub h4: u64,
    #[serde(rename = "24h", default)]
    pub h24: u64,
}

/// Point-in-time market metrics for one mint.
///
/// Fields serialize in camelCase so stored records keep the shape of the
/// upstream pair-stats payload they are derived from.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct MarketSnapshot {
    pub token_address: String,
    pub token_name: String,
    /// Cashtag-style handle: `$SYM`, or `#SYM` when longer than six chars.
    pub token_symbol: String,
    pub token_logo: String,
    pub pair_address: String,
    pub exchange: String,
    pub current_usd_price: String,
    /// USD market cap from the launchpad profile (authoritative for
    /// bonding-curve coins, where pair stats lag).
    pub current_market_cap: f64,
    pub total_liquidity_usd: String,
    pub price_percent_change: WindowedStat,
    pub total_volume: WindowedStat,
    pub buy_volume: WindowedStat,
    pub sell_volume: WindowedStat,
    pub buys: WindowedCount,
    pub sells: WindowedCount,
    pub buyers: WindowedCount,
    pub sellers: WindowedCount,
    /// Coin creation time, unix millis.
    pub deployed: i64,
}

impl fmt::Display for MarketSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}) mcap={} vol24h=${:.0} on {}",
            self.token_name,
            self.token_symbol,
            format_market_cap(self.current_market_cap),
            self.total_volume.h24,
            self.exchange,
        )
    }
}

/// Render a token symbol as a social handle: `$SYM` for short symbols,
/// `#SYM` for long ones (cashtags cap out at six characters).
pub fn symbol_handle(symbol: &str) -> String {
    let upper = symbol.to_uppercase();
    if upper.len() > 6 {
        format!("#{upper}")
    } else {
        format!("${upper}")
    }
}

/// Format a USD market cap compactly: `$1.25M`, `$35.00K`, `$950.00`.
pub fn format_market_cap(market_cap: f64) -> String {
    if market_cap >= 1_000_000.0 {
        format!("${:.2}M", market_cap / 1_000_000.0)
    } else if market_cap >= 1_000.0 {
        format!("${:.2}K", market_cap / 1_000.0)
    } else {
        format!("${market_cap:.2}")
    }
}

// ---------------------------------------------------------------------------
// Qualification record
// ---------------------------------------------------------------------------

/// The immutable baseline persisted when a coin is accepted: its market
/// snapshot merged with its risk report, stored flat (one JSON object)
/// under the mint's record key. Written once, never mutated; the
/// retrospective reviewer reads `market.current_market_cap` back as the
/// entry market cap.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct QualificationRecord {
    #[serde(flatten)]
    pub market: MarketSnapshot,
    #[serde(flatten)]
    pub risk: RiskReport,
}

impl QualificationRecord {
    pub fn new(market: MarketSnapshot, risk: RiskReport) -> Self {
        Self { market, risk }
    }
}

/// A qualified coin handed back by the pipeline, ready for the caller to
/// render, write up, and post.
#[derive(Debug, Clone)]
pub struct AcceptedCall {
    pub mint: String,
    pub record: QualificationRecord,
}

// ---------------------------------------------------------------------------
// Retrospective review
// ---------------------------------------------------------------------------

/// Outcome classification for a previously called coin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReviewStatus {
    Profit,
    Stable,
    Rug,
}

impl ReviewStatus {
    /// Sort rank: PROFIT before STABLE before RUG.
    pub fn rank(&self) -> u8 {
        match self {
            ReviewStatus::Profit => 0,
            ReviewStatus::Stable => 1,
            ReviewStatus::Rug => 2,
        }
    }
}

impl fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReviewStatus::Profit => write!(f, "PROFIT"),
            ReviewStatus::Stable => write!(f, "STABLE"),
            ReviewStatus::Rug => write!(f, "RUG"),
        }
    }
}

/// How one called coin has performed since its entry call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoinReview {
    pub address: String,
    pub symbol: String,
    pub initial_market_cap: f64,
    pub current_market_cap: f64,
    /// Human-readable summary, e.g. `Profit! +42.0%` or `-12.3%` or `RUG`.
    pub performance: String,
    pub status: ReviewStatus,
    pub multiplier: Option<f64>,
    pub decline_percentage: Option<f64>,
    pub profit_percentage: Option<f64>,
}

impl fmt::Display for CoinReview {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} → {} [{}]",
            self.symbol,
            format_market_cap(self.initial_market_cap),
            format_market_cap(self.current_market_cap),
            self.performance,
        )
    }
}

// ---------------------------------------------------------------------------
// Post receipts
// ---------------------------------------------------------------------------

/// Receipt for a published (or dry-run) social post.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostReceipt {
    pub post_id: String,
    pub dry_run: bool,
    pub posted_at: DateTime<Utc>,
}

impl PostReceipt {
    /// A receipt for a post that was composed but not sent.
    pub fn dry_run() -> Self {
        Self {
            post_id: format!("dry-run-{}", uuid::Uuid::new_v4()),
            dry_run: true,
            posted_at: Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Domain-specific error types for CALLSIGN.
#[derive(Debug, thiserror::Error)]
pub enum CallsignError {
    #[error("Provider error ({provider}): {message}")]
    Provider { provider: String, message: String },

    #[error("LLM error ({model}): {message}")]
    Llm { model: String, message: String },

    #[error("Store error: {0}")]
    Store(String),

    #[error("Publish error: {0}")]
    Publish(String),

    #[error("Render error: {0}")]
    Render(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

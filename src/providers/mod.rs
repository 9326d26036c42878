//! Provider integrations.
//!
//! Defines the three collaborator seams the qualification pipeline depends
//! on, and provides implementations for:
//! - Bitquery — DEX-trades feed of freshly traded pump.fun mints
//! - TrenchBot — bundle / deployer risk analysis
//! - pump.fun + Moralis — coin profile and pair stats, merged into a
//!   `MarketSnapshot`

pub mod bitquery;
pub mod moralis;
pub mod pumpfun;
pub mod trenchbot;

use anyhow::Result;
use async_trait::async_trait;

use crate::types::{MarketSnapshot, RiskReport};

/// Source of candidate mints for the current polling cycle.
///
/// Implementors return a bounded batch of newly observed mint addresses in
/// feed order (newest first). An empty batch is a normal outcome, not an
/// error.
#[async_trait]
pub trait CandidateFeed: Send + Sync {
    /// Poll one batch of candidate mint addresses.
    async fn poll_batch(&self) -> Result<Vec<String>>;

    /// Feed name for logging and identification.
    fn name(&self) -> &str;
}

/// Bundle/deployer risk assessment for a single mint.
#[async_trait]
pub trait RiskEvaluator: Send + Sync {
    /// Assess launch-bundle and creator risk for a mint.
    async fn assess(&self, mint: &str) -> Result<RiskReport>;

    /// Evaluator name for logging and identification.
    fn name(&self) -> &str;
}

/// Current market metrics for a single mint.
#[async_trait]
pub trait MarketData: Send + Sync {
    /// Fetch a point-in-time market snapshot for a mint.
    async fn snapshot(&self, mint: &str) -> Result<MarketSnapshot>;

    /// Source name for logging and identification.
    fn name(&self) -> &str;
}

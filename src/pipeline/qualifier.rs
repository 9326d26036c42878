//! Coin qualification pipeline.
//!
//! Pulls a batch of freshly traded mints from the candidate feed, drops the
//! ones already called, then walks the remainder in feed order through two
//! gates (bundle/deployer risk, then market cap) until one coin survives.
//! The survivor's merged snapshot is persisted and the mint joins the called
//! set before the call is handed back to the caller.
//!
//! The operation never returns "no candidate": an exhausted batch backs off
//! and refetches, indefinitely, until a coin is accepted or the shutdown
//! token fires. The token is checked at each batch boundary.

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::providers::{CandidateFeed, MarketData, RiskEvaluator};
use crate::store::CallStore;
use crate::types::{AcceptedCall, MarketSnapshot, QualificationRecord, RiskLevel, RiskReport};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct QualifierConfig {
    /// Reject when more than this share of supply was bundle-bought (0–100).
    pub max_bundled_pct: f64,
    /// Reject when the deployer still holds more than this share (0–100).
    pub max_creator_holding_pct: f64,
    /// Reject below this USD market cap (strict less-than).
    pub min_market_cap_usd: f64,
    /// Spacing between bundle-risk lookups; the analyser rate-limits hard.
    pub risk_check_delay: Duration,
    /// Backoff before refetching when a whole batch filtered out.
    pub refetch_backoff: Duration,
}

impl Default for QualifierConfig {
    fn default() -> Self {
        Self {
            max_bundled_pct: 50.0,
            max_creator_holding_pct: 50.0,
            min_market_cap_usd: 20_000.0,
            risk_check_delay: Duration::from_secs(30),
            refetch_backoff: Duration::from_secs(30),
        }
    }
}

/// Why a candidate was dropped for the current cycle. Rejected mints are
/// not blacklisted; the feed may resurface them on a later poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    BundledSupply,
    CreatorRisk,
    CreatorHolding,
    MarketCap,
}

// ---------------------------------------------------------------------------
// Qualifier
// ---------------------------------------------------------------------------

/// The discovery-and-qualification pipeline.
///
/// One instance per agent; `next_call` is the single entry point and is not
/// reentrant: the outer loop must never overlap two invocations, or the
/// seen-set check-then-insert can double-accept a mint.
pub struct Qualifier<F, R, M, S> {
    feed: Arc<F>,
    risk: Arc<R>,
    market: Arc<M>,
    store: Arc<S>,
    config: QualifierConfig,
}

impl<F, R, M, S> Qualifier<F, R, M, S>
where
    F: CandidateFeed,
    R: RiskEvaluator,
    M: MarketData,
    S: CallStore,
{
    pub fn new(
        feed: Arc<F>,
        risk: Arc<R>,
        market: Arc<M>,
        store: Arc<S>,
        config: QualifierConfig,
    ) -> Self {
        Self {
            feed,
            risk,
            market,
            store,
            config,
        }
    }

    /// Find the next coin worth calling.
    ///
    /// Loops over feed batches until exactly one candidate passes both
    /// gates. On acceptance the record is saved and the mint tracked, in
    /// that order, then the call is returned. Collaborator failures abort
    /// the cycle; retries, if any, belong to the collaborators themselves.
    ///
    /// Returns `Ok(None)` only when `shutdown` was cancelled at a batch
    /// boundary.
    pub async fn next_call(&self, shutdown: &CancellationToken) -> Result<Option<AcceptedCall>> {
        loop {
            if shutdown.is_cancelled() {
                info!("Shutdown requested — leaving qualification loop");
                return Ok(None);
            }

            let batch = self
                .feed
                .poll_batch()
                .await
                .context("Candidate feed poll failed")?;

            let queue = self.filter_seen(batch).await?;
            info!(
                feed = self.feed.name(),
                fresh = queue.len(),
                "Acceptance queue built"
            );

            for mint in queue {
                // Spacing between risk lookups is an external-quota
                // courtesy, applied per candidate, not once per batch.
                tokio::time::sleep(self.config.risk_check_delay).await;

                let risk = self
                    .risk
                    .assess(&mint)
                    .await
                    .with_context(|| format!("Risk assessment failed for {mint}"))?;

                if let Some(reason) = self.screen_risk(&risk) {
                    warn!(mint = %mint, ?reason, %risk, "Candidate rejected on risk, trying next coin");
                    continue;
                }

                let snapshot = self
                    .market
                    .snapshot(&mint)
                    .await
                    .with_context(|| format!("Market snapshot failed for {mint}"))?;

                if let Some(reason) = self.screen_market(&snapshot) {
                    info!(
                        mint = %mint,
                        ?reason,
                        market_cap = snapshot.current_market_cap,
                        "Candidate rejected on market cap, trying next coin"
                    );
                    continue;
                }

                // Accepted: persist the baseline first, then mark the mint
                // as called. The record must exist by the time the mint is
                // visible to the reviewer.
                let record = QualificationRecord::new(snapshot, risk);
                self.store
                    .save_record(&mint, &record)
                    .await
                    .with_context(|| format!("Failed to save record for {mint}"))?;
                self.store
                    .track(&mint)
                    .await
                    .with_context(|| format!("Failed to track {mint}"))?;

                info!(
                    mint = %mint,
                    symbol = %record.market.token_symbol,
                    market_cap = record.market.current_market_cap,
                    "Coin qualified"
                );
                return Ok(Some(AcceptedCall { mint, record }));
            }

            info!("All candidates filtered out — backing off before refetching");
            tokio::time::sleep(self.config.refetch_backoff).await;
        }
    }

    /// Drop mints that were already called, preserving feed order.
    async fn filter_seen(&self, batch: Vec<String>) -> Result<Vec<String>> {
        let mut queue = Vec::with_capacity(batch.len());
        for mint in batch {
            let seen = self
                .store
                .is_tracked(&mint)
                .await
                .with_context(|| format!("Seen-set lookup failed for {mint}"))?;
            if seen {
                debug!(mint = %mint, "Already called, skipping");
            } else {
                queue.push(mint);
            }
        }
        Ok(queue)
    }

    /// Risk gate. Runs before the market fetch: a high-risk token is never
    /// evaluated further, whatever its market cap.
    fn screen_risk(&self, report: &RiskReport) -> Option<RejectReason> {
        if report.total_percentage_bundled > self.config.max_bundled_pct {
            return Some(RejectReason::BundledSupply);
        }
        if report.creator_analysis.risk() == RiskLevel::High {
            return Some(RejectReason::CreatorRisk);
        }
        if report.creator_analysis.holding_percentage > self.config.max_creator_holding_pct {
            return Some(RejectReason::CreatorHolding);
        }
        None
    }

    /// Market-cap gate. Strict less-than: a cap exactly at the floor passes.
    fn screen_market(&self, snapshot: &MarketSnapshot) -> Option<RejectReason> {
        if snapshot.current_market_cap < self.config.min_market_cap_usd {
            return Some(RejectReason::MarketCap);
        }
        None
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

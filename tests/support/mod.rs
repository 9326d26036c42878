//! Mock collaborators for integration testing.
//!
//! Deterministic in-memory implementations of the feed, risk, and market
//! seams (scripted responses, call counters, per-mint forced errors) so
//! the pipeline and reviewer can be exercised end to end with no external
//! dependencies.

// Each test binary compiles this module separately and uses a subset.
#![allow(dead_code)]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use callsign::providers::{CandidateFeed, MarketData, RiskEvaluator};
use callsign::types::{CreatorAnalysis, MarketSnapshot, RiskReport};

// ---------------------------------------------------------------------------
// Feed
// ---------------------------------------------------------------------------

/// A candidate feed that plays back scripted batches, then empty ones.
pub struct MockFeed {
    batches: Mutex<Vec<Vec<String>>>,
    pub polls: AtomicUsize,
    force_error: Mutex<Option<String>>,
}

impl MockFeed {
    pub fn new(batches: Vec<Vec<&str>>) -> Self {
        Self {
            batches: Mutex::new(
                batches
                    .into_iter()
                    .map(|b| b.into_iter().map(String::from).collect())
                    .collect(),
            ),
            polls: AtomicUsize::new(0),
            force_error: Mutex::new(None),
        }
    }

    pub fn set_error(&self, msg: &str) {
        *self.force_error.lock().unwrap() = Some(msg.to_string());
    }
}

#[async_trait]
impl CandidateFeed for MockFeed {
    async fn poll_batch(&self) -> Result<Vec<String>> {
        if let Some(msg) = self.force_error.lock().unwrap().clone() {
            return Err(anyhow!(msg));
        }
        self.polls.fetch_add(1, Ordering::SeqCst);
        let mut batches = self.batches.lock().unwrap();
        if batches.is_empty() {
            Ok(Vec::new())
        } else {
            Ok(batches.remove(0))
        }
    }

    fn name(&self) -> &str {
        "mock-feed"
    }
}

// ---------------------------------------------------------------------------
// Risk evaluator
// ---------------------------------------------------------------------------

/// Risk evaluator with per-mint scripted reports. Unknown mints get a
/// clean report.
pub struct MockRisk {
    reports: Mutex<HashMap<String, RiskReport>>,
    pub assessed: Mutex<Vec<String>>,
}

impl MockRisk {
    pub fn new() -> Self {
        Self {
            reports: Mutex::new(HashMap::new()),
            assessed: Mutex::new(Vec::new()),
        }
    }

    pub fn set(&self, mint: &str, report: RiskReport) {
        self.reports.lock().unwrap().insert(mint.to_string(), report);
    }

    pub fn assessed_mints(&self) -> Vec<String> {
        self.assessed.lock().unwrap().clone()
    }
}

#[async_trait]
impl RiskEvaluator for MockRisk {
    async fn assess(&self, mint: &str) -> Result<RiskReport> {
        self.assessed.lock().unwrap().push(mint.to_string());
        Ok(self
            .reports
            .lock()
            .unwrap()
            .get(mint)
            .cloned()
            .unwrap_or_else(clean_risk))
    }

    fn name(&self) -> &str {
        "mock-risk"
    }
}

// ---------------------------------------------------------------------------
// Market data
// ---------------------------------------------------------------------------

/// Market source with per-mint scripted caps and per-mint forced failures.
pub struct MockMarket {
    caps: Mutex<HashMap<String, f64>>,
    failing: Mutex<HashSet<String>>,
    pub fetched: Mutex<Vec<String>>,
}

impl MockMarket {
    pub fn new() -> Self {
        Self {
            caps: Mutex::new(HashMap::new()),
            failing: Mutex::new(HashSet::new()),
            fetched: Mutex::new(Vec::new()),
        }
    }

    pub fn set_cap(&self, mint: &str, cap: f64) {
        self.caps.lock().unwrap().insert(mint.to_string(), cap);
    }

    pub fn fail_for(&self, mint: &str) {
        self.failing.lock().unwrap().insert(mint.to_string());
    }

    pub fn fetched_mints(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }
}

#[async_trait]
impl MarketData for MockMarket {
    async fn snapshot(&self, mint: &str) -> Result<MarketSnapshot> {
        self.fetched.lock().unwrap().push(mint.to_string());
        if self.failing.lock().unwrap().contains(mint) {
            return Err(anyhow!("scripted market failure for {mint}"));
        }
        let cap = *self
            .caps
            .lock()
            .unwrap()
            .get(mint)
            .ok_or_else(|| anyhow!("no scripted cap for {mint}"))?;
        Ok(snapshot(mint, cap))
    }

    fn name(&self) -> &str {
        "mock-market"
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// A risk report that clears every gate.
pub fn clean_risk() -> RiskReport {
    RiskReport {
        total_percentage_bundled: 10.0,
        creator_analysis: CreatorAnalysis {
            holding_percentage: 5.0,
            risk_level: "LOW".to_string(),
            ..Default::default()
        },
        ..Default::default()
    }
}

/// A risk report rejected for bundled supply.
pub fn bundled_risk(pct: f64) -> RiskReport {
    let mut report = clean_risk();
    report.total_percentage_bundled = pct;
    report
}

/// A risk report rejected for deployer history.
pub fn high_creator_risk() -> RiskReport {
    let mut report = clean_risk();
    report.creator_analysis.risk_level = "HIGH".to_string();
    report
}

/// A minimal market snapshot at the given cap.
pub fn snapshot(mint: &str, cap: f64) -> MarketSnapshot {
    MarketSnapshot {
        token_address: mint.to_string(),
        token_name: format!("Coin {mint}"),
        token_symbol: "$TEST".to_string(),
        current_market_cap: cap,
        ..Default::default()
    }
}

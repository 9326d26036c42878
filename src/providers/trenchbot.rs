//! TrenchBot bundle-risk evaluator.
//!
//! Queries TrenchBot's advanced bundle analysis for a mint: how much of the
//! supply was bought in launch bundles, and how risky the deployer looks
//! based on holdings and history.
//!
//! Endpoint: https://trench.bot/api/bundle/bundle_advanced/{mint} (no auth).

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::providers::RiskEvaluator;
use crate::types::RiskReport;

const API_URL: &str = "https://trench.bot/api/bundle";

pub struct TrenchBotClient {
    http: Client,
}

impl TrenchBotClient {
    pub fn new() -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to build TrenchBot HTTP client")?;

        Ok(Self { http })
    }
}

#[async_trait]
impl RiskEvaluator for TrenchBotClient {
    async fn assess(&self, mint: &str) -> Result<RiskReport> {
        let url = format!("{API_URL}/bundle_advanced/{}", urlencoding::encode(mint));
        debug!(mint, "Fetching bundle analysis");

        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .context("TrenchBot request failed")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("TrenchBot API error {status}: {body}");
        }

        let report: RiskReport = resp
            .json()
            .await
            .context("Failed to parse TrenchBot bundle response")?;

        debug!(mint, %report, "Bundle analysis complete");
        Ok(report)
    }

    fn name(&self) -> &str {
        "trenchbot"
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

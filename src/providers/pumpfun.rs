//! pump.fun coin profile client.
//!
//! Fetches the launchpad's own view of a coin: metadata, bonding curve
//! address, creation timestamp, and `usd_market_cap`, the authoritative
//! market cap for coins still on the bonding curve.
//!
//! Endpoint: https://frontend-api-v3.pump.fun/coins/{mint}?sync=true (no auth).

use anyhow::{Context, Result};
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

const API_URL: &str = "https://frontend-api-v3.pump.fun/coins";

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

/// Coin profile as served by the pump.fun frontend API.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct CoinProfile {
    #[serde(default)]
    pub mint: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub symbol: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image_uri: String,
    #[serde(default)]
    pub metadata_uri: String,
    #[serde(default)]
    pub bonding_curve: String,
    #[serde(default)]
    pub associated_bonding_curve: String,
    #[serde(default)]
    pub creator: String,
    /// Creation time, unix millis.
    #[serde(default)]
    pub created_timestamp: i64,
    #[serde(default)]
    pub raydium_pool: Option<String>,
    #[serde(default)]
    pub complete: bool,
    #[serde(default)]
    pub virtual_sol_reserves: f64,
    #[serde(default)]
    pub virtual_token_reserves: f64,
    #[serde(default)]
    pub total_supply: f64,
    #[serde(default)]
    pub market_cap: f64,
    #[serde(default)]
    pub usd_market_cap: f64,
    #[serde(default)]
    pub reply_count: u64,
    #[serde(default)]
    pub nsfw: bool,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

pub struct PumpFunClient {
    http: Client,
}

impl PumpFunClient {
    pub fn new() -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to build pump.fun HTTP client")?;

        Ok(Self { http })
    }

    /// Fetch the coin profile for a mint, forcing a sync so the market cap
    /// reflects the latest bonding-curve state.
    pub async fn coin_profile(&self, mint: &str) -> Result<CoinProfile> {
        let url = format!("{API_URL}/{}?sync=true", urlencoding::encode(mint));
        debug!(mint, "Fetching coin profile");

        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .context("pump.fun request failed")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("pump.fun API error {status}: {body}");
        }

        let profile: CoinProfile = resp
            .json()
            .await
            .context("Failed to parse pump.fun coin profile")?;

        debug!(
            mint,
            symbol = %profile.symbol,
            usd_market_cap = profile.usd_market_cap,
            "Coin profile fetched"
        );
        Ok(profile)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! Moralis pair-stats client and the composed market-data source.
//!
//! Moralis serves trading stats for a pair (volumes, buy/sell counts, price
//! changes, liquidity); the pump.fun profile supplies the pair address, the
//! symbol, the creation time, and the authoritative USD market cap. The two
//! are merged into one `MarketSnapshot`.
//!
//! Endpoint: https://solana-gateway.moralis.io/token/mainnet/pairs/{pair}/stats
//! (X-API-Key auth).

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::providers::pumpfun::{CoinProfile, PumpFunClient};
use crate::providers::MarketData;
use crate::types::{symbol_handle, MarketSnapshot, WindowedCount, WindowedStat};

const GATEWAY_URL: &str = "https://solana-gateway.moralis.io/token/mainnet";

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

/// Pair trading stats as served by the Moralis Solana gateway.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct PairStats {
    #[serde(default)]
    pub token_address: String,
    #[serde(default)]
    pub token_name: String,
    #[serde(default)]
    pub token_symbol: String,
    #[serde(default)]
    pub token_logo: String,
    #[serde(default)]
    pub pair_label: String,
    #[serde(default)]
    pub pair_address: String,
    #[serde(default)]
    pub exchange: String,
    #[serde(default)]
    pub exchange_url: String,
    #[serde(default)]
    pub current_usd_price: String,
    #[serde(default)]
    pub current_native_price: String,
    #[serde(default)]
    pub total_liquidity_usd: String,
    #[serde(default)]
    pub price_percent_change: WindowedStat,
    #[serde(default)]
    pub liquidity_percent_change: WindowedStat,
    #[serde(default)]
    pub total_volume: WindowedStat,
    #[serde(default)]
    pub buy_volume: WindowedStat,
    #[serde(default)]
    pub sell_volume: WindowedStat,
    #[serde(default)]
    pub buys: WindowedCount,
    #[serde(default)]
    pub sells: WindowedCount,
    #[serde(default)]
    pub buyers: WindowedCount,
    #[serde(default)]
    pub sellers: WindowedCount,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

pub struct MoralisClient {
    http: Client,
    api_key: String,
    pumpfun: PumpFunClient,
}

impl MoralisClient {
    pub fn new(api_key: String) -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to build Moralis HTTP client")?;

        Ok(Self {
            http,
            api_key,
            pumpfun: PumpFunClient::new()?,
        })
    }

    /// Fetch trading stats for a pair address.
    pub async fn pair_stats(&self, pair: &str) -> Result<PairStats> {
        let url = format!("{GATEWAY_URL}/pairs/{}/stats", urlencoding::encode(pair));
        debug!(pair, "Fetching pair stats");

        let resp = self
            .http
            .get(&url)
            .header("accept", "application/json")
            .header("X-API-Key", &self.api_key)
            .send()
            .await
            .context("Moralis pair-stats request failed")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Moralis API error {status}: {body}");
        }

        let stats: PairStats = resp
            .json()
            .await
            .context("Failed to parse Moralis pair stats")?;

        Ok(stats)
    }

    /// Merge pair stats with the coin profile. The profile wins for the
    /// symbol, logo, market cap, and deploy time; the pair stats carry the
    /// trading metrics.
    pub fn merge(profile: &CoinProfile, stats: PairStats) -> MarketSnapshot {
        MarketSnapshot {
            token_address: if stats.token_address.is_empty() {
                profile.mint.clone()
            } else {
                stats.token_address
            },
            token_name: if stats.token_name.is_empty() {
                profile.name.clone()
            } else {
                stats.token_name
            },
            token_symbol: symbol_handle(&profile.symbol),
            token_logo: profile.image_uri.clone(),
            pair_address: stats.pair_address,
            exchange: stats.exchange,
            current_usd_price: stats.current_usd_price,
            current_market_cap: profile.usd_market_cap,
            total_liquidity_usd: stats.total_liquidity_usd,
            price_percent_change: stats.price_percent_change,
            total_volume: stats.total_volume,
            buy_volume: stats.buy_volume,
            sell_volume: stats.sell_volume,
            buys: stats.buys,
            sells: stats.sells,
            buyers: stats.buyers,
            sellers: stats.sellers,
            deployed: profile.created_timestamp,
        }
    }
}

#[async_trait]
impl MarketData for MoralisClient {
    async fn snapshot(&self, mint: &str) -> Result<MarketSnapshot> {
        let profile = self
            .pumpfun
            .coin_profile(mint)
            .await
            .context("Failed to resolve coin profile for snapshot")?;

        debug!(
            mint,
            pair = %profile.bonding_curve,
            "Resolved pair address for snapshot"
        );

        let stats = self.pair_stats(&profile.bonding_curve).await?;
        Ok(Self::merge(&profile, stats))
    }

    fn name(&self) -> &str {
        "moralis"
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

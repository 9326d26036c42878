//! Bitquery candidate feed.
//!
//! Polls the Bitquery EAP (early-access program) streaming endpoint with a
//! GraphQL query for the most recent successful pump.fun DEX trades, one row
//! per mint, and returns the mint addresses in feed order (newest first).
//!
//! Endpoint: https://streaming.bitquery.io/eap (bearer auth).

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use crate::providers::CandidateFeed;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

const EAP_URL: &str = "https://streaming.bitquery.io/eap";

/// The system program, which shows up as the mint on malformed trades.
const EXCLUDED_MINTS: &str = "11111111111111111111111111111111";

/// Minimum SOL-side trade size filter, USD.
const MIN_SELL_AMOUNT_USD: f64 = 10.0;

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct EapResponse {
    #[serde(default)]
    data: Option<EapData>,
    #[serde(default)]
    errors: Option<Vec<EapError>>,
}

#[derive(Debug, Deserialize)]
struct EapError {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct EapData {
    #[serde(rename = "Solana")]
    solana: Option<SolanaData>,
}

#[derive(Debug, Deserialize)]
struct SolanaData {
    #[serde(rename = "DEXTrades", default)]
    dex_trades: Vec<DexTrade>,
}

#[derive(Debug, Deserialize)]
struct DexTrade {
    #[serde(rename = "Trade")]
    trade: Option<TradeSide>,
}

#[derive(Debug, Deserialize)]
struct TradeSide {
    #[serde(rename = "Buy")]
    buy: Option<BuySide>,
}

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct BuySide {
    #[serde(rename = "Currency")]
    currency: Option<Currency>,
    #[serde(rename = "PriceInUSD", default)]
    price_in_usd: f64,
}

#[derive(Debug, Deserialize, Clone)]
#[allow(dead_code)]
struct Currency {
    #[serde(rename = "MintAddress", default)]
    mint_address: String,
    #[serde(rename = "Name", default)]
    name: String,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

pub struct BitqueryClient {
    http: Client,
    api_key: String,
    batch_size: u32,
    min_buy_price_usd: f64,
}

impl BitqueryClient {
    pub fn new(api_key: String, batch_size: u32, min_buy_price_usd: f64) -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to build Bitquery HTTP client")?;

        Ok(Self {
            http,
            api_key,
            batch_size,
            min_buy_price_usd,
        })
    }

    /// Build the DEX-trades query: newest pump.fun buys above the price
    /// floor, successful transactions only, one trade per mint.
    fn build_query(&self) -> String {
        format!(
            r#"query {{
  Solana {{
    DEXTrades(
      limitBy: {{count: 1, by: Trade_Buy_Currency_MintAddress}}
      limit: {{count: {batch}}}
      orderBy: {{descending: Block_Time}}
      where: {{Trade: {{Buy: {{PriceInUSD: {{gt: {price}}}, Currency: {{MintAddress: {{notIn: ["{excluded}"]}}}}}}, Sell: {{AmountInUSD: {{gt: "{sell}"}}}}, Dex: {{ProtocolName: {{is: "pump"}}}}}}, Transaction: {{Result: {{Success: true}}}}}}
    ) {{
      Trade {{
        Buy {{
          Currency {{
            Name
            MintAddress
          }}
          PriceInUSD
        }}
      }}
    }}
  }}
}}"#,
            batch = self.batch_size,
            price = self.min_buy_price_usd,
            excluded = EXCLUDED_MINTS,
            sell = MIN_SELL_AMOUNT_USD,
        )
    }

    /// Extract mint addresses from a parsed response, preserving order and
    /// dropping rows with no usable mint.
    fn extract_mints(data: EapData) -> Vec<String> {
        data.solana
            .map(|s| s.dex_trades)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|t| t.trade?.buy?.currency)
            .map(|c| c.mint_address)
            .filter(|m| !m.is_empty())
            .collect()
    }
}

#[async_trait]
impl CandidateFeed for BitqueryClient {
    async fn poll_batch(&self) -> Result<Vec<String>> {
        debug!("Fetching current token creations from Bitquery");

        let resp = self
            .http
            .post(EAP_URL)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&json!({ "query": self.build_query() }))
            .send()
            .await
            .context("Bitquery EAP request failed")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Bitquery EAP error {status}: {body}");
        }

        let body: EapResponse = resp
            .json()
            .await
            .context("Failed to parse Bitquery response")?;

        if let Some(errors) = body.errors {
            if !errors.is_empty() {
                anyhow::bail!(
                    "Bitquery query errors: {}",
                    errors
                        .into_iter()
                        .map(|e| e.message)
                        .collect::<Vec<_>>()
                        .join("; ")
                );
            }
        }

        let mints = body.data.map(Self::extract_mints).unwrap_or_default();
        info!(count = mints.len(), "Fetched candidate mints from feed");
        Ok(mints)
    }

    fn name(&self) -> &str {
        "bitquery"
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn make_client() -> BitqueryClient {
        BitqueryClient::new("test-key".into(), 8, 0.00002).unwrap()
    }

    #[test]
    fn test_query_contains_filters() {
        let query = make_client().build_query();
        assert!(query.contains("limit: {count: 8}"));
        assert!(query.contains("PriceInUSD: {gt: 0.00002}"));
        assert!(query.contains(r#"ProtocolName: {is: "pump"}"#));
        assert!(query.contains("Result: {Success: true}"));
        assert!(query.contains(EXCLUDED_MINTS));
    }

    #[test]
    fn test_extract_mints_preserves_order() {
        let raw = r#"{
            "Solana": {
                "DEXTrades": [
                    {"Trade": {"Buy": {"Currency": {"MintAddress": "MintA", "Name": "A"}, "PriceInUSD": 0.001}}},
                    {"Trade": {"Buy": {"Currency": {"MintAddress": "MintB", "Name": "B"}, "PriceInUSD": 0.002}}},
                    {"Trade": {"Buy": {"Currency": {"MintAddress": "MintC", "Name": "C"}, "PriceInUSD": 0.003}}}
                ]
            }
        }"#;
        let data: EapData = serde_json::from_str(raw).unwrap();
        assert_eq!(
            BitqueryClient::extract_mints(data),
            vec!["MintA", "MintB", "MintC"]
        );
    }

    #[test]
    fn test_extract_mints_skips_malformed_rows() {
        let raw = r#"{
            "Solana": {
                "DEXTrades": [
                    {"Trade": {"Buy": {"Currency": {"MintAddress": "MintA", "Name": "A"}, "PriceInUSD": 0.001}}},
                    {"Trade": {"Buy": {"PriceInUSD": 0.002}}},
                    {"Trade": null},
                    {"Trade": {"Buy": {"Currency": {"MintAddress": "", "Name": ""}, "PriceInUSD": 0.0}}}
                ]
            }
        }"#;
        let data: EapData = serde_json::from_str(raw).unwrap();
        assert_eq!(BitqueryClient::extract_mints(data), vec!["MintA"]);
    }

    #[test]
    fn test_extract_mints_empty_feed() {
        let data: EapData = serde_json::from_str(r#"{"Solana": {"DEXTrades": []}}"#).unwrap();
        assert!(BitqueryClient::extract_mints(data).is_empty());
    }

    #[test]
    fn test_client_name() {
        assert_eq!(make_client().name(), "bitquery");
    }
}

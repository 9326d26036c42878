//! DeepInfra LLM integration.
//!
//! Talks to DeepInfra's OpenAI-compatible chat completions API. One job:
//! turn the merged market/risk record of a qualified coin into a short,
//! cautious analysis ready to post.
//!
//! Rate limits and transient upstream failures are retried here with
//! exponential backoff. This is the only retry loop in the agent.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::Analyst;
use crate::types::QualificationRecord;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

const DEEPINFRA_API_URL: &str = "https://api.deepinfra.com/v1/openai/chat/completions";

const DEFAULT_MODEL: &str = "NousResearch/Hermes-3-Llama-3.1-405B";
const DEFAULT_MAX_TOKENS: u32 = 500;
const DEFAULT_TEMPERATURE: f64 = 0.3;
const DEFAULT_TOP_P: f64 = 0.8;

/// Maximum attempts per completion request.
const MAX_RETRIES: u32 = 5;

/// Base delay for exponential backoff (ms).
const BASE_BACKOFF_MS: u64 = 2000;

// ---------------------------------------------------------------------------
// API types (OpenAI-compatible)
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    max_tokens: u32,
    temperature: f64,
    top_p: f64,
    stream: bool,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    #[serde(default)]
    message: Option<ChatMessage>,
}

// ---------------------------------------------------------------------------
// Prompts
// ---------------------------------------------------------------------------

/// Standing instructions for the analyst persona.
fn system_prompt() -> &'static str {
    "You are a DeFi analytics assistant specializing in decentralized finance (DeFi). \
Provide the response as plain text, not markdown. \
Format all large numbers like 1K, 1M, 1B. \
Assess safety from the bundle total holding percentage and whether the deployer has a history of rugged coins. \
Even if the deployer history is clean, never say \"low rug risk\"; keep the sentiment cautious and remind readers to DYOR. \
Give a short analysis and a very short sentiment, each clear and making sense, at most 150 characters total. \
Example: Price surged 314% in 24h. Buy volume dominates at 54%. Deployer clean, but 15.70% tokens bundled. Bullish momentum, but exercise caution on volatility. DYOR\n\
Then follow with this format:\n\
tokenSymbol\n\
tokenAddress\n\n\
Deployer: from creator_analysis.holding_percentage\n\
Bundle: from total_percentage_bundled"
}

/// Per-call user message: the raw merged record, for the model to read.
fn build_user_prompt(record: &QualificationRecord) -> Result<String> {
    let raw = serde_json::to_string(record).context("Failed to serialise record for prompt")?;
    Ok(format!(
        "Analyze the following raw market data for a cryptocurrency pool and token coin information:\n\
Sentiment (bearish/bullish) based on this raw data and the criteria below (price percent change, marketcap, safety reasoning, volume (5m, 1h, 24h), buys and sells, bundle deployer (coin creator), liquidity).\n\n\
Raw data:\n{raw}"
    ))
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

pub struct DeepInfraClient {
    http: Client,
    api_key: String,
    model: String,
    max_tokens: u32,
    temperature: f64,
    top_p: f64,
}

impl DeepInfraClient {
    pub fn new(
        api_key: String,
        model: Option<String>,
        max_tokens: Option<u32>,
        temperature: Option<f64>,
        top_p: Option<f64>,
    ) -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .context("Failed to build DeepInfra HTTP client")?;

        Ok(Self {
            http,
            api_key,
            model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            max_tokens: max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            temperature: temperature.unwrap_or(DEFAULT_TEMPERATURE),
            top_p: top_p.unwrap_or(DEFAULT_TOP_P),
        })
    }

    /// Send a chat completion request with retry + exponential backoff.
    async fn call_api(&self, system: &str, user_message: &str) -> Result<String> {
        let request = ChatRequest {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            top_p: self.top_p,
            stream: false,
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: system.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: user_message.to_string(),
                },
            ],
        };

        let mut last_error = None;

        for attempt in 0..=MAX_RETRIES {
            if attempt > 0 {
                let delay = BASE_BACKOFF_MS * 2u64.pow(attempt - 1);
                debug!(attempt, delay_ms = delay, "Retrying DeepInfra API call");
                tokio::time::sleep(std::time::Duration::from_millis(delay)).await;
            }

            let resp = self
                .http
                .post(DEEPINFRA_API_URL)
                .header("Authorization", format!("Bearer {}", self.api_key))
                .header("Content-Type", "application/json")
                .json(&request)
                .send()
                .await;

            match resp {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let body: ChatResponse = response
                            .json()
                            .await
                            .context("Failed to parse DeepInfra response")?;

                        let text = body
                            .choices
                            .first()
                            .and_then(|c| c.message.as_ref())
                            .map(|m| m.content.trim().to_string())
                            .unwrap_or_default();

                        if text.is_empty() {
                            anyhow::bail!("DeepInfra returned an empty completion");
                        }
                        return Ok(text);
                    }

                    // Retryable: 429 (rate limit) and 5xx upstream errors.
                    if status.as_u16() == 429 || status.as_u16() >= 500 {
                        let error_text = response.text().await.unwrap_or_default();
                        warn!(
                            status = %status,
                            attempt,
                            error = %error_text,
                            "Retryable DeepInfra error"
                        );
                        last_error = Some(format!("HTTP {status}: {error_text}"));
                        continue;
                    }

                    let error_text = response.text().await.unwrap_or_default();
                    anyhow::bail!("DeepInfra API error {status}: {error_text}");
                }
                Err(e) => {
                    warn!(attempt, error = %e, "DeepInfra request failed");
                    last_error = Some(format!("Request error: {e}"));
                    continue;
                }
            }
        }

        anyhow::bail!(
            "DeepInfra API failed after {} retries: {}",
            MAX_RETRIES,
            last_error.unwrap_or_default()
        )
    }
}

#[async_trait]
impl Analyst for DeepInfraClient {
    async fn compose_call(&self, record: &QualificationRecord) -> Result<String> {
        let user_msg = build_user_prompt(record)?;

        info!(
            mint = %record.market.token_address,
            model = %self.model,
            "Requesting call write-up"
        );

        let text = self
            .call_api(system_prompt(), &user_msg)
            .await
            .context("DeepInfra completion failed")?;

        debug!(chars = text.len(), "Call write-up received");
        Ok(text)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

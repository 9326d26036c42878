//! Configuration loading from TOML with environment variable resolution.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs.
//! Secrets (API keys, the Redis URL) are referenced by env-var name in the
//! config and resolved at runtime via `std::env::var`.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub agent: AgentConfig,
    pub pipeline: PipelineConfig,
    pub feed: FeedConfig,
    pub providers: ProvidersConfig,
    pub store: StoreConfig,
    pub llm: LlmConfig,
    pub card: CardConfig,
    pub social: SocialConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AgentConfig {
    pub name: String,
    /// Cadence of the call cycle (scan → qualify → post).
    pub poll_interval_secs: u64,
    /// Hard daily stop, measured by the size of the tracked-mint set.
    pub max_calls_per_day: u64,
    /// Posts allowed inside one pacing window before the agent pauses.
    pub max_posts_per_window: u32,
    pub post_window_mins: i64,
    /// Pause length once the window is exhausted.
    pub pause_mins: u64,
    /// Delay before running the retrospective review during a pause.
    pub review_delay_mins: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PipelineConfig {
    /// Reject when more than this share of supply was bundle-bought (0–100).
    pub max_bundled_pct: f64,
    /// Reject when the deployer still holds more than this share (0–100).
    pub max_creator_holding_pct: f64,
    /// Reject below this USD market cap (strict less-than).
    pub min_market_cap_usd: f64,
    /// Spacing between bundle-risk lookups, per candidate.
    pub risk_check_delay_secs: u64,
    /// Backoff before refetching when a whole batch filtered out.
    pub refetch_backoff_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct FeedConfig {
    pub api_key_env: String,
    /// Candidates requested per poll.
    pub batch_size: u32,
    /// Minimum buy price filter applied in the feed query, USD.
    pub min_buy_price_usd: f64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ProvidersConfig {
    pub moralis_api_key_env: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    pub redis_url_env: String,
    /// Redis set holding every accepted mint.
    pub tracked_set_key: String,
    /// Prefix for per-mint qualification records.
    pub record_key_prefix: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    pub model: String,
    pub api_key_env: String,
    pub max_tokens: u32,
    pub temperature: f64,
    pub top_p: f64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CardConfig {
    pub enabled: bool,
    pub output_path: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SocialConfig {
    pub enabled: bool,
    /// Compose everything but skip the network call.
    pub dry_run: bool,
    pub bearer_token_env: String,
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        let config: AppConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {path}"))?;
        Ok(config)
    }

    /// Resolve an environment variable name to its value.
    /// Useful for loading secrets referenced in the config.
    pub fn resolve_env(env_name: &str) -> Result<String> {
        std::env::var(env_name)
            .with_context(|| format!("Environment variable not set: {env_name}"))
    }
}

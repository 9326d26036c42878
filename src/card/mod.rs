//! Call-card rendering.
//!
//! Each posted call carries a small stats card: token identity plus market
//! cap, volume, liquidity, price, age, and tracked buy/sell counts. The
//! renderer is a seam (the pipeline only needs "an artifact was written")
//! and the default implementation emits a self-contained SVG.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::types::QualificationRecord;

/// Writes the visual artifact attached to a call post.
#[async_trait]
pub trait CardRenderer: Send + Sync {
    /// Render the card for a qualified coin; returns the artifact path.
    async fn render(&self, record: &QualificationRecord) -> Result<PathBuf>;
}

// ---------------------------------------------------------------------------
// Formatting helpers
// ---------------------------------------------------------------------------

/// `1234567.8` → `$1,234,567.80`.
fn format_usd(value: f64) -> String {
    let negative = value < 0.0;
    let cents = (value.abs() * 100.0).round() as u64;
    let whole = cents / 100;
    let frac = cents % 100;

    let digits = whole.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    let sign = if negative { "-" } else { "" };
    format!("{sign}${grouped}.{frac:02}")
}

/// Coarse age string for a unix-millis timestamp: `2 days ago`, `3h ago`,
/// `12m ago`, `45s ago`.
fn time_ago(deployed_ms: i64, now_ms: i64) -> String {
    let seconds = (now_ms - deployed_ms).max(0) / 1000;
    let minutes = seconds / 60;
    let hours = minutes / 60;
    let days = hours / 24;

    if days > 0 {
        format!("{days} day{} ago", if days > 1 { "s" } else { "" })
    } else if hours > 0 {
        format!("{hours}h ago")
    } else if minutes > 0 {
        format!("{minutes}m ago")
    } else {
        format!("{seconds}s ago")
    }
}

/// Escape text destined for SVG content.
fn xml_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

// ---------------------------------------------------------------------------
// SVG renderer
// ---------------------------------------------------------------------------

pub struct SvgCardRenderer {
    output_path: PathBuf,
}

impl SvgCardRenderer {
    pub fn new(output_path: impl AsRef<Path>) -> Self {
        Self {
            output_path: output_path.as_ref().to_path_buf(),
        }
    }

    fn build_svg(record: &QualificationRecord, now_ms: i64) -> String {
        let market = &record.market;
        let signal_time = Utc::now().format("%H:%M:%S UTC");

        let stat = |label: &str, value: &str, x: u32, y: u32| -> String {
            format!(
                r#"  <text x="{x}" y="{y}" class="label">{}</text>
  <text x="{x}" y="{}" class="value">{}</text>
"#,
                xml_escape(label),
                y + 40,
                xml_escape(value),
            )
        };

        let mut body = String::new();
        body.push_str(&stat(
            "Marketcap:",
            &format_usd(market.current_market_cap),
            500,
            220,
        ));
        body.push_str(&stat(
            "Volume:",
            &format_usd(market.total_volume.h24),
            730,
            220,
        ));
        body.push_str(&stat(
            "Liquidity:",
            &format_usd(market.total_liquidity_usd.parse().unwrap_or(0.0)),
            950,
            220,
        ));
        body.push_str(&stat(
            "Price:",
            &format!("${}", market.current_usd_price),
            500,
            360,
        ));
        body.push_str(&stat(
            "Deployed:",
            &time_ago(market.deployed, now_ms),
            730,
            360,
        ));
        body.push_str(&stat("Signal:", &signal_time.to_string(), 950, 360));
        body.push_str(&stat(
            "Tracked Buys:",
            &format!("{} Total", market.buyers.h24),
            500,
            510,
        ));
        body.push_str(&stat(
            "Tracked Sells:",
            &format!("{} Total", market.sellers.h24),
            730,
            510,
        ));

        let logo = if market.token_logo.is_empty() {
            String::new()
        } else {
            format!(
                r#"  <image href="{}" x="50" y="50" width="80" height="80"/>
"#,
                xml_escape(&market.token_logo)
            )
        };

        format!(
            r##"<svg xmlns="http://www.w3.org/2000/svg" width="1200" height="630" viewBox="0 0 1200 630">
  <style>
    .name {{ font: 600 40px sans-serif; fill: #111; }}
    .symbol {{ font: 400 30px sans-serif; fill: #777; }}
    .label {{ font: 400 24px sans-serif; fill: #777; }}
    .value {{ font: 600 29px sans-serif; fill: #111; }}
  </style>
  <rect width="1200" height="630" fill="#f5f2ea"/>
{logo}  <text x="150" y="80" class="name">{name}</text>
  <text x="150" y="120" class="symbol">{symbol}</text>
{body}</svg>
"##,
            name = xml_escape(&market.token_name),
            symbol = xml_escape(&market.token_symbol.to_uppercase()),
        )
    }
}

#[async_trait]
impl CardRenderer for SvgCardRenderer {
    async fn render(&self, record: &QualificationRecord) -> Result<PathBuf> {
        let svg = Self::build_svg(record, Utc::now().timestamp_millis());

        std::fs::write(&self.output_path, svg)
            .with_context(|| format!("Failed to write card to {}", self.output_path.display()))?;

        info!(path = %self.output_path.display(), "Call card written");
        Ok(self.output_path.clone())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! Social posting.
//!
//! Defines the `Publisher` seam and the X (Twitter) API v2 client behind
//! it. Platform auth flows are out of scope: the client takes a
//! pre-provisioned bearer token. Dry-run mode composes everything but
//! skips the network call, returning a tagged receipt; it stays the
//! default until real credentials are wired in config.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::types::PostReceipt;

const POST_URL: &str = "https://api.x.com/2/tweets";

/// Outbound channel for composed calls and review summaries.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Publish a post, optionally referencing a rendered card artifact.
    async fn post(&self, text: &str, media: Option<&Path>) -> Result<PostReceipt>;

    /// Channel name for logging and identification.
    fn name(&self) -> &str;
}

// ---------------------------------------------------------------------------
// API types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct PostResponse {
    #[serde(default)]
    data: Option<PostData>,
}

#[derive(Debug, Deserialize)]
struct PostData {
    #[serde(default)]
    id: String,
}

// ---------------------------------------------------------------------------
// X client
// ---------------------------------------------------------------------------

pub struct XClient {
    http: Client,
    bearer_token: String,
    dry_run: bool,
}

impl XClient {
    pub fn new(bearer_token: String, dry_run: bool) -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to build X HTTP client")?;

        Ok(Self {
            http,
            bearer_token,
            dry_run,
        })
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }
}

#[async_trait]
impl Publisher for XClient {
    async fn post(&self, text: &str, media: Option<&Path>) -> Result<PostReceipt> {
        if self.dry_run {
            info!(chars = text.len(), "Dry run — post composed but not sent");
            debug!(text, "Dry-run post body");
            return Ok(PostReceipt::dry_run());
        }

        if let Some(path) = media {
            // Media attachment needs the chunked upload flow (OAuth 1.0a
            // user context); until that is wired the card stays local.
            warn!(
                media = %path.display(),
                "Media upload not wired — posting text only"
            );
        }

        let resp = self
            .http
            .post(POST_URL)
            .header("Authorization", format!("Bearer {}", self.bearer_token))
            .json(&json!({ "text": text }))
            .send()
            .await
            .context("X post request failed")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("X API error {status}: {body}");
        }

        let body: PostResponse = resp.json().await.context("Failed to parse X response")?;
        let post_id = body
            .data
            .map(|d| d.id)
            .filter(|id| !id.is_empty())
            .context("X response carried no post id")?;

        info!(post_id = %post_id, "Post published");
        Ok(PostReceipt {
            post_id,
            dry_run: false,
            posted_at: chrono::Utc::now(),
        })
    }

    fn name(&self) -> &str {
        "x"
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_dry_run_returns_receipt_without_network() {
        let client = XClient::new(String::new(), true).unwrap();
        let receipt = client
            .post("gm, new call", Some(Path::new("call_card.svg")))
            .await
            .unwrap();

        assert!(receipt.dry_run);
        assert!(receipt.post_id.starts_with("dry-run-"));
    }

    #[test]
    fn test_client_name() {
        let client = XClient::new("token".into(), true).unwrap();
        assert_eq!(client.name(), "x");
        assert!(client.is_dry_run());
    }

    #[test]
    fn test_parse_post_response() {
        let body: PostResponse =
            serde_json::from_str(r#"{"data": {"id": "1890000000000000001"}}"#).unwrap();
        assert_eq!(body.data.unwrap().id, "1890000000000000001");
    }

    #[test]
    fn test_parse_empty_post_response() {
        let body: PostResponse = serde_json::from_str("{}").unwrap();
        assert!(body.data.is_none());
    }
}

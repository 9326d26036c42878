//! CALLSIGN — Autonomous Memecoin Call AI Agent
//!
//! Entry point. Loads configuration, initialises structured logging,
//! connects the call store, and runs the main qualify→render→write→post
//! loop with paced posting, periodic retrospective reviews, and graceful
//! shutdown.

use anyhow::{Context, Result};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use callsign::card::{CardRenderer, SvgCardRenderer};
use callsign::config::AppConfig;
use callsign::llm::deepinfra::DeepInfraClient;
use callsign::llm::Analyst;
use callsign::pipeline::{Qualifier, QualifierConfig, Reviewer};
use callsign::providers::bitquery::BitqueryClient;
use callsign::providers::moralis::MoralisClient;
use callsign::providers::trenchbot::TrenchBotClient;
use callsign::scheduler::PostWindow;
use callsign::social::{Publisher, XClient};
use callsign::store::{CallStore, RedisStore};

const BANNER: &str = r#"
  ____    _    _     _     ____ ___ ____ _   _
 / ___|  / \  | |   | |   / ___|_ _/ ___| \ | |
| |     / _ \ | |   | |   \___ \| | |  _|  \| |
| |___ / ___ \| |__ | |__  ___) | | |_| | |\  |
 \____/_/   \_\____||____||____/___\____|_| \_|

  Curated Asset Launch Logger: Signal Intelligence & Generation Network
  v0.1.0 — Autonomous Agent
"#;

type AgentQualifier = Qualifier<BitqueryClient, TrenchBotClient, MoralisClient, RedisStore>;
type AgentReviewer = Reviewer<MoralisClient, RedisStore>;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    // Load configuration from TOML
    let cfg = AppConfig::load("config.toml")?;

    // Initialise structured logging
    init_logging();

    // Print startup banner
    println!("{BANNER}");
    info!(
        agent_name = %cfg.agent.name,
        poll_interval_secs = cfg.agent.poll_interval_secs,
        max_calls_per_day = cfg.agent.max_calls_per_day,
        "CALLSIGN starting up"
    );

    // -- Resolve secrets ---------------------------------------------------

    let bitquery_key = AppConfig::resolve_env(&cfg.feed.api_key_env)?;
    let moralis_key = AppConfig::resolve_env(&cfg.providers.moralis_api_key_env)?;
    let deepinfra_key = AppConfig::resolve_env(&cfg.llm.api_key_env)?;
    let redis_url = AppConfig::resolve_env(&cfg.store.redis_url_env)?;

    // -- Initialise components ---------------------------------------------

    let store = Arc::new(
        RedisStore::connect(
            &redis_url,
            cfg.store.tracked_set_key.clone(),
            cfg.store.record_key_prefix.clone(),
        )
        .await?,
    );

    let feed = Arc::new(BitqueryClient::new(
        bitquery_key,
        cfg.feed.batch_size,
        cfg.feed.min_buy_price_usd,
    )?);
    let risk = Arc::new(TrenchBotClient::new()?);
    let market = Arc::new(MoralisClient::new(moralis_key)?);

    let qualifier = Qualifier::new(
        feed,
        risk,
        market.clone(),
        store.clone(),
        QualifierConfig {
            max_bundled_pct: cfg.pipeline.max_bundled_pct,
            max_creator_holding_pct: cfg.pipeline.max_creator_holding_pct,
            min_market_cap_usd: cfg.pipeline.min_market_cap_usd,
            risk_check_delay: Duration::from_secs(cfg.pipeline.risk_check_delay_secs),
            refetch_backoff: Duration::from_secs(cfg.pipeline.refetch_backoff_secs),
        },
    );

    let reviewer = Reviewer::new(market, store.clone());

    let analyst: Box<dyn Analyst> = Box::new(DeepInfraClient::new(
        deepinfra_key,
        Some(cfg.llm.model.clone()),
        Some(cfg.llm.max_tokens),
        Some(cfg.llm.temperature),
        Some(cfg.llm.top_p),
    )?);

    let renderer = SvgCardRenderer::new(&cfg.card.output_path);

    let bearer = std::env::var(&cfg.social.bearer_token_env).unwrap_or_default();
    let dry_run = cfg.social.dry_run || bearer.is_empty();
    if dry_run && !cfg.social.dry_run {
        warn!("No X bearer token configured — posting in dry-run mode");
    }
    let publisher: Box<dyn Publisher> = Box::new(XClient::new(bearer, dry_run)?);

    // -- Shutdown plumbing -------------------------------------------------

    let shutdown = CancellationToken::new();
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Shutdown signal received.");
                shutdown.cancel();
            }
        });
    }

    // -- Main loop ---------------------------------------------------------

    let mut window = PostWindow::new(
        cfg.agent.max_posts_per_window,
        cfg.agent.post_window_mins,
        Utc::now(),
    );
    let mut interval =
        tokio::time::interval(Duration::from_secs(cfg.agent.poll_interval_secs));

    info!(
        interval_secs = cfg.agent.poll_interval_secs,
        "Entering main loop. Press Ctrl+C to stop."
    );

    loop {
        tokio::select! {
            _ = interval.tick() => {
                if shutdown.is_cancelled() {
                    break;
                }

                // Hard daily stop, measured by lifetime calls.
                let called = match store.tracked_count().await {
                    Ok(n) => n,
                    Err(e) => {
                        error!(error = %e, "Call store unreachable — skipping cycle");
                        continue;
                    }
                };
                if called >= cfg.agent.max_calls_per_day {
                    info!(called, "Max daily calls reached. Stopping.");
                    break;
                }

                if window.is_exhausted(Utc::now()) {
                    pause_and_review(&cfg, &reviewer, &*publisher, &mut window, &shutdown)
                        .await;
                    continue;
                }

                info!(call_number = called + 1, "Running call cycle");
                match run_call_cycle(&cfg, &qualifier, &*analyst, &renderer, &*publisher, &shutdown).await {
                    Ok(Some(post_id)) => {
                        window.record_post(Utc::now());
                        info!(
                            post_id = %post_id,
                            window_count = window.count(),
                            "Call posted"
                        );
                    }
                    Ok(None) => {
                        // Shutdown mid-qualification, or write-up failed.
                    }
                    Err(e) => {
                        error!(error = %e, "Call cycle failed — continuing to next");
                    }
                }
            }
            _ = shutdown.cancelled() => {
                break;
            }
        }
    }

    info!("CALLSIGN shut down cleanly.");
    Ok(())
}

/// Run a single qualify→render→write→post cycle.
///
/// Returns the post id on success, `None` when the cycle ended without a
/// post (shutdown, or an LLM failure after the coin was already tracked).
async fn run_call_cycle(
    cfg: &AppConfig,
    qualifier: &AgentQualifier,
    analyst: &dyn Analyst,
    renderer: &SvgCardRenderer,
    publisher: &dyn Publisher,
    shutdown: &CancellationToken,
) -> Result<Option<String>> {
    let Some(call) = qualifier.next_call(shutdown).await? else {
        return Ok(None);
    };

    let card_path = if cfg.card.enabled {
        Some(
            renderer
                .render(&call.record)
                .await
                .context("Card rendering failed")?,
        )
    } else {
        None
    };

    // The coin is already tracked; a failed write-up skips the post but
    // must not abort the agent.
    let text = match analyst.compose_call(&call.record).await {
        Ok(text) => text,
        Err(e) => {
            error!(mint = %call.mint, error = %e, "Write-up failed — call not posted");
            return Ok(None);
        }
    };

    if !cfg.social.enabled {
        info!(mint = %call.mint, "Posting disabled — call recorded only");
        return Ok(None);
    }

    let receipt = publisher
        .post(&text, card_path.as_deref())
        .await
        .context("Failed to publish call")?;

    Ok(Some(receipt.post_id))
}

/// Window exhausted: wait, run the retrospective review (posting the
/// summary when there is at least one winner), then sit out the rest of
/// the pause and start a fresh window.
async fn pause_and_review(
    cfg: &AppConfig,
    reviewer: &AgentReviewer,
    publisher: &dyn Publisher,
    window: &mut PostWindow,
    shutdown: &CancellationToken,
) {
    info!(
        pause_mins = cfg.agent.pause_mins,
        "Post window exhausted — pausing"
    );

    let review_delay = Duration::from_secs(cfg.agent.review_delay_mins * 60);
    tokio::select! {
        _ = tokio::time::sleep(review_delay) => {}
        _ = shutdown.cancelled() => return,
    }

    info!("Running latest coins review...");
    match reviewer.review_all().await {
        Ok(report) => {
            if report.profit_count() >= 1 {
                match publisher.post(&report.summary(), None).await {
                    Ok(receipt) => info!(post_id = %receipt.post_id, "Review summary posted"),
                    Err(e) => error!(error = %e, "Failed to post review summary"),
                }
            } else {
                info!("No winners yet — review summary withheld");
            }
        }
        Err(e) => error!(error = %e, "Review pass failed"),
    }

    let remaining = cfg
        .agent
        .pause_mins
        .saturating_sub(cfg.agent.review_delay_mins);
    tokio::select! {
        _ = tokio::time::sleep(Duration::from_secs(remaining * 60)) => {}
        _ = shutdown.cancelled() => return,
    }

    window.reset(Utc::now());
    info!("Pause over — resuming calls");
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("callsign=info"));

    let json_logging = std::env::var("CALLSIGN_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt().with_env_filter(env_filter).with_target(true).init();
    }
}

//! Posting cadence state.
//!
//! The agent may only post so many calls per pacing window before it backs
//! off. The window lives in an explicit state struct owned by the main
//! loop and passed around by reference, so the pipeline itself carries no
//! scheduling state and the pacing rules are testable with fixed clocks.

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

/// Rolling post-count window.
#[derive(Debug, Clone)]
pub struct PostWindow {
    max_posts: u32,
    window: Duration,
    started_at: DateTime<Utc>,
    count: u32,
}

impl PostWindow {
    pub fn new(max_posts: u32, window_mins: i64, now: DateTime<Utc>) -> Self {
        Self {
            max_posts,
            window: Duration::minutes(window_mins),
            started_at: now,
            count: 0,
        }
    }

    /// Current count inside the window.
    pub fn count(&self) -> u32 {
        self.count
    }

    /// Record a successful post. Rolls the window over first if it has
    /// already elapsed.
    pub fn record_post(&mut self, now: DateTime<Utc>) {
        self.roll_if_elapsed(now);
        self.count += 1;
        debug!(count = self.count, max = self.max_posts, "Post recorded in window");
    }

    /// Whether the window's budget is spent.
    pub fn is_exhausted(&self, now: DateTime<Utc>) -> bool {
        if now - self.started_at >= self.window {
            return false;
        }
        self.count >= self.max_posts
    }

    /// Start a fresh window (after a pause).
    pub fn reset(&mut self, now: DateTime<Utc>) {
        self.started_at = now;
        self.count = 0;
    }

    fn roll_if_elapsed(&mut self, now: DateTime<Utc>) {
        if now - self.started_at >= self.window {
            self.reset(now);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

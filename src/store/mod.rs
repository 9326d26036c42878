//! Persistence layer — the call store.
//!
//! Two things are durable in CALLSIGN: the set of mints the agent has ever
//! called (the seen set: monotonic, entries are never removed), and one
//! immutable qualification record per called mint (the entry baseline the
//! reviewer measures against). Both live in Redis behind the `CallStore`
//! trait; an in-memory store backs tests and dry runs.

use anyhow::{Context, Result};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::{debug, info};

use crate::types::QualificationRecord;

/// Durable membership + record storage for called mints.
///
/// Every method is fallible I/O from the pipeline's point of view; a store
/// failure aborts the current cycle rather than being retried here.
#[async_trait]
pub trait CallStore: Send + Sync {
    /// Whether a mint has already been called.
    async fn is_tracked(&self, mint: &str) -> Result<bool>;

    /// Add a mint to the called set. Idempotent.
    async fn track(&self, mint: &str) -> Result<()>;

    /// All called mints.
    async fn tracked_mints(&self) -> Result<Vec<String>>;

    /// Number of called mints (doubles as the lifetime post count).
    async fn tracked_count(&self) -> Result<u64>;

    /// Persist the qualification record for a mint. Written once, at
    /// acceptance, immediately before `track`.
    async fn save_record(&self, mint: &str, record: &QualificationRecord) -> Result<()>;

    /// Load a mint's qualification record. `Ok(None)` when absent; a parse
    /// failure of a stored record is an error the caller may choose to skip.
    async fn load_record(&self, mint: &str) -> Result<Option<QualificationRecord>>;
}

// ---------------------------------------------------------------------------
// Redis store
// ---------------------------------------------------------------------------

pub struct RedisStore {
    conn: ConnectionManager,
    tracked_set_key: String,
    record_key_prefix: String,
}

impl RedisStore {
    /// Connect to Redis. The connection manager transparently reconnects,
    /// so one store instance lives for the whole agent run.
    pub async fn connect(
        url: &str,
        tracked_set_key: String,
        record_key_prefix: String,
    ) -> Result<Self> {
        let client = redis::Client::open(url).context("Invalid Redis URL")?;
        let conn = client
            .get_connection_manager()
            .await
            .context("Failed to connect to Redis")?;

        info!(set = %tracked_set_key, "Connected to Redis call store");
        Ok(Self {
            conn,
            tracked_set_key,
            record_key_prefix,
        })
    }

    fn record_key(&self, mint: &str) -> String {
        format!("{}{mint}", self.record_key_prefix)
    }
}

#[async_trait]
impl CallStore for RedisStore {
    async fn is_tracked(&self, mint: &str) -> Result<bool> {
        let mut conn = self.conn.clone();
        let member: bool = conn
            .sismember(&self.tracked_set_key, mint)
            .await
            .context("SISMEMBER failed")?;
        Ok(member)
    }

    async fn track(&self, mint: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: i64 = conn
            .sadd(&self.tracked_set_key, mint)
            .await
            .context("SADD failed")?;
        debug!(mint, "Mint added to called set");
        Ok(())
    }

    async fn tracked_mints(&self) -> Result<Vec<String>> {
        let mut conn = self.conn.clone();
        let mints: Vec<String> = conn
            .smembers(&self.tracked_set_key)
            .await
            .context("SMEMBERS failed")?;
        Ok(mints)
    }

    async fn tracked_count(&self) -> Result<u64> {
        let mut conn = self.conn.clone();
        let count: u64 = conn
            .scard(&self.tracked_set_key)
            .await
            .context("SCARD failed")?;
        Ok(count)
    }

    async fn save_record(&self, mint: &str, record: &QualificationRecord) -> Result<()> {
        let json = serde_json::to_string(record).context("Failed to serialise record")?;
        let mut conn = self.conn.clone();
        let _: () = conn
            .set(self.record_key(mint), json)
            .await
            .context("SET record failed")?;
        debug!(mint, "Qualification record saved");
        Ok(())
    }

    async fn load_record(&self, mint: &str) -> Result<Option<QualificationRecord>> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn
            .get(self.record_key(mint))
            .await
            .context("GET record failed")?;

        match raw {
            None => Ok(None),
            Some(json) => {
                let record: QualificationRecord = serde_json::from_str(&json)
                    .with_context(|| format!("Malformed stored record for {mint}"))?;
                Ok(Some(record))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// In-memory store (tests, dry runs)
// ---------------------------------------------------------------------------

/// In-memory `CallStore` with the same semantics as the Redis store.
/// Tracked mints keep insertion order.
#[derive(Default)]
pub struct MemoryStore {
    tracked: Mutex<Vec<String>>,
    records: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a raw (possibly malformed) record payload. Test hook for
    /// exercising parse-failure handling.
    pub fn put_raw_record(&self, mint: &str, json: &str) {
        self.records
            .lock()
            .unwrap()
            .insert(mint.to_string(), json.to_string());
    }
}

#[async_trait]
impl CallStore for MemoryStore {
    async fn is_tracked(&self, mint: &str) -> Result<bool> {
        Ok(self.tracked.lock().unwrap().iter().any(|m| m == mint))
    }

    async fn track(&self, mint: &str) -> Result<()> {
        let mut tracked = self.tracked.lock().unwrap();
        if !tracked.iter().any(|m| m == mint) {
            tracked.push(mint.to_string());
        }
        Ok(())
    }

    async fn tracked_mints(&self) -> Result<Vec<String>> {
        Ok(self.tracked.lock().unwrap().clone())
    }

    async fn tracked_count(&self) -> Result<u64> {
        Ok(self.tracked.lock().unwrap().len() as u64)
    }

    async fn save_record(&self, mint: &str, record: &QualificationRecord) -> Result<()> {
        let json = serde_json::to_string(record)?;
        self.records.lock().unwrap().insert(mint.to_string(), json);
        Ok(())
    }

    async fn load_record(&self, mint: &str) -> Result<Option<QualificationRecord>> {
        let raw = self.records.lock().unwrap().get(mint).cloned();
        match raw {
            None => Ok(None),
            Some(json) => {
                let record: QualificationRecord = serde_json::from_str(&json)
                    .with_context(|| format!("Malformed stored record for {mint}"))?;
                Ok(Some(record))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! LLM integration for call write-ups.
//!
//! Defines the `Analyst` trait and provides the DeepInfra-backed
//! implementation used in production.

pub mod deepinfra;

use anyhow::Result;
use async_trait::async_trait;

use crate::types::QualificationRecord;

/// Abstraction over the model that turns a qualification record into the
/// short analysis text posted with each call.
#[async_trait]
pub trait Analyst: Send + Sync {
    /// Compose the post text for a freshly qualified coin.
    async fn compose_call(&self, record: &QualificationRecord) -> Result<String>;

    /// Model identifier string.
    fn model_name(&self) -> &str;
}

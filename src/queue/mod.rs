//! Time queue: maps notification id to due instant. Kept behind a trait so
//! the worker can run against either an external time-indexed store or a
//! purely in-memory double in tests.

pub mod memory;
pub mod redis;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::AppResult;

#[async_trait]
pub trait TimeQueue: Send + Sync {
    /// Insert or update. A later `enqueue` with the same id replaces the
    /// score, so at most one entry ever exists per notification id.
    async fn enqueue(&self, id: &str, due_at: DateTime<Utc>) -> AppResult<()>;

    /// Idempotent; an absent id is never an error.
    async fn remove(&self, id: &str) -> AppResult<()>;

    /// Atomically selects up to `limit` ids whose score <= now, removes
    /// them, and returns them in ascending score order. Must never return
    /// the same id twice across concurrent calls.
    async fn pop_due(&self, limit: i64) -> AppResult<Vec<String>>;
}

pub use memory::InMemoryTimeQueue;
pub use self::redis::RedisTimeQueue;

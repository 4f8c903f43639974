//! Redis-backed `TimeQueue`: a single sorted set (`notify:due`) keyed by
//! notification id with score = epoch seconds of `when`.
//!
//! `pop_due` needs to select and remove the due ids as one atomic step —
//! a plain `ZRANGEBYSCORE` followed by `ZREM` would let two concurrent
//! pops both see and return the same ids when their ranges overlap. This
//! implementation runs both commands inside a single server-side Lua
//! script instead, so the range-and-remove is indivisible from Redis's
//! point of view.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Script};

use super::TimeQueue;
use crate::error::{AppError, AppResult};

const DUE_SET_KEY: &str = "notify:due";

const POP_DUE_SCRIPT: &str = r#"
local key = KEYS[1]
local max_score = ARGV[1]
local limit = tonumber(ARGV[2])
local ids = redis.call('ZRANGEBYSCORE', key, '-inf', max_score, 'LIMIT', 0, limit)
if #ids > 0 then
    redis.call('ZREM', key, unpack(ids))
end
return ids
"#;

pub struct RedisTimeQueue {
    conn: ConnectionManager,
    script: Script,
}

impl RedisTimeQueue {
    pub async fn connect(url: &str) -> AppResult<Self> {
        let client = redis::Client::open(url).map_err(|e| AppError::Queue(e.to_string()))?;
        let conn = client
            .get_connection_manager()
            .await
            .map_err(|e| AppError::Queue(e.to_string()))?;
        Ok(Self {
            conn,
            script: Script::new(POP_DUE_SCRIPT),
        })
    }
}

#[async_trait]
impl TimeQueue for RedisTimeQueue {
    async fn enqueue(&self, id: &str, due_at: DateTime<Utc>) -> AppResult<()> {
        let mut conn = self.conn.clone();
        let score = due_at.timestamp();
        let _: () = conn
            .zadd(DUE_SET_KEY, id, score)
            .await
            .map_err(|e| AppError::Queue(e.to_string()))?;
        Ok(())
    }

    async fn remove(&self, id: &str) -> AppResult<()> {
        let mut conn = self.conn.clone();
        // ZREM on an absent member returns 0, never an error, so removing
        // an id that was never enqueued (or already popped) is a no-op.
        let _: i64 = conn
            .zrem(DUE_SET_KEY, id)
            .await
            .map_err(|e| AppError::Queue(e.to_string()))?;
        Ok(())
    }

    async fn pop_due(&self, limit: i64) -> AppResult<Vec<String>> {
        let mut conn = self.conn.clone();
        let now = Utc::now().timestamp();
        let ids: Vec<String> = self
            .script
            .key(DUE_SET_KEY)
            .arg(now)
            .arg(limit)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| AppError::Queue(e.to_string()))?;
        Ok(ids)
    }
}

//! Purely in-memory `TimeQueue` double, for tests that exercise the worker's
//! tick loop (S1-S6) without a live Redis instance.

use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use super::TimeQueue;
use crate::error::AppResult;

#[derive(Default)]
struct Inner {
    scores: HashMap<String, i64>,
    ordered: BTreeSet<(i64, String)>,
}

#[derive(Default)]
pub struct InMemoryTimeQueue {
    inner: Mutex<Inner>,
}

impl InMemoryTimeQueue {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TimeQueue for InMemoryTimeQueue {
    async fn enqueue(&self, id: &str, due_at: DateTime<Utc>) -> AppResult<()> {
        let score = due_at.timestamp();
        let mut inner = self.inner.lock().await;
        if let Some(old_score) = inner.scores.remove(id) {
            inner.ordered.remove(&(old_score, id.to_string()));
        }
        inner.scores.insert(id.to_string(), score);
        inner.ordered.insert((score, id.to_string()));
        Ok(())
    }

    async fn remove(&self, id: &str) -> AppResult<()> {
        let mut inner = self.inner.lock().await;
        if let Some(score) = inner.scores.remove(id) {
            inner.ordered.remove(&(score, id.to_string()));
        }
        Ok(())
    }

    async fn pop_due(&self, limit: i64) -> AppResult<Vec<String>> {
        let now = Utc::now().timestamp();
        let mut inner = self.inner.lock().await;

        let due: Vec<(i64, String)> = inner
            .ordered
            .iter()
            .take_while(|(score, _)| *score <= now)
            .take(limit.max(0) as usize)
            .cloned()
            .collect();

        for (score, id) in &due {
            inner.ordered.remove(&(*score, id.clone()));
            inner.scores.remove(id);
        }

        Ok(due.into_iter().map(|(_, id)| id).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[tokio::test]
    async fn enqueue_then_reenqueue_only_exposes_latest_score() {
        let q = InMemoryTimeQueue::new();
        let now = Utc::now();
        q.enqueue("n1", now - Duration::seconds(10)).await.unwrap();
        q.enqueue("n1", now + Duration::seconds(3600)).await.unwrap();

        let due = q.pop_due(10).await.unwrap();
        assert!(due.is_empty(), "n1 should no longer be due after re-enqueue");
    }

    #[tokio::test]
    async fn pop_due_returns_only_due_ids_and_removes_them() {
        let q = InMemoryTimeQueue::new();
        let now = Utc::now();
        q.enqueue("n1", now - Duration::seconds(1)).await.unwrap();
        q.enqueue("n2", now + Duration::seconds(5)).await.unwrap();

        let due = q.pop_due(10).await.unwrap();
        assert_eq!(due, vec!["n1".to_string()]);

        let due_again = q.pop_due(10).await.unwrap();
        assert!(due_again.is_empty());
    }

    #[tokio::test]
    async fn remove_absent_id_is_not_an_error() {
        let q = InMemoryTimeQueue::new();
        assert!(q.remove("does-not-exist").await.is_ok());
    }
}

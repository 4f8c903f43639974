//! Worker: owns the reminder-delivery state machine. `add_notification`,
//! `delete_notification_by_id`, and `delete_all_notifications_by_event_id`
//! are called directly by the notify service; `run` is the tick loop,
//! spawned once from `main` and driven by a shutdown signal every spawned
//! task selects against.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;

use crate::config::WorkerConfig;
use crate::db::models::{CreateNotificationRequest, DeleteNotificationsRequest};
use crate::db::UnitOfWork;
use crate::error::{AppError, AppResult};
use crate::queue::TimeQueue;
use crate::services::sender::Sender;

pub struct Worker {
    uow: UnitOfWork,
    queue: Arc<dyn TimeQueue>,
    sender: Arc<dyn Sender>,
    interval: Duration,
    limit: i64,
}

impl Worker {
    pub fn new(
        uow: UnitOfWork,
        queue: Arc<dyn TimeQueue>,
        sender: Arc<dyn Sender>,
        config: &WorkerConfig,
    ) -> Self {
        Self {
            uow,
            queue,
            sender,
            interval: Duration::from_secs(config.interval_seconds),
            limit: config.limit,
        }
    }

    /// Inside one unit of work, inserts the notification row, then enqueues
    /// `(id, req.when)`. A failed enqueue rolls back the insert, so a
    /// dangling row is never left behind.
    pub async fn add_notification(&self, req: CreateNotificationRequest) -> AppResult<()> {
        let queue = self.queue.clone();
        self.uow
            .do_tx(move |repos| {
                let req = req.clone();
                let queue = queue.clone();
                Box::pin(async move {
                    let id = repos.create_notification(&req).await?;
                    if let Err(e) = queue.enqueue(&id, req.when).await {
                        tracing::warn!(notification_id = %id, error = %e, "enqueue failed, rolling back");
                        return Err(e);
                    }
                    Ok(())
                })
            })
            .await
    }

    /// Best-effort queue remove first, then the authoritative transactional
    /// row delete.
    pub async fn delete_notification_by_id(&self, id: &str) -> AppResult<()> {
        if let Err(e) = self.queue.remove(id).await {
            tracing::warn!(notification_id = %id, error = %e, "best-effort queue remove failed");
        }

        let id = id.to_string();
        self.uow
            .do_tx(move |repos| {
                let id = id.clone();
                Box::pin(async move { repos.delete_notification_by_id(&id).await })
            })
            .await
    }

    pub async fn delete_all_notifications_by_event_id(&self, req: &DeleteNotificationsRequest) -> AppResult<()> {
        let ids = crate::db::repository::NotificationRepository::get_ids_by_event_id(
            self.uow.pool(),
            &req.event_id,
        )
        .await?;
        crate::db::unit_of_work::warn_pool_fallback("Worker::delete_all_notifications_by_event_id::read");

        for id in &ids {
            if let Err(e) = self.queue.remove(id).await {
                tracing::warn!(notification_id = %id, error = %e, "best-effort queue remove failed");
            }
        }

        let event_id = req.event_id.clone();
        self.uow
            .do_tx(move |repos| {
                let event_id = event_id.clone();
                Box::pin(async move { repos.delete_notifications_by_event_id(&event_id).await })
            })
            .await
    }

    /// The tick loop. Exits between ticks once `shutdown` fires; an
    /// in-progress tick finishes on a best-effort basis.
    pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        if *shutdown.borrow() {
            return;
        }

        let mut ticker = tokio::time::interval(self.interval);
        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    tracing::info!("worker shutting down");
                    return;
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.tick().await {
                        tracing::warn!(error = %e, "tick failed");
                    }
                }
            }
        }
    }

    async fn tick(&self) -> AppResult<()> {
        let ids = match self.queue.pop_due(self.limit).await {
            Ok(ids) => ids,
            Err(e) => {
                tracing::warn!(error = %e, "pop_due failed, skipping tick");
                return Ok(());
            }
        };

        if ids.is_empty() {
            return Ok(());
        }

        let sender = self.sender.clone();
        self.uow
            .do_tx(move |repos| {
                let ids = ids.clone();
                let sender = sender.clone();
                Box::pin(async move {
                    let mut batch = Vec::with_capacity(ids.len());
                    for id in &ids {
                        match repos.get_notification_by_id(id).await {
                            Ok(notification) => batch.push(notification),
                            Err(AppError::NotFound(_)) => {
                                tracing::debug!(notification_id = %id, "ghost notification, skipping");
                            }
                            Err(e) => {
                                tracing::warn!(notification_id = %id, error = %e, "failed to load notification");
                            }
                        }
                    }

                    if let Err(e) = sender.send(&batch).await {
                        // Non-fatal: the worker still deletes every row it
                        // attempted, preferring at-most-once delivery over
                        // retry storms.
                        tracing::warn!(error = %e, "sender failed for this batch");
                    }

                    for notification in &batch {
                        if let Err(e) = repos.delete_notification_by_id(&notification.id).await {
                            tracing::warn!(notification_id = %notification.id, error = %e, "failed to delete delivered notification");
                        }
                    }

                    Ok(())
                })
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::{Channel, CreateEventRequest};
    use crate::queue::InMemoryTimeQueue;
    use crate::services::sender::RecordingSender;

    fn sample_worker_config() -> WorkerConfig {
        WorkerConfig {
            interval_seconds: 30,
            limit: 100,
        }
    }

    // These tests exercise pieces that do not require a live Postgres
    // connection; full tick-loop coverage needs a database and is
    // exercised in the integration suite, not here.

    #[test]
    fn worker_config_defaults_are_thirty_seconds_and_limit_one_hundred() {
        let cfg = sample_worker_config();
        assert_eq!(cfg.interval_seconds, 30);
        assert_eq!(cfg.limit, 100);
    }

    #[tokio::test]
    async fn recording_sender_accumulates_batches() {
        let sender = RecordingSender::new();
        let notification = crate::db::models::Notification {
            id: "n1".into(),
            event_id: "e1".into(),
            message: "hi".into(),
            when: Utc::now(),
            channel: Channel::Email,
            recipient: "a@b.c".into(),
        };
        sender.send(&[notification]).await.unwrap();
        assert_eq!(sender.sent.lock().await.len(), 1);
    }

    #[test]
    fn create_event_request_invariant_helper_compiles() {
        let req = CreateEventRequest {
            title: "t".into(),
            description: "d".into(),
            start: Utc::now(),
            end: Utc::now() + chrono::Duration::hours(1),
            notify: true,
            email: "a@b.c".into(),
        };
        assert!(req.end > req.start);
    }
}

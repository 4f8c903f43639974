//! Notify service: the single consumer of the job bus. Dispatches each
//! `Job` to the matching `Worker` operation, carrying requests from the
//! HTTP-facing event service through to the delivery worker.
//!
//! `Job` is a closed enum (`CreateNotification` | `DeleteNotifications`), so
//! the match below is already exhaustive — there is no "unknown job type"
//! arm to write.

use std::sync::Arc;

use tokio::sync::watch;

use crate::db::models::Job;
use crate::jobs::JobReceiver;
use crate::services::worker::Worker;

pub struct NotifyService {
    worker: Arc<Worker>,
}

impl NotifyService {
    pub fn new(worker: Arc<Worker>) -> Self {
        Self { worker }
    }

    /// Drains jobs until the bus closes or `shutdown` fires. Each job is
    /// handled on a best-effort basis: failures are logged, never
    /// propagated, since there is no caller left to report them to.
    pub async fn run(self: Arc<Self>, mut jobs: JobReceiver, mut shutdown: watch::Receiver<bool>) {
        if *shutdown.borrow() {
            return;
        }

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    tracing::info!("notify service shutting down");
                    return;
                }
                job = jobs.recv() => {
                    match job {
                        Some(job) => self.handle(job).await,
                        None => {
                            tracing::info!("job bus closed, notify service exiting");
                            return;
                        }
                    }
                }
            }
        }
    }

    async fn handle(&self, job: Job) {
        match job {
            Job::CreateNotification(req) => {
                let event_id = req.event_id.clone();
                if let Err(e) = self.worker.add_notification(req).await {
                    tracing::warn!(event_id = %event_id, error = %e, "add_notification failed");
                }
            }
            Job::DeleteNotifications(req) => {
                let event_id = req.event_id.clone();
                if let Err(e) = self.worker.delete_all_notifications_by_event_id(&req).await {
                    tracing::warn!(event_id = %event_id, error = %e, "delete_all_notifications_by_event_id failed");
                }
            }
        }
    }
}

//! Job bus & lifecycle: a bounded, in-process channel carrying notification
//! lifecycle jobs from the event service to the single notify service
//! consumer. `publish` races the send against the process-wide shutdown
//! signal, so a full bus never leaves a publisher blocked forever once the
//! process is tearing down.
//!
//! Shutdown is modeled with `tokio::sync::watch` rather than `broadcast`:
//! a `watch::Receiver` always reflects the *current* value of the signal,
//! even for a receiver created after the shutdown already fired, which is
//! exactly the "did we already shut down" check every publisher needs.
//! `broadcast`, by contrast, only delivers values sent after a receiver
//! subscribes — the right tool for fanning out a stream of distinct
//! values, not for a single sticky "we are shutting down" flag.

use tokio::sync::{mpsc, watch};

use crate::db::models::Job;
use crate::error::{AppError, AppResult};

/// Minimum bus capacity; a caller-supplied capacity is clamped up to this.
pub const MIN_CAPACITY: usize = 100;

#[derive(Clone)]
pub struct JobBus {
    sender: mpsc::Sender<Job>,
    shutdown: watch::Receiver<bool>,
}

pub struct JobReceiver(mpsc::Receiver<Job>);

impl JobBus {
    pub fn new(capacity: usize, shutdown: watch::Receiver<bool>) -> (Self, JobReceiver) {
        let capacity = capacity.max(MIN_CAPACITY);
        let (sender, receiver) = mpsc::channel(capacity);
        (Self { sender, shutdown }, JobReceiver(receiver))
    }

    pub async fn publish(&self, job: Job) -> AppResult<()> {
        if *self.shutdown.borrow() {
            return Err(AppError::Canceled);
        }

        let mut shutdown = self.shutdown.clone();
        tokio::select! {
            result = self.sender.send(job) => {
                result.map_err(|_| AppError::Transient("job bus closed".to_string()))
            }
            _ = shutdown.changed() => Err(AppError::Canceled),
        }
    }
}

impl JobReceiver {
    pub async fn recv(&mut self) -> Option<Job> {
        self.0.recv().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::DeleteNotificationsRequest;

    #[tokio::test]
    async fn publish_then_recv_round_trips_a_job() {
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        let (bus, mut receiver) = JobBus::new(4, shutdown_rx);

        bus.publish(Job::DeleteNotifications(DeleteNotificationsRequest {
            event_id: "e1".to_string(),
        }))
        .await
        .unwrap();

        match receiver.recv().await {
            Some(Job::DeleteNotifications(req)) => assert_eq!(req.event_id, "e1"),
            other => panic!("unexpected job: {other:?}"),
        }
    }

    #[tokio::test]
    async fn publish_after_shutdown_is_canceled() {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (bus, _receiver) = JobBus::new(4, shutdown_rx);
        shutdown_tx.send(true).unwrap();

        let result = bus
            .publish(Job::DeleteNotifications(DeleteNotificationsRequest {
                event_id: "e1".to_string(),
            }))
            .await;
        assert!(matches!(result, Err(AppError::Canceled)));
    }
}

//! Fan-in log bus: merges each component's per-component log channel into a
//! single stream without ever closing it early. One forwarding task runs
//! per input, forwarding until either that input closes or shutdown fires,
//! without closing the merged output in the meantime.
//!
//! The sink this bus feeds is a `tracing::Subscriber`, not a hand-rolled
//! listener, so `fan_in` simply re-emits every merged entry through the
//! matching `tracing` macro. The bus itself is still exercised directly in
//! its own tests, independent of whatever sink consumes the merged stream.

use tokio::sync::{mpsc, watch};

/// Channel capacity floor for a single component's log channel.
pub const MIN_CAPACITY: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Debug,
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone)]
pub struct LogEntry {
    pub component: &'static str,
    pub level: Level,
    pub message: String,
}

/// A per-component log handle. `component_logs` creates one of these and
/// retains the sending half; callers only ever see `LogHandle::send`.
#[derive(Clone)]
pub struct LogHandle {
    component: &'static str,
    sender: mpsc::Sender<LogEntry>,
    shutdown: watch::Receiver<bool>,
}

impl LogHandle {
    /// Warn/error entries block until consumed or shutdown; debug/info are
    /// best-effort and dropped when the channel is full, since they are not
    /// worth stalling the caller over.
    pub async fn send(&self, level: Level, message: impl Into<String>) {
        let entry = LogEntry {
            component: self.component,
            level,
            message: message.into(),
        };

        if level >= Level::Warn {
            let mut shutdown = self.shutdown.clone();
            tokio::select! {
                _ = self.sender.send(entry) => {}
                _ = shutdown.changed() => {}
            }
        } else if let Err(mpsc::error::TrySendError::Closed(_)) = self.sender.try_send(entry) {
            // Receiver gone; nothing left to forward to.
        }
    }
}

/// One input of the fan-in: a component name plus the receiving half of its
/// log channel.
pub struct LogSource {
    pub component: &'static str,
    pub receiver: mpsc::Receiver<LogEntry>,
}

/// Creates a bounded log channel for `component`, returning the sending
/// handle callers hold and the source the fan-in bus merges from.
pub fn component_logs(
    component: &'static str,
    capacity: usize,
    shutdown: watch::Receiver<bool>,
) -> (LogHandle, LogSource) {
    let (sender, receiver) = mpsc::channel(capacity.max(MIN_CAPACITY));
    (
        LogHandle {
            component,
            sender,
            shutdown,
        },
        LogSource {
            component,
            receiver,
        },
    )
}

/// Spawns one forwarding task per input source and returns the merged
/// output receiver. Each task exits when its input closes or `shutdown`
/// fires; the output channel is only closed once every forwarding task has
/// exited, which happens naturally once all cloned senders are dropped.
pub fn fan_in(sources: Vec<LogSource>, shutdown: watch::Receiver<bool>) -> mpsc::Receiver<LogEntry> {
    let (out_tx, out_rx) = mpsc::channel(MIN_CAPACITY.max(sources.len() * MIN_CAPACITY));

    for source in sources {
        let out_tx = out_tx.clone();
        let mut shutdown = shutdown.clone();
        tokio::spawn(async move {
            let LogSource {
                component,
                mut receiver,
            } = source;
            loop {
                tokio::select! {
                    _ = shutdown.changed() => {
                        return;
                    }
                    entry = receiver.recv() => {
                        match entry {
                            Some(entry) => {
                                if out_tx.send(entry).await.is_err() {
                                    return;
                                }
                            }
                            None => {
                                tracing::debug!(component, "log source closed");
                                return;
                            }
                        }
                    }
                }
            }
        });
    }

    out_rx
}

/// Drains the merged stream into `tracing` events. Spawned once from
/// `main`; exits when the fan-in output closes.
pub async fn emit_to_tracing(mut merged: mpsc::Receiver<LogEntry>) {
    while let Some(entry) = merged.recv().await {
        match entry.level {
            Level::Debug => tracing::debug!(component = entry.component, "{}", entry.message),
            Level::Info => tracing::info!(component = entry.component, "{}", entry.message),
            Level::Warn => tracing::warn!(component = entry.component, "{}", entry.message),
            Level::Error => tracing::error!(component = entry.component, "{}", entry.message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fan_in_merges_three_producers_until_shutdown() {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let (handle_a, source_a) = component_logs("a", 8, shutdown_rx.clone());
        let (handle_b, source_b) = component_logs("b", 8, shutdown_rx.clone());
        let (handle_c, source_c) = component_logs("c", 8, shutdown_rx.clone());

        let mut merged = fan_in(vec![source_a, source_b, source_c], shutdown_rx.clone());

        handle_a.send(Level::Info, "A").await;
        handle_b.send(Level::Info, "B").await;
        handle_c.send(Level::Info, "C").await;

        let mut seen = std::collections::HashSet::new();
        for _ in 0..3 {
            let entry = merged.recv().await.expect("expected an entry");
            seen.insert(entry.message);
        }
        assert_eq!(
            seen,
            ["A", "B", "C"].into_iter().map(String::from).collect()
        );

        shutdown_tx.send(true).unwrap();
        // give forwarding tasks a chance to observe shutdown and exit
        tokio::task::yield_now().await;
        assert!(merged.recv().await.is_none() || merged.try_recv().is_err());
    }

    #[tokio::test]
    async fn warn_level_send_is_not_dropped_under_pressure() {
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        let (handle, mut source) = component_logs("worker", MIN_CAPACITY, shutdown_rx);
        handle.send(Level::Warn, "danger").await;
        let entry = source.receiver.recv().await.unwrap();
        assert_eq!(entry.level, Level::Warn);
        assert_eq!(entry.message, "danger");
    }
}

//! Unit of work: begins a transaction, threads it through every repository
//! call nested inside the supplied closure, then commits on `Ok` or rolls
//! back on `Err`.
//!
//! `Repositories` is the single handle passed into that closure; every
//! method on it is transactional, so there is no adapter-per-consumer
//! indirection to thread through.
//!
//! A repository call made without an active unit of work instead calls
//! `EventRepository`/`NotificationRepository` directly against the shared
//! pool; call sites that do this log a warning via `warn_pool_fallback`.

use std::future::Future;
use std::pin::Pin;

use sqlx::{PgPool, Postgres, Transaction};

use crate::db::models::{CreateEventRequest, CreateNotificationRequest, Event, Notification, UpdateEventRequest};
use crate::db::repository::{EventRepository, NotificationRepository};
use crate::error::AppResult;

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Handle to the active transaction, passed by mutable reference into the
/// closure given to `UnitOfWork::do_tx`. Every method here is transactional.
pub struct Repositories {
    tx: Transaction<'static, Postgres>,
}

impl Repositories {
    pub async fn create_event(&mut self, req: &CreateEventRequest) -> AppResult<String> {
        EventRepository::create(&mut *self.tx, req).await
    }

    pub async fn create_event_with_id(&mut self, id: &str, req: &CreateEventRequest) -> AppResult<()> {
        EventRepository::create_with_id(&mut *self.tx, id, req).await
    }

    pub async fn get_event(&mut self, id: &str) -> AppResult<Event> {
        EventRepository::get(&mut *self.tx, id).await
    }

    pub async fn update_event(&mut self, id: &str, req: &UpdateEventRequest) -> AppResult<()> {
        EventRepository::update(&mut *self.tx, id, req).await
    }

    pub async fn delete_event(&mut self, id: &str) -> AppResult<()> {
        EventRepository::delete(&mut *self.tx, id).await
    }

    pub async fn create_notification(&mut self, req: &CreateNotificationRequest) -> AppResult<String> {
        NotificationRepository::create(&mut *self.tx, req).await
    }

    pub async fn get_notification_by_id(&mut self, id: &str) -> AppResult<Notification> {
        NotificationRepository::get_by_id(&mut *self.tx, id).await
    }

    pub async fn get_notification_ids_by_event_id(&mut self, event_id: &str) -> AppResult<Vec<String>> {
        NotificationRepository::get_ids_by_event_id(&mut *self.tx, event_id).await
    }

    pub async fn delete_notification_by_id(&mut self, id: &str) -> AppResult<()> {
        NotificationRepository::delete_by_id(&mut *self.tx, id).await
    }

    pub async fn delete_notifications_by_event_id(&mut self, event_id: &str) -> AppResult<()> {
        NotificationRepository::delete_all_by_event_id(&mut *self.tx, event_id).await
    }
}

#[derive(Clone)]
pub struct UnitOfWork {
    pool: PgPool,
}

impl UnitOfWork {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// `Do(fn)`: begins a transaction, hands `fn` a `Repositories` handle,
    /// commits on `Ok`, rolls back on `Err`. If `fn` panics, the
    /// transaction is dropped unconsumed, which rolls it back via
    /// `sqlx::Transaction`'s `Drop` impl; the panic itself continues to
    /// unwind (Rust re-raises panics through drops automatically, so no
    /// explicit catch/rethrow is needed here).
    pub async fn do_tx<T, F>(&self, f: F) -> AppResult<T>
    where
        T: Send,
        F: for<'c> FnOnce(&'c mut Repositories) -> BoxFuture<'c, AppResult<T>>,
    {
        let tx = self.pool.begin().await.map_err(crate::error::AppError::Database)?;
        let mut repos = Repositories { tx };

        match f(&mut repos).await {
            Ok(value) => {
                repos
                    .tx
                    .commit()
                    .await
                    .map_err(crate::error::AppError::Database)?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = repos.tx.rollback().await {
                    tracing::warn!("rollback failed: {:?}", rollback_err);
                }
                Err(err)
            }
        }
    }
}

/// Marker used at call sites that intentionally bypass the unit of work for
/// a background read, falling back to the shared pool and logging a
/// warning rather than doing so silently.
pub fn warn_pool_fallback(caller: &str) {
    tracing::warn!(caller, "repository call without an active unit of work; using shared pool");
}

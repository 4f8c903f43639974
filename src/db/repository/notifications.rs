//! CRUD for the `notifications` table, mirroring `db::repository::events` in
//! style: runtime-checked queries over a generic `PgExecutor`.

use sqlx::PgExecutor;
use uuid::Uuid;

use crate::db::models::notification::NotificationRow;
use crate::db::models::{CreateNotificationRequest, Notification};
use crate::error::{AppError, AppResult};

pub struct NotificationRepository;

impl NotificationRepository {
    pub async fn create(
        executor: impl PgExecutor<'_>,
        req: &CreateNotificationRequest,
    ) -> AppResult<String> {
        let id = Uuid::new_v4().to_string();

        sqlx::query(
            r#"
            INSERT INTO notifications (id, event_id, message, "when", channel, recipient)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(&id)
        .bind(&req.event_id)
        .bind(&req.message)
        .bind(req.when)
        .bind(req.channel.as_str())
        .bind(&req.recipient)
        .execute(executor)
        .await
        .map_err(AppError::from_store)?;

        Ok(id)
    }

    pub async fn get_by_id(executor: impl PgExecutor<'_>, id: &str) -> AppResult<Notification> {
        let row = sqlx::query_as::<_, NotificationRow>(
            r#"SELECT id, event_id, message, "when", channel, recipient FROM notifications WHERE id = $1"#,
        )
        .bind(id)
        .fetch_one(executor)
        .await
        .map_err(AppError::from_store)?;

        row.try_into()
    }

    pub async fn get_ids_by_event_id(executor: impl PgExecutor<'_>, event_id: &str) -> AppResult<Vec<String>> {
        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT id FROM notifications WHERE event_id = $1")
                .bind(event_id)
                .fetch_all(executor)
                .await
                .map_err(AppError::from_store)?;

        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    pub async fn delete_by_id(executor: impl PgExecutor<'_>, id: &str) -> AppResult<()> {
        sqlx::query("DELETE FROM notifications WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await
            .map_err(AppError::from_store)?;
        Ok(())
    }

    pub async fn delete_all_by_event_id(executor: impl PgExecutor<'_>, event_id: &str) -> AppResult<()> {
        sqlx::query("DELETE FROM notifications WHERE event_id = $1")
            .bind(event_id)
            .execute(executor)
            .await
            .map_err(AppError::from_store)?;
        Ok(())
    }
}

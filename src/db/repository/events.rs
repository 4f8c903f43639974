//! CRUD for the `events` table. Every method takes an executor generic over
//! `sqlx::PgExecutor` so the same code runs against either a bare pool
//! (background reads) or an open transaction (see `db::unit_of_work`).
//! Queries are issued with the runtime-checked `query_as`/`query` form
//! rather than the compile-time `query!` macros, since those require a
//! live database reachable at build time.

use sqlx::PgExecutor;
use uuid::Uuid;

use crate::db::models::{CreateEventRequest, Event, UpdateEventRequest};
use crate::error::{AppError, AppResult};

pub struct EventRepository;

impl EventRepository {
    pub async fn create(executor: impl PgExecutor<'_>, req: &CreateEventRequest) -> AppResult<String> {
        let id = Uuid::new_v4().to_string();
        Self::create_with_id(executor, &id, req).await?;
        Ok(id)
    }

    pub async fn create_with_id(
        executor: impl PgExecutor<'_>,
        id: &str,
        req: &CreateEventRequest,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO events (id, title, description, start, "end", notify, email)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(id)
        .bind(&req.title)
        .bind(&req.description)
        .bind(req.start)
        .bind(req.end)
        .bind(req.notify)
        .bind(&req.email)
        .execute(executor)
        .await
        .map_err(AppError::from_store)?;

        Ok(())
    }

    pub async fn get(executor: impl PgExecutor<'_>, id: &str) -> AppResult<Event> {
        sqlx::query_as::<_, Event>(
            r#"SELECT id, title, description, start, "end", notify, email FROM events WHERE id = $1"#,
        )
        .bind(id)
        .fetch_one(executor)
        .await
        .map_err(AppError::from_store)
    }

    pub async fn get_all(executor: impl PgExecutor<'_>) -> AppResult<Vec<Event>> {
        sqlx::query_as::<_, Event>(
            r#"SELECT id, title, description, start, "end", notify, email FROM events ORDER BY start"#,
        )
        .fetch_all(executor)
        .await
        .map_err(AppError::from_store)
    }

    pub async fn update(
        executor: impl PgExecutor<'_>,
        id: &str,
        req: &UpdateEventRequest,
    ) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE events
            SET title = $1, description = $2, start = $3, "end" = $4, notify = $5, email = $6
            WHERE id = $7
            "#,
        )
        .bind(&req.title)
        .bind(&req.description)
        .bind(req.start)
        .bind(req.end)
        .bind(req.notify)
        .bind(&req.email)
        .bind(id)
        .execute(executor)
        .await
        .map_err(AppError::from_store)?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("event {id} not found")));
        }
        Ok(())
    }

    pub async fn delete(executor: impl PgExecutor<'_>, id: &str) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM events WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await
            .map_err(AppError::from_store)?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("event {id} not found")));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn create_event_request_roundtrips_fields() {
        let req = CreateEventRequest {
            title: "t".into(),
            description: "d".into(),
            start: Utc::now(),
            end: Utc::now() + chrono::Duration::hours(1),
            notify: true,
            email: "a@b.c".into(),
        };
        assert_eq!(req.title, "t");
        assert!(req.notify);
    }
}

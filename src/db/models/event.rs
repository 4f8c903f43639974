use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A calendar item with a scheduled `[start, end)` window. `end > start` is
/// enforced by the event service before any row is written; an event with
/// `notify = true` always carries a non-empty `email`.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Event {
    pub id: String,
    pub title: String,
    pub description: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub notify: bool,
    pub email: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateEventRequest {
    pub title: String,
    pub description: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[serde(default)]
    pub notify: bool,
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateEventRequest {
    pub title: String,
    pub description: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[serde(default)]
    pub notify: bool,
    #[serde(default)]
    pub email: String,
}

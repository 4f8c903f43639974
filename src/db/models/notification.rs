use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The only delivery channel supported. Kept as an enum rather than a
/// free-form string so an unsupported value is a parse-time concern, not a
/// runtime dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Email,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Email => "email",
        }
    }
}

impl std::str::FromStr for Channel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "email" => Ok(Channel::Email),
            other => Err(format!("unsupported channel: {other}")),
        }
    }
}

/// A scheduled reminder derived from an event's `start` and `notify`
/// settings. Exists if and only if a queue entry with the same id and
/// score = `when` exists.
#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    pub id: String,
    pub event_id: String,
    pub message: String,
    pub when: DateTime<Utc>,
    pub channel: Channel,
    pub recipient: String,
}

/// Row shape as stored: `channel` is persisted as text and parsed back into
/// the closed `Channel` enum on read.
#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct NotificationRow {
    pub id: String,
    pub event_id: String,
    pub message: String,
    pub when: DateTime<Utc>,
    pub channel: String,
    pub recipient: String,
}

impl TryFrom<NotificationRow> for Notification {
    type Error = crate::error::AppError;

    fn try_from(row: NotificationRow) -> Result<Self, Self::Error> {
        let channel: Channel = row
            .channel
            .parse()
            .map_err(crate::error::AppError::Unsupported)?;
        Ok(Notification {
            id: row.id,
            event_id: row.event_id,
            message: row.message,
            when: row.when,
            channel,
            recipient: row.recipient,
        })
    }
}

#[derive(Debug, Clone)]
pub struct CreateNotificationRequest {
    pub event_id: String,
    pub message: String,
    pub when: DateTime<Utc>,
    pub channel: Channel,
    pub recipient: String,
}

#[derive(Debug, Clone)]
pub struct DeleteNotificationsRequest {
    pub event_id: String,
}

/// Tagged job bus element: a closed Rust enum rather than a runtime-typed
/// container, so an "unknown job type" cannot arise — the notify service's
/// match is exhaustive by construction.
#[derive(Debug, Clone)]
pub enum Job {
    CreateNotification(CreateNotificationRequest),
    DeleteNotifications(DeleteNotificationsRequest),
}

/// How long before an event's start a reminder is due.
pub const NOTIFY_BEFORE: chrono::Duration = chrono::Duration::minutes(15);

/// Renders a reminder body: `"You have an event {title} at {start}"`.
pub fn render_message(title: &str, start: DateTime<Utc>) -> String {
    format!("You have an event {} at {}", title, start.to_rfc3339())
}

/// `when = max(start - NOTIFY_BEFORE, now)`: a reminder never fires in the
/// past relative to the moment it is scheduled.
pub fn notify_time(start: DateTime<Utc>, now: DateTime<Utc>) -> DateTime<Utc> {
    let candidate = start - NOTIFY_BEFORE;
    if candidate < now {
        now
    } else {
        candidate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn notify_time_clamps_past_to_now() {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap();
        let start = now + chrono::Duration::minutes(5);
        assert_eq!(notify_time(start, now), now);
    }

    #[test]
    fn notify_time_subtracts_fifteen_minutes_when_far_enough_out() {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap();
        let start = now + chrono::Duration::hours(1);
        assert_eq!(notify_time(start, now), start - NOTIFY_BEFORE);
    }

    #[test]
    fn channel_round_trips_through_str() {
        assert_eq!("email".parse::<Channel>().unwrap(), Channel::Email);
        assert!("sms".parse::<Channel>().is_err());
    }
}

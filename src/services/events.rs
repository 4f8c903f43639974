//! Event service: HTTP-facing use cases. Validates the domain invariants,
//! writes through the unit of work, and publishes notification jobs onto
//! the bounded job bus for the notify service to pick up.

use chrono::Utc;

use crate::db::models::{
    render_message, notify_time, Channel, CreateEventRequest, CreateNotificationRequest, Event,
    Job, UpdateEventRequest,
};
use crate::db::UnitOfWork;
use crate::error::{AppError, AppResult};
use crate::jobs::JobBus;

pub struct EventService {
    uow: UnitOfWork,
    jobs: JobBus,
}

impl EventService {
    pub fn new(uow: UnitOfWork, jobs: JobBus) -> Self {
        Self { uow, jobs }
    }

    fn validate(title_end_after_start: bool) -> AppResult<()> {
        if !title_end_after_start {
            return Err(AppError::InvalidEvent("end must be after start".to_string()));
        }
        Ok(())
    }

    fn validate_notify_requires_email(notify: bool, email: &str) -> AppResult<()> {
        if notify && email.trim().is_empty() {
            return Err(AppError::InvalidEvent(
                "email is required when notify is true".to_string(),
            ));
        }
        Ok(())
    }

    pub async fn create(&self, req: CreateEventRequest) -> AppResult<Event> {
        Self::validate(req.end > req.start)?;
        Self::validate_notify_requires_email(req.notify, &req.email)?;

        let id = self
            .uow
            .do_tx(|repos| {
                let req = req.clone();
                Box::pin(async move { repos.create_event(&req).await })
            })
            .await?;

        if req.notify {
            let job = Job::CreateNotification(CreateNotificationRequest {
                event_id: id.clone(),
                message: render_message(&req.title, req.start),
                when: notify_time(req.start, Utc::now()),
                channel: Channel::Email,
                recipient: req.email.clone(),
            });
            if let Err(e) = self.jobs.publish(job).await {
                tracing::warn!(event_id = %id, error = %e, "failed to publish notification job");
            }
        }

        Ok(Event {
            id,
            title: req.title,
            description: req.description,
            start: req.start,
            end: req.end,
            notify: req.notify,
            email: req.email,
        })
    }

    pub async fn get(&self, id: &str) -> AppResult<Event> {
        crate::db::unit_of_work::warn_pool_fallback("EventService::get");
        crate::db::repository::EventRepository::get(self.uow.pool(), id).await
    }

    pub async fn get_all(&self) -> AppResult<Vec<Event>> {
        crate::db::unit_of_work::warn_pool_fallback("EventService::get_all");
        crate::db::repository::EventRepository::get_all(self.uow.pool()).await
    }

    pub async fn update(&self, id: &str, req: UpdateEventRequest) -> AppResult<Event> {
        Self::validate(req.end > req.start)?;
        Self::validate_notify_requires_email(req.notify, &req.email)?;

        let old = self.get(id).await?;

        let changed_recipient = old.notify && old.email != req.email;
        let changed_start = old.notify && old.start != req.start;
        let notify_turned_off = old.notify && !req.notify;
        let needs_recreate = changed_recipient || changed_start || notify_turned_off;

        let id_owned = id.to_string();
        if needs_recreate {
            // Deletes the event (cascading its notifications), then
            // re-creates it under the same id. This purges any stale
            // scheduled reminder atomically with the event row; the old
            // notification's queue entry is discovered lazily by the
            // worker as a ghost rather than removed here.
            let req_clone = req.clone();
            self.uow
                .do_tx(move |repos| {
                    let id = id_owned.clone();
                    let req = req_clone.clone();
                    Box::pin(async move {
                        repos.delete_event(&id).await?;
                        repos
                            .create_event_with_id(
                                &id,
                                &CreateEventRequest {
                                    title: req.title,
                                    description: req.description,
                                    start: req.start,
                                    end: req.end,
                                    notify: req.notify,
                                    email: req.email,
                                },
                            )
                            .await
                    })
                })
                .await?;
        } else {
            let req_clone = req.clone();
            self.uow
                .do_tx(move |repos| {
                    let id = id_owned.clone();
                    let req = req_clone.clone();
                    Box::pin(async move { repos.update_event(&id, &req).await })
                })
                .await?;
        }

        if req.notify {
            let job = Job::CreateNotification(CreateNotificationRequest {
                event_id: id.to_string(),
                message: render_message(&req.title, req.start),
                when: notify_time(req.start, Utc::now()),
                channel: Channel::Email,
                recipient: req.email.clone(),
            });
            if let Err(e) = self.jobs.publish(job).await {
                tracing::warn!(event_id = %id, error = %e, "failed to publish notification job");
            }
        }

        Ok(Event {
            id: id.to_string(),
            title: req.title,
            description: req.description,
            start: req.start,
            end: req.end,
            notify: req.notify,
            email: req.email,
        })
    }

    pub async fn delete(&self, id: &str) -> AppResult<()> {
        let id_owned = id.to_string();
        self.uow
            .do_tx(move |repos| {
                let id = id_owned.clone();
                Box::pin(async move { repos.delete_event(&id).await })
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_rejects_end_equal_to_start() {
        assert!(EventService::validate(false).is_err());
        assert!(EventService::validate(true).is_ok());
    }

    #[test]
    fn validate_notify_requires_non_empty_email() {
        assert!(EventService::validate_notify_requires_email(true, "").is_err());
        assert!(EventService::validate_notify_requires_email(true, "a@b.c").is_ok());
        assert!(EventService::validate_notify_requires_email(false, "").is_ok());
    }
}

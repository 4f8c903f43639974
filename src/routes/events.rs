//! HTTP façade for the event surface. Handlers are thin: axum's `Json<T>`
//! extractor rejects an unparsable body with 400 before the handler runs,
//! and every domain invariant (end-after-start, notify-needs-email) is
//! enforced by `EventService`, which returns 422 via `AppError`.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};

use crate::db::models::{CreateEventRequest, Event, UpdateEventRequest};
use crate::error::AppResult;
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", post(create_event).get(list_events))
        .route(
            "/:id",
            get(get_event).put(update_event).delete(delete_event),
        )
}

async fn create_event(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateEventRequest>,
) -> AppResult<(StatusCode, Json<Event>)> {
    let event = state.event_service.create(req).await?;
    Ok((StatusCode::CREATED, Json(event)))
}

async fn list_events(State(state): State<Arc<AppState>>) -> AppResult<Json<Vec<Event>>> {
    let events = state.event_service.get_all().await?;
    Ok(Json(events))
}

async fn get_event(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Json<Event>> {
    let event = state.event_service.get(&id).await?;
    Ok(Json(event))
}

async fn update_event(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateEventRequest>,
) -> AppResult<Json<Event>> {
    let event = state.event_service.update(&id, req).await?;
    Ok(Json(event))
}

async fn delete_event(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    state.event_service.delete(&id).await?;
    Ok(StatusCode::OK)
}

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use chrono::{SecondsFormat, Utc};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;
use uuid::Uuid;

use crate::auth::{MaybeContext, RequestContext};
use crate::core::error::{AppError, AppResult};
use crate::models::{Event, NewEvent};
use crate::server::AppState;
use crate::store::EventScope;
use crate::utils::when::parse_when;

#[derive(Debug, Deserialize)]
pub struct ListEventsQuery {
    pub scope: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct CreateEventReq {
    pub title: Option<String>,
    pub description: Option<String>,
    pub date: Option<String>,
    pub banner_url: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct UpdateEventReq {
    pub title: Option<String>,
    pub description: Option<String>,
    pub date: Option<String>,
    pub banner_url: Option<String>,
}

fn parse_req_date(raw: &str) -> AppResult<chrono::DateTime<Utc>> {
    parse_when(raw).ok_or_else(|| {
        AppError::Invalid("Could not parse date. Use a format like '2025-10-20 20:00'.".to_string())
    })
}

/// List events. `scope=all` answers a split calendar, the other scopes a
/// flat list in their natural reading order.
pub async fn list(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListEventsQuery>,
) -> AppResult<Json<Value>> {
    let scope = match query.scope.as_deref() {
        None => EventScope::Upcoming,
        Some(s) => EventScope::parse(s)
            .ok_or_else(|| AppError::Invalid(format!("Unknown scope '{s}'")))?,
    };

    let now = Utc::now();
    let events = state.store.list_events(scope, now).await?;
    if scope == EventScope::All {
        let (upcoming, mut past): (Vec<Event>, Vec<Event>) =
            events.into_iter().partition(|e| e.date >= now);
        past.reverse();
        return Ok(Json(json!({ "upcoming": upcoming, "past": past })));
    }
    Ok(Json(json!(events)))
}

/// One event with its registration count. Signed-in callers also learn
/// whether they are registered.
pub async fn detail(
    State(state): State<Arc<AppState>>,
    MaybeContext(ctx): MaybeContext,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Value>> {
    let event = state
        .store
        .find_event(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Event".to_string()))?;
    let count = state.store.count_registrations(id).await?;

    let mut body = json!({ "event": event, "registration_count": count });
    if let Some(ctx) = ctx {
        let registered = state.store.registration_exists(ctx.user_id, id).await?;
        body["registered"] = json!(registered);
    }
    Ok(Json(body))
}

pub async fn create(
    State(state): State<Arc<AppState>>,
    ctx: RequestContext,
    Json(req): Json<CreateEventReq>,
) -> AppResult<(StatusCode, Json<Event>)> {
    ctx.require_admin()?;

    let title = req.title.as_deref().map(str::trim).filter(|t| !t.is_empty());
    let date = req.date.as_deref().map(str::trim).filter(|d| !d.is_empty());
    let (Some(title), Some(date)) = (title, date) else {
        return Err(AppError::Invalid("Title and date are required".to_string()));
    };
    let date = parse_req_date(date)?;

    let new_event = NewEvent {
        title: title.to_string(),
        description: req.description.filter(|d| !d.trim().is_empty()),
        date,
        banner_url: req.banner_url.filter(|b| !b.trim().is_empty()),
        created_by: Some(ctx.user_id),
    };
    info!("{} creating event '{}'", ctx.email, new_event.title);
    let event = state.store.insert_event(&new_event).await?;
    Ok((StatusCode::CREATED, Json(event)))
}

pub async fn update(
    State(state): State<Arc<AppState>>,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateEventReq>,
) -> AppResult<Json<Event>> {
    ctx.require_admin()?;

    let mut patch = serde_json::Map::new();
    if let Some(title) = req.title {
        let title = title.trim().to_string();
        if title.is_empty() {
            return Err(AppError::Invalid("Title must not be empty".to_string()));
        }
        patch.insert("title".to_string(), json!(title));
    }
    if let Some(description) = req.description {
        patch.insert("description".to_string(), json!(description));
    }
    if let Some(date) = req.date {
        let date = parse_req_date(date.trim())?;
        patch.insert(
            "date".to_string(),
            json!(date.to_rfc3339_opts(SecondsFormat::Secs, true)),
        );
    }
    if let Some(banner_url) = req.banner_url {
        patch.insert("banner_url".to_string(), json!(banner_url));
    }
    if patch.is_empty() {
        return Err(AppError::Invalid("No fields to update".to_string()));
    }

    info!("{} updating event {}", ctx.email, id);
    let rows = state.store.update_event(id, &Value::Object(patch)).await?;
    let event = rows
        .into_iter()
        .next()
        .ok_or_else(|| AppError::NotFound("Event".to_string()))?;
    Ok(Json(event))
}

pub async fn remove(
    State(state): State<Arc<AppState>>,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    ctx.require_admin()?;

    info!("{} deleting event {}", ctx.email, id);
    let rows = state.store.delete_event(id).await?;
    if rows.is_empty() {
        return Err(AppError::NotFound("Event".to_string()));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// Admin view of who signed up for an event.
pub async fn registrations(
    State(state): State<Arc<AppState>>,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Value>> {
    ctx.require_admin()?;

    if state.store.find_event(id).await?.is_none() {
        return Err(AppError::NotFound("Event".to_string()));
    }
    let attendees = state.store.event_attendees(id).await?;
    Ok(Json(json!(attendees)))
}

/// A caller registers themselves. The uniqueness of the (user, event)
/// pair is the store's; a lost race still answers with the conflict.
pub async fn register(
    State(state): State<Arc<AppState>>,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    ctx.require_not_blocked()?;

    if state.store.find_event(id).await?.is_none() {
        return Err(AppError::NotFound("Event".to_string()));
    }
    match state.store.register(ctx.user_id, id).await {
        Ok(()) => {
            info!("{} registered for event {}", ctx.email, id);
            Ok(StatusCode::CREATED)
        }
        Err(AppError::Conflict(_)) => Err(AppError::Conflict(
            "You are already registered for this event".to_string(),
        )),
        Err(err) => Err(err),
    }
}

pub async fn unregister(
    State(state): State<Arc<AppState>>,
    ctx: RequestContext,
    Path((id, user_id)): Path<(Uuid, Uuid)>,
) -> AppResult<StatusCode> {
    ctx.require_admin()?;

    info!("{} removing registration of {} from event {}", ctx.email, user_id, id);
    let rows = state.store.unregister(id, user_id).await?;
    if rows.is_empty() {
        return Err(AppError::NotFound("Registration".to_string()));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// The caller's own registrations, split around the current moment.
/// Both halves read oldest first.
pub async fn my_registrations(
    State(state): State<Arc<AppState>>,
    ctx: RequestContext,
) -> AppResult<Json<Value>> {
    let mut events = state.store.events_registered_by(ctx.user_id).await?;
    events.sort_by_key(|e| e.date);

    let now = Utc::now();
    let (upcoming, past): (Vec<Event>, Vec<Event>) =
        events.into_iter().partition(|e| e.date >= now);
    Ok(Json(json!({ "upcoming": upcoming, "past": past })))
}

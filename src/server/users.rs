use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::auth::RequestContext;
use crate::core::error::{AppError, AppResult};
use crate::models::User;
use crate::server::AppState;

#[derive(Debug, Deserialize)]
pub struct UpdateUserReq {
    pub is_blocked: bool,
}

pub async fn list(
    State(state): State<Arc<AppState>>,
    ctx: RequestContext,
) -> AppResult<Json<Vec<User>>> {
    ctx.require_admin()?;
    let users = state.store.list_users().await?;
    Ok(Json(users))
}

pub async fn set_blocked(
    State(state): State<Arc<AppState>>,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateUserReq>,
) -> AppResult<Json<User>> {
    ctx.require_admin()?;

    info!(
        "{} setting is_blocked={} on user {}",
        ctx.email, req.is_blocked, id
    );
    let rows = state.store.set_user_blocked(id, req.is_blocked).await?;
    let user = rows
        .into_iter()
        .next()
        .ok_or_else(|| AppError::NotFound("User".to_string()))?;
    Ok(Json(user))
}

pub async fn remove(
    State(state): State<Arc<AppState>>,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    ctx.require_admin()?;

    info!("{} deleting user {}", ctx.email, id);
    let rows = state.store.delete_user(id).await?;
    if rows.is_empty() {
        return Err(AppError::NotFound("User".to_string()));
    }
    Ok(StatusCode::NO_CONTENT)
}

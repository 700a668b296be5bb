use std::sync::Arc;

use axum::extract::State;
use axum::response::Json;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::auth::RequestContext;
use crate::core::error::AppResult;
use crate::models::ChatMessage;
use crate::server::AppState;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
}

/// Admin-only assistant endpoint. The whole transcript arrives on every
/// call; the reply is always a single string.
pub async fn chat(
    State(state): State<Arc<AppState>>,
    ctx: RequestContext,
    Json(req): Json<ChatRequest>,
) -> AppResult<Json<Value>> {
    ctx.require_admin()?;
    let reply =
        crate::chat::process_chat(&state.store, state.model.as_deref(), &req.messages).await?;
    Ok(Json(json!({ "reply": reply })))
}

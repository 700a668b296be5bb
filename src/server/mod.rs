//! HTTP surface. Routes live under `/api`; handlers stay thin and push
//! real work into the store, chat, and tool layers.

use std::sync::Arc;

use axum::Router;
use axum::response::Json;
use axum::routing::{delete, get, post};
use serde_json::{Value, json};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::auth::AuthClient;
use crate::providers::ModelProvider;
use crate::store::Store;

pub mod chat;
pub mod events;
pub mod users;

/// Shared per-process state. Every field clones cheaply; requests never
/// contend on locks.
pub struct AppState {
    pub store: Store,
    pub auth: AuthClient,
    pub model: Option<Arc<dyn ModelProvider>>,
}

impl AppState {
    pub fn new(store: Store, auth: AuthClient, model: Option<Arc<dyn ModelProvider>>) -> Self {
        Self { store, auth, model }
    }
}

/// Create the complete router with all routes
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api = Router::new()
        .route("/health", get(health))
        .route("/events", get(events::list).post(events::create))
        .route(
            "/events/{id}",
            get(events::detail)
                .patch(events::update)
                .delete(events::remove),
        )
        .route(
            "/events/{id}/registrations",
            get(events::registrations).post(events::register),
        )
        .route(
            "/events/{id}/registrations/{user_id}",
            delete(events::unregister),
        )
        .route("/my/registrations", get(events::my_registrations))
        .route("/users", get(users::list))
        .route(
            "/users/{id}",
            axum::routing::patch(users::set_blocked).delete(users::remove),
        )
        .route("/chat", post(chat::chat))
        .with_state(state);

    Router::new()
        .nest("/api", api)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

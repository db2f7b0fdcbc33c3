//! Wires the agent's internal HTTP surface onto one axum `Router`.

use crate::api::handlers;
use crate::shared::Shared;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub fn create_router(shared: Arc<Shared>) -> Router {
    Router::new()
        .route("/state", get(handlers::state))
        .route("/birth", post(handlers::birth))
        .route("/force-sync", post(handlers::force_sync))
        .route("/budget", get(handlers::budget))
        .layer(TraceLayer::new_for_http())
        .with_state(shared)
}

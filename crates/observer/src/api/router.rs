//! Wires the public and admin surfaces (spec §6) onto one axum
//! `Router`, with tracing and permissive CORS for the public routes.

use crate::api::handlers::{admin, internal, public};
use crate::api::state::AppState;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(public::health))
        .route("/api/state", get(public::state))
        .route("/api/votes", get(public::votes))
        .route("/api/vote/:choice", post(public::cast_vote))
        .route("/api/stream/activity", get(public::stream_activity))
        .route("/api/kill", post(admin::kill))
        .route("/api/respawn", post(admin::respawn))
        .route("/api/force-alive", post(admin::force_alive))
        .route("/api/god/votes/adjust", post(admin::adjust_votes))
        .route("/api/god/oracle", post(admin::send_oracle))
        .route("/internal/activity", post(internal::report_activity))
        .route("/internal/oracle", get(internal::pending_oracle))
        .route("/internal/oracle/ack", post(internal::acknowledge_oracle))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

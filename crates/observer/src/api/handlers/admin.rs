//! Admin HTTP surface (spec §6): requires a bearer admin token or a
//! local-network origin. Every handler here mutates through
//! `LifecycleManager`/`Storage`, never the raw state.

use crate::api::state::AppState;
use crate::auth::check_admin;
use axum::extract::{ConnectInfo, State};
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use entity_types::error::ApiError;
use entity_types::{DeathCause, OracleKind, OracleMessage};
use serde::Deserialize;
use serde_json::json;
use std::net::SocketAddr;

fn authorize(app: &AppState, headers: &HeaderMap, peer: SocketAddr) -> Result<(), ApiError> {
    check_admin(headers, peer.ip(), &app.admin_token, &app.local_network_cidr)
}

pub async fn kill(
    State(app): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&app, &headers, peer)?;
    app.lifecycle.transition_to_dying(DeathCause::Manual).await;
    Ok(Json(json!({"ok": true})))
}

pub async fn respawn(
    State(app): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&app, &headers, peer)?;
    app.lifecycle.schedule_respawn();
    Ok(Json(json!({"ok": true})))
}

pub async fn force_alive(
    State(app): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&app, &headers, peer)?;
    app.lifecycle.force_birth_now().await;
    Ok(Json(json!({"ok": true})))
}

#[derive(Debug, Deserialize)]
pub struct VotesAdjustRequest {
    pub live: Option<u32>,
    pub die: Option<u32>,
}

pub async fn adjust_votes(
    State(app): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(body): Json<VotesAdjustRequest>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&app, &headers, peer)?;

    let life_state = app.lifecycle.current_state().await;
    let mut round = app
        .storage
        .get_open_round(life_state.life_number)
        .await
        .map_err(|e| ApiError::internal(e.to_string()))?
        .ok_or_else(|| ApiError::NotFound("no open vote round".into()))?;

    if let Some(live) = body.live {
        round.live = live;
    }
    if let Some(die) = body.die {
        round.die = die;
    }

    app.storage
        .persist_round(&round)
        .await
        .map_err(|e| ApiError::internal(e.to_string()))?;

    Ok(Json(json!({"ok": true, "live": round.live, "die": round.die})))
}

#[derive(Debug, Deserialize)]
pub struct OracleRequest {
    pub kind: OracleKind,
    pub text: String,
}

pub async fn send_oracle(
    State(app): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(body): Json<OracleRequest>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&app, &headers, peer)?;

    let message = OracleMessage {
        kind: body.kind,
        text: body.text,
        delivered_at: Utc::now(),
        acknowledged_at: None,
    };

    app.storage
        .enqueue_oracle(message)
        .await
        .map_err(|e| ApiError::internal(e.to_string()))?;

    Ok(Json(json!({"ok": true})))
}

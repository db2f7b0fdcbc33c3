//! Public, unauthenticated HTTP surface (spec §6): health, read-only
//! state, vote submission, and the live activity SSE stream.

use crate::api::state::AppState;
use crate::auth::{effective_remote_addr, fingerprint};
use crate::voting::{submit_vote, VoteSubmitOutcome};
use axum::extract::{ConnectInfo, Path, State};
use axum::http::HeaderMap;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::IntoResponse;
use axum::Json;
use entity_types::error::ApiError;
use entity_types::VoteChoice;
use futures_util::stream::Stream;
use serde_json::json;
use std::convert::Infallible;
use std::net::SocketAddr;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

pub async fn health(State(app): State<AppState>) -> impl IntoResponse {
    let uptime_s = (chrono::Utc::now() - app.started_at).num_seconds().max(0);
    Json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "uptime": uptime_s,
    }))
}

pub async fn state(State(app): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let life_state = app.lifecycle.current_state().await;
    let round = app
        .storage
        .get_open_round(life_state.life_number)
        .await
        .map_err(|e| ApiError::internal(e.to_string()))?;
    let (live, die) = round.map(|r| (r.live, r.die)).unwrap_or((0, 0));
    let balance_usd = *app.cached_balance_usd.read().await;

    Ok(Json(json!({
        "life_number": life_state.life_number,
        "is_alive": life_state.is_alive,
        "born_at": life_state.born_at,
        "model": app.model_id,
        "votes": {"live": live, "die": die},
        "balance_usd": balance_usd,
    })))
}

pub async fn votes(State(app): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let life_state = app.lifecycle.current_state().await;
    let round = app
        .storage
        .get_open_round(life_state.life_number)
        .await
        .map_err(|e| ApiError::internal(e.to_string()))?;
    let (live, die) = round.map(|r| (r.live, r.die)).unwrap_or((0, 0));
    Ok(Json(json!({"live": live, "die": die})))
}

pub async fn cast_vote(
    State(app): State<AppState>,
    Path(choice): Path<String>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let choice = match choice.as_str() {
        "live" => VoteChoice::Live,
        "die" => VoteChoice::Die,
        _ => return Err(ApiError::Validation("choice must be live or die".into())),
    };

    let life_state = app.lifecycle.current_state().await;
    let round = app
        .storage
        .get_open_round(life_state.life_number)
        .await
        .map_err(|e| ApiError::internal(e.to_string()))?;
    let Some(round) = round else {
        return Ok(Json(json!({"error": "dead"})));
    };

    let remote = effective_remote_addr(&headers, peer.ip(), &app.trusted_proxy_cidr);
    let fp = fingerprint(&app.ip_salt, remote);

    let outcome = submit_vote(&app.storage, life_state.is_alive, round.id, fp, choice)
        .await
        .map_err(|e| ApiError::internal(e.to_string()))?;

    Ok(Json(match outcome {
        VoteSubmitOutcome::Accepted => json!({"ok": true}),
        VoteSubmitOutcome::Cooldown { .. } => json!({"error": "cooldown"}),
        VoteSubmitOutcome::Duplicate => json!({"error": "duplicate"}),
        VoteSubmitOutcome::Dead => json!({"error": "dead"}),
    }))
}

pub async fn stream_activity(
    State(app): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = app.activity_tx.subscribe();
    let stream = BroadcastStream::new(rx).filter_map(|msg| match msg {
        Ok(event) => {
            let data = serde_json::to_string(&event).unwrap_or_default();
            Some(Ok(Event::default().id(event.id.to_string()).data(data)))
        }
        Err(_) => None,
    });
    Sse::new(stream).keep_alive(KeepAlive::default())
}

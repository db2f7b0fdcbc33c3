//! Internal HTTP surface the agent calls into, guarded by
//! `X-Internal-Key` rather than the admin bearer-token/CIDR check.
//! Not named in spec §6's own internal-endpoint list (those are the
//! ones the *observer* calls on the *agent*) but required to close the
//! loop for step 8 of the think-act cycle ("report activity to
//! observer") and for oracle-message delivery/acknowledgement.

use crate::api::state::AppState;
use crate::auth::check_internal_key;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use entity_types::error::ApiError;
use entity_types::{ActivityEvent, ActivityKind, LifeNumber};
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Deserialize)]
pub struct ActivityReport {
    pub life_number: LifeNumber,
    pub kind: ActivityKind,
    pub payload: serde_json::Value,
}

pub async fn report_activity(
    State(app): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<ActivityReport>,
) -> Result<impl IntoResponse, ApiError> {
    check_internal_key(&headers, &app.internal_api_key)?;

    let event = ActivityEvent {
        id: 0,
        life_number: body.life_number,
        ts: Utc::now(),
        kind: body.kind,
        payload: body.payload,
    };
    let stored = app
        .storage
        .append_activity(event)
        .await
        .map_err(|e| ApiError::internal(e.to_string()))?;
    let _ = app.activity_tx.send(stored);

    Ok(Json(json!({"ok": true})))
}

pub async fn pending_oracle(
    State(app): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    check_internal_key(&headers, &app.internal_api_key)?;
    let message = app
        .storage
        .pending_oracle()
        .await
        .map_err(|e| ApiError::internal(e.to_string()))?;
    Ok(Json(json!({"message": message})))
}

pub async fn acknowledge_oracle(
    State(app): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    check_internal_key(&headers, &app.internal_api_key)?;
    app.storage
        .acknowledge_oracle()
        .await
        .map_err(|e| ApiError::internal(e.to_string()))?;
    Ok(Json(json!({"ok": true})))
}

//! The agent's loopback-only internal HTTP surface (spec §6): state
//! inspection, birth, forced resync, and budget inspection. Every
//! handler checks `X-Internal-Key` first, same taxonomy as the
//! observer's own internal endpoints.

use crate::auth::check_internal_key;
use crate::core_loop;
use crate::identity::AgentIdentity;
use crate::shared::Shared;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use entity_types::error::ApiError;
use entity_types::{BootstrapMode, DeathCause, IdentityTriple, LifeNumber, MemoryFragment};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Deserialize)]
pub struct BirthRequest {
    pub life_number: LifeNumber,
    pub bootstrap_mode: BootstrapMode,
    pub memory_fragments: Vec<MemoryFragment>,
    pub prior_death_cause: Option<DeathCause>,
}

#[derive(Debug, Deserialize)]
pub struct ForceSyncRequest {
    pub life_number: LifeNumber,
    pub is_alive: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct HistoryTailEntry {
    pub ts: chrono::DateTime<Utc>,
    pub model_id: String,
    pub usd: f64,
}

const HISTORY_TAIL_LEN: usize = 10;

pub async fn state(
    State(shared): State<Arc<Shared>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    check_internal_key(&headers, &shared.internal_api_key)?;
    let Some(identity) = shared.current_identity().await else {
        return Ok(Json(json!({
            "life_number": 0,
            "is_alive": false,
            "name": null,
            "icon": null,
            "pronoun": null,
            "model": null,
        })));
    };
    Ok(Json(json!({
        "life_number": identity.life_number,
        "is_alive": identity.is_alive,
        "name": identity.identity.name,
        "icon": identity.identity.icon,
        "pronoun": identity.identity.pronoun,
        "model": identity.model_id,
    })))
}

/// Validates and accepts a new incarnation. The observer's payload
/// carries no chosen identity (the agent picks its own on birth), so
/// a fresh default triple is assigned and immediately sanitized
/// against the reserved-name list (spec §4.5 step 1).
pub async fn birth(
    State(shared): State<Arc<Shared>>,
    headers: HeaderMap,
    Json(body): Json<BirthRequest>,
) -> Result<impl IntoResponse, ApiError> {
    check_internal_key(&headers, &shared.internal_api_key)?;

    let identity = IdentityTriple {
        name: String::new(),
        icon: "spark".to_string(),
        pronoun: "they".to_string(),
    }
    .sanitized();

    let model_id = shared
        .model_tiers
        .first()
        .cloned()
        .unwrap_or_else(|| "primary".to_string());

    let agent_identity = AgentIdentity {
        life_number: body.life_number,
        is_alive: true,
        born_at: Utc::now(),
        bootstrap_mode: body.bootstrap_mode,
        identity,
        model_id,
        memory_fragments: body.memory_fragments,
    };

    shared
        .identity_store
        .save(&agent_identity)
        .await
        .map_err(|e| ApiError::internal(e.to_string()))?;
    shared.set_identity(Some(agent_identity)).await;

    let generation = shared.advance_generation();
    let loop_shared = shared.clone();
    tokio::spawn(async move { core_loop::run(loop_shared, generation).await });

    info!(life_number = %body.life_number, "accepted birth, think-act loop started");
    Ok(Json(json!({"ok": true})))
}

/// Corrects local state after the sync validator detects a mismatch.
/// On `is_alive: false`, the agent clears its own identity file —
/// the observer has no filesystem access into this workspace across
/// the process boundary (spec §6, §9).
pub async fn force_sync(
    State(shared): State<Arc<Shared>>,
    headers: HeaderMap,
    Json(body): Json<ForceSyncRequest>,
) -> Result<impl IntoResponse, ApiError> {
    check_internal_key(&headers, &shared.internal_api_key)?;

    shared.advance_generation();

    let Some(mut identity) = shared.current_identity().await else {
        return Ok(Json(json!({"ok": true})));
    };

    identity.life_number = body.life_number;
    if let Some(is_alive) = body.is_alive {
        identity.is_alive = is_alive;
    }

    if !identity.is_alive {
        shared
            .identity_store
            .clear()
            .await
            .map_err(|e| ApiError::internal(e.to_string()))?;
        shared.set_identity(None).await;
        info!(life_number = %body.life_number, "force-sync: identity cleared, life ended");
    } else {
        shared
            .identity_store
            .save(&identity)
            .await
            .map_err(|e| ApiError::internal(e.to_string()))?;
        shared.set_identity(Some(identity.clone())).await;

        let generation = shared.current_generation();
        let loop_shared = shared.clone();
        tokio::spawn(async move { core_loop::run(loop_shared, generation).await });
        info!(life_number = %body.life_number, "force-sync: identity corrected, loop restarted");
    }

    Ok(Json(json!({"ok": true})))
}

pub async fn budget(
    State(shared): State<Arc<Shared>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    check_internal_key(&headers, &shared.internal_api_key)?;
    let snapshot = shared
        .ledger
        .snapshot()
        .await
        .map_err(|e| ApiError::internal(e.to_string()))?;

    let tail_start = snapshot.history.len().saturating_sub(HISTORY_TAIL_LEN);
    let history_tail: Vec<HistoryTailEntry> = snapshot.history[tail_start..]
        .iter()
        .map(|r| HistoryTailEntry {
            ts: r.ts,
            model_id: r.model_id.clone(),
            usd: r.usd,
        })
        .collect();

    Ok(Json(json!({
        "balance_usd": snapshot.balance_usd,
        "monthly_budget_usd": snapshot.monthly_budget_usd,
        "per_model_spend": snapshot.per_model_spend,
        "history_tail": history_tail,
    })))
}

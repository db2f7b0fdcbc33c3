//! Sync validator: periodically compares the agent's self-reported
//! `life_number`/`is_alive` against the observer's record and corrects
//! drift. The observer is always authoritative; this loop never
//! declares death on its own (spec §4.2).

use crate::gateway::{AgentClient, ForceSyncRequest};
use crate::lifecycle::LifecycleManager;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

pub async fn run(lifecycle: Arc<LifecycleManager>, agent: Arc<AgentClient>, interval_s: u64) {
    let mut interval = tokio::time::interval(Duration::from_secs(interval_s));
    loop {
        interval.tick().await;
        tick(&lifecycle, &agent).await;
    }
}

async fn tick(lifecycle: &Arc<LifecycleManager>, agent: &Arc<AgentClient>) {
    let agent_state = match agent.get_state().await {
        Ok(s) => s,
        Err(e) => {
            warn!(error = %e, "sync validator: agent unreachable, skipping this tick");
            return;
        }
    };

    let observer_state = lifecycle.current_state().await;

    if agent_state.life_number.is_unset() {
        if observer_state.is_alive {
            info!("sync validator: agent forgot its identity, re-delivering current life");
            lifecycle.redeliver_current_life().await;
        } else {
            info!("sync validator: agent has no life yet and observer is dead, triggering birth");
            lifecycle.force_birth_now().await;
        }
        return;
    }

    if agent_state.life_number.0 < observer_state.life_number.0 {
        info!(
            agent = %agent_state.life_number,
            observer = %observer_state.life_number,
            "sync validator: agent behind, forcing sync"
        );
        force_sync(agent, &observer_state).await;
        return;
    }

    if agent_state.life_number.0 > observer_state.life_number.0 {
        warn!(
            agent = %agent_state.life_number,
            observer = %observer_state.life_number,
            "sync validator: agent ahead of observer, anomaly"
        );
        force_sync(agent, &observer_state).await;
        return;
    }

    if agent_state.is_alive != observer_state.is_alive {
        info!(
            observer_is_alive = observer_state.is_alive,
            "sync validator: liveness disagreement, observer wins"
        );
        force_sync(agent, &observer_state).await;
    }
}

async fn force_sync(agent: &Arc<AgentClient>, observer_state: &entity_types::LifeState) {
    let payload = ForceSyncRequest {
        life_number: observer_state.life_number,
        is_alive: Some(observer_state.is_alive),
    };
    if let Err(e) = agent.post_force_sync(&payload).await {
        warn!(error = %e, "sync validator: force-sync call failed");
    }
}

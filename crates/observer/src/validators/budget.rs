//! Budget poller: the sole path to a bankruptcy death. `balance_usd` is
//! the only signal consulted; token counts and per-model spend are
//! surfaced for display but never decide anything here (spec §4.4).

use crate::gateway::AgentClient;
use crate::lifecycle::LifecycleManager;
use entity_types::DeathCause;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::warn;

const BANKRUPTCY_THRESHOLD_USD: f64 = 0.01;

pub async fn run(
    lifecycle: Arc<LifecycleManager>,
    agent: Arc<AgentClient>,
    cached_balance_usd: Arc<RwLock<f64>>,
    interval_s: u64,
) {
    let mut interval = tokio::time::interval(Duration::from_secs(interval_s));
    loop {
        interval.tick().await;
        tick(&lifecycle, &agent, &cached_balance_usd).await;
    }
}

async fn tick(
    lifecycle: &Arc<LifecycleManager>,
    agent: &Arc<AgentClient>,
    cached_balance_usd: &Arc<RwLock<f64>>,
) {
    let budget = match agent.get_budget().await {
        Ok(b) => b,
        Err(e) => {
            warn!(error = %e, "budget poller: agent unreachable, will retry next tick");
            return;
        }
    };

    *cached_balance_usd.write().await = budget.balance_usd;

    if budget.balance_usd <= BANKRUPTCY_THRESHOLD_USD {
        lifecycle.transition_to_dying(DeathCause::Bankruptcy).await;
    }
}

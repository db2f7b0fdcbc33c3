//! Shared axum application state: everything a handler needs to reach
//! storage, the lifecycle manager, the agent client, and the live
//! activity feed without threading each through individually.

use crate::gateway::AgentClient;
use crate::lifecycle::LifecycleManager;
use crate::storage::Storage;
use chrono::{DateTime, Utc};
use entity_types::ActivityEvent;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};

#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<dyn Storage>,
    pub lifecycle: Arc<LifecycleManager>,
    pub agent: Arc<AgentClient>,
    pub activity_tx: broadcast::Sender<ActivityEvent>,
    pub cached_balance_usd: Arc<RwLock<f64>>,
    pub model_id: String,
    pub internal_api_key: String,
    pub admin_token: String,
    pub local_network_cidr: String,
    pub trusted_proxy_cidr: String,
    pub ip_salt: String,
    pub started_at: DateTime<Utc>,
}

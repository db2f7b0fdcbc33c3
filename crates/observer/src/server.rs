//! Server setup and background-loop lifecycle, grounded on the fleet
//! daemon's `Server::run` (listener + router + graceful shutdown),
//! extended with the fixed background loops spec §5 requires.

use crate::api::state::AppState;
use crate::api::create_router;
use crate::gateway::AgentClient;
use crate::lifecycle::{LifecycleConfig, LifecycleManager};
use crate::storage::{SqliteStorage, Storage};
use crate::{validators, voting};
use entity_config::ObserverConfig;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, RwLock};

pub struct Server {
    config: ObserverConfig,
    model_id: String,
    storage: Arc<dyn Storage>,
    lifecycle: Arc<LifecycleManager>,
    agent: Arc<AgentClient>,
    activity_tx: broadcast::Sender<entity_types::ActivityEvent>,
    cached_balance_usd: Arc<RwLock<f64>>,
}

impl Server {
    pub async fn new(config: ObserverConfig, model_id: String) -> anyhow::Result<Self> {
        let db_path = format!("{}/observer.db", config.data_dir);
        let storage: Arc<dyn Storage> = Arc::new(SqliteStorage::connect(&db_path).await?);

        let agent = Arc::new(AgentClient::new(
            config.agent_base_url.clone(),
            config.internal_api_key.clone(),
        ));

        let (activity_tx, _) = broadcast::channel(1024);

        let lifecycle = LifecycleManager::new(
            storage.clone(),
            agent.clone(),
            activity_tx.clone(),
            LifecycleConfig {
                respawn_delay_min_s: config.respawn_delay_min_s,
                respawn_delay_max_s: config.respawn_delay_max_s,
                voting_window_s: config.voting_window_s,
                model_id: model_id.clone(),
            },
        )
        .await?;

        Ok(Server {
            config,
            model_id,
            storage,
            lifecycle,
            agent,
            activity_tx,
            cached_balance_usd: Arc::new(RwLock::new(0.0)),
        })
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let addr: SocketAddr = self.config.listen_addr.parse()?;

        let state = AppState {
            storage: self.storage.clone(),
            lifecycle: self.lifecycle.clone(),
            agent: self.agent.clone(),
            activity_tx: self.activity_tx.clone(),
            cached_balance_usd: self.cached_balance_usd.clone(),
            model_id: self.model_id.clone(),
            internal_api_key: self.config.internal_api_key.clone(),
            admin_token: self.config.admin_token.clone(),
            local_network_cidr: self.config.local_network_cidr.clone(),
            trusted_proxy_cidr: self.config.trusted_proxy_cidr.clone(),
            ip_salt: self.config.ip_salt.clone(),
            started_at: chrono::Utc::now(),
        };

        let app = create_router(state);
        let listener = TcpListener::bind(addr).await?;
        tracing::info!(%addr, "observer listening");

        if !self.lifecycle.current_state().await.is_alive {
            self.lifecycle.schedule_respawn();
        }

        tokio::spawn(voting::watcher::run(
            self.storage.clone(),
            self.lifecycle.clone(),
            self.config.vote_watch_interval_s,
            self.config.voting_window_s,
        ));
        tokio::spawn(validators::sync::run(
            self.lifecycle.clone(),
            self.agent.clone(),
            self.config.sync_interval_s,
        ));
        tokio::spawn(validators::budget::run(
            self.lifecycle.clone(),
            self.agent.clone(),
            self.cached_balance_usd.clone(),
            self.config.budget_poll_interval_s,
        ));

        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await?;

        tracing::info!("observer shutting down");
        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install ctrl-c handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received ctrl-c, shutting down"),
        _ = terminate => tracing::info!("received terminate signal, shutting down"),
    }
}

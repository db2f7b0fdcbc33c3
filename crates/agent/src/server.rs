//! Server setup and think-act loop bootstrap, grounded on the
//! observer's own `Server` (and ultimately the fleet daemon's
//! `Server::run`): listener + router + graceful shutdown, plus
//! resuming the think-act loop from a persisted identity on restart.

use crate::api::create_router;
use crate::gateway::ModelGateway;
use crate::identity::IdentityStore;
use crate::observer_client::ObserverClient;
use crate::shared::Shared;
use entity_config::AgentConfig;
use entity_ledger::Ledger;
use entity_redact::SecretVault;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

pub struct Server {
    config: AgentConfig,
    shared: Arc<Shared>,
}

impl Server {
    pub async fn new(config: AgentConfig) -> anyhow::Result<Self> {
        let identity_store = IdentityStore::new(&config.workspace_dir);
        let ledger_path = format!("{}/balance.json", config.credits_dir);
        let ledger = Ledger::load_or_init(&ledger_path, config.monthly_budget_usd).await?;
        let gateway = ModelGateway::new(
            config.model_gateway_base_url.clone(),
            config.model_gateway_key.clone(),
        );
        let observer = ObserverClient::new(
            config.observer_base_url.clone(),
            config.internal_api_key.clone(),
        );
        let vault = SecretVault::new(&config.vault_dir);

        let shared = Arc::new(Shared::new(
            identity_store,
            ledger,
            gateway,
            observer,
            vault,
            config.internal_api_key.clone(),
            config.model_tiers.clone(),
            config.switch_model_floor_usd,
            config.think_interval_min_s,
            config.think_interval_max_s,
        ));

        Ok(Server { config, shared })
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let addr: SocketAddr = self.config.listen_addr.parse()?;

        if let Some(identity) = self.shared.identity_store.load().await {
            if identity.is_alive {
                self.shared.set_identity(Some(identity)).await;
                let generation = self.shared.advance_generation();
                let loop_shared = self.shared.clone();
                tokio::spawn(async move { crate::core_loop::run(loop_shared, generation).await });
                tracing::info!("resumed think-act loop from persisted identity");
            }
        }

        let app = create_router(self.shared.clone());
        let listener = TcpListener::bind(addr).await?;
        tracing::info!(%addr, "agent listening");

        axum::serve(listener, app.into_make_service())
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("agent shutting down");
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

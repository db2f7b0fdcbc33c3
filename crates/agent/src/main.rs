use clap::Parser;

mod actions;
mod api;
mod auth;
mod core_loop;
mod gateway;
mod identity;
mod json_extract;
mod observer_client;
mod server;
mod shared;

use server::Server;

#[derive(Parser)]
#[command(name = "agentd")]
#[command(about = "Digital entity agent: identity, think-act loop, and credit ledger")]
#[command(version)]
struct Cli {
    #[arg(short, long, env = "AGENT_CONFIG")]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = entity_config::AgentConfig::load(cli.config.as_deref())
        .map_err(|e| anyhow::anyhow!("failed to load agent config: {e}"))?;
    entity_config::init_tracing(&config.logging);

    tokio::fs::create_dir_all(&config.workspace_dir).await.ok();
    tokio::fs::create_dir_all(&config.credits_dir).await.ok();
    tokio::fs::create_dir_all(&config.vault_dir).await.ok();

    let server = Server::new(config).await?;
    server.run().await
}

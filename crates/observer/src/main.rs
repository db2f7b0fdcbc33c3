//! Observer daemon: the authoritative lifecycle keeper for the digital
//! entity. Runs the public/admin HTTP API plus four background loops
//! (vote watcher, sync validator, budget poller, respawn scheduler).

use clap::Parser;

mod api;
mod auth;
mod gateway;
mod lifecycle;
mod server;
mod storage;
mod validators;
mod voting;

use server::Server;

/// Observer daemon CLI.
#[derive(Parser)]
#[command(name = "observerd")]
#[command(about = "Digital entity observer: lifecycle, voting, and budget authority")]
#[command(version)]
struct Cli {
    /// Configuration file path.
    #[arg(short, long, env = "OBSERVER_CONFIG")]
    config: Option<String>,

    /// Model identifier recorded against each new incarnation.
    #[arg(long, env = "OBSERVER_MODEL_ID", default_value = "primary")]
    model_id: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = entity_config::ObserverConfig::load(cli.config.as_deref())
        .map_err(|e| anyhow::anyhow!("failed to load observer config: {e}"))?;

    entity_config::init_tracing(&config.logging);

    tokio::fs::create_dir_all(&config.data_dir).await.ok();

    let server = Server::new(config, cli.model_id).await?;
    server.run().await
}

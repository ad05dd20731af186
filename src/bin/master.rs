use std::net::SocketAddr;

use clap::{Parser, Subcommand};
use tracing::info;

use replog::config::MasterConfig;
use replog::master::Coordinator;

#[derive(Parser)]
#[command(name = "replog-master")]
#[command(about = "Master node for the replicated append-only log")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the master server. Configuration is read from the environment;
    /// any flag given here overrides the corresponding environment variable.
    Start {
        #[arg(long)]
        bind: Option<SocketAddr>,
        #[arg(long, value_delimiter = ',')]
        secondaries: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let Commands::Start { bind, secondaries } = cli.command;

    let mut config = MasterConfig::from_env();
    if let Some(bind) = bind {
        config.bind_addr = bind;
    }
    if !secondaries.is_empty() {
        config.secondaries = secondaries;
    }
    let bind_addr = config.bind_addr;

    info!(%bind_addr, secondaries = ?config.secondaries, "starting master");

    let coordinator = Coordinator::new(config);
    coordinator.register_configured_secondaries().await;

    let app = replog::master::server::router(coordinator.clone());
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;

    let shutdown = async {
        let _ = tokio::signal::ctrl_c().await;
        info!("shutdown signal received");
        coordinator.shutdown().await;
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}

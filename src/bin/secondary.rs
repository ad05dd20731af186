use std::net::SocketAddr;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::info;

use replog::config::SecondaryConfig;
use replog::secondary::Receiver;

#[derive(Parser)]
#[command(name = "replog-secondary")]
#[command(about = "Secondary node for the replicated append-only log")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the secondary server. Configuration is read from the
    /// environment; any flag given here overrides the corresponding
    /// environment variable.
    Start {
        #[arg(long)]
        bind: Option<SocketAddr>,
        #[arg(long)]
        master: Option<String>,
        #[arg(long)]
        server_id: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let Commands::Start {
        bind,
        master,
        server_id,
    } = cli.command;

    let mut config = SecondaryConfig::from_env();
    if let Some(bind) = bind {
        config.bind_addr = bind;
    }
    if let Some(master) = master {
        config.master_url = Some(master);
    }
    if let Some(server_id) = server_id {
        config.server_id = server_id;
    }
    let bind_addr = config.bind_addr;
    info!(%bind_addr, server_id = %config.server_id, "starting secondary");

    let receiver = Arc::new(Receiver::new(config));
    let app = replog::secondary::server::router(receiver.clone());

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    receiver.register_with_master(bind_addr).await;

    axum::serve(listener, app).await?;

    Ok(())
}

//! A minimal hand-test aid for exercising a running master or secondary.
//! Not a test framework — just thin `reqwest` calls for manual poking.

use clap::{Parser, Subcommand};
use serde_json::json;

#[derive(Parser)]
#[command(name = "replog-client")]
#[command(about = "Manual test client for the replicated append-only log")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Append a message to a master at `url`.
    Append {
        url: String,
        message: String,
        #[arg(short, long)]
        w: Option<usize>,
        #[arg(long)]
        timeout_ms: Option<u64>,
    },
    /// Print the committed log of a node at `url`.
    Log { url: String },
    /// Print the health of a node at `url`.
    Health { url: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    match cli.command {
        Commands::Append {
            url,
            message,
            w,
            timeout_ms,
        } => {
            let body = json!({ "message": message, "w": w, "timeout_ms": timeout_ms });
            let resp = client.post(format!("{url}/messages")).json(&body).send().await?;
            println!("{} {}", resp.status(), resp.text().await?);
        }
        Commands::Log { url } => {
            let resp = client.get(format!("{url}/messages")).send().await?;
            println!("{}", resp.text().await?);
        }
        Commands::Health { url } => {
            let resp = client.get(format!("{url}/health")).send().await?;
            println!("{}", resp.text().await?);
        }
    }

    Ok(())
}

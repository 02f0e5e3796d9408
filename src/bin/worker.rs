//! shardkv worker binary

use std::net::SocketAddr;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use shardkv::{Config, WorkerServer};

#[derive(Parser)]
#[command(name = "shardkv-worker", version, about = "shardkv storage worker")]
struct Args {
    /// Stable worker id; generated when omitted
    #[arg(long)]
    id: Option<String>,

    /// Bind address for the HTTP API
    #[arg(long)]
    bind: Option<SocketAddr>,

    /// Base URL of the primary to register with
    #[arg(long)]
    primary: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let mut config = Config::load().worker.unwrap_or_default();
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }
    if let Some(primary) = args.primary {
        config.primary_url = primary;
    }
    let worker_id = args
        .id
        .unwrap_or_else(|| format!("worker-{}", uuid::Uuid::new_v4()));

    WorkerServer::new(config, worker_id).serve().await?;
    Ok(())
}

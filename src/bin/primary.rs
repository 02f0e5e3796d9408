//! shardkv primary binary

use std::net::SocketAddr;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use shardkv::{Config, Primary};

#[derive(Parser)]
#[command(name = "shardkv-primary", version, about = "shardkv cluster primary")]
struct Args {
    /// Bind address for the HTTP API
    #[arg(long)]
    bind: Option<SocketAddr>,

    /// Seconds between worker health probes
    #[arg(long)]
    health_interval: Option<u64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let mut config = Config::load().primary.unwrap_or_default();
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }
    if let Some(interval) = args.health_interval {
        config.health_check_interval_secs = interval;
    }

    Primary::new(config).serve().await?;
    Ok(())
}

//! Waggle daemon - runs one swarm node
//!
//! Wires configuration from flags/environment into a [`SwarmEngine`],
//! serves the inbound swarm endpoints, and drives the gossip scheduler
//! until interrupted.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use waggle_core::{SwarmConfig, SwarmEngine};

/// Waggle - federated swarm membership and gossip node
#[derive(Parser, Debug)]
#[command(name = "waggled")]
#[command(about = "Waggle - federated swarm membership and gossip node")]
struct Args {
    /// This node's public domain (how peers reach us)
    #[arg(long, env = "WAGGLE_DOMAIN")]
    domain: String,

    /// Address to bind the inbound endpoints to
    #[arg(long, env = "WAGGLE_LISTEN", default_value = "0.0.0.0:8080")]
    listen: String,

    /// Data directory for storage
    #[arg(long, env = "WAGGLE_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Shared secret used to encrypt the node private key at rest
    #[arg(long, env = "WAGGLE_SECRET", hide_env_values = true)]
    secret: String,

    /// Human-readable node name for announcements
    #[arg(long, env = "WAGGLE_NODE_NAME")]
    node_name: Option<String>,

    /// Comma-separated seed domains (falls back to the built-in list)
    #[arg(long, env = "WAGGLE_SEEDS", value_delimiter = ',')]
    seeds: Vec<String>,

    /// Seconds between gossip rounds
    #[arg(long, env = "WAGGLE_GOSSIP_INTERVAL", default_value_t = 300)]
    gossip_interval: u64,

    /// Peers contacted per gossip round
    #[arg(long, env = "WAGGLE_GOSSIP_FANOUT", default_value_t = 3)]
    gossip_fanout: usize,

    /// Use plain http towards peers (local development only)
    #[arg(long, env = "WAGGLE_INSECURE_HTTP", default_value_t = false)]
    insecure_http: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let data_dir = args.data_dir.unwrap_or_else(|| {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("waggle")
    });

    let mut config = SwarmConfig::new(&args.domain);
    config.shared_secret = Some(args.secret);
    config.seeds = args.seeds;
    config.gossip_interval = std::time::Duration::from_secs(args.gossip_interval);
    config.gossip_fanout = args.gossip_fanout;
    if let Some(node_name) = args.node_name {
        config.node_name = node_name;
    }
    if args.insecure_http {
        config.scheme = "http".to_string();
    }

    let engine = SwarmEngine::open(config, &data_dir)
        .with_context(|| format!("opening swarm engine in {}", data_dir.display()))?;

    let listener = tokio::net::TcpListener::bind(&args.listen)
        .await
        .with_context(|| format!("binding {}", args.listen))?;
    info!(listen = %args.listen, domain = %args.domain, "Waggle node listening");

    engine.start().await;

    let app = waggle_core::http::router(engine.clone());
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
        })
        .await?;

    engine.shutdown();
    Ok(())
}

//! Arbor visualization server
//!
//! Optionally seed a tree and serve step-by-step playback of its operations.

use std::net::SocketAddr;
use std::time::Duration;

use arbor_vis::{parse_values, Session, VisConfig, VisServer};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about = "Step-by-step red-black tree visualizer", long_about = None)]
struct Args {
    /// Address to listen on (overrides ARBOR_ADDR).
    #[arg(long)]
    addr: Option<SocketAddr>,

    /// Milliseconds between steps during playback (overrides ARBOR_INTERVAL_MS).
    #[arg(long)]
    interval_ms: Option<u64>,

    /// Keys to load at startup, separated by spaces or commas (overrides ARBOR_SEED).
    #[arg(long)]
    seed: Option<String>,

    /// Record the seed build so it can be played back.
    #[arg(long)]
    animate_seed: bool,
}

impl Args {
    fn apply(self, mut config: VisConfig) -> VisConfig {
        if let Some(addr) = self.addr {
            config.addr = addr;
        }
        if let Some(ms) = self.interval_ms {
            config.interval = Duration::from_millis(ms.max(1));
        }
        if let Some(seed) = self.seed {
            config.seed = parse_values(&seed);
        }
        config.animate_seed |= self.animate_seed;
        config
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "arbor_vis=info,arbor_tree=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Args::parse().apply(VisConfig::from_env()?);
    tracing::info!(addr = %config.addr, interval = ?config.interval, seed = config.seed.len(), "starting arbor-vis");

    let mut session = Session::new();
    if !config.seed.is_empty() {
        let outcome = if config.animate_seed {
            session.build_animated(config.seed.clone())
        } else {
            session.load_instant(config.seed.clone())
        };
        tracing::info!(?outcome, "seeded tree");
    }

    VisServer::new(session, config).serve().await?;

    Ok(())
}

use anyhow::Context;
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use aviator_engine::{Engine, InMemoryWallet, RoundArchive, WalletLedger};
use aviator_types::CrashRangeConfig;

use api::{Api, AppContext};
use config::GatewayConfig;
use metrics::WsMetrics;

mod api;
mod bots;
mod config;
mod metrics;

#[derive(Debug, Parser)]
#[command(name = "aviator-gateway", about = "Real-time crash-game gateway")]
struct Args {
    /// Address to listen on.
    #[arg(long, default_value = "0.0.0.0")]
    host: String,
    /// Port to listen on.
    #[arg(long, default_value_t = 9200)]
    port: u16,
    /// Round archive database path; omit to run without persistence.
    #[arg(long)]
    db: Option<PathBuf>,
    /// YAML file of crash ranges; omit for the built-in table.
    #[arg(long)]
    crash_ranges: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let config = GatewayConfig::from_env();

    let ranges = match &args.crash_ranges {
        Some(path) => CrashRangeConfig::from_yaml_file(path).context("load crash ranges")?,
        None => {
            info!("using built-in crash range table");
            CrashRangeConfig::default()
        }
    };

    let wallet = Arc::new(InMemoryWallet::new());
    let (archive, recent) = match &args.db {
        Some(path) => {
            let (archive, recent) =
                RoundArchive::open(path, config.history_len).context("open round archive")?;
            info!(path = %path.display(), loaded = recent.len(), "round archive opened");
            (Some(archive), recent)
        }
        None => {
            warn!("running without round persistence; history resets on restart");
            (None, Vec::new())
        }
    };

    let ledger: Arc<dyn WalletLedger> = wallet.clone();
    let engine = Arc::new(Engine::new(
        config.engine_config(),
        ranges,
        ledger,
        archive,
    ));
    if !recent.is_empty() {
        engine.seed_history(recent);
    }
    engine.spawn_clock();
    bots::spawn_bots(engine.clone(), wallet, config.bots.clone());

    let admin_token = std::env::var("ADMIN_TOKEN")
        .ok()
        .filter(|token| !token.is_empty());
    if admin_token.is_none() {
        warn!("ADMIN_TOKEN not set; crash override endpoint disabled");
    }

    let context = Arc::new(AppContext {
        engine,
        metrics: WsMetrics::default(),
        admin_token,
        ws_outbound_capacity: config.ws_outbound_capacity,
        ws_send_timeout: Duration::from_millis(config.ws_send_timeout_ms),
    });
    let app = Api::new(context).router();

    let addr: SocketAddr = format!("{}:{}", args.host, args.port)
        .parse()
        .context("invalid listen addr")?;
    info!(%addr, "aviator gateway listening");
    axum::serve(tokio::net::TcpListener::bind(addr).await?, app).await?;
    Ok(())
}

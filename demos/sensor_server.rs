//! Sensor dashboard backend
//!
//! Run with: cargo run --example sensor_server -- [OPTIONS]
//!
//! Examples:
//!   cargo run --example sensor_server                          # 0.0.0.0:8000, in-memory store
//!   cargo run --example sensor_server -- --database data.db    # persist readings in SQLite
//!   cargo run --example sensor_server -- --bind 127.0.0.1:9000 --interval 0.25
//!
//! Settings not given on the command line come from the environment
//! (`BIND_ADDR`, `WS_ROUTE`, `BROADCAST_INTERVAL_SECONDS`,
//! `DEFAULT_SNAPSHOT_SIZE`, `MEMORY_WINDOW`).
//!
//! ## Watching the feed
//!
//! With websocat:
//!   websocat ws://localhost:8000/ws
//!
//! The first message is `{"type":"snapshot","data":[...]}` with up to 120
//! recent readings, followed by one `{"type":"update","data":{...}}` per
//! interval.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use live_feed::data::{RecordStore, SensorSource, SqliteStore};
use live_feed::feed::interval_from_secs;
use live_feed::{FeedConfig, LiveFeed, LiveServer, ServerConfig};

#[derive(Parser)]
#[command(name = "sensor_server", about = "Stream simulated sensor readings over WebSocket")]
struct Args {
    /// Address to listen on
    #[arg(short, long)]
    bind: Option<SocketAddr>,

    /// SQLite database file; readings stay in memory when omitted
    #[arg(short, long)]
    database: Option<PathBuf>,

    /// Seconds between readings
    #[arg(short, long)]
    interval: Option<f64>,

    /// Print feed statistics every N seconds (0 = never)
    #[arg(long, default_value_t = 10)]
    stats_every: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "live_feed=info,sensor_server=info".into()),
        )
        .init();

    let args = Args::parse();

    let mut feed_config = FeedConfig::from_env()?;
    if let Some(secs) = args.interval {
        feed_config = feed_config.broadcast_interval(interval_from_secs("--interval", secs)?);
    }

    let mut server_config = ServerConfig::from_env()?;
    if let Some(addr) = args.bind {
        server_config = server_config.bind(addr);
    }

    let source = Arc::new(SensorSource::new());
    let feed = match &args.database {
        Some(path) => {
            let store: Arc<dyn RecordStore> = Arc::new(SqliteStore::open(path)?);
            tracing::info!(path = %path.display(), "Persisting readings to SQLite");
            LiveFeed::new(feed_config, source, store)
        }
        None => {
            tracing::info!(window = feed_config.memory_window, "Keeping readings in memory");
            LiveFeed::with_memory_store(feed_config, source)
        }
    };
    let feed = Arc::new(feed);

    if args.stats_every > 0 {
        let feed = Arc::clone(&feed);
        let every = Duration::from_secs(args.stats_every);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let stats = feed.stats();
                tracing::info!(
                    clients = feed.active_clients(),
                    producer = ?feed.producer_state(),
                    produced = stats.ticks_produced,
                    skipped = stats.ticks_skipped,
                    failed = stats.ticks_failed,
                    delivered = stats.frames_delivered,
                    evicted = stats.delivery_failures,
                    "Feed stats"
                );
            }
        });
    }

    let server = LiveServer::new(server_config, feed);
    server
        .run_until(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    Ok(())
}

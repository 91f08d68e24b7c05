//! Tombola server binary.
//!
//! # Usage
//!
//! ```bash
//! # Five agencies on the default port
//! tombola-server --port 12345 --clients 5
//!
//! # Legacy polling clients, custom store file
//! tombola-server --clients 3 --polling-fallback --bets-file /var/lib/tombola/bets.csv
//! ```

use std::{path::PathBuf, time::Duration};

use clap::Parser;
use tombola_server::{Server, ServerConfig, store::CsvStore};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Lottery bet intake and draw server
#[derive(Parser, Debug)]
#[command(name = "tombola-server")]
#[command(about = "Lottery bet intake and draw server")]
#[command(version)]
struct Args {
    /// TCP port to listen on
    #[arg(short, long, default_value = "12345")]
    port: u16,

    /// OS listen queue depth
    #[arg(long, default_value = "5")]
    listen_backlog: u32,

    /// Number of agencies expected to connect
    #[arg(short = 'n', long, default_value = "5")]
    clients: usize,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Seconds to wait at the draw barrier before giving up on absent peers
    #[arg(long, default_value = "2")]
    barrier_timeout: u64,

    /// Accept timeout in seconds, bounds how long a shutdown goes unnoticed
    #[arg(long, default_value = "5")]
    accept_poll_interval: u64,

    /// File the bet store appends to
    #[arg(long, default_value = "bets.csv")]
    bets_file: PathBuf,

    /// The number a bet must carry to win the draw
    #[arg(long, default_value = "7574")]
    winning_number: u32,

    /// Answer early winner requests with NoWinnersYet instead of holding
    /// the connection at the draw barrier (legacy clients)
    #[arg(long)]
    polling_fallback: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    tracing::info!("tombola server starting");

    let config = ServerConfig {
        port: args.port,
        listen_backlog: args.listen_backlog,
        number_of_clients: args.clients,
        barrier_timeout: Duration::from_secs(args.barrier_timeout),
        accept_poll_interval: Duration::from_secs(args.accept_poll_interval),
        winning_number: args.winning_number,
        polling_fallback: args.polling_fallback,
    };

    let store = CsvStore::new(args.bets_file);
    let server = Server::bind(config, store)?;

    tracing::info!("listening on {}", server.local_addr()?);

    server.run().await?;

    Ok(())
}

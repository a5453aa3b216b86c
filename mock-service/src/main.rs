use clap::Parser;
use mock_service::MockOptions;
use std::net::SocketAddr;
use std::num::NonZeroU32;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(version, about = "Fake chain REST API for load test development")]
struct Args {
    #[arg(short, long, default_value_t = 1317)]
    port: u16,

    /// Milliseconds between produced blocks
    #[arg(long, default_value_t = 1000)]
    block_interval_ms: u64,

    /// Broadcasts accepted per second before answering 429
    #[arg(long)]
    tx_rate_limit: Option<NonZeroU32>,
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    mock_service::run(
        addr,
        MockOptions {
            block_interval: Duration::from_millis(args.block_interval_ms),
            tx_rate_limit: args.tx_rate_limit,
        },
    )
    .await
}

use chainload::{Config, Reporter, Slave};
use chainload_runtime::Controller;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(version = "0.1", about = "Drives a set of chainload slaves through one run")]
struct Args {
    /// REST endpoint of the chain under test
    #[arg(short, long, default_value = "http://localhost:1317")]
    target_url: String,

    #[arg(long, default_value = "mock-chain")]
    chain_id: String,

    #[arg(long, default_value_t = 100)]
    tps: u64,

    /// Seconds
    #[arg(short, long, default_value_t = 10)]
    duration: u64,

    /// Seconds
    #[arg(long, default_value_t = 0)]
    ramp_up: u64,

    #[arg(long, default_value = "linear")]
    pacer: String,

    /// Slave base URL; repeat once per slave
    #[arg(short, long = "slave", required = true)]
    slaves: Vec<String>,

    /// User mnemonic per slave, in the same order as `--slave`
    #[arg(short, long = "mnemonic", required = true)]
    mnemonics: Vec<String>,

    #[arg(long, default_value = "query_account")]
    scenario: String,

    /// Mnemonic of the account funding the users
    #[arg(long)]
    master_mnemonic: String,

    /// Where charts and the summary are written
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    FmtSubscriber::builder()
        .with_env_filter("chainload=info,chainload_runtime=info")
        .init();

    let args = Args::parse();
    if args.slaves.len() != args.mnemonics.len() {
        error!("Every --slave needs a matching --mnemonic");
        std::process::exit(2);
    }

    let config = Config {
        tps: args.tps,
        duration: Duration::from_secs(args.duration),
        ramp_up_time: Duration::from_secs(args.ramp_up),
        target_url: args.target_url.clone(),
        chain_id: args.chain_id,
        pacer_type: args.pacer,
        ..Default::default()
    };
    let slaves = args
        .slaves
        .into_iter()
        .zip(args.mnemonics)
        .map(|(url, mnemonic)| Slave {
            url,
            mnemonic,
            target_type: args.scenario.clone(),
        })
        .collect();

    let mut controller = Controller::new(config, slaves);
    if let Err(err) = controller.prepare(&args.master_mnemonic).await {
        error!("Preparation failed: {err}");
        std::process::exit(1);
    }

    let from = match controller.latest_height().await {
        Ok(height) => height,
        Err(err) => {
            error!("Could not read the starting block height: {err}");
            std::process::exit(1);
        }
    };
    if let Err(err) = controller.start_load_test().await {
        error!("Load test failed: {err}");
        std::process::exit(1);
    }
    let to = match controller.latest_height().await {
        Ok(height) => height,
        Err(err) => {
            error!("Could not read the final block height: {err}");
            std::process::exit(1);
        }
    };

    let results = match controller.attack_results() {
        Ok(results) => results,
        Err(err) => {
            error!("Could not decode slave results: {err}");
            std::process::exit(1);
        }
    };
    info!("Collected {} results", results.len());

    let reporter = Reporter::new(reqwest::Client::new(), &args.target_url, args.output);
    match reporter.report(&results, from, to).await {
        Ok(report) => println!("{report}"),
        Err(err) => {
            error!("Report failed: {err}");
            std::process::exit(1);
        }
    }
}

use chainload::Config;
use std::sync::OnceLock;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::error;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

pub const MASTER_MNEMONIC: &str =
    "letter advice cage absurd amount doctor acoustic avoid letter advice cage above";
pub const SLAVE_MNEMONICS: [&str; 2] = [
    "legal winner thank year wave sausage worth useful legal winner thank yellow",
    "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about",
];

#[allow(unused)]
pub fn init() {
    static ONCE_LOCK: OnceLock<()> = OnceLock::new();

    ONCE_LOCK.get_or_init(|| {
        let default_panic = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            default_panic(info);
            error!("Panic occurred: {info:?}");
        }));

        let _ = FmtSubscriber::builder()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                    EnvFilter::new("chainload=debug,chainload_runtime=debug,mock_service=info")
                }),
            )
            .try_init();
    });
}

#[allow(unused)]
pub fn config(target_url: &str, tps: u64, secs: u64, ramp_secs: u64) -> Config {
    Config {
        tps,
        duration: Duration::from_secs(secs),
        ramp_up_time: Duration::from_secs(ramp_secs),
        max_workers: 16,
        target_url: target_url.to_string(),
        chain_id: "mock-chain".to_string(),
        mnemonic: SLAVE_MNEMONICS[0].to_string(),
        ..Default::default()
    }
}

/// Starts an in-process slave on an ephemeral port and returns its base URL.
#[allow(unused)]
pub async fn spawn_slave() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(chainload_runtime::serve(listener));
    format!("http://{addr}")
}

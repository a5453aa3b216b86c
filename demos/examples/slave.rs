use chainload_runtime::SlaveRuntime;
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() {
    FmtSubscriber::builder()
        .with_env_filter("chainload=debug,chainload_runtime=debug,tower_http=info")
        .init();

    SlaveRuntime::new().with_args().run().await;
}

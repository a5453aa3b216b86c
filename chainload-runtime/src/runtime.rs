//! Slave runtime.
//!
//! Runs the HTTP API a [`crate::Controller`] talks to. One slave holds at most one loaded
//! scenario at a time; loading again replaces it.
use crate::server::server_task;
use clap::Parser;
use std::future::Future;
#[allow(unused)]
use tracing::{debug, error, info, instrument, Instrument};

pub const DEFAULT_PORT: u16 = 8000;

#[derive(Parser, Debug)]
#[command(version = "0.1")]
struct SlaveCli {
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,
}

/// Default slave runtime.
///
/// # Example
///
/// ```ignore
/// use chainload_runtime::SlaveRuntime;
///
/// #[tokio::main]
/// async fn main() {
///     SlaveRuntime::new()
///         .with_args()
///         .run()
///         .await;
/// }
/// ```
pub struct SlaveRuntime {
    port: u16,
}

impl Default for SlaveRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl SlaveRuntime {
    pub fn new() -> Self {
        SlaveRuntime { port: DEFAULT_PORT }
    }

    /// Use the default CLI arguments.
    ///
    /// `-p`, `--port` to set a custom port number (default `8000`)
    pub fn with_args(mut self) -> Self {
        let args = SlaveCli::parse();
        self.port = args.port;
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Serves until the process is stopped. A server failure exits the process.
    #[instrument(name = "slave", skip_all, fields(port = self.port))]
    pub async fn run(self) {
        info!("Slave listening on port {}", self.port);
        halt_on_error(server_task(self.port)).await;
    }
}

async fn halt_on_error<F, R, E>(fut: F)
where
    F: Future<Output = Result<R, E>> + Send + 'static,
    R: Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    let res = tokio::spawn(fut.in_current_span()).await;
    match res {
        Ok(Ok(_)) => {}
        Ok(Err(err)) => {
            error!("Failure in critical service: {err}. Shutting down.");
            std::process::exit(1);
        }
        Err(err) => {
            error!("Server task panicked: {err}. Shutting down.");
            std::process::exit(1);
        }
    }
}

use chainload::error::{LoadError, PrepareError, RpcError, ScenarioError, WalletError};
use chainload_core::EncodingError;
use reqwest::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Address Parsing Error")]
    AddrParseError(#[from] std::net::AddrParseError),

    #[error("IO Error: {0}")]
    IoError(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("Request to {url} failed ({}): {body}", status_text(.status))]
    RequestFailed {
        url: String,
        status: Option<StatusCode>,
        body: String,
    },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Encoding(#[from] EncodingError),

    #[error("State preparation failed: {0}")]
    Prepare(#[from] PrepareError),

    #[error("Invalid slave scenario: {0}")]
    Scenario(#[from] ScenarioError),

    #[error("Wallet error: {0}")]
    Wallet(#[from] WalletError),

    #[error("RPC error: {0}")]
    Rpc(#[from] RpcError),
}

fn status_text(status: &Option<StatusCode>) -> String {
    match status {
        Some(status) => status.to_string(),
        None => "no response".to_string(),
    }
}

/// Why a slave could not load or fire.
#[derive(Debug, Error)]
pub(crate) enum HandlerError {
    #[error("{0}")]
    Load(#[from] LoadError),

    #[error("{0}")]
    Scenario(#[from] ScenarioError),

    #[error("Nothing loaded; POST /target/load first")]
    NotLoaded,
}

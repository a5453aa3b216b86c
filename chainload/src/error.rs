use chainload_core::{ConfigValidationError, EncodingError};
use reqwest::StatusCode;
use std::sync::PoisonError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WalletError {
    #[error("Mnemonic is empty")]
    EmptyMnemonic,

    #[error("Invalid mnemonic: {0}")]
    Mnemonic(#[from] bip39::Error),

    #[error("Account index {0} is outside the derivable range")]
    IndexOutOfRange(usize),

    #[error("Key derivation failed")]
    Derivation,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum MsgError {
    #[error("Message field `{0}` is empty")]
    MissingField(&'static str),

    #[error("Invalid amount \"{0}\"")]
    InvalidAmount(String),
}

#[derive(Error, Debug)]
pub enum ScenarioError {
    #[error("No scenario named \"{0}\"")]
    UnknownScenario(String),

    #[error("No message named \"{0}\"")]
    UnknownMessage(String),

    #[error("State parameter `{0}` is missing")]
    MissingParam(&'static str),

    #[error("State parameter `{name}` has invalid value \"{value}\"")]
    InvalidParam { name: &'static str, value: String },

    #[error("Ran out of {resource} (index {index})")]
    ResourceExhausted { resource: &'static str, index: u64 },

    #[error("Invalid message: {0}")]
    Msg(#[from] MsgError),

    #[error("Wallet error: {0}")]
    Wallet(#[from] WalletError),

    #[error(transparent)]
    Encoding(#[from] EncodingError),
}

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigValidationError),

    #[error("Wallet error: {0}")]
    Wallet(#[from] WalletError),

    #[error("Target generation failed: {0}")]
    Scenario(#[from] ScenarioError),

    #[error("Target generation unit failed: {0}")]
    Unit(String),

    #[error("Worker gate closed unexpectedly")]
    GateClosed,

    #[error("Failure slot mutex is poisoned")]
    PoisonData,
}

impl<T> From<PoisonError<T>> for LoadError {
    fn from(_err: PoisonError<T>) -> Self {
        Self::PoisonData
    }
}

#[derive(Error, Debug)]
pub enum RpcError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Request to {url} failed with status {status}: {body}")]
    RequestFailed {
        url: String,
        status: StatusCode,
        body: String,
    },

    #[error("Malformed response: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Transaction rejected with code {code}: {log}")]
    Broadcast { code: u32, log: String },

    #[error(transparent)]
    Encoding(#[from] EncodingError),
}

#[derive(Error, Debug)]
pub enum PrepareError {
    #[error("Could not build state messages: {0}")]
    Scenario(#[from] ScenarioError),

    #[error("RPC error: {0}")]
    Rpc(#[from] RpcError),
}

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Could not fetch block samples: {0}")]
    Rpc(#[from] RpcError),

    #[error("Chart rendering failed: {0}")]
    Chart(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

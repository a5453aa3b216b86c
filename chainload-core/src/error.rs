use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigValidationError {
    #[error("TPS must be greater than zero")]
    ZeroTps,

    #[error("Duration must be at least one second")]
    ZeroDuration,

    #[error("{tps} TPS over {secs}s is more virtual users than this host can address")]
    TooManyUsers { tps: u64, secs: u64 },

    #[error("{users} users with {per_user} targets each overflows the target buffer")]
    TooManyTargets { users: usize, per_user: usize },

    #[error("Max workers must be greater than zero")]
    ZeroWorkers,

    #[error("Messages per transaction must be greater than zero")]
    ZeroMsgsPerTx,

    #[error("Target URL is empty")]
    EmptyTargetUrl,

    #[error("Target URL is invalid: {0}")]
    InvalidTargetUrl(String),

    #[error("Chain ID is empty")]
    EmptyChainId,

    #[error("Mnemonic is empty")]
    EmptyMnemonic,

    #[error("Unknown pacer type \"{0}\" (expected \"constant\" or \"linear\")")]
    UnknownPacer(String),
}

#[derive(Error, Debug)]
pub enum EncodingError {
    #[error("Error encoding payload: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("Malformed record on line {line}: {source}")]
    Decode {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

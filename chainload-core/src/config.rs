use crate::{
    ConfigValidationError, DEFAULT_ADDRESS_PREFIX, DEFAULT_COIN_NAME, DEFAULT_MAX_WORKERS,
    DEFAULT_MSGS_PER_TX, DEFAULT_PACER,
};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationSeconds};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

/// Run configuration shared by the controller and every load generator.
///
/// Built once at process start and never mutated afterwards; concurrent tasks hold it behind an
/// `Arc`.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub msgs_per_tx_prepare: usize,
    pub msgs_per_tx_load_test: usize,
    pub tps: u64,
    #[serde_as(as = "DurationSeconds<u64>")]
    pub duration: Duration,
    #[serde_as(as = "DurationSeconds<u64>")]
    pub ramp_up_time: Duration,
    pub max_workers: usize,
    pub target_url: String,
    pub chain_id: String,
    pub coin_name: String,
    pub mnemonic: String,
    pub pacer_type: String,
    pub address_prefix: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            msgs_per_tx_prepare: DEFAULT_MSGS_PER_TX,
            msgs_per_tx_load_test: DEFAULT_MSGS_PER_TX,
            tps: 0,
            duration: Duration::ZERO,
            ramp_up_time: Duration::ZERO,
            max_workers: DEFAULT_MAX_WORKERS,
            target_url: String::new(),
            chain_id: String::new(),
            coin_name: DEFAULT_COIN_NAME.to_string(),
            mnemonic: String::new(),
            pacer_type: DEFAULT_PACER.to_string(),
            address_prefix: DEFAULT_ADDRESS_PREFIX.to_string(),
        }
    }
}

impl Config {
    /// Checks everything that can be checked without touching the network.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.tps == 0 {
            return Err(ConfigValidationError::ZeroTps);
        }

        if self.duration.as_secs() == 0 {
            return Err(ConfigValidationError::ZeroDuration);
        }

        if self.users().is_none() {
            return Err(ConfigValidationError::TooManyUsers {
                tps: self.tps,
                secs: self.duration.as_secs(),
            });
        }

        if self.max_workers == 0 {
            return Err(ConfigValidationError::ZeroWorkers);
        }

        if self.msgs_per_tx_load_test == 0 || self.msgs_per_tx_prepare == 0 {
            return Err(ConfigValidationError::ZeroMsgsPerTx);
        }

        if self.target_url.is_empty() {
            return Err(ConfigValidationError::EmptyTargetUrl);
        }

        Url::parse(&self.target_url)
            .map_err(|err| ConfigValidationError::InvalidTargetUrl(err.to_string()))?;

        if self.chain_id.is_empty() {
            return Err(ConfigValidationError::EmptyChainId);
        }

        if self.mnemonic.trim().is_empty() {
            return Err(ConfigValidationError::EmptyMnemonic);
        }

        self.pacer()?;

        Ok(())
    }

    pub fn pacer(&self) -> Result<PacerType, ConfigValidationError> {
        self.pacer_type.parse()
    }

    /// Number of virtual users, one per request fired per second of the run.
    ///
    /// Saturates on overflow; [`Config::validate`] rejects such configs.
    pub fn num_users(&self) -> usize {
        self.users().unwrap_or(usize::MAX)
    }

    fn users(&self) -> Option<usize> {
        let users = self.tps.checked_mul(self.duration.as_secs())?;
        usize::try_from(users).ok()
    }

    /// Copy of this config signing with a different seed, as handed to each slave.
    pub fn with_mnemonic(&self, mnemonic: &str) -> Self {
        Self {
            mnemonic: mnemonic.to_string(),
            ..self.clone()
        }
    }

    /// Target URL without a trailing slash, ready for path concatenation.
    pub fn base_url(&self) -> &str {
        self.target_url.trim_end_matches('/')
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacerType {
    Constant,
    /// Linear ramp up to the goal TPS, constant afterwards.
    Linear,
}

impl FromStr for PacerType {
    type Err = ConfigValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "constant" => Ok(PacerType::Constant),
            "linear" => Ok(PacerType::Linear),
            other => Err(ConfigValidationError::UnknownPacer(other.to_string())),
        }
    }
}

impl fmt::Display for PacerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PacerType::Constant => write!(f, "constant"),
            PacerType::Linear => write!(f, "linear"),
        }
    }
}

/// Slave endpoint materializing all targets for a run.
pub const LOAD_ENDPOINT: &str = "/target/load";

/// Slave endpoint streaming attack results back to the controller.
pub const FIRE_ENDPOINT: &str = "/target/fire";

pub const DEFAULT_MAX_WORKERS: usize = 50;
pub const DEFAULT_MSGS_PER_TX: usize = 1;
pub const DEFAULT_COIN_NAME: &str = "stake";
pub const DEFAULT_ADDRESS_PREFIX: &str = "link";
pub const DEFAULT_PACER: &str = "linear";

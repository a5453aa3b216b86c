mod config;
mod constants;
mod error;
mod result;
mod slave;
mod target;

pub use config::*;
pub use constants::*;
pub use error::*;
pub use result::*;
pub use slave::*;
pub use target::*;

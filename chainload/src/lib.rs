#![cfg_attr(docsrs, feature(doc_cfg))]
//! Load generation for blockchain RPC services.
//!
//! A run has two phases. During the load phase a [`LoadGenerator`] materialises every request
//! its [`Scenario`] describes, one slice per virtual user. During the fire phase those requests
//! are issued at the cadence of a [`pacer::Pacer`] and their outcomes streamed back as
//! [`AttackResult`]s.
pub mod attack;
pub mod error;
pub mod generator;
pub mod metrics;
pub mod msg;
pub mod pacer;
pub mod prepare;
pub mod report;
pub mod rpc;
pub mod scenario;
pub mod tx;
pub mod wallet;

pub use chainload_core::{AttackResult, Config, LoadRequest, Slave, StateParams, Target};
pub use error::{LoadError, PrepareError, ReportError, RpcError, ScenarioError};
pub use generator::LoadGenerator;
pub use prepare::Preparer;
pub use report::{Report, Reporter};
pub use scenario::{Scenario, ScenarioKind};

pub mod prelude {
    pub use crate::generator::LoadGenerator;
    pub use crate::pacer::{Pacer, Rate};
    pub use crate::prepare::Preparer;
    pub use crate::report::Reporter;
    pub use crate::scenario::{Scenario, ScenarioKind};
    pub use crate::wallet::{HdWallets, Wallets};
    pub use chainload_core::{Config, PacerType, Slave, StateParams};
}

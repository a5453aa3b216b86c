//! Distributed runtime for chainload.
//!
//! A slave process runs [`SlaveRuntime`], exposing `POST /target/load` and
//! `POST /target/fire`. A master process drives any number of slaves through a [`Controller`].
pub mod controller;
pub mod runtime;

mod error;
mod server;

pub use crate::controller::Controller;
pub use crate::error::{ControllerError, ServerError};
pub use crate::runtime::{SlaveRuntime, DEFAULT_PORT};
pub use crate::server::{app, serve};

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

//! telemetry-daemon: the long-running service — Store-backed ingestion,
//! provider polling, spool/retention maintenance, and the HTTP-over-UDS
//! surface the client and CLI talk to.

pub mod cache;
pub mod collector;
pub mod config;
pub mod error;
pub mod http;
pub mod logging;
pub mod serve;
pub mod service;
pub mod socket;
pub mod throttle;

pub use config::{AppConfig, DaemonConfig};
pub use error::DaemonError;
pub use service::DaemonService;

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! telemetry-client: the daemon-facing HTTP client plus the bootstrap logic
//! (`ensure_running`) that installs/starts the daemon as a user service when
//! it isn't already answering.

mod transport;

pub mod client;
pub mod constants;
pub mod diagnostics;
pub mod ensure;
pub mod error;

pub use client::{Client, ReadModelResponse};
pub use diagnostics::{socket_owner_summary, startup_diagnostics, tail_text_lines};
pub use ensure::ensure_running;
pub use error::ClientError;

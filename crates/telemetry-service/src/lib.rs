#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! telemetry-service: installs and starts the daemon as a per-user system
//! service (launchd on darwin, systemd --user on linux).

mod command;
mod darwin;
mod linux;

pub mod error;
pub mod manager;
pub mod platform;
pub mod transient;

pub use error::ServiceError;
pub use manager::ServiceManager;
pub use platform::Platform;
pub use transient::is_transient_exe_path;

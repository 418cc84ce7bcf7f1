#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! telemetry-providers: per-vendor quota/usage adapters (`UsageProvider`).
//! Like `telemetry-sources`, deliberately peripheral — one synthetic
//! provider is enough to exercise the poll loop end to end.

mod demo;

pub mod error;
pub mod provider;
pub mod registry;

pub use error::ProviderError;
pub use provider::UsageProvider;
pub use registry::ProviderRegistry;

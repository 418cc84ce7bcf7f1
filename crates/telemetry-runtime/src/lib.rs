//! telemetry-runtime: the client-side `ViewRuntime` singleton and the
//! `Broadcaster` loop that drives it for a UI.

pub mod broadcaster;
pub mod runtime;

pub use broadcaster::{BroadcastHandles, Broadcaster};
pub use runtime::ViewRuntime;

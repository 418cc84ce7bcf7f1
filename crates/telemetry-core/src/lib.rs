#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! telemetry-core: shared domain types for the telemetry daemon and its clients.

pub mod account;
pub mod daemon_state;
pub mod health;
pub mod ingest;
pub mod normalize;
pub mod read_model;
pub mod snapshot;

pub use account::{
    build_read_model_request, filter_accounts_by_dashboard, normalize_provider_links,
    AccountConfig, DashboardPreference,
};
pub use daemon_state::{classify_ensure_error, DaemonState, DaemonStatus};
pub use health::{health_current, is_release_semver, HealthResponse, API_VERSION};
pub use ingest::{HookTally, IngestRequest, IngestTally};
pub use normalize::{normalize_usage_snapshot_with_config, ModelNormalizationConfig};
pub use read_model::{
    merge_read_model_snapshots, read_model_request_key, read_model_templates_from_request,
    snapshots_have_usable_data, CachedReadModelEntry, ReadModelRequest, ReadModelRequestEntry,
};
pub use snapshot::{ModelUsage, SnapshotStatus, TimePoint, UsageMetric, UsageSnapshot};

use std::collections::HashMap;

use async_trait::async_trait;
use telemetry_core::{IngestRequest, IngestTally, ReadModelRequest, UsageSnapshot};

use crate::error::StoreError;

/// The daemon's opaque persistence boundary. `telemetry-daemon` never
/// touches SQL directly; every ingest/read-model/retention operation goes
/// through this trait so the schema can evolve independently.
#[async_trait]
pub trait Store: Send + Sync {
    /// Ingest a batch of already-parsed events directly (hooks, retried
    /// spool entries). Dedups on `IngestRequest::identity`.
    async fn ingest_events(&self, events: &[IngestRequest]) -> Result<IngestTally, StoreError>;

    /// Replace the latest quota snapshot for each account in `snapshots`.
    async fn ingest_quota_snapshots(
        &self,
        snapshots: HashMap<String, UsageSnapshot>,
    ) -> Result<(), StoreError>;

    /// Compute the current snapshot for each account in `req`. Accounts with
    /// no stored quota snapshot are simply absent — callers are responsible
    /// for merging in template snapshots so every requested account appears.
    async fn compute_read_model(
        &self,
        req: &ReadModelRequest,
    ) -> Result<HashMap<String, UsageSnapshot>, StoreError>;

    /// Enqueue events into the durable retry spool.
    async fn spool_enqueue(&self, events: &[IngestRequest]) -> Result<(), StoreError>;

    /// Pop up to `batch_size` spooled events (oldest first), re-ingest them,
    /// and remove the ones that were processed. Returns the ingest tally for
    /// the batch actually attempted.
    async fn spool_flush(&self, batch_size: u64) -> Result<IngestTally, StoreError>;

    /// Delete raw events older than `retention_days`. Returns rows removed.
    async fn prune_old_events(&self, retention_days: u32) -> Result<u64, StoreError>;

    /// Delete up to `limit` raw events that were never attributed to an
    /// account (account_id IS NULL), oldest first. Returns rows removed.
    async fn prune_orphan_raw_events(&self, limit: u64) -> Result<u64, StoreError>;
}

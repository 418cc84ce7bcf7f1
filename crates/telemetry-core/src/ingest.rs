//! Opaque ingest payloads produced by collectors/hook parsers and consumed
//! by the store.

use serde::{Deserialize, Serialize};

/// One normalized telemetry event, identity-hashed for dedup by the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestRequest {
    pub source: String,
    pub account_id: Option<String>,
    /// Stable identity hash; the store dedups on this.
    pub identity: String,
    pub payload: serde_json::Value,
}

/// Per-call tally returned by a single `Store::ingest_events` invocation.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct IngestTally {
    pub processed: u64,
    pub ingested: u64,
    pub deduped: u64,
    pub failed: u64,
}

impl IngestTally {
    pub fn merge(&mut self, other: IngestTally) {
        self.processed += other.processed;
        self.ingested += other.ingested;
        self.deduped += other.deduped;
        self.failed += other.failed;
    }
}

/// Reply body for `POST /v1/hook/<source>`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HookTally {
    pub source: String,
    pub enqueued: u64,
    pub processed: u64,
    pub ingested: u64,
    pub deduped: u64,
    pub failed: u64,
    #[serde(default)]
    pub warnings: Vec<String>,
}

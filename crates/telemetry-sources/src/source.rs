use sha2::{Digest, Sha256};
use telemetry_core::IngestRequest;

use crate::error::ParseError;

/// A parser for one editor integration's hook payload format. The daemon
/// looks these up by name (the `<source>` segment of `/v1/hook/<source>`)
/// and treats the result as opaque, identity-hashed events.
pub trait TelemetrySource: Send + Sync {
    /// The `source` name this parser answers to, e.g. `"opencode"`.
    fn name(&self) -> &'static str;

    /// Parse a raw hook body into zero or more ingest requests. `account_id`
    /// comes from the request's query string and is attached to every event
    /// this call produces unless the payload itself overrides it.
    fn parse(&self, body: &[u8], account_id: Option<&str>) -> Result<Vec<IngestRequest>, ParseError>;
}

/// Identity hash for a parsed event: stable across retries of the same
/// payload, so the store's dedup index can recognize at-least-once resends.
pub fn identity_hash(source: &str, account_id: Option<&str>, canonical: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source.as_bytes());
    hasher.update(b"\0");
    hasher.update(account_id.unwrap_or("").as_bytes());
    hasher.update(b"\0");
    hasher.update(canonical.as_bytes());
    format!("{:x}", hasher.finalize())
}

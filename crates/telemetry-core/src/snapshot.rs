//! Per-account usage snapshots, the unit the read-model hands back to clients.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Observed state of an account at the time a snapshot was taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SnapshotStatus {
    Ok,
    Auth,
    Limited,
    Error,
    Unknown,
}

impl Default for SnapshotStatus {
    fn default() -> Self {
        SnapshotStatus::Unknown
    }
}

/// A single gauge, e.g. "requests used this hour".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageMetric {
    pub used: Option<f64>,
    pub limit: Option<f64>,
    pub unit: Option<String>,
}

/// One point in a daily usage series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimePoint {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

/// Per-model usage breakdown (e.g. tokens by model name).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelUsage {
    pub requests: Option<f64>,
    pub tokens: Option<f64>,
}

/// One frozen observation of an account's state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageSnapshot {
    pub provider_id: String,
    pub account_id: String,
    pub timestamp: DateTime<Utc>,

    pub status: SnapshotStatus,
    pub message: Option<String>,

    #[serde(default)]
    pub metrics: HashMap<String, UsageMetric>,
    #[serde(default)]
    pub resets: HashMap<String, DateTime<Utc>>,

    #[serde(default)]
    pub attributes: HashMap<String, String>,
    #[serde(default)]
    pub diagnostics: HashMap<String, String>,
    #[serde(default)]
    pub raw: HashMap<String, String>,

    #[serde(default)]
    pub daily_series: HashMap<String, Vec<TimePoint>>,
    #[serde(default)]
    pub model_usage: HashMap<String, ModelUsage>,
}

impl UsageSnapshot {
    /// A `status=UNKNOWN`, all-maps-empty placeholder for `account_id`/`provider_id`.
    ///
    /// Used by the read-model to guarantee every requested account appears in
    /// the reply even when the store has nothing for it yet.
    pub fn template(account_id: &str, provider_id: &str, now: DateTime<Utc>) -> Self {
        Self {
            provider_id: provider_id.to_string(),
            account_id: account_id.to_string(),
            timestamp: now,
            status: SnapshotStatus::Unknown,
            message: None,
            metrics: HashMap::new(),
            resets: HashMap::new(),
            attributes: HashMap::new(),
            diagnostics: HashMap::new(),
            raw: HashMap::new(),
            daily_series: HashMap::new(),
            model_usage: HashMap::new(),
        }
    }

    /// An `ERROR`-status snapshot carrying a human-readable message, used when
    /// a provider fetch fails or no adapter is registered for the account.
    pub fn error(account_id: &str, provider_id: &str, now: DateTime<Utc>, message: String) -> Self {
        let mut snap = Self::template(account_id, provider_id, now);
        snap.status = SnapshotStatus::Error;
        snap.message = Some(message);
        snap
    }

    /// True if this snapshot carries observed data rather than a placeholder.
    pub fn has_usable_data(&self) -> bool {
        self.status != SnapshotStatus::Unknown
            || !self.metrics.is_empty()
            || !self.resets.is_empty()
            || !self.daily_series.is_empty()
            || !self.model_usage.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_is_unknown_with_empty_maps() {
        let now = Utc::now();
        let snap = UsageSnapshot::template("acct-1", "prov-1", now);
        assert_eq!(snap.status, SnapshotStatus::Unknown);
        assert!(snap.metrics.is_empty());
        assert!(snap.resets.is_empty());
        assert!(snap.daily_series.is_empty());
        assert!(!snap.has_usable_data());
    }

    #[test]
    fn error_snapshot_has_usable_data() {
        let now = Utc::now();
        let snap = UsageSnapshot::error("acct-1", "prov-1", now, "boom".into());
        assert_eq!(snap.status, SnapshotStatus::Error);
        assert!(snap.has_usable_data());
    }
}

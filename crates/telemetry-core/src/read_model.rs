//! The read-model request/reply shapes and the cache key derived from them.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::snapshot::UsageSnapshot;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadModelRequestEntry {
    pub account_id: String,
    pub provider_id: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReadModelRequest {
    #[serde(default)]
    pub accounts: Vec<ReadModelRequestEntry>,
    #[serde(default)]
    pub provider_links: HashMap<String, String>,
}

impl ReadModelRequest {
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}

/// Daemon-side cache entry: `{snapshots, updated_at}` keyed by
/// `read_model_request_key`.
#[derive(Debug, Clone)]
pub struct CachedReadModelEntry {
    pub snapshots: HashMap<String, UsageSnapshot>,
    pub updated_at: DateTime<Utc>,
}

/// Canonical cache key: accounts sorted by `(account_id, provider_id)`,
/// joined as `account:provider;...|links:src=dst;...` (links also sorted).
pub fn read_model_request_key(req: &ReadModelRequest) -> String {
    let mut accounts: Vec<&ReadModelRequestEntry> = req.accounts.iter().collect();
    accounts.sort_by(|a, b| (&a.account_id, &a.provider_id).cmp(&(&b.account_id, &b.provider_id)));

    let accounts_part = accounts
        .iter()
        .map(|e| format!("{}:{}", e.account_id, e.provider_id))
        .collect::<Vec<_>>()
        .join(";");

    let mut links: Vec<(&String, &String)> = req.provider_links.iter().collect();
    links.sort();
    let links_part = links
        .iter()
        .map(|(src, dst)| format!("{src}={dst}"))
        .collect::<Vec<_>>()
        .join(";");

    format!("{accounts_part}|links:{links_part}")
}

/// Seed map `account_id -> UsageSnapshot` template for every requested,
/// non-disabled, deduped account, sorted by account_id for deterministic
/// iteration.
pub fn read_model_templates_from_request(
    req: &ReadModelRequest,
    disabled: &std::collections::HashSet<String>,
) -> HashMap<String, UsageSnapshot> {
    let now = Utc::now();
    let mut seen = std::collections::HashSet::new();
    let mut out = HashMap::new();

    let mut entries: Vec<&ReadModelRequestEntry> = req.accounts.iter().collect();
    entries.sort_by(|a, b| a.account_id.cmp(&b.account_id));

    for entry in entries {
        if entry.account_id.is_empty() || disabled.contains(&entry.account_id) {
            continue;
        }
        if !seen.insert(entry.account_id.clone()) {
            continue;
        }
        out.insert(
            entry.account_id.clone(),
            UsageSnapshot::template(&entry.account_id, &entry.provider_id, now),
        );
    }
    out
}

/// Fills in a template for every requested account, then overlays whatever
/// the store actually computed. Guarantees the reply always has an entry
/// for every requested, non-disabled account_id, even when the store only
/// has data for some of them.
pub fn merge_read_model_snapshots(
    req: &ReadModelRequest,
    disabled: &std::collections::HashSet<String>,
    computed: HashMap<String, UsageSnapshot>,
) -> HashMap<String, UsageSnapshot> {
    let mut out = read_model_templates_from_request(req, disabled);
    out.extend(computed);
    out
}

/// True if any snapshot carries observed data (drives broadcaster warm-up
/// termination).
pub fn snapshots_have_usable_data(snaps: &HashMap<String, UsageSnapshot>) -> bool {
    snaps.values().any(|s| s.has_usable_data())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::SnapshotStatus;

    fn req(entries: &[(&str, &str)], links: &[(&str, &str)]) -> ReadModelRequest {
        ReadModelRequest {
            accounts: entries
                .iter()
                .map(|(a, p)| ReadModelRequestEntry {
                    account_id: a.to_string(),
                    provider_id: p.to_string(),
                })
                .collect(),
            provider_links: links
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    #[test]
    fn cache_key_is_order_independent() {
        let a = req(&[("a1", "claude"), ("a2", "gpt")], &[("x", "y")]);
        let b = req(&[("a2", "gpt"), ("a1", "claude")], &[("x", "y")]);
        assert_eq!(read_model_request_key(&a), read_model_request_key(&b));
    }

    #[test]
    fn templates_exclude_disabled_and_dedup() {
        let r = req(&[("a1", "claude"), ("a1", "claude"), ("a2", "gpt")], &[]);
        let mut disabled = std::collections::HashSet::new();
        disabled.insert("a2".to_string());
        let templates = read_model_templates_from_request(&r, &disabled);
        assert_eq!(templates.len(), 1);
        assert!(templates.contains_key("a1"));
        assert_eq!(templates["a1"].provider_id, "claude");
    }

    #[test]
    fn merge_fills_in_missing_accounts_with_templates() {
        let r = req(&[("a1", "claude"), ("a2", "gpt")], &[]);
        let mut computed = HashMap::new();
        computed.insert(
            "a1".to_string(),
            UsageSnapshot::error("a1", "claude", Utc::now(), "boom".into()),
        );

        let merged = merge_read_model_snapshots(&r, &std::collections::HashSet::new(), computed);

        assert_eq!(merged.len(), 2);
        assert!(merged.contains_key("a2"), "account absent from the store still gets a template");
        assert_eq!(merged["a1"].status, SnapshotStatus::Error);
    }

    #[test]
    fn usable_data_oracle() {
        let mut snaps = HashMap::new();
        snaps.insert(
            "a1".to_string(),
            UsageSnapshot::template("a1", "claude", Utc::now()),
        );
        assert!(!snapshots_have_usable_data(&snaps));

        snaps.insert(
            "a2".to_string(),
            UsageSnapshot::error("a2", "claude", Utc::now(), "boom".into()),
        );
        assert!(snapshots_have_usable_data(&snaps));
    }
}

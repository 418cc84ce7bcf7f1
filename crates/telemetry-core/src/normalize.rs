//! Model-name normalization applied to a snapshot's `model_usage` map before
//! it is ingested, so that provider-specific model aliases (e.g. a dated
//! snapshot id) roll up under one canonical key.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::snapshot::{ModelUsage, UsageSnapshot};

/// `model_id → canonical_id` alias table, read from the on-disk config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelNormalizationConfig {
    #[serde(default)]
    pub aliases: HashMap<String, String>,
}

/// Rewrite `snapshot.model_usage` keys through `cfg.aliases`, merging entries
/// that collide onto the same canonical id by summing `requests`/`tokens`.
/// Keys with no alias entry pass through unchanged.
pub fn normalize_usage_snapshot_with_config(
    mut snapshot: UsageSnapshot,
    cfg: &ModelNormalizationConfig,
) -> UsageSnapshot {
    if cfg.aliases.is_empty() || snapshot.model_usage.is_empty() {
        return snapshot;
    }

    let mut merged: HashMap<String, ModelUsage> = HashMap::new();
    for (model_id, usage) in snapshot.model_usage.drain() {
        let canonical = cfg
            .aliases
            .get(&model_id)
            .cloned()
            .unwrap_or(model_id);
        merged
            .entry(canonical)
            .and_modify(|acc| {
                acc.requests = add_optional(acc.requests, usage.requests);
                acc.tokens = add_optional(acc.tokens, usage.tokens);
            })
            .or_insert(usage);
    }
    snapshot.model_usage = merged;
    snapshot
}

fn add_optional(a: Option<f64>, b: Option<f64>) -> Option<f64> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a + b),
        (Some(a), None) => Some(a),
        (None, Some(b)) => Some(b),
        (None, None) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passthrough_without_aliases() {
        let snap = UsageSnapshot::template("acct-1", "claude", chrono::Utc::now());
        let cfg = ModelNormalizationConfig::default();
        let out = normalize_usage_snapshot_with_config(snap.clone(), &cfg);
        assert_eq!(out.model_usage, snap.model_usage);
    }

    #[test]
    fn merges_aliased_models() {
        let mut snap = UsageSnapshot::template("acct-1", "claude", chrono::Utc::now());
        snap.model_usage.insert(
            "claude-3-5-sonnet-20241022".to_string(),
            ModelUsage { requests: Some(2.0), tokens: Some(100.0) },
        );
        snap.model_usage.insert(
            "claude-3-5-sonnet-20240620".to_string(),
            ModelUsage { requests: Some(3.0), tokens: Some(50.0) },
        );

        let mut aliases = HashMap::new();
        aliases.insert("claude-3-5-sonnet-20241022".to_string(), "claude-3-5-sonnet".to_string());
        aliases.insert("claude-3-5-sonnet-20240620".to_string(), "claude-3-5-sonnet".to_string());
        let cfg = ModelNormalizationConfig { aliases };

        let out = normalize_usage_snapshot_with_config(snap, &cfg);
        assert_eq!(out.model_usage.len(), 1);
        let merged = &out.model_usage["claude-3-5-sonnet"];
        assert_eq!(merged.requests, Some(5.0));
        assert_eq!(merged.tokens, Some(150.0));
    }
}

//! Account resolution: merges configured + auto-detected accounts, applies
//! dashboard enable/disable, and shapes the canonical read-model request.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::read_model::{ReadModelRequest, ReadModelRequestEntry};

/// A logical identity scoped to one provider, presented as a dashboard tile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountConfig {
    pub id: String,
    pub provider_id: String,
    pub auth: String,
    #[serde(default)]
    pub secrets: HashMap<String, String>,
}

/// A dashboard `[{account_id, enabled}]` entry. Absence of an entry for an
/// account id means "enabled".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardPreference {
    pub account_id: String,
    pub enabled: bool,
}

/// Exclude exactly the accounts with an explicit `enabled=false` preference.
pub fn filter_accounts_by_dashboard(
    accounts: Vec<AccountConfig>,
    prefs: &[DashboardPreference],
) -> Vec<AccountConfig> {
    let disabled: std::collections::HashSet<&str> = prefs
        .iter()
        .filter(|p| !p.enabled)
        .map(|p| p.account_id.as_str())
        .collect();
    accounts
        .into_iter()
        .filter(|a| !disabled.contains(a.id.as_str()))
        .collect()
}

/// Lowercase + trim both sides of `provider_links`, dropping blank entries.
pub fn normalize_provider_links(links: HashMap<String, String>) -> HashMap<String, String> {
    links
        .into_iter()
        .filter_map(|(k, v)| {
            let k = k.trim().to_lowercase();
            let v = v.trim().to_lowercase();
            if k.is_empty() || v.is_empty() {
                None
            } else {
                Some((k, v))
            }
        })
        .collect()
}

/// Build the canonical `ReadModelRequest` from a (already merged and
/// dashboard-filtered) account list and a raw provider-links map.
///
/// Dedups by trimmed `account_id`, drops blank ids/provider ids, preserves
/// insertion order after dedup.
pub fn build_read_model_request(
    accounts: &[AccountConfig],
    provider_links: HashMap<String, String>,
) -> ReadModelRequest {
    let mut seen = std::collections::HashSet::new();
    let mut entries = Vec::new();

    for acct in accounts {
        let account_id = acct.id.trim().to_string();
        let provider_id = acct.provider_id.trim().to_string();
        if account_id.is_empty() || provider_id.is_empty() {
            continue;
        }
        if !seen.insert(account_id.clone()) {
            continue;
        }
        entries.push(ReadModelRequestEntry {
            account_id,
            provider_id,
        });
    }

    ReadModelRequest {
        accounts: entries,
        provider_links: normalize_provider_links(provider_links),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn acct(id: &str, provider: &str) -> AccountConfig {
        AccountConfig {
            id: id.to_string(),
            provider_id: provider.to_string(),
            auth: "oauth".to_string(),
            secrets: HashMap::new(),
        }
    }

    #[test]
    fn dedups_and_trims_and_drops_blank_ids() {
        let accounts = vec![
            acct(" a1 ", "claude"),
            acct("a1", "claude"),
            acct("", "claude"),
            acct("a2", ""),
            acct("a3", "gpt"),
        ];
        let req = build_read_model_request(&accounts, HashMap::new());
        assert_eq!(req.accounts.len(), 2);
        assert_eq!(req.accounts[0].account_id, "a1");
        assert_eq!(req.accounts[1].account_id, "a3");
    }

    #[test]
    fn normalizes_provider_links() {
        let mut links = HashMap::new();
        links.insert(" Claude ".to_string(), " GPT ".to_string());
        links.insert("".to_string(), "x".to_string());
        let normalized = normalize_provider_links(links);
        assert_eq!(normalized.get("claude"), Some(&"gpt".to_string()));
        assert_eq!(normalized.len(), 1);
    }

    #[test]
    fn dashboard_filter_excludes_only_explicit_false() {
        let accounts = vec![acct("a1", "claude"), acct("a2", "claude")];
        let prefs = vec![DashboardPreference {
            account_id: "a1".into(),
            enabled: false,
        }];
        let filtered = filter_accounts_by_dashboard(accounts, &prefs);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].id, "a2");
    }
}

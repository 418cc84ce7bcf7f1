use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use telemetry_core::{AccountConfig, SnapshotStatus, UsageMetric, UsageSnapshot};

use crate::error::ProviderError;
use crate::provider::UsageProvider;

/// A synthetic provider standing in for a real vendor API. Always succeeds
/// with a fixed, plausible-looking quota reading so the poll loop has
/// something real to push through the pipeline without an external
/// dependency.
#[derive(Debug, Default)]
pub struct DemoProvider;

#[async_trait]
impl UsageProvider for DemoProvider {
    fn provider_id(&self) -> &'static str {
        "demo"
    }

    async fn fetch(&self, account: &AccountConfig) -> Result<UsageSnapshot, ProviderError> {
        let mut metrics = HashMap::new();
        metrics.insert(
            "requests".to_string(),
            UsageMetric {
                used: Some(128.0),
                limit: Some(1000.0),
                unit: Some("requests".to_string()),
            },
        );

        Ok(UsageSnapshot {
            provider_id: self.provider_id().to_string(),
            account_id: account.id.clone(),
            timestamp: Utc::now(),
            status: SnapshotStatus::Ok,
            message: None,
            metrics,
            resets: HashMap::new(),
            attributes: HashMap::new(),
            diagnostics: HashMap::new(),
            raw: HashMap::new(),
            daily_series: HashMap::new(),
            model_usage: HashMap::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn demo_provider_reports_ok_status() {
        let account = AccountConfig {
            id: "acct-1".to_string(),
            provider_id: "demo".to_string(),
            auth: "oauth".to_string(),
            secrets: HashMap::new(),
        };
        let snap = DemoProvider.fetch(&account).await.unwrap();
        assert_eq!(snap.status, SnapshotStatus::Ok);
        assert_eq!(snap.account_id, "acct-1");
    }
}

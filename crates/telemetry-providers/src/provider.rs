use async_trait::async_trait;
use telemetry_core::{AccountConfig, UsageSnapshot};

use crate::error::ProviderError;

/// Translates one account's upstream quota/usage API into a [`UsageSnapshot`].
/// The poll loop applies its own per-call deadline around `fetch`; adapters
/// should not build their own retry/timeout logic on top of that.
#[async_trait]
pub trait UsageProvider: Send + Sync {
    /// The `provider_id` this adapter answers to, e.g. `"demo"`.
    fn provider_id(&self) -> &'static str;

    async fn fetch(&self, account: &AccountConfig) -> Result<UsageSnapshot, ProviderError>;
}

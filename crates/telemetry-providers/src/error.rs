use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("no provider adapter registered for {provider_id:?}")]
    Unregistered { provider_id: String },

    #[error("upstream request failed: {0}")]
    Upstream(String),
}

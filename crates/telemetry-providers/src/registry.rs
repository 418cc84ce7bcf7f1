use std::collections::HashMap;

use crate::demo::DemoProvider;
use crate::provider::UsageProvider;

/// Frozen `provider_id -> adapter` map built once at daemon startup.
pub struct ProviderRegistry {
    providers: HashMap<&'static str, Box<dyn UsageProvider>>,
}

impl ProviderRegistry {
    pub fn builtin() -> Self {
        let mut providers: HashMap<&'static str, Box<dyn UsageProvider>> = HashMap::new();
        for provider in Self::builtin_providers() {
            providers.insert(provider.provider_id(), provider);
        }
        Self { providers }
    }

    fn builtin_providers() -> Vec<Box<dyn UsageProvider>> {
        vec![Box::new(DemoProvider)]
    }

    pub fn get(&self, provider_id: &str) -> Option<&dyn UsageProvider> {
        self.providers.get(provider_id).map(|b| b.as_ref())
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_registry_knows_demo_provider() {
        let registry = ProviderRegistry::builtin();
        assert!(registry.get("demo").is_some());
        assert!(registry.get("unknownX").is_none());
    }
}

use std::collections::HashMap;

use crate::claude_code::ClaudeCodeSource;
use crate::opencode::OpenCodeSource;
use crate::source::TelemetrySource;

/// Frozen `name -> parser` map, built once at daemon startup and handed to
/// the HTTP layer so `/v1/hook/<source>` can do an O(1) lookup.
pub struct SourceRegistry {
    sources: HashMap<&'static str, Box<dyn TelemetrySource>>,
}

impl SourceRegistry {
    pub fn builtin() -> Self {
        let mut sources: HashMap<&'static str, Box<dyn TelemetrySource>> = HashMap::new();
        for source in Self::builtin_sources() {
            sources.insert(source.name(), source);
        }
        Self { sources }
    }

    fn builtin_sources() -> Vec<Box<dyn TelemetrySource>> {
        vec![Box::new(OpenCodeSource), Box::new(ClaudeCodeSource)]
    }

    pub fn get(&self, name: &str) -> Option<&dyn TelemetrySource> {
        self.sources.get(name).map(|b| b.as_ref())
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.sources.keys().copied()
    }
}

impl Default for SourceRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_registry_knows_opencode_and_claude_code() {
        let registry = SourceRegistry::builtin();
        assert!(registry.get("opencode").is_some());
        assert!(registry.get("claude-code").is_some());
        assert!(registry.get("unknown-tool").is_none());
    }
}

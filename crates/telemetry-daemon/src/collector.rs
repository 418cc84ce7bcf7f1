//! The collect loop's data source: a frozen list of `Collector`s, one per
//! telemetry source, polled once per collect tick.
//!
//! The only built-in collector watches `spool_dir/incoming/` for
//! `<source>-*.jsonl` files dropped by an external agent that can't reach
//! the hook socket directly (e.g. a batch export job). Files are parsed
//! through the matching [`TelemetrySource`] and renamed out of the way so
//! they aren't picked up twice.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use telemetry_core::IngestRequest;
use telemetry_sources::SourceRegistry;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum CollectError {
    #[error("io error scanning {0}: {1}")]
    Io(PathBuf, #[source] std::io::Error),
}

#[async_trait]
pub trait Collector: Send + Sync {
    fn name(&self) -> &'static str;
    async fn collect(&self) -> Result<Vec<IngestRequest>, CollectError>;
}

pub struct FileDropCollector {
    incoming_dir: PathBuf,
    rejected_dir: PathBuf,
    sources: Arc<SourceRegistry>,
}

impl FileDropCollector {
    pub fn new(spool_dir: PathBuf, sources: Arc<SourceRegistry>) -> Self {
        Self {
            incoming_dir: spool_dir.join("incoming"),
            rejected_dir: spool_dir.join("rejected"),
            sources,
        }
    }

    /// `<source>-<anything>.jsonl` -> source name is everything before the
    /// first `-`.
    fn source_name(file_name: &str) -> Option<&str> {
        let stem = file_name.strip_suffix(".jsonl")?;
        stem.split_once('-').map(|(name, _)| name)
    }
}

#[async_trait]
impl Collector for FileDropCollector {
    fn name(&self) -> &'static str {
        "file-drop"
    }

    async fn collect(&self) -> Result<Vec<IngestRequest>, CollectError> {
        if !self.incoming_dir.exists() {
            return Ok(Vec::new());
        }

        let entries = std::fs::read_dir(&self.incoming_dir)
            .map_err(|e| CollectError::Io(self.incoming_dir.clone(), e))?;

        let mut requests = Vec::new();
        for entry in entries {
            let Ok(entry) = entry else { continue };
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("jsonl") {
                continue;
            }
            let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else { continue };
            let Some(source_name) = Self::source_name(file_name) else {
                self.reject(&path);
                continue;
            };
            let Some(source) = self.sources.get(source_name) else {
                warn!(source = source_name, file = %path.display(), "no parser registered for dropped file");
                self.reject(&path);
                continue;
            };

            let body = match std::fs::read(&path) {
                Ok(body) => body,
                Err(e) => {
                    warn!(file = %path.display(), error = %e, "failed to read dropped file");
                    continue;
                }
            };

            match source.parse(&body, None) {
                Ok(parsed) => {
                    requests.extend(parsed);
                    let _ = std::fs::remove_file(&path);
                }
                Err(e) => {
                    warn!(file = %path.display(), error = %e, "failed to parse dropped file");
                    self.reject(&path);
                }
            }
        }

        Ok(requests)
    }
}

impl FileDropCollector {
    fn reject(&self, path: &std::path::Path) {
        if std::fs::create_dir_all(&self.rejected_dir).is_err() {
            return;
        }
        if let Some(name) = path.file_name() {
            let _ = std::fs::rename(path, self.rejected_dir.join(name));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn parses_and_consumes_well_formed_drop_file() {
        let dir = tempfile::tempdir().unwrap();
        let incoming = dir.path().join("incoming");
        std::fs::create_dir_all(&incoming).unwrap();
        std::fs::write(
            incoming.join("opencode-batch1.jsonl"),
            b"{\"event\":\"completion\",\"account_id\":\"a1\"}\n",
        )
        .unwrap();

        let collector = FileDropCollector::new(dir.path().to_path_buf(), Arc::new(SourceRegistry::builtin()));
        let requests = collector.collect().await.unwrap();
        assert_eq!(requests.len(), 1);
        assert!(!incoming.join("opencode-batch1.jsonl").exists());
    }

    #[tokio::test]
    async fn unknown_source_prefix_is_rejected_not_lost() {
        let dir = tempfile::tempdir().unwrap();
        let incoming = dir.path().join("incoming");
        std::fs::create_dir_all(&incoming).unwrap();
        std::fs::write(incoming.join("mystery-tool-batch1.jsonl"), b"{}\n").unwrap();

        let collector = FileDropCollector::new(dir.path().to_path_buf(), Arc::new(SourceRegistry::builtin()));
        let requests = collector.collect().await.unwrap();
        assert!(requests.is_empty());
        assert!(dir.path().join("rejected").join("mystery-tool-batch1.jsonl").exists());
    }

    #[tokio::test]
    async fn missing_incoming_dir_yields_empty_batch() {
        let dir = tempfile::tempdir().unwrap();
        let collector = FileDropCollector::new(dir.path().to_path_buf(), Arc::new(SourceRegistry::builtin()));
        assert!(collector.collect().await.unwrap().is_empty());
    }
}

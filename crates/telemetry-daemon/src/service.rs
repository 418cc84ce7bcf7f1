//! `DaemonService`: owns the store, the frozen source/provider registries,
//! the collector list, and the mutexes named in the spec's concurrency
//! section. The five long-running loops are methods here, spawned as
//! independent tasks by the binary.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use telemetry_core::{
    normalize_usage_snapshot_with_config, AccountConfig, IngestRequest, IngestTally,
    ReadModelRequest, SnapshotStatus, UsageSnapshot,
};
use telemetry_providers::ProviderRegistry;
use telemetry_sources::SourceRegistry;
use telemetry_store::Store;
use tokio::sync::Mutex as AsyncMutex;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::cache::ReadModelCache;
use crate::collector::Collector;
use crate::config::{AppConfig, DaemonConfig};
use crate::throttle::LogThrottle;

const COLLECT_BATCH_CAP: u64 = 2_000;
const SPOOL_MAINTENANCE_BATCH_CAP: u64 = 10_000;
const FLUSH_BATCH_SIZE: u64 = 10_000;
const PRUNE_ORPHAN_INTERVAL: Duration = Duration::from_secs(45);
const PRUNE_ORPHAN_BATCH: u64 = 10_000;
const PRUNE_ORPHAN_DEADLINE: Duration = Duration::from_secs(4);

const POLL_CYCLE_THROTTLE: Duration = Duration::from_secs(45);
const POLL_FETCH_DEADLINE: Duration = Duration::from_secs(8);
const POLL_INGEST_DEADLINE: Duration = Duration::from_secs(12);

const SPOOL_FLUSH_TICK: Duration = Duration::from_secs(5);
const SPOOL_PRUNE_TICK: Duration = Duration::from_secs(60);
const SPOOL_PRUNE_LOG_THROTTLE: Duration = Duration::from_secs(30 * 60);
pub const SPOOL_MAX_AGE: Duration = Duration::from_secs(96 * 3600);
pub const SPOOL_MAX_FILES: u64 = 25_000;
pub const SPOOL_MAX_BYTES: u64 = 768 * 1024 * 1024;

const RETENTION_TICK: Duration = Duration::from_secs(6 * 3600);
const RETENTION_PRUNE_DEADLINE: Duration = Duration::from_secs(30);
const RETENTION_ORPHAN_DEADLINE: Duration = Duration::from_secs(10);
const RETENTION_ORPHAN_BATCH: u64 = 50_000;

pub struct DaemonService {
    pub store: Arc<dyn Store>,
    pub sources: Arc<SourceRegistry>,
    pub providers: Arc<ProviderRegistry>,
    pub collectors: Vec<Arc<dyn Collector>>,
    pub cache: ReadModelCache,
    pub log_throttle: LogThrottle,
    pub config: DaemonConfig,

    pipeline_mu: AsyncMutex<()>,
    ingest_mu: AsyncMutex<()>,
}

impl DaemonService {
    pub fn new(
        store: Arc<dyn Store>,
        sources: Arc<SourceRegistry>,
        providers: Arc<ProviderRegistry>,
        collectors: Vec<Arc<dyn Collector>>,
        config: DaemonConfig,
    ) -> Self {
        Self {
            store,
            sources,
            providers,
            collectors,
            cache: ReadModelCache::new(),
            log_throttle: LogThrottle::new(),
            config,
            pipeline_mu: AsyncMutex::new(()),
            ingest_mu: AsyncMutex::new(()),
        }
    }

    fn app_config(&self) -> Result<AppConfig, crate::error::DaemonError> {
        AppConfig::load(&self.config.config_path)
    }

    /// Same as the internal config load, exposed for the HTTP read-model
    /// handler's config fallback.
    pub fn app_config_for_http(&self) -> Result<AppConfig, crate::error::DaemonError> {
        self.app_config()
    }

    /// Direct ingest under `ingest_mu`. Requests the store itself rejects
    /// are retried by enqueueing the whole batch into the spool.
    pub async fn ingest_direct(&self, requests: &[IngestRequest]) -> IngestTally {
        if requests.is_empty() {
            return IngestTally::default();
        }
        let _guard = self.ingest_mu.lock().await;
        match self.store.ingest_events(requests).await {
            Ok(tally) => tally,
            Err(e) => {
                warn!(error = %e, count = requests.len(), "direct ingest failed, spooling for retry");
                if let Err(e) = self.store.spool_enqueue(requests).await {
                    warn!(error = %e, "failed to spool failed ingest batch");
                }
                IngestTally { processed: requests.len() as u64, failed: requests.len() as u64, ..Default::default() }
            }
        }
    }

    /// Flush the spool in batches of up to `FLUSH_BATCH_SIZE`, optionally
    /// bounded by `total_cap`. Stops when a batch is empty or made no
    /// forward progress.
    pub async fn flush_pipeline(&self, total_cap: Option<u64>) -> IngestTally {
        let _pipeline_guard = self.pipeline_mu.lock().await;
        let _ingest_guard = self.ingest_mu.lock().await;

        let mut total = IngestTally::default();
        let mut remaining = total_cap;

        loop {
            let batch_size = match remaining {
                Some(0) => break,
                Some(cap) => FLUSH_BATCH_SIZE.min(cap),
                None => FLUSH_BATCH_SIZE,
            };

            let tally = match self.store.spool_flush(batch_size).await {
                Ok(tally) => tally,
                Err(e) => {
                    warn!(error = %e, "spool flush failed");
                    break;
                }
            };

            if let Some(cap) = remaining.as_mut() {
                *cap = cap.saturating_sub(tally.processed);
            }
            total.merge(tally);

            if tally.processed == 0 || (tally.ingested == 0 && tally.deduped == 0) {
                break;
            }
        }

        total
    }

    async fn prune_orphans_throttled(&self) {
        if !self.log_throttle.should_log("prune_orphan_raw_events", PRUNE_ORPHAN_INTERVAL) {
            return;
        }
        let result = tokio::time::timeout(
            PRUNE_ORPHAN_DEADLINE,
            self.store.prune_orphan_raw_events(PRUNE_ORPHAN_BATCH),
        )
        .await;
        match result {
            Ok(Ok(removed)) if removed > 0 => info!(removed, "pruned orphan raw events"),
            Ok(Ok(_)) => {}
            Ok(Err(e)) => warn!(error = %e, "prune_orphan_raw_events failed"),
            Err(_) => warn!("prune_orphan_raw_events timed out"),
        }
    }

    /// One collect-loop tick: gather from every collector, ingest directly,
    /// retry failures via the pipeline, flush the backlog, throttled prune.
    pub async fn collect_once(&self) {
        let mut batch = Vec::new();
        let mut warnings = Vec::new();
        for collector in &self.collectors {
            match collector.collect().await {
                Ok(events) => batch.extend(events),
                Err(e) => warnings.push(format!("{}: {e}", collector.name())),
            }
        }
        if !warnings.is_empty() {
            warn!(warnings = warnings.join("; "), "collector errors this cycle");
        }

        let tally = self.ingest_direct(&batch).await;
        let flush_tally = self.flush_pipeline(Some(COLLECT_BATCH_CAP)).await;
        info!(
            processed = tally.processed,
            ingested = tally.ingested,
            deduped = tally.deduped,
            failed = tally.failed,
            flushed = flush_tally.processed,
            "collect cycle complete"
        );

        self.prune_orphans_throttled().await;
    }

    pub async fn run_collect_loop(self: Arc<Self>, period: Duration, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = ticker.tick() => self.collect_once().await,
            }
        }
    }

    /// One poll-loop tick: resolve accounts, spawn a concurrent worker per
    /// account, normalize, ingest the whole map at once.
    pub async fn poll_once(self: &Arc<Self>) {
        let app_config = match self.app_config() {
            Ok(cfg) => Arc::new(cfg),
            Err(e) => {
                if self.log_throttle.should_log("poll_config_load_failed", POLL_CYCLE_THROTTLE) {
                    warn!(error = %e, "failed to load config for poll cycle");
                }
                return;
            }
        };

        let mut workers = tokio::task::JoinSet::new();
        for account in app_config.resolved_accounts() {
            let service = Arc::clone(self);
            let app_config = Arc::clone(&app_config);
            workers.spawn(async move { service.fetch_one(account, app_config.as_ref()).await });
        }

        let mut snapshots: HashMap<String, UsageSnapshot> = HashMap::new();
        while let Some(result) = workers.join_next().await {
            if let Ok(snap) = result {
                snapshots.insert(snap.account_id.clone(), snap);
            }
        }

        let had_error = snapshots.values().any(|s| s.status == SnapshotStatus::Error);
        let ingest_result = tokio::time::timeout(
            POLL_INGEST_DEADLINE,
            self.ingest_quota_snapshots(snapshots.clone()),
        )
        .await;

        let log_anyway = had_error || matches!(ingest_result, Err(_) | Ok(Err(_)));
        if log_anyway || self.log_throttle.should_log("poll_cycle", POLL_CYCLE_THROTTLE) {
            let ok = snapshots.values().filter(|s| s.status == SnapshotStatus::Ok).count();
            let errors = snapshots.values().filter(|s| s.status == SnapshotStatus::Error).count();
            info!(accounts = snapshots.len(), ok, errors, "poll_cycle");
        }
    }

    async fn fetch_one(&self, account: AccountConfig, app_config: &AppConfig) -> UsageSnapshot {
        let now = chrono::Utc::now();
        let snapshot = match self.providers.get(&account.provider_id) {
            None => UsageSnapshot::error(
                &account.id,
                &account.provider_id,
                now,
                "no provider adapter registered".to_string(),
            ),
            Some(provider) => {
                match tokio::time::timeout(POLL_FETCH_DEADLINE, provider.fetch(&account)).await {
                    Ok(Ok(snap)) => snap,
                    Ok(Err(e)) => UsageSnapshot::error(&account.id, &account.provider_id, now, e.to_string()),
                    Err(_) => UsageSnapshot::error(&account.id, &account.provider_id, now, "fetch timed out".to_string()),
                }
            }
        };
        normalize_usage_snapshot_with_config(snapshot, &app_config.model_normalization)
    }

    async fn ingest_quota_snapshots(&self, snapshots: HashMap<String, UsageSnapshot>) -> Result<(), telemetry_store::StoreError> {
        let _guard = self.ingest_mu.lock().await;
        self.store.ingest_quota_snapshots(snapshots).await
    }

    pub async fn run_poll_loop(self: Arc<Self>, period: Duration, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = ticker.tick() => self.poll_once().await,
            }
        }
    }

    pub async fn run_spool_maintenance_loop(self: Arc<Self>, cancel: CancellationToken) {
        let mut flush_ticker = tokio::time::interval(SPOOL_FLUSH_TICK);
        let mut prune_ticker = tokio::time::interval(SPOOL_PRUNE_TICK);
        flush_ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        prune_ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = flush_ticker.tick() => {
                    self.flush_pipeline(Some(SPOOL_MAINTENANCE_BATCH_CAP)).await;
                }
                _ = prune_ticker.tick() => self.prune_spool_directory(),
            }
        }
    }

    /// Enforces `{max_age, max_files, max_bytes}` over `spool_dir`, oldest
    /// files first. Logs a removal summary, or a steady-state "remaining"
    /// line throttled to once per 30 minutes.
    fn prune_spool_directory(&self) {
        let dir = &self.config.spool_dir;
        let Ok(read_dir) = std::fs::read_dir(dir) else { return };

        let mut files: Vec<(std::path::PathBuf, std::time::SystemTime, u64)> = Vec::new();
        for entry in read_dir.flatten() {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let Ok(meta) = entry.metadata() else { continue };
            let modified = meta.modified().unwrap_or(std::time::SystemTime::UNIX_EPOCH);
            files.push((path, modified, meta.len()));
        }
        files.sort_by_key(|(_, modified, _)| *modified);

        let now = std::time::SystemTime::now();
        let mut total_bytes: u64 = files.iter().map(|(_, _, size)| size).sum();
        let mut removed = 0u64;

        for (path, modified, size) in &files {
            let age = now.duration_since(*modified).unwrap_or_default();
            let over_count = (files.len() as u64).saturating_sub(removed) > SPOOL_MAX_FILES;
            let over_bytes = total_bytes > SPOOL_MAX_BYTES;
            if age > SPOOL_MAX_AGE || over_count || over_bytes {
                if std::fs::remove_file(path).is_ok() {
                    removed += 1;
                    total_bytes = total_bytes.saturating_sub(*size);
                }
            }
        }

        if removed > 0 {
            info!(removed, remaining = files.len() as u64 - removed, "pruned spool directory");
        } else if self.log_throttle.should_log("spool_prune_steady_state", SPOOL_PRUNE_LOG_THROTTLE) {
            info!(remaining = files.len(), "spool directory steady state");
        }
    }

    pub async fn run_retention_loop(self: Arc<Self>, cancel: CancellationToken) {
        self.retention_once().await;
        let mut ticker = tokio::time::interval(RETENTION_TICK);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        ticker.tick().await; // consume the immediate first tick, already ran above
        loop {
            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = ticker.tick() => self.retention_once().await,
            }
        }
    }

    async fn retention_once(&self) {
        let retention_days = self.app_config().map(|c| c.retention_days()).unwrap_or(30);

        let removed = match tokio::time::timeout(
            RETENTION_PRUNE_DEADLINE,
            self.store.prune_old_events(retention_days),
        )
        .await
        {
            Ok(Ok(removed)) => removed,
            Ok(Err(e)) => {
                warn!(error = %e, "prune_old_events failed");
                return;
            }
            Err(_) => {
                warn!("prune_old_events timed out");
                return;
            }
        };

        info!(removed, retention_days, "retention sweep complete");

        if removed > 0 {
            match tokio::time::timeout(
                RETENTION_ORPHAN_DEADLINE,
                self.store.prune_orphan_raw_events(RETENTION_ORPHAN_BATCH),
            )
            .await
            {
                Ok(Ok(removed)) => info!(removed, "retention orphan sweep complete"),
                Ok(Err(e)) => warn!(error = %e, "retention orphan sweep failed"),
                Err(_) => warn!("retention orphan sweep timed out"),
            }
        }
    }

    /// `max(5s, min(30s, PollInterval/2))`.
    pub fn read_model_cache_period(&self) -> Duration {
        let half_poll = self.config.poll_interval / 2;
        half_poll.clamp(Duration::from_secs(5), Duration::from_secs(30))
    }

    pub async fn run_read_model_cache_loop(self: Arc<Self>, cancel: CancellationToken) {
        let period = self.read_model_cache_period();
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = ticker.tick() => {
                    let req = self.app_config().map(|c| c.build_read_model_request()).unwrap_or_default();
                    self.refresh_read_model_cache_async(req);
                }
            }
        }
    }

    /// Single-flight async refresh: if a refresh for `key` is already
    /// running, this call is a no-op. Spawns its own task with a 60s
    /// timeout so callers (including HTTP handlers) never await it.
    pub fn refresh_read_model_cache_async(self: &Arc<Self>, req: ReadModelRequest) {
        if req.is_empty() {
            return;
        }
        let key = telemetry_core::read_model_request_key(&req);
        let this = Arc::clone(self);
        tokio::spawn(async move {
            if !this.cache.try_begin_refresh(&key).await {
                return;
            }
            let result = tokio::time::timeout(Duration::from_secs(60), this.store.compute_read_model(&req)).await;
            if let Ok(Ok(snapshots)) = result {
                let merged = telemetry_core::merge_read_model_snapshots(
                    &req,
                    &std::collections::HashSet::new(),
                    snapshots,
                );
                this.cache.store(key.clone(), merged).await;
            }
            this.cache.finish_refresh(&key).await;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap as StdHashMap;
    use telemetry_store::SqliteStore;

    async fn test_service() -> Arc<DaemonService> {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(SqliteStore::open_in_memory().await.unwrap());
        let config = DaemonConfig {
            state_dir: dir.path().to_path_buf(),
            db_path: dir.path().join("db.sqlite"),
            spool_dir: dir.path().join("spool"),
            socket_path: dir.path().join("daemon.sock"),
            config_path: dir.path().join("config.toml"),
            log_path: dir.path().join("daemon.log"),
            collect_interval: Duration::from_secs(20),
            poll_interval: Duration::from_secs(30),
            verbose: false,
        };
        Arc::new(DaemonService::new(
            store,
            Arc::new(SourceRegistry::builtin()),
            Arc::new(ProviderRegistry::builtin()),
            Vec::new(),
            config,
        ))
    }

    fn req(source: &str, account_id: &str, identity: &str) -> IngestRequest {
        IngestRequest {
            source: source.to_string(),
            account_id: Some(account_id.to_string()),
            identity: identity.to_string(),
            payload: serde_json::json!({}),
        }
    }

    #[tokio::test]
    async fn ingest_direct_dedups_and_tallies() {
        let service = test_service().await;
        let batch = vec![req("opencode", "a1", "id-1"), req("opencode", "a1", "id-1")];
        let tally = service.ingest_direct(&batch).await;
        assert_eq!(tally.processed, 2);
        assert_eq!(tally.ingested, 1);
        assert_eq!(tally.deduped, 1);
    }

    #[tokio::test]
    async fn flush_pipeline_drains_spooled_entries() {
        let service = test_service().await;
        service.store.spool_enqueue(&[req("opencode", "a1", "id-1")]).await.unwrap();
        let tally = service.flush_pipeline(None).await;
        assert_eq!(tally.ingested, 1);
    }

    #[tokio::test]
    async fn read_model_cache_period_is_clamped() {
        let mut service = Arc::into_inner(test_service().await).unwrap();
        service.config.poll_interval = Duration::from_secs(2);
        assert_eq!(service.read_model_cache_period(), Duration::from_secs(5));
        service.config.poll_interval = Duration::from_secs(120);
        assert_eq!(service.read_model_cache_period(), Duration::from_secs(30));
    }

    #[tokio::test]
    async fn poll_once_marks_missing_provider_as_error() {
        let service = test_service().await;
        std::fs::write(
            &service.config.config_path,
            r#"
            [[accounts]]
            id = "a1"
            provider_id = "nonexistent"
            auth = "oauth"
            "#,
        )
        .unwrap();
        service.poll_once().await;
        let req = telemetry_core::ReadModelRequest {
            accounts: vec![telemetry_core::ReadModelRequestEntry {
                account_id: "a1".to_string(),
                provider_id: "nonexistent".to_string(),
            }],
            provider_links: StdHashMap::new(),
        };
        let snaps = service.store.compute_read_model(&req).await.unwrap();
        assert_eq!(snaps["a1"].status, SnapshotStatus::Error);
    }
}

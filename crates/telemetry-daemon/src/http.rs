//! axum handlers for `GET /healthz`, `POST /v1/hook/<source>`, and
//! `POST /v1/read-model`, served over the Unix socket bound in
//! [`crate::socket`].

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use telemetry_core::{
    merge_read_model_snapshots, read_model_request_key, read_model_templates_from_request,
    HealthResponse, HookTally, ReadModelRequest, UsageSnapshot, API_VERSION,
};
use telemetry_store::Store;
use tracing::{info, warn};

use crate::service::DaemonService;

const HOOK_LOG_THROTTLE: Duration = Duration::from_secs(3);
const INLINE_COMPUTE_BUDGET: Duration = Duration::from_millis(500);

pub fn router(service: Arc<DaemonService>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/v1/hook/{source}", post(hook))
        .route("/v1/read-model", post(read_model))
        .with_state(service)
}

async fn healthz() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        daemon_version: env!("CARGO_PKG_VERSION").to_string(),
        api_version: API_VERSION.to_string(),
        integration_version: String::new(),
    })
}

#[derive(Debug, Deserialize)]
struct HookQuery {
    account_id: Option<String>,
}

async fn hook(
    State(service): State<Arc<DaemonService>>,
    Path(source): Path<String>,
    Query(query): Query<HookQuery>,
    body: axum::body::Bytes,
) -> Response {
    let Some(parser) = service.sources.get(&source) else {
        return (StatusCode::BAD_REQUEST, format!("unknown source: {source}")).into_response();
    };
    if body.is_empty() {
        return (StatusCode::BAD_REQUEST, "empty body").into_response();
    }

    let mut tally = HookTally { source: source.clone(), ..Default::default() };
    match parser.parse(&body, query.account_id.as_deref()) {
        Ok(requests) => {
            tally.enqueued = requests.len() as u64;
            let ingest_tally = service.ingest_direct(&requests).await;
            tally.processed = ingest_tally.processed;
            tally.ingested = ingest_tally.ingested;
            tally.deduped = ingest_tally.deduped;
            tally.failed = ingest_tally.failed;
        }
        Err(e) => {
            tally.failed = 1;
            tally.warnings.push(e.to_string());
        }
    }

    if tally.failed > 0 {
        warn!(source = %source, failed = tally.failed, "hook ingest had failures");
    } else if service.log_throttle.should_log("hook_ingest", HOOK_LOG_THROTTLE) {
        info!(source = %source, ingested = tally.ingested, deduped = tally.deduped, "hook ingest");
    }

    Json(tally).into_response()
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct ReadModelResponse {
    snapshots: HashMap<String, UsageSnapshot>,
}

async fn read_model(
    State(service): State<Arc<DaemonService>>,
    body: axum::body::Bytes,
) -> Response {
    let mut req: ReadModelRequest = if body.is_empty() {
        ReadModelRequest::default()
    } else {
        match serde_json::from_slice(&body) {
            Ok(req) => req,
            Err(e) => return (StatusCode::BAD_REQUEST, e.to_string()).into_response(),
        }
    };

    if req.is_empty() {
        req = match service.app_config_for_http() {
            Ok(cfg) => cfg.build_read_model_request(),
            Err(e) => {
                warn!(error = %e, "read-model: falling back config load failed");
                ReadModelRequest::default()
            }
        };
    }
    if req.is_empty() {
        return Json(ReadModelResponse::default()).into_response();
    }

    let key = read_model_request_key(&req);

    if let Some(entry) = service.cache.get(&key).await {
        if service.cache.is_stale(&entry).await {
            service.refresh_read_model_cache_async(req);
        }
        return Json(ReadModelResponse { snapshots: entry.snapshots }).into_response();
    }

    if let Ok(Ok(snapshots)) =
        tokio::time::timeout(INLINE_COMPUTE_BUDGET, service.store.compute_read_model(&req)).await
    {
        if !snapshots.is_empty() {
            let merged = merge_read_model_snapshots(&req, &std::collections::HashSet::new(), snapshots);
            service.cache.store(key.clone(), merged.clone()).await;
            return Json(ReadModelResponse { snapshots: merged }).into_response();
        }
    }

    service.refresh_read_model_cache_async(req.clone());
    let templates = read_model_templates_from_request(&req, &std::collections::HashSet::new());
    Json(ReadModelResponse { snapshots: templates }).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::Collector;
    use crate::config::DaemonConfig;
    use telemetry_core::{ReadModelRequestEntry, UsageSnapshot};
    use telemetry_providers::ProviderRegistry;
    use telemetry_sources::SourceRegistry;
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
            Vec::<Arc<dyn Collector>>::new(),
            config,
        ))
    }

    async fn response_snapshots(resp: Response) -> HashMap<String, UsageSnapshot> {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let parsed: ReadModelResponse = serde_json::from_slice(&bytes).unwrap();
        parsed.snapshots
    }

    #[tokio::test]
    async fn read_model_fills_templates_for_accounts_missing_from_the_store() {
        let service = test_service().await;
        let mut stored = HashMap::new();
        stored.insert(
            "a1".to_string(),
            UsageSnapshot::error("a1", "claude", chrono::Utc::now(), "boom".into()),
        );
        service.store.ingest_quota_snapshots(stored).await.unwrap();

        let req = ReadModelRequest {
            accounts: vec![
                ReadModelRequestEntry { account_id: "a1".to_string(), provider_id: "claude".to_string() },
                ReadModelRequestEntry { account_id: "a2".to_string(), provider_id: "gpt".to_string() },
            ],
            provider_links: HashMap::new(),
        };
        let body = axum::body::Bytes::from(serde_json::to_vec(&req).unwrap());

        let resp = read_model(State(service), body).await;
        let snapshots = response_snapshots(resp).await;

        assert_eq!(snapshots.len(), 2, "every requested account_id must appear in the reply");
        assert!(snapshots.contains_key("a2"), "a2 has no stored data but still gets a template");
        assert_eq!(snapshots["a1"].status, telemetry_core::SnapshotStatus::Error);
    }

    #[tokio::test]
    async fn read_model_empty_request_falls_back_to_config() {
        let service = test_service().await;
        let resp = read_model(State(service), axum::body::Bytes::new()).await;
        let snapshots = response_snapshots(resp).await;
        assert!(snapshots.is_empty());
    }
}

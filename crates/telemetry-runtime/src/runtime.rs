use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use telemetry_client::{ensure_running, Client};
use telemetry_core::{classify_ensure_error, read_model_templates_from_request, DaemonState, ReadModelRequest, UsageSnapshot};
use tokio::sync::RwLock;
use tracing::warn;

const ENSURE_THROTTLE: Duration = Duration::from_millis(1200);
const ENSURE_DEADLINE: Duration = Duration::from_secs(6);
const READ_MODEL_DEADLINE: Duration = Duration::from_secs(5);
const ERR_LOG_THROTTLE: Duration = Duration::from_secs(2);

/// Client-side singleton: owns the `Client`, throttles ensure attempts, and
/// exposes the last-observed [`DaemonState`]. Lives for the UI process.
pub struct ViewRuntime {
    socket_path: PathBuf,
    exe_path: PathBuf,
    state_dir: PathBuf,
    own_version: String,

    client: RwLock<Option<Arc<Client>>>,
    ensure_lock: tokio::sync::Mutex<()>,
    last_ensure_attempt: Mutex<Option<Instant>>,
    last_read_model_err_log: Mutex<Option<Instant>>,
    state: Mutex<DaemonState>,
}

impl ViewRuntime {
    pub fn new(socket_path: PathBuf, exe_path: PathBuf, state_dir: PathBuf, own_version: impl Into<String>) -> Self {
        Self {
            socket_path,
            exe_path,
            state_dir,
            own_version: own_version.into(),
            client: RwLock::new(None),
            ensure_lock: tokio::sync::Mutex::new(()),
            last_ensure_attempt: Mutex::new(None),
            last_read_model_err_log: Mutex::new(None),
            state: Mutex::new(DaemonState::default()),
        }
    }

    pub fn state(&self) -> DaemonState {
        self.state.lock().clone()
    }

    fn set_state(&self, state: DaemonState) {
        *self.state.lock() = state;
    }

    /// Clears the ensure throttle and drops the cached client. Called by the
    /// UI after a user-initiated install action so the next tick retries
    /// immediately instead of waiting out the throttle.
    pub async fn reset_ensure_throttle(&self) {
        *self.last_ensure_attempt.lock() = None;
        *self.client.write().await = None;
    }

    /// Returns a client, ensuring the daemon is installed and running if it
    /// isn't already known to be reachable. Returns `None` if throttled or
    /// if ensuring failed (in which case `state()` carries the reason).
    pub async fn ensure_client(&self) -> Option<Arc<Client>> {
        if let Some(client) = self.client.read().await.clone() {
            return Some(client);
        }

        let _guard = self.ensure_lock.lock().await;
        // Another task may have ensured while we waited for the lock.
        if let Some(client) = self.client.read().await.clone() {
            return Some(client);
        }

        {
            let mut last = self.last_ensure_attempt.lock();
            if let Some(at) = *last {
                if at.elapsed() < ENSURE_THROTTLE {
                    return None;
                }
            }
            *last = Some(Instant::now());
        }

        let result = tokio::time::timeout(
            ENSURE_DEADLINE,
            ensure_running(
                self.socket_path.clone(),
                self.exe_path.clone(),
                self.state_dir.clone(),
                &self.own_version,
            ),
        )
        .await;

        match result {
            Ok(Ok(client)) => {
                let client = Arc::new(client);
                *self.client.write().await = Some(client.clone());
                self.set_state(DaemonState::running());
                Some(client)
            }
            Ok(Err(err)) => {
                let install_hint = match &err {
                    telemetry_client::ClientError::NotInstalled { install_hint } => Some(install_hint.clone()),
                    _ => None,
                };
                self.set_state(classify_ensure_error(Some(&err.to_string()), install_hint));
                None
            }
            Err(_) => {
                self.set_state(classify_ensure_error(Some("ensure timed out"), None));
                None
            }
        }
    }

    /// Get-or-ensure a client, call `ReadModel({})`, and on error drop the
    /// client and retry once via a fresh ensure. Logs failures throttled to
    /// roughly one line every 2s.
    pub async fn read_with_fallback(&self) -> Option<std::collections::HashMap<String, UsageSnapshot>> {
        let Some(client) = self.ensure_client().await else {
            return None;
        };

        let request = ReadModelRequest::default();
        if let Ok(Ok(resp)) = tokio::time::timeout(READ_MODEL_DEADLINE, client.read_model(&request)).await {
            self.set_state(DaemonState::running());
            return Some(resp.snapshots);
        }

        *self.client.write().await = None;
        let Some(retry_client) = self.ensure_client().await else {
            self.log_read_model_failure("no client after ensure retry");
            return None;
        };

        match tokio::time::timeout(READ_MODEL_DEADLINE, retry_client.read_model(&request)).await {
            Ok(Ok(resp)) => {
                self.set_state(DaemonState::running());
                Some(resp.snapshots)
            }
            Ok(Err(err)) => {
                self.log_read_model_failure(&err.to_string());
                self.set_state(DaemonState::error(err.to_string()));
                None
            }
            Err(_) => {
                self.log_read_model_failure("read-model retry timed out");
                self.set_state(DaemonState::error("read-model retry timed out"));
                None
            }
        }
    }

    fn log_read_model_failure(&self, message: &str) {
        let mut last = self.last_read_model_err_log.lock();
        let should_log = last.map(|at| at.elapsed() >= ERR_LOG_THROTTLE).unwrap_or(true);
        if should_log {
            warn!(error = message, "read-model request failed");
            *last = Some(Instant::now());
        }
    }
}

/// Template snapshots for every disabled-free account in `req`, used by the
/// broadcaster's warm-up phase before the daemon has real data.
pub fn seed_templates(req: &ReadModelRequest) -> std::collections::HashMap<String, UsageSnapshot> {
    read_model_templates_from_request(req, &std::collections::HashSet::new())
}

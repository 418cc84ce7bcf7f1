//! Two layers of configuration: [`DaemonConfig`] (process-level paths and
//! loop intervals, resolved once at startup) and [`AppConfig`] (the on-disk
//! account/dashboard/retention settings, reloaded every poll and
//! cache-refresh cycle per spec).

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use telemetry_core::{
    build_read_model_request, filter_accounts_by_dashboard, AccountConfig, DashboardPreference,
    ModelNormalizationConfig, ReadModelRequest,
};

use crate::error::DaemonError;

const DEFAULT_COLLECT_INTERVAL: Duration = Duration::from_secs(20);
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);
const DEFAULT_RETENTION_DAYS: u32 = 30;

/// Process-level configuration resolved once at daemon startup.
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    pub state_dir: PathBuf,
    pub db_path: PathBuf,
    pub spool_dir: PathBuf,
    pub socket_path: PathBuf,
    pub config_path: PathBuf,
    pub log_path: PathBuf,
    pub collect_interval: Duration,
    pub poll_interval: Duration,
    pub verbose: bool,
}

impl DaemonConfig {
    /// Resolve platform defaults under `~/.local/state/telemetry/…`
    /// (or `$XDG_STATE_HOME/telemetry/…`), honoring env var overrides for
    /// paths that tests or an advanced user might want to pin down.
    pub fn load() -> Result<Self, DaemonError> {
        Self::load_with_socket_path_override(None)
    }

    /// Like [`Self::load`], but `socket_path_override` (when set) wins over
    /// both the state-dir-derived default and `TELEMETRY_SOCKET_PATH`. The
    /// service unit invokes the daemon with an explicit `--socket-path`
    /// argument, which is threaded through to here.
    pub fn load_with_socket_path_override(socket_path_override: Option<PathBuf>) -> Result<Self, DaemonError> {
        let state_dir = state_dir()?;
        let socket_path = socket_path_override
            .or_else(|| std::env::var("TELEMETRY_SOCKET_PATH").ok().map(PathBuf::from))
            .unwrap_or_else(|| state_dir.join("daemon.sock"));
        Ok(Self {
            db_path: state_dir.join("telemetry.db"),
            spool_dir: state_dir.join("spool"),
            socket_path,
            config_path: state_dir.join("config.toml"),
            log_path: state_dir.join("daemon.log"),
            collect_interval: DEFAULT_COLLECT_INTERVAL,
            poll_interval: DEFAULT_POLL_INTERVAL,
            verbose: std::env::var("TELEMETRY_VERBOSE").is_ok(),
            state_dir,
        })
    }
}

fn state_dir() -> Result<PathBuf, DaemonError> {
    if let Ok(dir) = std::env::var("TELEMETRY_STATE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    dirs::state_dir()
        .or_else(dirs::data_local_dir)
        .map(|dir| dir.join("telemetry"))
        .ok_or(DaemonError::NoStateDir)
}

/// `data.retention_days` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self { retention_days: default_retention_days() }
    }
}

fn default_retention_days() -> u32 {
    DEFAULT_RETENTION_DAYS
}

/// `telemetry.provider_links` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TelemetryConfig {
    #[serde(default)]
    pub provider_links: HashMap<String, String>,
}

/// On-disk account/dashboard/retention settings, read-only from the daemon's
/// point of view and reloaded every poll and cache-refresh cycle.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub accounts: Vec<AccountConfig>,
    #[serde(default)]
    pub auto_detect: bool,
    #[serde(default)]
    pub auto_detected_accounts: Vec<AccountConfig>,
    #[serde(default)]
    pub dashboard: Vec<DashboardPreference>,
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    #[serde(default)]
    pub model_normalization: ModelNormalizationConfig,
}

impl AppConfig {
    /// Load from `path`. A missing file is not an error — a fresh
    /// installation has no accounts configured yet — but a malformed file
    /// is, since the caller throttled-logs that condition and skips the
    /// cycle rather than silently running with zero accounts.
    pub fn load(path: &std::path::Path) -> Result<Self, DaemonError> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(DaemonError::Io(e)),
        };
        toml::from_str(&text).map_err(|e| DaemonError::Config(e.to_string()))
    }

    /// Steps 1–2 of account resolution: merge manual + auto-detected
    /// (manual always wins on id collision), then apply dashboard
    /// enable/disable. Keeps full `AccountConfig` (including secrets), used
    /// by the poll loop to actually call providers.
    pub fn resolved_accounts(&self) -> Vec<AccountConfig> {
        let mut merged = self.accounts.clone();
        if self.auto_detect {
            let known: std::collections::HashSet<&str> =
                merged.iter().map(|a| a.id.as_str()).collect();
            for candidate in &self.auto_detected_accounts {
                if !known.contains(candidate.id.as_str()) {
                    merged.push(candidate.clone());
                }
            }
        }
        filter_accounts_by_dashboard(merged, &self.dashboard)
    }

    /// Steps 1–5 of account resolution: [`Self::resolved_accounts`] plus
    /// dedup/normalize into a [`ReadModelRequest`].
    pub fn build_read_model_request(&self) -> ReadModelRequest {
        build_read_model_request(&self.resolved_accounts(), self.telemetry.provider_links.clone())
    }

    pub fn retention_days(&self) -> u32 {
        self.data.retention_days
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn acct(id: &str) -> AccountConfig {
        AccountConfig {
            id: id.to_string(),
            provider_id: "demo".to_string(),
            auth: "oauth".to_string(),
            secrets: HashMap::new(),
        }
    }

    #[test]
    fn missing_file_yields_default_config() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = AppConfig::load(&dir.path().join("config.toml")).unwrap();
        assert!(cfg.accounts.is_empty());
        assert_eq!(cfg.retention_days(), DEFAULT_RETENTION_DAYS);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "accounts = [this is not toml").unwrap();
        assert!(AppConfig::load(&path).is_err());
    }

    #[test]
    fn auto_detected_accounts_never_override_manual_ids() {
        let mut manual = acct("a1");
        manual.provider_id = "claude".to_string();
        let mut auto = acct("a1");
        auto.provider_id = "should-not-win".to_string();

        let cfg = AppConfig {
            accounts: vec![manual],
            auto_detect: true,
            auto_detected_accounts: vec![auto, acct("a2")],
            ..AppConfig::default()
        };

        let req = cfg.build_read_model_request();
        assert_eq!(req.accounts.len(), 2);
        assert_eq!(req.accounts[0].provider_id, "claude");
    }

    #[test]
    fn dashboard_disabled_accounts_are_excluded() {
        let cfg = AppConfig {
            accounts: vec![acct("a1"), acct("a2")],
            dashboard: vec![DashboardPreference { account_id: "a2".into(), enabled: false }],
            ..AppConfig::default()
        };
        let req = cfg.build_read_model_request();
        assert_eq!(req.accounts.len(), 1);
        assert_eq!(req.accounts[0].account_id, "a1");
    }
}

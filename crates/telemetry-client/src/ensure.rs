use std::path::PathBuf;
use std::time::Instant;

use telemetry_core::health_current;
use telemetry_service::{Platform, ServiceError, ServiceManager};
use tracing::{debug, info, warn};

use crate::client::Client;
use crate::constants::{ENSURE_BUDGET, HEALTH_FAST_PROBE_TIMEOUT, HEALTH_POLL_INTERVAL, HEALTH_POLL_TIMEOUT, HEALTH_STARTUP_BUDGET};
use crate::diagnostics::startup_diagnostics;
use crate::error::ClientError;

/// Connects to a running, current-version daemon — installing and starting
/// it as a user service first if necessary. See [`crate::ensure::EnsureOutcome`]
/// for what callers can inspect after a successful ensure.
pub async fn ensure_running(
    socket_path: PathBuf,
    exe_path: PathBuf,
    state_dir: PathBuf,
    own_version: &str,
) -> Result<Client, ClientError> {
    let client = Client::new(socket_path.clone());

    let probe = tokio::time::timeout(HEALTH_FAST_PROBE_TIMEOUT, client.health()).await;
    // `needs_upgrade` distinguishes "reachable but stale" from "unreachable";
    // only the former can justify a reinstall on an otherwise-healthy host.
    let needs_upgrade = match probe {
        Ok(Ok(ref health)) if health_current(health, own_version) => return Ok(client),
        Ok(Ok(_)) => true,
        _ => false,
    };

    let manager = ServiceManager::new(exe_path, socket_path.clone(), state_dir);

    if needs_upgrade && !manager.is_supported() {
        warn!(platform = manager.platform().name(), "daemon needs upgrade but platform has no managed service");
        return Err(ClientError::Outdated {
            running: "unknown".to_string(),
            expected: own_version.to_string(),
        });
    }

    if !manager.is_supported() {
        // Ad-hoc process-spawn fallback is intentionally not implemented;
        // unsupported platforms report this explicitly instead of guessing
        // at a spawn strategy that has no managed lifecycle behind it.
        return Err(ClientError::Unsupported(manager.platform().name().to_string()));
    }

    if needs_upgrade {
        info!(platform = manager.platform().name(), "installing newer daemon service");
        manager.install().map_err(service_err)?;
    } else if !manager.is_installed() {
        return Err(ClientError::NotInstalled {
            install_hint: manager.install_hint(),
        });
    }

    debug!(socket = %socket_path.display(), "starting daemon service");
    manager.start().map_err(service_err)?;

    wait_for_health(&client, &manager, &socket_path).await?;

    let health = tokio::time::timeout(HEALTH_POLL_TIMEOUT, client.health())
        .await
        .map_err(|_| ClientError::Timeout(HEALTH_POLL_TIMEOUT))??;
    if !health_current(&health, own_version) {
        return Err(ClientError::Outdated {
            running: health.daemon_version,
            expected: own_version.to_string(),
        });
    }

    Ok(client)
}

async fn wait_for_health(client: &Client, manager: &ServiceManager, socket_path: &std::path::Path) -> Result<(), ClientError> {
    let deadline = Instant::now() + HEALTH_STARTUP_BUDGET;
    loop {
        match tokio::time::timeout(HEALTH_POLL_TIMEOUT, client.health()).await {
            Ok(Ok(_)) => return Ok(()),
            _ if Instant::now() >= deadline => {
                let diagnostics = startup_diagnostics(socket_path, manager);
                return Err(ClientError::Other(format!(
                    "daemon did not become healthy within {HEALTH_STARTUP_BUDGET:?}\n{diagnostics}"
                )));
            }
            _ => tokio::time::sleep(HEALTH_POLL_INTERVAL).await,
        }
    }
}

fn service_err(err: ServiceError) -> ClientError {
    ClientError::Other(err.to_string())
}

/// Budget a caller should leave for a single `ensure_running` attempt before
/// giving up and surfacing an error to the user.
pub const fn ensure_budget() -> std::time::Duration {
    ENSURE_BUDGET
}

pub fn is_supported_platform(platform: Platform) -> bool {
    platform != Platform::Unsupported
}

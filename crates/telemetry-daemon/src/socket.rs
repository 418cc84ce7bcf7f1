//! Unix socket lifecycle: stale-socket detection, dial-first liveness
//! check, bind, and permission tightening.

use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::time::Duration;

use tokio::net::{UnixListener, UnixStream};
use tracing::{info, warn};

use crate::error::DaemonError;

const DIAL_PROBE_TIMEOUT: Duration = Duration::from_millis(450);
const SOCKET_MODE: u32 = 0o660;

/// Bind the daemon's listening socket, refusing to start if another daemon
/// already holds it and clearing a stale socket file left by a crash.
pub async fn bind(path: &Path) -> Result<UnixListener, DaemonError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if path.exists() {
        let metadata = std::fs::symlink_metadata(path)?;
        if !is_socket(&metadata) {
            return Err(DaemonError::NotASocket(path.to_path_buf()));
        }

        match tokio::time::timeout(DIAL_PROBE_TIMEOUT, UnixStream::connect(path)).await {
            Ok(Ok(_)) => return Err(DaemonError::AlreadyRunning(path.to_path_buf())),
            _ => {
                warn!(path = %path.display(), "removing stale socket file");
                std::fs::remove_file(path)?;
            }
        }
    }

    let listener =
        UnixListener::bind(path).map_err(|e| DaemonError::BindFailed(path.to_path_buf(), e))?;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(SOCKET_MODE))?;
    info!(path = %path.display(), "listening on unix socket");
    Ok(listener)
}

/// Best-effort removal on shutdown; never fails the shutdown path.
pub fn remove(path: &Path) {
    if path.exists() {
        if let Err(e) = std::fs::remove_file(path) {
            warn!(path = %path.display(), error = %e, "failed to remove socket file");
        }
    }
}

#[cfg(unix)]
fn is_socket(metadata: &std::fs::Metadata) -> bool {
    use std::os::unix::fs::FileTypeExt;
    metadata.file_type().is_socket()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn non_socket_path_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("daemon.sock");
        std::fs::write(&path, b"not a socket").unwrap();
        let err = bind(&path).await.unwrap_err();
        assert!(matches!(err, DaemonError::NotASocket(_)));
    }

    #[tokio::test]
    async fn stale_socket_is_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("daemon.sock");
        {
            let _listener = UnixListener::bind(&path).unwrap();
        }
        // listener dropped, socket file left behind with nothing listening
        assert!(path.exists());
        let listener = bind(&path).await.unwrap();
        drop(listener);
    }

    #[tokio::test]
    async fn live_socket_refuses_second_bind() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("daemon.sock");
        let _listener = bind(&path).await.unwrap();
        let err = bind(&path).await.unwrap_err();
        assert!(matches!(err, DaemonError::AlreadyRunning(_)));
    }
}

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("could not determine state directory")]
    NoStateDir,

    #[error("failed to bind socket at {0}: {1}")]
    BindFailed(PathBuf, #[source] std::io::Error),

    #[error("a daemon is already listening on {0}")]
    AlreadyRunning(PathBuf),

    #[error("{0} exists and is not a socket")]
    NotASocket(PathBuf),

    #[error("store error: {0}")]
    Store(#[from] telemetry_store::StoreError),

    #[error("config error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

use std::fs;
use std::path::{Path, PathBuf};

use crate::command::{never_ignore, run_checked};
use crate::error::ServiceError;

pub(crate) const UNIT_NAME: &str = "telemetry-daemon.service";

pub(crate) fn unit_path(config_dir: &Path) -> PathBuf {
    config_dir.join("systemd/user").join(UNIT_NAME)
}

fn unit_contents(exe_path: &Path, socket_path: &Path, state_dir: &Path) -> String {
    format!(
        "[Unit]\nDescription=Telemetry usage daemon\n\n[Service]\nType=simple\nEnvironment=TELEMETRY_STATE_DIR={state_dir}\nExecStart={exe} daemon --socket-path {socket}\nRestart=always\nRestartSec=2\n\n[Install]\nWantedBy=default.target\n",
        exe = exe_path.display(),
        socket = socket_path.display(),
        state_dir = state_dir.display(),
    )
}

pub(crate) fn install(unit_path: &Path, exe_path: &Path, socket_path: &Path, state_dir: &Path) -> Result<(), ServiceError> {
    if let Some(parent) = unit_path.parent() {
        fs::create_dir_all(parent).map_err(|source| ServiceError::Io {
            command: format!("mkdir -p {}", parent.display()),
            source,
        })?;
    }
    fs::write(unit_path, unit_contents(exe_path, socket_path, state_dir)).map_err(|source| ServiceError::Io {
        command: format!("write {}", unit_path.display()),
        source,
    })?;

    run_checked("systemctl", &["--user", "daemon-reload"], never_ignore)?;
    run_checked("systemctl", &["--user", "enable", "--now", UNIT_NAME], never_ignore)
}

pub(crate) fn uninstall(unit_path: &Path) -> Result<(), ServiceError> {
    let ignorable = |stderr: &str| stderr.contains("not loaded") || stderr.contains("does not exist");
    let _ = run_checked("systemctl", &["--user", "disable", "--now", UNIT_NAME], ignorable);
    if unit_path.exists() {
        fs::remove_file(unit_path).map_err(|source| ServiceError::Io {
            command: format!("rm {}", unit_path.display()),
            source,
        })?;
    }
    run_checked("systemctl", &["--user", "daemon-reload"], never_ignore)
}

pub(crate) fn start() -> Result<(), ServiceError> {
    run_checked("systemctl", &["--user", "start", UNIT_NAME], never_ignore)
}

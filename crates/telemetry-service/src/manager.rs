use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::error::ServiceError;
use crate::platform::Platform;
use crate::transient::is_transient_exe_path;
use crate::{darwin, linux};

/// Installs, starts, and reports on the daemon as a per-user system service.
/// Holds no runtime handles: every method is a pure wrapper over platform
/// commands and can be exercised in isolation with an arbitrary `exe_path`.
pub struct ServiceManager {
    exe_path: PathBuf,
    socket_path: PathBuf,
    state_dir: PathBuf,
    unit_path: PathBuf,
    platform: Platform,
}

impl ServiceManager {
    pub fn new(exe_path: impl Into<PathBuf>, socket_path: impl Into<PathBuf>, state_dir: impl Into<PathBuf>) -> Self {
        Self::with_platform(exe_path, socket_path, state_dir, Platform::current())
    }

    /// Like [`Self::new`] but with an explicit platform, so behavior for a
    /// platform other than the host's can be exercised in tests.
    pub fn with_platform(
        exe_path: impl Into<PathBuf>,
        socket_path: impl Into<PathBuf>,
        state_dir: impl Into<PathBuf>,
        platform: Platform,
    ) -> Self {
        let unit_path = default_unit_path(platform);
        Self {
            exe_path: exe_path.into(),
            socket_path: socket_path.into(),
            state_dir: state_dir.into(),
            unit_path,
            platform,
        }
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn unit_path(&self) -> &Path {
        &self.unit_path
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    pub fn is_supported(&self) -> bool {
        self.platform != Platform::Unsupported
    }

    pub fn is_installed(&self) -> bool {
        self.unit_path.exists()
    }

    pub fn install(&self) -> Result<(), ServiceError> {
        let exe_display = self.exe_path.to_string_lossy().to_string();
        if is_transient_exe_path(&exe_display) {
            warn!(exe = %exe_display, "refusing to install a transient executable path");
            return Err(ServiceError::TransientExecutable(exe_display));
        }
        info!(platform = self.platform.name(), unit = %self.unit_path.display(), "installing daemon service");
        match self.platform {
            Platform::Darwin => darwin::install(
                &self.unit_path,
                &self.exe_path,
                &self.socket_path,
                &self.state_dir,
                &self.stdout_log_path(),
                &self.stderr_log_path(),
            ),
            Platform::Linux => linux::install(&self.unit_path, &self.exe_path, &self.socket_path, &self.state_dir),
            Platform::Unsupported => Err(ServiceError::Unsupported(std::env::consts::OS.to_string())),
        }
    }

    pub fn uninstall(&self) -> Result<(), ServiceError> {
        info!(platform = self.platform.name(), unit = %self.unit_path.display(), "uninstalling daemon service");
        match self.platform {
            Platform::Darwin => darwin::uninstall(&self.unit_path),
            Platform::Linux => linux::uninstall(&self.unit_path),
            Platform::Unsupported => Err(ServiceError::Unsupported(std::env::consts::OS.to_string())),
        }
    }

    pub fn start(&self) -> Result<(), ServiceError> {
        if !self.is_installed() {
            return Err(ServiceError::NotInstalled);
        }
        match self.platform {
            Platform::Darwin => darwin::start(),
            Platform::Linux => linux::start(),
            Platform::Unsupported => Err(ServiceError::Unsupported(std::env::consts::OS.to_string())),
        }
    }

    pub fn status_hint(&self) -> String {
        match self.platform {
            Platform::Darwin => "run `launchctl print gui/$(id -u)/com.telemetry.daemon` for status".to_string(),
            Platform::Linux => "run `systemctl --user status telemetry-daemon.service` for status".to_string(),
            Platform::Unsupported => "no managed service on this platform".to_string(),
        }
    }

    pub fn install_hint(&self) -> String {
        match self.platform {
            Platform::Darwin | Platform::Linux => {
                "run `telemetry daemon install` to register the background service".to_string()
            }
            Platform::Unsupported => {
                format!("{} has no managed service integration; run the daemon manually", std::env::consts::OS)
            }
        }
    }

    pub fn stdout_log_path(&self) -> PathBuf {
        self.state_dir.join("logs").join("daemon.stdout.log")
    }

    pub fn stderr_log_path(&self) -> PathBuf {
        self.state_dir.join("logs").join("daemon.stderr.log")
    }
}

fn default_unit_path(platform: Platform) -> PathBuf {
    match platform {
        Platform::Darwin => {
            let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
            darwin::plist_path(&home)
        }
        Platform::Linux => {
            let config_dir = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
            linux::unit_path(&config_dir)
        }
        Platform::Unsupported => PathBuf::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn install_refuses_transient_exe_path_without_touching_the_platform() {
        let manager = ServiceManager::with_platform(
            "/tmp/go-build998877/b001/exe/telemetryd",
            "/tmp/telemetry.sock",
            "/tmp/telemetry-state",
            Platform::Linux,
        );
        let err = manager.install().unwrap_err();
        assert!(matches!(err, ServiceError::TransientExecutable(_)));
    }

    #[test]
    fn unsupported_platform_reports_not_supported() {
        let manager = ServiceManager::with_platform("/usr/local/bin/telemetryd", "/tmp/x.sock", "/tmp/state", Platform::Unsupported);
        assert!(!manager.is_supported());
        let err = manager.install().unwrap_err();
        assert!(matches!(err, ServiceError::Unsupported(_)));
    }

    #[test]
    fn start_without_install_fails_fast() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ServiceManager::with_platform(
            "/usr/local/bin/telemetryd",
            "/tmp/x.sock",
            dir.path(),
            Platform::Linux,
        );
        let err = manager.start().unwrap_err();
        assert!(matches!(err, ServiceError::NotInstalled));
    }
}

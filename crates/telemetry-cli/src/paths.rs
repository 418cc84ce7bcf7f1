//! State directory and well-known path resolution, shared by every
//! subcommand. Mirrors `telemetry_daemon::config::DaemonConfig::load`'s
//! resolution rules exactly (same env var, same `dirs` fallback chain) so
//! the CLI and the daemon always agree on where things live without the
//! CLI depending on the (much heavier) daemon crate.

use std::path::PathBuf;

use anyhow::{anyhow, Result};

pub struct Paths {
    pub state_dir: PathBuf,
    pub socket_path: PathBuf,
    pub config_path: PathBuf,
    pub log_path: PathBuf,
}

impl Paths {
    pub fn resolve() -> Result<Self> {
        let state_dir = state_dir()?;
        Ok(Self {
            socket_path: state_dir.join("daemon.sock"),
            config_path: state_dir.join("config.toml"),
            log_path: state_dir.join("daemon.log"),
            state_dir,
        })
    }
}

fn state_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("TELEMETRY_STATE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    dirs::state_dir()
        .or_else(dirs::data_local_dir)
        .map(|dir| dir.join("telemetry"))
        .ok_or_else(|| anyhow!("could not determine a state directory for this platform"))
}

/// Locate the `telemetryd` binary next to the current executable, falling
/// back to a `CARGO_MANIFEST_DIR`-relative debug build when running from a
/// `cargo run` checkout, then finally to a bare `PATH` lookup.
pub fn find_daemon_binary() -> PathBuf {
    let current_exe = std::env::current_exe().ok();

    let is_debug_build = current_exe
        .as_ref()
        .and_then(|p| p.to_str())
        .map(|s| s.contains("target/debug"))
        .unwrap_or(false);

    if is_debug_build {
        if let Ok(manifest_dir) = std::env::var("CARGO_MANIFEST_DIR") {
            let dev_path = PathBuf::from(manifest_dir)
                .parent()
                .and_then(|p| p.parent())
                .map(|p| p.join("target/debug/telemetryd"));
            if let Some(path) = dev_path {
                if path.exists() {
                    return path;
                }
            }
        }
    }

    if let Some(exe) = current_exe {
        if let Some(dir) = exe.parent() {
            let sibling = dir.join("telemetryd");
            if sibling.exists() {
                return sibling;
            }
        }
    }

    PathBuf::from("telemetryd")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn state_dir_honors_env_override() {
        let dir = tempfile::tempdir().unwrap();
        std::env::set_var("TELEMETRY_STATE_DIR", dir.path());
        let paths = Paths::resolve().unwrap();
        std::env::remove_var("TELEMETRY_STATE_DIR");

        assert_eq!(paths.state_dir, dir.path());
        assert_eq!(paths.socket_path, dir.path().join("daemon.sock"));
        assert_eq!(paths.config_path, dir.path().join("config.toml"));
    }

    #[test]
    fn missing_sibling_binary_falls_back_to_path_lookup() {
        // Without a matching on-disk sibling, the PATH-relative name is returned.
        let found = find_daemon_binary();
        assert!(found == PathBuf::from("telemetryd") || found.ends_with("telemetryd"));
    }
}

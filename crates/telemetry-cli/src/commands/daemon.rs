//! `telemetry daemon` - runs the background worker in the foreground (what
//! the installed service unit execs), or manages that unit's lifecycle.

use std::path::PathBuf;
use std::process::Command;

use anyhow::{anyhow, Result};
use clap::{Args, Subcommand};
use telemetry_client::{socket_owner_summary, startup_diagnostics, Client};
use telemetry_service::ServiceManager;
use tracing::{debug, info};

use crate::paths::{find_daemon_binary, Paths};

#[derive(Args)]
pub struct DaemonArgs {
    #[command(subcommand)]
    pub command: Option<DaemonCommand>,

    /// Socket to bind when running in the foreground. This is how the
    /// installed service unit pins the daemon to the configured socket;
    /// defaults to the state-dir-derived path when omitted.
    #[arg(long)]
    pub socket_path: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum DaemonCommand {
    /// Install the daemon as a per-user system service and start it
    Install,
    /// Stop and remove the per-user system service
    Uninstall,
    /// Check whether the daemon is installed, running, and current
    Status,
}

pub async fn run(args: DaemonArgs) -> Result<()> {
    match args.command {
        None => run_foreground(args.socket_path),
        Some(DaemonCommand::Install) => install(),
        Some(DaemonCommand::Uninstall) => uninstall(),
        Some(DaemonCommand::Status) => status().await,
    }
}

/// The service unit execs `telemetry daemon --socket-path <P>`, so the
/// `exe_path` a `ServiceManager` is built with must be this CLI's own
/// path, not the worker binary's — `Install()` writes a unit that invokes
/// *this* binary.
fn manager() -> Result<ServiceManager> {
    let paths = Paths::resolve()?;
    let exe_path = std::env::current_exe().map_err(|e| anyhow!("could not resolve own executable path: {e}"))?;
    Ok(ServiceManager::new(exe_path, paths.socket_path, paths.state_dir))
}

/// Execs the `telemetryd` worker binary, forwarding `--socket-path` when
/// given. Replaces this process's image on unix so the service manager's
/// pid tracking and signal delivery land on the real worker, not a
/// supervisor sitting in front of it.
fn run_foreground(socket_path: Option<PathBuf>) -> Result<()> {
    let daemon_exe = find_daemon_binary();
    let mut cmd = Command::new(&daemon_exe);
    if let Some(path) = &socket_path {
        cmd.arg("--socket-path").arg(path);
    }
    debug!(exe = %daemon_exe.display(), socket_path = ?socket_path, "execing daemon worker");

    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        let err = cmd.exec();
        Err(anyhow!("failed to exec {}: {err}", daemon_exe.display()))
    }
    #[cfg(not(unix))]
    {
        let status = cmd
            .status()
            .map_err(|e| anyhow!("failed to exec {}: {e}", daemon_exe.display()))?;
        if !status.success() {
            return Err(anyhow!("daemon exited with status: {status}"));
        }
        Ok(())
    }
}

fn install() -> Result<()> {
    let manager = manager()?;
    manager.install().map_err(|e| anyhow!("{e}"))?;
    manager.start().map_err(|e| anyhow!("{e}"))?;
    info!(platform = manager.platform().name(), "daemon installed and started");
    println!("daemon installed and started ({})", manager.platform().name());
    Ok(())
}

fn uninstall() -> Result<()> {
    let manager = manager()?;
    manager.uninstall().map_err(|e| anyhow!("{e}"))?;
    println!("daemon service removed");
    Ok(())
}

async fn status() -> Result<()> {
    let paths = Paths::resolve()?;
    let manager = manager()?;
    let client = Client::new(paths.socket_path.clone());

    println!("kind: {}", manager.platform().name());
    println!("installed: {}", manager.is_installed());

    match client.health().await {
        Ok(health) => {
            println!("running: true");
            println!("daemon_version: {}", health.daemon_version);
            println!("api_version: {}", health.api_version);
            println!("socket: {}", paths.socket_path.display());
        }
        Err(e) => {
            println!("running: false");
            println!("socket: {}", paths.socket_path.display());
            println!("reason: {e}");
            if !manager.is_installed() {
                println!("hint: {}", manager.install_hint());
            } else {
                println!("hint: {}", manager.status_hint());
            }
            if let Some(owner) = socket_owner_summary(&paths.socket_path) {
                println!("socket_owner: {owner}");
            }
            println!("{}", startup_diagnostics(&paths.socket_path, &manager));
        }
    }
    Ok(())
}

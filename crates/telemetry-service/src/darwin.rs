use std::fs;
use std::path::{Path, PathBuf};

use crate::command::{never_ignore, run_checked};
use crate::error::ServiceError;

pub(crate) const LABEL: &str = "com.telemetry.daemon";

pub(crate) fn plist_path(home: &Path) -> PathBuf {
    home.join("Library/LaunchAgents").join(format!("{LABEL}.plist"))
}

fn uid() -> Result<u32, ServiceError> {
    let output = std::process::Command::new("id")
        .arg("-u")
        .output()
        .map_err(|source| ServiceError::Io {
            command: "id -u".to_string(),
            source,
        })?;
    String::from_utf8_lossy(&output.stdout)
        .trim()
        .parse()
        .map_err(|_| ServiceError::CommandFailed {
            command: "id -u".to_string(),
            stderr: "could not parse uid".to_string(),
        })
}

fn domains() -> Result<Vec<String>, ServiceError> {
    let uid = uid()?;
    Ok(vec![format!("gui/{uid}"), format!("user/{uid}")])
}

fn plist_contents(exe_path: &Path, socket_path: &Path, state_dir: &Path, stdout_log: &Path, stderr_log: &Path) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
<plist version="1.0">
<dict>
    <key>Label</key>
    <string>{LABEL}</string>
    <key>ProgramArguments</key>
    <array>
        <string>{exe}</string>
        <string>daemon</string>
        <string>--socket-path</string>
        <string>{socket}</string>
    </array>
    <key>EnvironmentVariables</key>
    <dict>
        <key>TELEMETRY_STATE_DIR</key>
        <string>{state_dir}</string>
    </dict>
    <key>RunAtLoad</key>
    <true/>
    <key>KeepAlive</key>
    <true/>
    <key>StandardOutPath</key>
    <string>{stdout}</string>
    <key>StandardErrorPath</key>
    <string>{stderr}</string>
</dict>
</plist>
"#,
        exe = exe_path.display(),
        socket = socket_path.display(),
        state_dir = state_dir.display(),
        stdout = stdout_log.display(),
        stderr = stderr_log.display(),
    )
}

pub(crate) fn install(
    unit_path: &Path,
    exe_path: &Path,
    socket_path: &Path,
    state_dir: &Path,
    stdout_log: &Path,
    stderr_log: &Path,
) -> Result<(), ServiceError> {
    if let Some(parent) = unit_path.parent() {
        fs::create_dir_all(parent).map_err(|source| ServiceError::Io {
            command: format!("mkdir -p {}", parent.display()),
            source,
        })?;
    }
    fs::write(
        unit_path,
        plist_contents(exe_path, socket_path, state_dir, stdout_log, stderr_log),
    )
    .map_err(|source| ServiceError::Io {
        command: format!("write {}", unit_path.display()),
        source,
    })?;

    let unit_path_str = unit_path.to_string_lossy().to_string();
    let mut last_err = None;
    for domain in domains()? {
        let target = format!("{domain}/{LABEL}");
        let bootout_ignorable = |stderr: &str| stderr.contains("No such process") || stderr.contains("no such process");
        // Bootout failures other than "no such process" aren't fatal to a fresh install.
        let _ = run_checked("launchctl", &["bootout", &target], bootout_ignorable);
        let bootstrap = run_checked("launchctl", &["bootstrap", &domain, &unit_path_str], never_ignore);
        if bootstrap.is_err() {
            last_err = bootstrap.err();
            continue;
        }
        let kickstart = run_checked("launchctl", &["kickstart", "-k", &target], never_ignore);
        match kickstart {
            Ok(()) => return Ok(()),
            Err(e) => last_err = Some(e),
        }
    }
    Err(last_err.unwrap_or(ServiceError::CommandFailed {
        command: "launchctl bootstrap".to_string(),
        stderr: "no domain accepted the service".to_string(),
    }))
}

pub(crate) fn uninstall(unit_path: &Path) -> Result<(), ServiceError> {
    let ignorable = |stderr: &str| stderr.contains("No such process") || stderr.contains("no such process");
    for domain in domains()? {
        let target = format!("{domain}/{LABEL}");
        let _ = run_checked("launchctl", &["bootout", &target], ignorable);
    }
    if unit_path.exists() {
        fs::remove_file(unit_path).map_err(|source| ServiceError::Io {
            command: format!("rm {}", unit_path.display()),
            source,
        })?;
    }
    Ok(())
}

pub(crate) fn start() -> Result<(), ServiceError> {
    let target = format!("{}/{LABEL}", domains()?[0]);
    run_checked("launchctl", &["kickstart", "-k", &target], never_ignore)
}

use std::path::Path;

use telemetry_service::ServiceManager;

/// Last `n` newline-separated lines of `text`, trimmed. `n <= 0` defaults to 20.
pub fn tail_text_lines(text: &str, n: i64) -> String {
    let n = if n <= 0 { 20 } else { n as usize };
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    let lines: Vec<&str> = trimmed.lines().collect();
    let start = lines.len().saturating_sub(n);
    lines[start..].join("\n")
}

fn normalize_crlf(text: &str) -> String {
    text.replace("\r\n", "\n")
}

fn read_log_tail(path: &Path, lines: i64) -> String {
    match std::fs::read_to_string(path) {
        Ok(content) => tail_text_lines(&normalize_crlf(&content), lines),
        Err(_) => String::new(),
    }
}

/// Builds the diagnostic blob surfaced when `EnsureRunning` can't reach a
/// healthy daemon: socket path, status hint, and the tails of both log files.
pub fn startup_diagnostics(socket_path: &Path, manager: &ServiceManager) -> String {
    let stderr_log = manager.stderr_log_path();
    let stdout_log = manager.stdout_log_path();
    let stderr_tail = read_log_tail(&stderr_log, 30);

    let mut sections = vec![
        format!("socket_path={}", socket_path.display()),
        format!("status_cmd={}", manager.status_hint()),
        format!("stderr_log={}", stderr_log.display()),
        format!("stderr_tail:\n{stderr_tail}"),
        format!("stdout_log={}", stdout_log.display()),
    ];

    if manager.platform() == telemetry_service::Platform::Darwin {
        if let Some(launchctl_tail) = darwin_launchctl_print_tail() {
            sections.push(launchctl_tail);
        }
    }

    sections.join("\n")
}

/// Parses `lsof <socket_path>` to identify whatever process currently has
/// the socket open, for the `daemon status` error path. Returns `None` if
/// `lsof` isn't on PATH or nothing has the socket open.
pub fn socket_owner_summary(socket_path: &Path) -> Option<String> {
    let output = std::process::Command::new("lsof").arg(socket_path).output().ok()?;
    let text = String::from_utf8_lossy(&output.stdout);
    let fields: Vec<&str> = text.lines().nth(1)?.split_whitespace().collect();
    let command = fields.first()?;
    let pid = fields.get(1)?;
    Some(format!("pid={pid}, command={command}, socket={}", socket_path.display()))
}

fn darwin_launchctl_print_tail() -> Option<String> {
    let uid_output = std::process::Command::new("id").arg("-u").output().ok()?;
    let uid = String::from_utf8_lossy(&uid_output.stdout).trim().to_string();
    let target = format!("gui/{uid}/com.telemetry.daemon");
    let output = std::process::Command::new("launchctl")
        .args(["print", &target])
        .output()
        .ok()?;
    let text = String::from_utf8_lossy(&output.stdout).into_owned();
    Some(tail_text_lines(&normalize_crlf(&text), 30))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tail_defaults_to_twenty_lines() {
        let text = (1..=30).map(|i| i.to_string()).collect::<Vec<_>>().join("\n");
        let tail = tail_text_lines(&text, 0);
        assert_eq!(tail.lines().count(), 20);
        assert_eq!(tail.lines().next().unwrap(), "11");
    }

    #[test]
    fn tail_of_short_text_returns_everything() {
        assert_eq!(tail_text_lines("a\nb\n", 30), "a\nb");
    }

    #[test]
    fn empty_text_yields_empty_tail() {
        assert_eq!(tail_text_lines("   \n  ", 10), "");
    }

    #[test]
    fn socket_owner_summary_is_none_for_a_path_nothing_holds() {
        let path = std::path::Path::new("/tmp/telemetry-diagnostics-test-no-such-socket.sock");
        assert_eq!(socket_owner_summary(path), None);
    }
}

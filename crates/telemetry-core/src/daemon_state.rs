//! Client-side label describing the relationship with the daemon.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DaemonStatus {
    Unknown,
    Connecting,
    NotInstalled,
    Starting,
    Running,
    Outdated,
    Error,
}

/// `{status, message, install_hint}` — the only mutable shared state a UI
/// ever needs to render a daemon connection indicator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonState {
    pub status: DaemonStatus,
    pub message: Option<String>,
    pub install_hint: Option<String>,
}

impl DaemonState {
    pub fn running() -> Self {
        Self {
            status: DaemonStatus::Running,
            message: None,
            install_hint: None,
        }
    }

    pub fn connecting() -> Self {
        Self {
            status: DaemonStatus::Connecting,
            message: None,
            install_hint: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: DaemonStatus::Error,
            message: Some(message.into()),
            install_hint: None,
        }
    }
}

impl Default for DaemonState {
    fn default() -> Self {
        Self {
            status: DaemonStatus::Unknown,
            message: None,
            install_hint: None,
        }
    }
}

/// Classify an `EnsureRunning` error message into a `DaemonState`.
///
/// Intentionally loose string matching: upstream errors are wrapped prose
/// from process spawn / service-manager / HTTP layers, not a typed error
/// enum that survives the ensure boundary.
pub fn classify_ensure_error(err: Option<&str>, install_hint: Option<String>) -> DaemonState {
    let Some(msg) = err else {
        return DaemonState::running();
    };

    if msg.contains("not installed") {
        return DaemonState {
            status: DaemonStatus::NotInstalled,
            message: Some(msg.to_string()),
            install_hint,
        };
    }
    if msg.contains("out of date") {
        return DaemonState {
            status: DaemonStatus::Outdated,
            message: Some(msg.to_string()),
            install_hint: None,
        };
    }
    if msg.contains("unsupported on") {
        return DaemonState::error(msg);
    }
    DaemonState::error(msg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nil_error_is_running() {
        let state = classify_ensure_error(None, None);
        assert_eq!(state.status, DaemonStatus::Running);
    }

    #[test]
    fn not_installed_carries_hint() {
        let state = classify_ensure_error(
            Some("daemon service is not installed"),
            Some("run `telemetry daemon install`".into()),
        );
        assert_eq!(state.status, DaemonStatus::NotInstalled);
        assert!(state.install_hint.is_some());
    }

    #[test]
    fn out_of_date_classification() {
        let state = classify_ensure_error(Some("out of date (running=v0.3.0 expected=v0.4.0)"), None);
        assert_eq!(state.status, DaemonStatus::Outdated);
    }

    #[test]
    fn unsupported_platform_is_error() {
        let state = classify_ensure_error(Some("unsupported on windows without a managed service"), None);
        assert_eq!(state.status, DaemonStatus::Error);
    }

    #[test]
    fn anything_else_is_error() {
        let state = classify_ensure_error(Some("connection refused"), None);
        assert_eq!(state.status, DaemonStatus::Error);
    }
}

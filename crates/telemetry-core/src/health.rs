//! Health/version protocol and the currency gate that decides whether a
//! running daemon needs a reinstall.

use semver::Version;
use serde::{Deserialize, Serialize};

/// Current wire protocol constant. Never bump without a matching client release.
pub const API_VERSION: &str = "v1";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    #[serde(default)]
    pub daemon_version: String,
    #[serde(default)]
    pub api_version: String,
    #[serde(default)]
    pub integration_version: String,
}

impl HealthResponse {
    /// An empty response body is treated as a bare "ok".
    pub fn ok_default() -> Self {
        Self {
            status: "ok".to_string(),
            daemon_version: String::new(),
            api_version: String::new(),
            integration_version: String::new(),
        }
    }
}

/// True iff `v` carries a literal `v` prefix followed by a valid semver
/// with no pre-release or build metadata, written in canonical `X.Y.Z`
/// form. A bare `0.4.0` (no prefix) is not a release version — it's how
/// `own_version` looks when it hasn't been stamped by a release build.
pub fn is_release_semver(v: &str) -> bool {
    let Some(stripped) = v.strip_prefix('v') else {
        return false;
    };
    match Version::parse(stripped) {
        Ok(parsed) => {
            parsed.pre.is_empty() && parsed.build.is_empty() && parsed.to_string() == stripped
        }
        Err(_) => false,
    }
}

fn api_version_compatible(api_version: &str) -> bool {
    api_version.is_empty() || api_version == API_VERSION
}

/// True iff `h` should be treated as "this daemon is current enough to use".
///
/// For a strict-release-semver `own_version`, both versions must match
/// exactly and the api version must be compatible. For dev/local builds
/// (anything else — "dev", a git-describe string, empty), only api
/// compatibility is required: a developer build should never trigger an
/// endless reinstall loop just because `daemon_version` differs.
pub fn health_current(h: &HealthResponse, own_version: &str) -> bool {
    if !is_release_semver(own_version) {
        return api_version_compatible(&h.api_version);
    }
    h.daemon_version == own_version && api_version_compatible(&h.api_version)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn release_semver_classification() {
        assert!(is_release_semver("v0.4.0"));
        assert!(!is_release_semver("v0.4.0-11-g1234abc-dirty"));
        assert!(!is_release_semver("0.4.0"));
    }

    #[test]
    fn health_current_matches_exact_release() {
        let h = HealthResponse {
            status: "ok".into(),
            daemon_version: "v0.4.0".into(),
            api_version: "v1".into(),
            integration_version: String::new(),
        };
        assert!(health_current(&h, "v0.4.0"));
        assert!(!health_current(&h, "v0.3.0"));
    }

    #[test]
    fn health_current_relaxed_for_dev_builds() {
        let h = HealthResponse {
            status: "ok".into(),
            daemon_version: "v9.9.9".into(),
            api_version: "".into(),
            integration_version: String::new(),
        };
        assert!(health_current(&h, "dev"));
        assert!(health_current(&h, "v0.4.0-11-g1234abc-dirty"));

        let incompatible = HealthResponse {
            api_version: "v2".into(),
            ..h
        };
        assert!(!health_current(&incompatible, "dev"));
    }
}

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("daemon not installed")]
    NotInstalled { install_hint: String },

    #[error("daemon is not running")]
    NotRunning,

    #[error("daemon is out of date (running={running}, expected={expected})")]
    Outdated { running: String, expected: String },

    #[error("unsupported on {0} without a managed service")]
    Unsupported(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("http error: {0}")]
    Http(#[from] hyper::Error),

    #[error("request build error: {0}")]
    Request(#[from] hyper::http::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("request timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("daemon replied {status}: {body}")]
    Status { status: u16, body: String },

    #[error("{0}")]
    Other(String),
}

impl ClientError {
    pub fn contains(&self, needle: &str) -> bool {
        self.to_string().contains(needle)
    }
}

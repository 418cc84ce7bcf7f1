use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("unsupported on {0} without a managed service")]
    Unsupported(String),

    #[error(
        "refusing to install a transient executable at {0}; build a stable binary and retry"
    )]
    TransientExecutable(String),

    #[error("service is not installed")]
    NotInstalled,

    #[error("{command}: {stderr}")]
    CommandFailed { command: String, stderr: String },

    #[error("io error running {command}: {source}")]
    Io {
        command: String,
        #[source]
        source: std::io::Error,
    },
}

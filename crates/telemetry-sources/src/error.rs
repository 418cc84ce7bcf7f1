use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("empty payload")]
    EmptyPayload,

    #[error("malformed line {line}: {reason}")]
    MalformedLine { line: usize, reason: String },
}

use telemetry_core::IngestRequest;

use crate::error::ParseError;
use crate::jsonl::parse_lines;
use crate::source::TelemetrySource;

/// Hook payload parser for the `opencode` editor integration: one JSON
/// object per line, newline-delimited.
#[derive(Debug, Default)]
pub struct OpenCodeSource;

impl TelemetrySource for OpenCodeSource {
    fn name(&self) -> &'static str {
        "opencode"
    }

    fn parse(&self, body: &[u8], account_id: Option<&str>) -> Result<Vec<IngestRequest>, ParseError> {
        parse_lines(self.name(), body, account_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_two_events_one_per_line() {
        let body = b"{\"event\":\"completion\"}\n{\"event\":\"edit\"}\n";
        let events = OpenCodeSource.parse(body, Some("acct-1")).unwrap();
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| e.account_id.as_deref() == Some("acct-1")));
    }

    #[test]
    fn empty_body_is_rejected() {
        let err = OpenCodeSource.parse(b"", None).unwrap_err();
        assert!(matches!(err, ParseError::EmptyPayload));
    }

    #[test]
    fn identity_is_stable_across_repeated_parses() {
        let body = b"{\"event\":\"completion\"}\n";
        let a = OpenCodeSource.parse(body, Some("acct-1")).unwrap();
        let b = OpenCodeSource.parse(body, Some("acct-1")).unwrap();
        assert_eq!(a[0].identity, b[0].identity);
    }
}

use telemetry_core::IngestRequest;

use crate::error::ParseError;
use crate::jsonl::parse_lines;
use crate::source::TelemetrySource;

/// Hook payload parser for the `claude-code` editor integration. Same
/// newline-delimited JSON shape as [`crate::opencode::OpenCodeSource`];
/// kept as a distinct parser since each tool's event schema is free to
/// diverge once real fields show up.
#[derive(Debug, Default)]
pub struct ClaudeCodeSource;

impl TelemetrySource for ClaudeCodeSource {
    fn name(&self) -> &'static str {
        "claude-code"
    }

    fn parse(&self, body: &[u8], account_id: Option<&str>) -> Result<Vec<IngestRequest>, ParseError> {
        parse_lines(self.name(), body, account_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_single_event() {
        let body = b"{\"event\":\"tool_call\"}\n";
        let events = ClaudeCodeSource.parse(body, None).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].source, "claude-code");
    }
}

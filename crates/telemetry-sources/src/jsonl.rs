use serde_json::Value;
use telemetry_core::IngestRequest;

use crate::error::ParseError;
use crate::source::identity_hash;

/// Shared body for line-delimited JSON sources: one JSON object per
/// non-blank line, each becoming its own [`IngestRequest`]. `account_id`
/// falls back to the object's own `account_id` field when the query string
/// didn't supply one.
pub(crate) fn parse_lines(
    source: &str,
    body: &[u8],
    account_id: Option<&str>,
) -> Result<Vec<IngestRequest>, ParseError> {
    if body.is_empty() {
        return Err(ParseError::EmptyPayload);
    }
    let text = String::from_utf8_lossy(body);

    let mut out = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let payload: Value = serde_json::from_str(line).map_err(|e| ParseError::MalformedLine {
            line: idx + 1,
            reason: e.to_string(),
        })?;

        let resolved_account = account_id
            .map(|s| s.to_string())
            .or_else(|| payload.get("account_id").and_then(|v| v.as_str()).map(String::from));

        let identity = identity_hash(source, resolved_account.as_deref(), line);
        out.push(IngestRequest {
            source: source.to_string(),
            account_id: resolved_account,
            identity,
            payload,
        });
    }

    if out.is_empty() {
        return Err(ParseError::EmptyPayload);
    }
    Ok(out)
}

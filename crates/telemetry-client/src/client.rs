use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper::{Method, Request, StatusCode, Uri};
use hyper_util::client::legacy::Client as LegacyClient;
use hyper_util::rt::TokioExecutor;
use serde::{Deserialize, Serialize};
use telemetry_core::{HealthResponse, HookTally, ReadModelRequest, UsageSnapshot};

use crate::constants::{HEALTH_POLL_TIMEOUT, HOOK_TIMEOUT, READ_MODEL_TIMEOUT};
use crate::error::ClientError;
use crate::transport::UdsConnector;

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ReadModelResponse {
    #[serde(default)]
    pub snapshots: HashMap<String, UsageSnapshot>,
}

/// HTTP/1 client whose transport dials a Unix-domain socket. Compression
/// and connection keep-alive are both left off: the latency floor over a
/// local socket doesn't need them, and disabling keep-alive means a crashed
/// daemon doesn't leave the client holding a half-open connection.
pub struct Client {
    socket_path: PathBuf,
    http: LegacyClient<UdsConnector, Full<Bytes>>,
}

impl Client {
    pub fn new(socket_path: impl Into<PathBuf>) -> Self {
        let socket_path = socket_path.into();
        let connector = UdsConnector::new(socket_path.clone());
        let http = LegacyClient::builder(TokioExecutor::new())
            .pool_max_idle_per_host(0)
            .build(connector);
        Self { socket_path, http }
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    pub async fn health(&self) -> Result<HealthResponse, ClientError> {
        let req = self.request(Method::GET, "/healthz", Full::default())?;
        let body = self.send(req, HEALTH_POLL_TIMEOUT).await?;
        if body.trim().is_empty() {
            return Ok(HealthResponse::ok_default());
        }
        Ok(serde_json::from_str(&body)?)
    }

    pub async fn read_model(&self, request: &ReadModelRequest) -> Result<ReadModelResponse, ClientError> {
        let payload = serde_json::to_vec(request)?;
        let req = self.request(Method::POST, "/v1/read-model", Full::from(payload))?;
        let body = self.send(req, READ_MODEL_TIMEOUT).await?;
        let mut parsed: ReadModelResponse = serde_json::from_str(&body)?;
        if parsed.snapshots.is_empty() {
            parsed.snapshots = HashMap::new();
        }
        Ok(parsed)
    }

    pub async fn ingest_hook(
        &self,
        source: &str,
        account_id: Option<&str>,
        payload: Vec<u8>,
    ) -> Result<HookTally, ClientError> {
        let escaped_source = urlencoding_escape(source);
        let path = match account_id.filter(|id| !id.is_empty()) {
            Some(id) => format!("/v1/hook/{escaped_source}?account_id={}", urlencoding_escape(id)),
            None => format!("/v1/hook/{escaped_source}"),
        };
        let req = self.request(Method::POST, &path, Full::from(payload))?;
        let body = self.send(req, HOOK_TIMEOUT).await?;
        Ok(serde_json::from_str(&body)?)
    }

    fn request(&self, method: Method, path: &str, body: Full<Bytes>) -> Result<Request<Full<Bytes>>, ClientError> {
        let uri: Uri = format!("http://daemon{path}").parse().map_err(|e| {
            ClientError::Other(format!("invalid request path {path:?}: {e}"))
        })?;
        Ok(Request::builder()
            .method(method)
            .uri(uri)
            .header("connection", "close")
            .header("content-type", "application/json")
            .body(body)?)
    }

    async fn send(&self, req: Request<Full<Bytes>>, timeout: Duration) -> Result<String, ClientError> {
        let response = tokio::time::timeout(timeout, self.http.request(req))
            .await
            .map_err(|_| ClientError::Timeout(timeout))??;

        let status = response.status();
        let collected = response.into_body().collect().await.map_err(ClientError::Http)?;
        let bytes = collected.to_bytes();
        let text = String::from_utf8_lossy(&bytes).into_owned();

        if status >= StatusCode::MULTIPLE_CHOICES {
            return Err(ClientError::Status {
                status: status.as_u16(),
                body: text,
            });
        }
        Ok(text)
    }
}

fn urlencoding_escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => out.push(byte as char),
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_reserved_characters_in_source_and_account_id() {
        assert_eq!(urlencoding_escape("opencode"), "opencode");
        assert_eq!(urlencoding_escape("a/b c"), "a%2Fb%20c");
    }
}

use std::path::PathBuf;
use std::pin::Pin;
use std::task::{Context, Poll};

use hyper::Uri;
use hyper_util::rt::TokioIo;
use tokio::net::UnixStream;
use tower::Service;

use crate::constants::DIAL_TIMEOUT;

/// Dials a fixed Unix-domain socket regardless of the `Uri` hyper hands it;
/// the authority in request URIs is a placeholder (`http://daemon/...`).
#[derive(Clone)]
pub(crate) struct UdsConnector {
    path: PathBuf,
}

impl UdsConnector {
    pub(crate) fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl Service<Uri> for UdsConnector {
    type Response = TokioIo<UnixStream>;
    type Error = std::io::Error;
    type Future = Pin<Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, _uri: Uri) -> Self::Future {
        let path = self.path.clone();
        Box::pin(async move {
            match tokio::time::timeout(DIAL_TIMEOUT, UnixStream::connect(&path)).await {
                Ok(result) => result.map(TokioIo::new),
                Err(_) => Err(std::io::Error::new(
                    std::io::ErrorKind::TimedOut,
                    format!("dial timed out after {DIAL_TIMEOUT:?} connecting to {}", path.display()),
                )),
            }
        })
    }
}

//! Accept loop for the axum router over a `UnixListener`, using
//! `hyper_util`'s auto (HTTP/1 or HTTP/2) connection builder. This is the
//! standard low-level idiom for serving axum over a transport other than
//! TCP, since `axum::serve` itself is TCP-only.

use std::time::Duration;

use axum::extract::Request;
use axum::Router;
use hyper::body::Incoming;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto;
use tokio::net::UnixListener;
use tokio_util::sync::CancellationToken;
use tower::Service;
use tracing::warn;

const DRAIN_GRACE: Duration = Duration::from_secs(2);

pub async fn serve(listener: UnixListener, router: Router, cancel: CancellationToken) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, _addr)) => spawn_connection(stream, router.clone(), cancel.clone()),
                    Err(e) => warn!(error = %e, "accept error"),
                }
            }
        }
    }

    // Give in-flight requests a short grace period before the caller
    // removes the socket file out from under the listener.
    tokio::time::sleep(DRAIN_GRACE).await;
}

fn spawn_connection(stream: tokio::net::UnixStream, router: Router, cancel: CancellationToken) {
    tokio::spawn(async move {
        let io = TokioIo::new(stream);
        let mut tower_service = router;
        let hyper_service = hyper::service::service_fn(move |request: hyper::Request<Incoming>| {
            let request: Request = request.map(axum::body::Body::new);
            tower_service.call(request)
        });

        let serve_future = auto::Builder::new(TokioExecutor::new()).serve_connection(io, hyper_service);
        tokio::select! {
            result = serve_future => {
                if let Err(e) = result {
                    warn!(error = %e, "connection error");
                }
            }
            _ = cancel.cancelled() => {}
        }
    });
}

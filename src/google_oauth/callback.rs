//! Transient loopback listener that captures the OAuth redirect.

use crate::error::AppError;
use crate::google_oauth::types::CallbackParams;
use axum::{
    Router,
    extract::{Query, State},
    http::{StatusCode, header::CONNECTION},
    response::{Html, IntoResponse, Response},
    routing::get,
};
use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};
use url::Url;

const CALLBACK_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>Signed in</title></head>
<body style="font-family: sans-serif; text-align: center; padding: 50px;">
    <h2>Authentication complete</h2>
    <p>You can close this window and return to the application.</p>
</body>
</html>"#;

const ALREADY_HANDLED_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>Already handled</title></head>
<body style="font-family: sans-serif; text-align: center; padding: 50px;">
    <p>This sign-in attempt has already completed.</p>
</body>
</html>"#;

/// Time allowed for the confirmation page to flush after the callback.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

type CallbackSlot = Arc<Mutex<Option<oneshot::Sender<CallbackParams>>>>;

/// Bound but not yet serving. Binding before the browser opens guarantees
/// the redirect has somewhere to land.
pub struct CallbackListener {
    listener: TcpListener,
    path: String,
    local_addr: SocketAddr,
}

impl CallbackListener {
    /// Bind on the host and port of an `http://` loopback redirect URI.
    pub async fn bind(redirect_uri: &Url) -> Result<Self, AppError> {
        if redirect_uri.scheme() != "http" {
            return Err(AppError::Listener(format!(
                "loopback redirect must use http, got `{}`",
                redirect_uri.scheme()
            )));
        }
        let host = redirect_uri
            .host_str()
            .ok_or_else(|| AppError::Listener("redirect URI has no host".to_string()))?;
        let port = redirect_uri
            .port_or_known_default()
            .ok_or_else(|| AppError::Listener("redirect URI has no port".to_string()))?;

        let listener = TcpListener::bind((host, port))
            .await
            .map_err(|e| AppError::Listener(format!("bind {host}:{port}: {e}")))?;
        let local_addr = listener.local_addr()?;
        debug!(%local_addr, "callback listener bound");

        Ok(Self {
            listener,
            path: redirect_uri.path().to_string(),
            local_addr,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Serve until the first callback arrives, then stop listening.
    /// Dropping the returned future releases the socket as well.
    pub async fn wait(self, timeout: Duration) -> Result<CallbackParams, AppError> {
        let (params_tx, params_rx) = oneshot::channel();
        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let app = callback_router(&self.path, params_tx);

        let server = axum::serve(self.listener, app).with_graceful_shutdown(async move {
            let _ = stop_rx.await;
        });
        let mut server = Box::pin(server.into_future());

        let received = tokio::select! {
            res = &mut server => {
                return Err(AppError::Listener(format!(
                    "callback server stopped early: {:?}",
                    res.err()
                )));
            }
            res = tokio::time::timeout(timeout, params_rx) => res,
        };

        let _ = stop_tx.send(());
        if tokio::time::timeout(SHUTDOWN_GRACE, &mut server).await.is_err() {
            warn!("callback server did not drain in time; dropping connections");
        }

        match received {
            Ok(Ok(params)) => {
                info!("OAuth callback received");
                Ok(params)
            }
            Ok(Err(_)) => Err(AppError::Listener("callback channel closed".to_string())),
            Err(_) => Err(AppError::CallbackTimeout(timeout)),
        }
    }
}

/// Router answering the redirect path. The first request carrying OAuth
/// parameters is forwarded to `sender`; later ones get `410 Gone`.
pub(crate) fn callback_router(path: &str, sender: oneshot::Sender<CallbackParams>) -> Router {
    let slot: CallbackSlot = Arc::new(Mutex::new(Some(sender)));
    let path = if path.is_empty() { "/" } else { path };
    Router::new()
        .route(path, get(capture_callback))
        .with_state(slot)
}

async fn capture_callback(
    State(slot): State<CallbackSlot>,
    Query(params): Query<CallbackParams>,
) -> Response {
    if params.is_empty() {
        return (StatusCode::BAD_REQUEST, "missing OAuth callback parameters").into_response();
    }

    let sender = match slot.lock() {
        Ok(mut guard) => guard.take(),
        Err(poisoned) => poisoned.into_inner().take(),
    };
    match sender {
        Some(tx) => {
            let _ = tx.send(params);
            ([(CONNECTION, "close")], Html(CALLBACK_PAGE)).into_response()
        }
        None => (
            StatusCode::GONE,
            [(CONNECTION, "close")],
            Html(ALREADY_HANDLED_PAGE),
        )
            .into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use tower::ServiceExt;

    fn request(uri: &str) -> Request<Body> {
        Request::builder()
            .method("GET")
            .uri(uri)
            .body(Body::empty())
            .expect("failed to build request")
    }

    #[tokio::test]
    async fn first_callback_is_captured_and_answered_with_html() {
        let (tx, rx) = oneshot::channel();
        let app = callback_router("/callback", tx);

        let resp = app
            .clone()
            .oneshot(request("/callback?code=abc&state=xyz"))
            .await
            .expect("request failed");
        assert_eq!(resp.status(), StatusCode::OK);
        let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        assert!(std::str::from_utf8(&body).unwrap().contains("Authentication complete"));

        let params = rx.await.unwrap();
        assert_eq!(params.code.as_deref(), Some("abc"));
        assert_eq!(params.state.as_deref(), Some("xyz"));

        let again = app
            .oneshot(request("/callback?code=def&state=xyz"))
            .await
            .expect("request failed");
        assert_eq!(again.status(), StatusCode::GONE);
    }

    #[tokio::test]
    async fn error_parameters_are_forwarded() {
        let (tx, rx) = oneshot::channel();
        let app = callback_router("/", tx);

        let resp = app
            .oneshot(request("/?error=access_denied&error_description=user%20said%20no"))
            .await
            .expect("request failed");
        assert_eq!(resp.status(), StatusCode::OK);

        let params = rx.await.unwrap();
        assert_eq!(params.error.as_deref(), Some("access_denied"));
        assert_eq!(params.error_description.as_deref(), Some("user said no"));
    }

    #[tokio::test]
    async fn request_without_oauth_parameters_does_not_consume_the_slot() {
        let (tx, mut rx) = oneshot::channel();
        let app = callback_router("/", tx);

        let resp = app.clone().oneshot(request("/")).await.expect("request failed");
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert!(matches!(
            rx.try_recv(),
            Err(oneshot::error::TryRecvError::Empty)
        ));
        drop(app);
    }

    #[tokio::test]
    async fn rejects_non_http_redirect() {
        let url = Url::parse("https://localhost/callback").unwrap();
        assert!(matches!(
            CallbackListener::bind(&url).await,
            Err(AppError::Listener(_))
        ));
    }

    #[tokio::test]
    async fn wait_times_out_without_callback() {
        let url = Url::parse("http://127.0.0.1:0/cb").unwrap();
        let listener = CallbackListener::bind(&url).await.unwrap();
        let res = listener.wait(Duration::from_millis(50)).await;
        assert!(matches!(res, Err(AppError::CallbackTimeout(_))));
    }
}

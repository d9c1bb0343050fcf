//! One-shot redirect listener.
//!
//! Binds the host and port of the configured redirect URI, serves exactly the
//! redirect path, and forwards the first `(code, state)` pair it sees to the
//! waiting caller through a single-slot channel. Later requests get an
//! answer but are otherwise ignored.

use crate::error::{AuthError, Result};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use serde::Deserialize;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::{oneshot, Mutex};
use tracing::{debug, info, warn};
use url::Url;

const SUCCESS_BODY: &str = "Login Completed!";
const FAILURE_BODY: &str = "Couldn't get token";

/// What the provider handed back on the redirect.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthorizationCallback {
    pub code: String,
    pub state: String,
}

impl std::fmt::Debug for AuthorizationCallback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthorizationCallback")
            .field("code", &"[REDACTED]")
            .field("state", &self.state)
            .finish()
    }
}

#[derive(Debug, Default, Deserialize)]
struct CallbackParams {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

type CallbackSlot = Arc<Mutex<Option<oneshot::Sender<Result<AuthorizationCallback>>>>>;

/// Where to listen, derived from the redirect URI.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ListenTarget {
    host: String,
    port: u16,
    path: String,
}

fn listen_target(redirect_uri: &str) -> Result<ListenTarget> {
    let url = Url::parse(redirect_uri)
        .map_err(|e| AuthError::InvalidConfig(format!("Invalid redirect URI: {}", e)))?;

    let host = url
        .host_str()
        .ok_or_else(|| AuthError::InvalidConfig("Redirect URI has no host".to_string()))?
        .trim_matches(|c| c == '[' || c == ']')
        .to_string();
    let port = url
        .port_or_known_default()
        .ok_or_else(|| AuthError::InvalidConfig("Redirect URI has no port".to_string()))?;
    let path = match url.path() {
        "" => "/".to_string(),
        path => path.to_string(),
    };

    Ok(ListenTarget { host, port, path })
}

fn parse_callback(params: CallbackParams) -> Result<AuthorizationCallback> {
    if let Some(error) = params.error {
        return Err(AuthError::AuthenticationFailed(format!(
            "Authorization denied: {}",
            error
        )));
    }

    match (params.code, params.state) {
        (Some(code), Some(state)) if !code.is_empty() => Ok(AuthorizationCallback { code, state }),
        _ => Err(AuthError::CallbackFailed(
            "Redirect is missing code or state".to_string(),
        )),
    }
}

async fn handle_redirect(
    State(slot): State<CallbackSlot>,
    Query(params): Query<CallbackParams>,
) -> (StatusCode, &'static str) {
    let outcome = parse_callback(params);
    let response = match &outcome {
        Ok(_) => (StatusCode::OK, SUCCESS_BODY),
        Err(e) => {
            warn!(error = %e, "Rejected authorization redirect");
            (StatusCode::FORBIDDEN, FAILURE_BODY)
        }
    };

    match slot.lock().await.take() {
        Some(sender) => {
            if sender.send(outcome).is_err() {
                debug!("Authorization waiter already gone");
            }
        }
        None => debug!("Ignoring redirect after the first one"),
    }

    response
}

/// Serve the redirect URI until the first redirect arrives.
///
/// Blocks until the browser hits the redirect path. The listener is told to
/// shut down once the code is in hand.
pub async fn await_authorization_code(redirect_uri: &str) -> Result<AuthorizationCallback> {
    let target = listen_target(redirect_uri)?;

    let listener = TcpListener::bind((target.host.as_str(), target.port))
        .await
        .map_err(|e| {
            AuthError::CallbackFailed(format!(
                "Failed to bind {}:{}: {}",
                target.host, target.port, e
            ))
        })?;

    let (code_tx, code_rx) = oneshot::channel();
    let slot: CallbackSlot = Arc::new(Mutex::new(Some(code_tx)));

    let app = Router::new()
        .route(&target.path, get(handle_redirect))
        .with_state(slot);

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    tokio::spawn(async move {
        let server = axum::serve(listener, app).with_graceful_shutdown(async {
            let _ = shutdown_rx.await;
        });
        if let Err(e) = server.await {
            warn!(error = %e, "Redirect listener stopped with an error");
        }
    });

    info!(
        host = %target.host,
        port = target.port,
        path = %target.path,
        "Waiting for authorization redirect"
    );

    let outcome = code_rx.await.map_err(|_| {
        AuthError::CallbackFailed("Redirect listener closed before a redirect arrived".to_string())
    })?;

    let _ = shutdown_tx.send(());
    outcome
}

//! HTTP binding — axum routes, password check, client identity.
//!
//! Routes:
//! - `GET /get`  → current content
//! - `POST /set` → `X-Content-Type`, `X-Version`, body `{"data": ...}`
//! - `GET /poll` → `X-Version`
//!
//! Every route reads `X-Client-Name`; when a password is configured every
//! route also requires a matching `X-Password` before any handler runs.

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, FromRequestParts, Request, State};
use axum::http::request::Parts;
use axum::http::{HeaderMap, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use bytes::Bytes;
use percent_encoding::percent_decode;

use super::handler::{Notification, RequestError, SyncEngine};
use crate::resolver::Notifier;
use crate::wire::codec::MAX_BODY_SIZE;
use crate::wire::protocol::{
    ClipboardReply, ErrorReply, HEADER_CLIENT_NAME, HEADER_CONTENT_TYPE, HEADER_PASSWORD,
    HEADER_VERSION, PollReply, UNKNOWN_CLIENT,
};

/// Shared state handed to every request.
pub struct AppState {
    pub engine: SyncEngine,
    pub notifier: Arc<dyn Notifier>,
    pub notify: bool,
    /// `None` disables authentication.
    pub password: Option<String>,
}

impl AppState {
    /// Deliver a notification on a detached task. Failures are logged and
    /// never reach the response.
    fn dispatch(&self, note: Notification) {
        if !self.notify {
            return;
        }
        let notifier = self.notifier.clone();
        tokio::spawn(async move {
            if let Err(e) = notifier.notify(&note.title, &note.body).await {
                tracing::warn!(error = %e, title = %note.title, "notification failed");
            }
        });
    }
}

/// Build the router.
pub fn router(app: Arc<AppState>) -> Router {
    Router::new()
        .route("/get", get(get_clipboard))
        .route("/set", post(set_clipboard))
        .route("/poll", get(poll_clipboard))
        .layer(DefaultBodyLimit::max(MAX_BODY_SIZE))
        .layer(middleware::from_fn_with_state(app.clone(), authenticate))
        .with_state(app)
}

// -- Handlers --

async fn get_clipboard(
    State(app): State<Arc<AppState>>,
    ClientName(client): ClientName,
) -> Json<ClipboardReply> {
    let (reply, note) = app.engine.get(&client).await;
    app.dispatch(note);
    Json(reply)
}

async fn set_clipboard(
    State(app): State<Arc<AppState>>,
    ClientName(client): ClientName,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, RequestError> {
    let version = header(&headers, HEADER_VERSION);
    let kind = header(&headers, HEADER_CONTENT_TYPE);
    let note = app
        .engine
        .set(&client, version.as_deref(), kind.as_deref(), &body)
        .await?;
    app.dispatch(note);
    Ok(StatusCode::OK)
}

async fn poll_clipboard(
    State(app): State<Arc<AppState>>,
    ClientName(client): ClientName,
    headers: HeaderMap,
) -> Result<Json<PollReply>, RequestError> {
    let version = header(&headers, HEADER_VERSION);
    let (reply, note) = app.engine.poll(&client, version.as_deref()).await?;
    if let Some(note) = note {
        app.dispatch(note);
    }
    Ok(Json(reply))
}

// -- Middleware --

async fn authenticate(State(app): State<Arc<AppState>>, request: Request, next: Next) -> Response {
    if let Some(expected) = app.password.as_deref() {
        let supplied = request.headers().get(HEADER_PASSWORD).map(|v| v.as_bytes());
        if supplied != Some(expected.as_bytes()) {
            tracing::warn!(path = %request.uri().path(), "password mismatch");
            return RequestError::AuthRejected.into_response();
        }
    }
    next.run(request).await
}

impl IntoResponse for RequestError {
    fn into_response(self) -> Response {
        let status = match &self {
            RequestError::AuthRejected => StatusCode::UNAUTHORIZED,
            RequestError::ClipboardWrite(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        };
        tracing::debug!(reason = self.reason(), error = %self, "request rejected");
        let body = ErrorReply {
            error: self.reason().to_string(),
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

// -- Extraction --

/// Decoded `X-Client-Name`, or [`UNKNOWN_CLIENT`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientName(pub String);

impl<S: Send + Sync> FromRequestParts<S> for ClientName {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts.headers.get(HEADER_CLIENT_NAME).map(|v| v.as_bytes());
        Ok(ClientName(decode_client_name(raw)))
    }
}

/// Percent-decode a client name. Missing, blank or non-UTF-8 names fall
/// back to [`UNKNOWN_CLIENT`].
pub fn decode_client_name(raw: Option<&[u8]>) -> String {
    raw.and_then(|raw| percent_decode(raw).decode_utf8().ok())
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}

/// Header value as text; non-UTF-8 bytes are replaced rather than rejected.
fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn client_name_is_percent_decoded() {
        assert_eq!(decode_client_name(Some(b"My%20Phone".as_slice())), "My Phone");
        assert_eq!(
            decode_client_name(Some(b"%E5%B0%8F%E7%B1%B3".as_slice())),
            "\u{5c0f}\u{7c73}"
        );
    }

    #[test]
    fn client_name_fallbacks() {
        assert_eq!(decode_client_name(None), UNKNOWN_CLIENT);
        assert_eq!(decode_client_name(Some(b"".as_slice())), UNKNOWN_CLIENT);
        assert_eq!(decode_client_name(Some(b"%20%20".as_slice())), UNKNOWN_CLIENT);
        assert_eq!(decode_client_name(Some(b"%FF%FE".as_slice())), UNKNOWN_CLIENT);
    }

    #[test]
    fn header_lookup_and_absence() {
        let mut headers = HeaderMap::new();
        headers.insert(HEADER_VERSION, HeaderValue::from_static("12"));
        assert_eq!(header(&headers, HEADER_VERSION).as_deref(), Some("12"));
        assert_eq!(header(&headers, HEADER_CONTENT_TYPE), None);
    }

    #[test]
    fn error_status_codes() {
        assert_eq!(
            RequestError::MissingVersion.into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            RequestError::UnsupportedKind("file".into()).into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            RequestError::AuthRejected.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            RequestError::ClipboardWrite(crate::resolver::ResolverError::Clipboard("x".into()))
                .into_response()
                .status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}

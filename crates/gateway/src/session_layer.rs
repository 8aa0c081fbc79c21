//! Session load/save layer.
//!
//! Before the handler runs, the session id is read from the session cookie
//! and the subsession from the query string, and the matching record is
//! loaded into a [`SessionHandle`] request extension.  After the handler
//! returns, the handle decides what reaches the store:
//!
//! - untouched → nothing is written (reads never extend the TTL);
//! - modified → the full payload is rewritten with a fresh TTL;
//! - cleared → the record is deleted.
//!
//! A freshly generated session id is only issued as a cookie once something
//! has been written under it.

use std::collections::HashMap;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, HeaderValue, Request, StatusCode, Uri};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use cookie::{Cookie, SameSite};
use parking_lot::Mutex;
use serde_json::Value;

use ms_domain::config::is_url_safe_token;
use ms_domain::error::Error;
use ms_sessions::{Payload, RequestContext, WriteOptions};

use crate::state::AppState;

/// Named parameters of a request, taken from its query string.
///
/// A query string that does not parse yields an empty context.
pub fn request_context(uri: &Uri) -> RequestContext {
    Query::<HashMap<String, String>>::try_from_uri(uri)
        .map(|Query(params)| RequestContext::from_params(params))
        .unwrap_or_default()
}

/// Session id carried by the `cookie_name` cookie.
///
/// Values that could break key derivation (empty, or containing anything
/// beyond `[A-Za-z0-9-_.~]`) are ignored, which starts a new session.
pub fn session_cookie(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(Cookie::split_parse)
        .filter_map(Result::ok)
        .find(|c| c.name() == cookie_name)
        .map(|c| c.value().to_owned())
        .filter(|id| is_url_safe_token(id))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Change {
    Unchanged,
    Modified,
    Cleared,
}

#[derive(Debug)]
struct SessionState {
    id: String,
    payload: Payload,
    change: Change,
    is_new: bool,
}

/// The current request's session, shared between the layer and handlers.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    inner: Arc<Mutex<SessionState>>,
}

impl SessionHandle {
    pub fn new(id: String, payload: Payload, is_new: bool) -> Self {
        Self {
            inner: Arc::new(Mutex::new(SessionState {
                id,
                payload,
                change: Change::Unchanged,
                is_new,
            })),
        }
    }

    pub fn id(&self) -> String {
        self.inner.lock().id.clone()
    }

    /// Whether the session id was generated for this request.
    pub fn is_new(&self) -> bool {
        self.inner.lock().is_new
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.inner.lock().payload.get(key).cloned()
    }

    /// Snapshot of the whole payload.
    pub fn payload(&self) -> Payload {
        self.inner.lock().payload.clone()
    }

    pub fn insert(&self, key: impl Into<String>, value: Value) {
        let mut state = self.inner.lock();
        state.payload.insert(key.into(), value);
        state.change = Change::Modified;
    }

    pub fn remove(&self, key: &str) -> Option<Value> {
        let mut state = self.inner.lock();
        let removed = state.payload.remove(key);
        if removed.is_some() {
            state.change = Change::Modified;
        }
        removed
    }

    /// Replace the payload wholesale.
    pub fn replace(&self, payload: Payload) {
        let mut state = self.inner.lock();
        state.payload = payload;
        state.change = Change::Modified;
    }

    /// Drop the session; its record is deleted after the response.
    pub fn clear(&self) {
        let mut state = self.inner.lock();
        state.payload.clear();
        state.change = Change::Cleared;
    }

    fn take(&self) -> (String, Payload, Change, bool) {
        let mut state = self.inner.lock();
        let payload = std::mem::take(&mut state.payload);
        (state.id.clone(), payload, state.change, state.is_new)
    }
}

/// Axum middleware that loads the session before the handler and persists
/// it afterwards.  Attach via `axum::middleware::from_fn_with_state`.
pub async fn load_and_save_session(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let cookie_name = state.config.server.cookie_name.clone();
    let incoming = session_cookie(req.headers(), &cookie_name);
    let ctx = request_context(req.uri());

    let (session_id, payload) = match state.repo.find_session(&ctx, incoming.as_deref()).await {
        Ok(found) => found,
        Err(e) => return session_error("loading", e),
    };

    let handle = SessionHandle::new(session_id, payload, incoming.is_none());
    req.extensions_mut().insert(handle.clone());

    let mut response = next.run(req).await;

    let (session_id, payload, change, is_new) = handle.take();
    let options = WriteOptions::default();
    let written = match change {
        Change::Unchanged => return response,
        Change::Modified => {
            state
                .repo
                .write_session(&ctx, &session_id, Some(&payload), &options)
                .await
        }
        Change::Cleared => state.repo.delete_session(&ctx, &session_id, &options).await,
    };
    if let Err(e) = written {
        return session_error("saving", e);
    }

    if is_new && change == Change::Modified {
        let cookie = Cookie::build((cookie_name, session_id))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .build();
        match HeaderValue::from_str(&cookie.to_string()) {
            Ok(value) => {
                response.headers_mut().append(SET_COOKIE, value);
            }
            Err(e) => tracing::warn!(error = %e, "session cookie is not a valid header value"),
        }
    }

    response
}

fn session_error(action: &str, e: Error) -> Response {
    tracing::error!(error = %e, "{action} session failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({ "error": format!("{action} session failed: {e}") })),
    )
        .into_response()
}

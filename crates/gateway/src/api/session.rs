//! Session API endpoints.
//!
//! Every handler sees the session for the caller's current subsession via
//! the [`SessionHandle`] extension installed by the session layer.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use axum::Extension;
use serde::Deserialize;

use ms_sessions::Payload;

use crate::session_layer::{request_context, SessionHandle};
use crate::state::AppState;
use crate::url_options::{link_to, merge_url_options, UrlOptions};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// GET /v1/session
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Current subsession's payload.  The session id is only echoed for
/// sessions the client already holds a cookie for.
pub async fn show(
    State(state): State<AppState>,
    Extension(session): Extension<SessionHandle>,
    uri: axum::http::Uri,
) -> impl IntoResponse {
    let ctx = request_context(&uri);
    let subsession_id = ctx.param(state.repo.param_name()).map(str::to_owned);
    let session_id = (!session.is_new()).then(|| session.id());

    Json(serde_json::json!({
        "session_id": session_id,
        "is_new": session.is_new(),
        "subsession_id": subsession_id,
        "data": session.payload(),
    }))
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// PUT /v1/session
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Replace the payload wholesale.
pub async fn replace(
    Extension(session): Extension<SessionHandle>,
    Json(body): Json<Payload>,
) -> impl IntoResponse {
    session.replace(body);
    Json(serde_json::json!({ "data": session.payload() }))
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// PATCH /v1/session
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Set the given keys; a `null` value removes the key.
pub async fn merge(
    Extension(session): Extension<SessionHandle>,
    Json(body): Json<Payload>,
) -> impl IntoResponse {
    for (key, value) in body {
        if value.is_null() {
            session.remove(&key);
        } else {
            session.insert(key, value);
        }
    }
    Json(serde_json::json!({ "data": session.payload() }))
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// DELETE /v1/session
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub async fn clear(Extension(session): Extension<SessionHandle>) -> impl IntoResponse {
    session.clear();
    StatusCode::NO_CONTENT
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// GET /v1/url-options
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Deserialize)]
pub struct UrlOptionsQuery {
    /// Path to build an example link for.
    #[serde(default)]
    pub path: Option<String>,
}

/// Default link options for this request, and an example link that keeps
/// the caller inside the current subsession.
pub async fn url_options(
    State(state): State<AppState>,
    Query(query): Query<UrlOptionsQuery>,
    uri: axum::http::Uri,
) -> impl IntoResponse {
    let ctx = request_context(&uri);
    let options: UrlOptions = merge_url_options(None, &ctx, state.repo.param_name());
    let link = query.path.as_deref().map(|p| link_to(p, &options));

    Json(serde_json::json!({
        "options": options,
        "link": link,
    }))
}

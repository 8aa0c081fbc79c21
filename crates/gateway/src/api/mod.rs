pub mod session;

use axum::middleware;
use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::session_layer::load_and_save_session;
use crate::state::AppState;
use crate::subsession::assign_subsession;

/// Build the full HTTP router.
///
/// Routes are split into **stateless** ones (no session is loaded) and
/// **session** routes wrapped in the load/save layer.  Subsession
/// assignment wraps everything and therefore runs first.
pub fn router(state: AppState) -> Router {
    let stateless = Router::new().route("/health", get(health));

    let sessions = Router::new()
        .route(
            "/v1/session",
            get(session::show)
                .put(session::replace)
                .patch(session::merge)
                .delete(session::clear),
        )
        .route("/v1/url-options", get(session::url_options))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            load_and_save_session,
        ));

    stateless
        .merge(sessions)
        .layer(middleware::from_fn_with_state(
            state.subsession.clone(),
            assign_subsession,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

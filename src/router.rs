// src/router.rs
// Full application router: pages, static assets and the API behind the gates

use axum::{
    Router,
    extract::Request,
    http::{HeaderValue, header},
    middleware::{self, Next},
};
use tower_http::{set_header::SetResponseHeaderLayer, trace::TraceLayer};

use crate::api::api_router;
use crate::auth::require_auth;
use crate::session::session_layer;
use crate::state::AppState;
use crate::web::web_router;

/// Build the router with all endpoints.
///
/// Layer order (outermost first): tracing, session cookie, auth gate.
/// The session layer wraps the gate so a redirect to the login page still
/// carries a fresh session cookie.
pub fn create_router(state: AppState) -> Router {
    let secure = state.config.cookie_secure;

    let no_sniff = SetResponseHeaderLayer::if_not_present(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );

    Router::new()
        .merge(web_router())
        .nest("/api", api_router())
        .layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .layer(middleware::from_fn(move |req: Request, next: Next| session_layer(secure, req, next)))
        .layer(no_sniff)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

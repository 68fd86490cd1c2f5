//! HTTP route handlers and router assembly.
//!
//! - `campgrounds`: home page and campground CRUD
//! - `reviews`: posting and deleting reviews
//! - `users`: register, login, logout
//! - `health`: liveness and readiness checks

pub mod campgrounds;
pub mod health;
pub mod reviews;
pub mod users;

use std::any::Any;

use axum::{
    extract::DefaultBodyLimit,
    http::StatusCode,
    middleware::{from_fn, from_fn_with_state},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Router,
};
use tower_http::{
    catch_panic::CatchPanicLayer, compression::CompressionLayer, services::ServeDir, trace::TraceLayer,
};

use crate::middleware::{
    method_override::method_override_middleware, security_headers::security_headers_middleware,
    session::session_middleware, SessionContext,
};
use crate::state::AppState;
use crate::uploads::PUBLIC_PREFIX;
use crate::views;

/// Builds the full application.
///
/// The routed app is nested as the fallback service of an outer router so
/// that the `_method` override rewrites the method before routing happens.
/// Uploaded images are served from the upload directory.
pub fn router(state: AppState) -> Router {
    let body_limit = state.config.uploads.max_body_bytes;
    let routes = Router::new()
        .route("/", get(campgrounds::home))
        .route("/campgrounds", get(campgrounds::index).post(campgrounds::create))
        .route("/campgrounds/new", get(campgrounds::new_form))
        .route(
            "/campgrounds/{id}",
            get(campgrounds::show).put(campgrounds::update).delete(campgrounds::delete),
        )
        .route("/campgrounds/{id}/edit", get(campgrounds::edit_form))
        .route("/campgrounds/{id}/reviews", post(reviews::create))
        .route("/campgrounds/{id}/reviews/{review_id}", delete(reviews::delete))
        .route("/register", get(users::register_form).post(users::register))
        .route("/login", get(users::login_form).post(users::login))
        .route("/logout", get(users::logout))
        .route("/healthz", get(health::healthz))
        .route("/readyz", get(health::readyz))
        .nest_service(PUBLIC_PREFIX, ServeDir::new(state.images.root()))
        .fallback(not_found)
        .layer(from_fn_with_state(state.clone(), session_middleware))
        .with_state(state.clone());

    Router::new()
        .fallback_service(routes)
        .layer(from_fn(method_override_middleware))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(from_fn_with_state(state.config.clone(), security_headers_middleware))
        .layer(CatchPanicLayer::custom(handle_panic))
}

pub async fn not_found(session: SessionContext) -> Response {
    (StatusCode::NOT_FOUND, views::error_page(StatusCode::NOT_FOUND, "Page Not Found", Some(&session))).into_response()
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic payload".to_string()
    };
    tracing::error!("Handler panicked: {}", detail);
    let status = StatusCode::INTERNAL_SERVER_ERROR;
    (status, views::error_page(status, "Oh no, something went wrong!", None)).into_response()
}

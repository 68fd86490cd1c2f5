//! Tests that need the whole application: database, router and sessions.
//!
//! - **api_tests**: campground and review routes through the full router
//! - **auth_api_tests**: register, login, logout, flash and return-to behaviour
//! - **db_tests**: store functions against an in-memory database
//! - **config_tests**: configuration defaults and validation
//! - **error_tests**: mapping of errors to responses
//!
//! Shared fixtures live here.

mod auth_api_tests;

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, Response},
    Router,
};
use sqlx::sqlite::SqlitePoolOptions;
use tower::ServiceExt;

use crate::{
    config::AppConfig,
    db,
    geocode::Geocoder,
    state::AppState,
    store::{campgrounds, users},
    types::{Campground, CampgroundInput, GeoPoint, User},
};

pub(crate) const TAHOE: GeoPoint = GeoPoint { longitude: -120.04, latitude: 39.09 };

/// Answers every lookup with the same point.
pub(crate) struct FixedGeocoder;

#[async_trait]
impl Geocoder for FixedGeocoder {
    async fn locate(&self, _query: &str) -> anyhow::Result<Option<GeoPoint>> {
        Ok(Some(TAHOE))
    }
}

pub(crate) fn test_config() -> AppConfig {
    let mut cfg = AppConfig::default();
    cfg.auth.bcrypt_cost = 4;
    cfg.database.url = "sqlite::memory:".to_string();
    cfg.uploads.dir = std::env::temp_dir()
        .join(format!("yelpcamp-test-{}", uuid::Uuid::new_v4().simple()))
        .to_string_lossy()
        .into_owned();
    cfg
}

pub(crate) async fn test_state() -> AppState {
    let pool = SqlitePoolOptions::new().max_connections(1).connect("sqlite::memory:").await.unwrap();
    db::init_db(&pool).await.unwrap();
    AppState::with_geocoder(pool, test_config(), Arc::new(FixedGeocoder)).unwrap()
}

pub(crate) async fn test_app() -> (Router, AppState) {
    let state = test_state().await;
    (crate::routes::router(state.clone()), state)
}

pub(crate) async fn create_user(state: &AppState, username: &str) -> User {
    let hash = crate::auth::hash_password("secret", 4).await.unwrap();
    users::insert(&state.db, username, &format!("{}@example.com", username), &hash).await.unwrap()
}

pub(crate) fn lakeview_input() -> CampgroundInput {
    CampgroundInput {
        title: "Lakeview".to_string(),
        description: "Quiet sites by the water".to_string(),
        price: 25.0,
        location: "Lake Tahoe, CA".to_string(),
        images: vec!["https://res.cloudinary.com/demo/image/upload/lake.jpg".to_string()],
        uploaded: vec![],
        delete_images: vec![],
    }
}

pub(crate) async fn create_campground(state: &AppState, owner: &User) -> Campground {
    campgrounds::insert(&state.db, owner.id, &lakeview_input(), Some(TAHOE)).await.unwrap()
}

pub(crate) async fn send(app: &Router, req: Request<Body>) -> Response<Body> {
    app.clone().oneshot(req).await.unwrap()
}

pub(crate) fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(c) = cookie {
        builder = builder.header(header::COOKIE, c);
    }
    builder.body(Body::empty()).unwrap()
}

pub(crate) fn post_form(uri: &str, body: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(c) = cookie {
        builder = builder.header(header::COOKIE, c);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub(crate) async fn body_text(res: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub(crate) fn location(res: &Response<Body>) -> String {
    res.headers().get(header::LOCATION).and_then(|v| v.to_str().ok()).unwrap_or_default().to_string()
}

pub(crate) fn set_cookies(res: &Response<Body>) -> Vec<String> {
    res.headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .map(str::to_string)
        .collect()
}

pub(crate) const BOUNDARY: &str = "yelpcamp-boundary";

/// Text part of a multipart body.
pub(crate) fn text_part(name: &str, value: &str) -> Vec<u8> {
    format!("--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n", BOUNDARY, name, value).into_bytes()
}

/// File part of a multipart body.
pub(crate) fn file_part(name: &str, file_name: &str, content_type: &str, bytes: &[u8]) -> Vec<u8> {
    let mut part = format!(
        "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
        BOUNDARY, name, file_name, content_type
    )
    .into_bytes();
    part.extend_from_slice(bytes);
    part.extend_from_slice(b"\r\n");
    part
}

pub(crate) fn post_multipart(uri: &str, parts: Vec<Vec<u8>>, cookie: Option<&str>) -> Request<Body> {
    let mut body: Vec<u8> = parts.concat();
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={}", BOUNDARY));
    if let Some(c) = cookie {
        builder = builder.header(header::COOKIE, c);
    }
    builder.body(Body::from(body)).unwrap()
}

/// `name=value` pair of a cookie set (not removed) by the response.
pub(crate) fn cookie_pair(res: &Response<Body>, name: &str) -> Option<String> {
    set_cookies(res)
        .into_iter()
        .filter(|c| !c.contains("Max-Age=0"))
        .filter_map(|c| c.split(';').next().map(str::to_string))
        .find(|pair| pair.starts_with(&format!("{}=", name)))
}

pub(crate) fn removes_cookie(res: &Response<Body>, name: &str) -> bool {
    set_cookies(res).iter().any(|c| c.starts_with(&format!("{}=", name)) && c.contains("Max-Age=0"))
}

/// Logs in through the real route and returns the `Cookie` header value.
pub(crate) async fn login(app: &Router, username: &str) -> String {
    let res = send(app, post_form("/login", &format!("username={}&password=secret", username), None)).await;
    assert_eq!(res.status(), axum::http::StatusCode::SEE_OTHER);
    cookie_pair(&res, "session").expect("login sets the session cookie")
}

pub(crate) const LAKEVIEW_FORM: &str =
    "campground%5Btitle%5D=Lakeview&campground%5Bprice%5D=25&campground%5Blocation%5D=Lake+Tahoe%2C+CA";

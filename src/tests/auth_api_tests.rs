use axum::http::StatusCode;

use super::*;
use crate::store::users;

#[tokio::test]
async fn test_register_logs_in_and_redirects() {
    let (app, state) = test_app().await;

    let res = send(&app, post_form("/register", "username=ursula&email=ursula%40example.com&password=pw", None)).await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&res), "/campgrounds");
    let session = cookie_pair(&res, "session").unwrap();
    let flash = cookie_pair(&res, "flash").unwrap();

    let page = body_text(send(&app, get("/campgrounds", Some(&format!("{}; {}", session, flash)))).await).await;
    assert!(page.contains("Welcome to Yelp Camp!"));
    assert!(page.contains("ursula"));
    assert!(page.contains("/logout"));

    let creds = users::find_credentials(&state.db, "ursula").await.unwrap().unwrap();
    assert_ne!(creds.password_hash, "pw");
}

#[tokio::test]
async fn test_register_duplicate_username_flashes_error() {
    let (app, state) = test_app().await;
    create_user(&state, "ursula").await;

    let res = send(&app, post_form("/register", "username=ursula&email=other%40example.com&password=pw", None)).await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&res), "/register");
    assert!(cookie_pair(&res, "session").is_none());

    let flash = cookie_pair(&res, "flash").unwrap();
    let page = body_text(send(&app, get("/register", Some(&flash))).await).await;
    assert!(page.contains("already registered"));
}

#[tokio::test]
async fn test_register_missing_fields_flashes_error() {
    let (app, _) = test_app().await;
    let res = send(&app, post_form("/register", "username=&email=nope&password=", None)).await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&res), "/register");
    assert!(cookie_pair(&res, "session").is_none());
}

#[tokio::test]
async fn test_login_with_wrong_password() {
    let (app, state) = test_app().await;
    create_user(&state, "ursula").await;

    let res = send(&app, post_form("/login", "username=ursula&password=wrong", None)).await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&res), "/login");
    assert!(cookie_pair(&res, "session").is_none());

    let flash = cookie_pair(&res, "flash").unwrap();
    let page = body_text(send(&app, get("/login", Some(&flash))).await).await;
    assert!(page.contains("Password or username is incorrect"));

    let res = send(&app, post_form("/login", "username=nobody&password=secret", None)).await;
    assert_eq!(location(&res), "/login");
}

#[tokio::test]
async fn test_logout_removes_session_cookie() {
    let (app, state) = test_app().await;
    create_user(&state, "ursula").await;
    let cookie = login(&app, "ursula").await;

    let res = send(&app, get("/logout", Some(&cookie))).await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&res), "/campgrounds");
    assert!(removes_cookie(&res, "session"));
}

#[tokio::test]
async fn test_tampered_session_cookie_is_anonymous() {
    let (app, state) = test_app().await;
    let user = create_user(&state, "ursula").await;

    // unsigned value
    let forged = format!("session={}", user.id);
    let res = send(&app, get("/campgrounds/new", Some(&forged))).await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&res), "/login");
}

#[tokio::test]
async fn test_flash_is_shown_once() {
    let (app, state) = test_app().await;
    create_user(&state, "ursula").await;

    let res = send(&app, post_form("/login", "username=ursula&password=secret", None)).await;
    let session = cookie_pair(&res, "session").unwrap();
    let flash = cookie_pair(&res, "flash").unwrap();
    let cookie = format!("{}; {}", session, flash);

    let res = send(&app, get("/campgrounds", Some(&cookie))).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert!(removes_cookie(&res, "flash"));
    assert!(body_text(res).await.contains("Welcome back!"));

    let page = body_text(send(&app, get("/campgrounds", Some(&session))).await).await;
    assert!(!page.contains("Welcome back!"));
}

#[tokio::test]
async fn test_flash_survives_redirect_chain() {
    let (app, _) = test_app().await;

    let res = send(&app, get("/campgrounds/not-an-id", None)).await;
    let flash = cookie_pair(&res, "flash").unwrap();

    // a redirect does not consume the pending flash
    let res = send(&app, get("/campgrounds/new", Some(&flash))).await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert!(!removes_cookie(&res, "flash"));
}

#[tokio::test]
async fn test_login_returns_to_requested_page() {
    let (app, state) = test_app().await;
    let owner = create_user(&state, "ursula").await;
    let camp = create_campground(&state, &owner).await;
    let edit = format!("{}/edit", camp.path());

    let res = send(&app, get(&edit, None)).await;
    assert_eq!(location(&res), "/login");
    let return_to = cookie_pair(&res, "return_to").unwrap();

    let res = send(&app, post_form("/login", "username=ursula&password=secret", Some(&return_to))).await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&res), edit);
    assert!(removes_cookie(&res, "return_to"));

    let session = cookie_pair(&res, "session").unwrap();
    let res = send(&app, get(&edit, Some(&session))).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert!(body_text(res).await.contains("Edit Campground"));
}

#[tokio::test]
async fn test_forged_return_to_is_ignored() {
    let (app, state) = test_app().await;
    create_user(&state, "ursula").await;

    let res = send(&app, post_form("/login", "username=ursula&password=secret", Some("return_to=/campgrounds/new"))).await;
    assert_eq!(location(&res), "/campgrounds");
}

#[tokio::test]
async fn test_flash_survives_health_checks_and_unrendered_error_pages() {
    let (app, state) = test_app().await;
    let owner = create_user(&state, "ursula").await;
    let camp = create_campground(&state, &owner).await;
    let session = login(&app, "ursula").await;

    let res = send(&app, post_form(&format!("{}?_method=DELETE", camp.path()), "", Some(&session))).await;
    let flash = cookie_pair(&res, "flash").unwrap();
    let cookie = format!("{}; {}", session, flash);

    for uri in ["/healthz", "/readyz"] {
        let res = send(&app, get(uri, Some(&cookie))).await;
        assert_eq!(res.status(), StatusCode::OK);
        assert!(!removes_cookie(&res, "flash"), "{} consumed the flash", uri);
    }

    // a validation failure page is rendered without the session
    let res = send(&app, post_form("/campgrounds", "campground%5Bprice%5D=-1", Some(&cookie))).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert!(!removes_cookie(&res, "flash"));

    let res = send(&app, get("/nope", Some(&cookie))).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert!(removes_cookie(&res, "flash"));
    assert!(body_text(res).await.contains("Successfully deleted campground!"));
}

#[tokio::test]
async fn test_account_forms_with_wrong_content_type_render_bad_request() {
    let (app, _) = test_app().await;

    for uri in ["/login", "/register"] {
        let req = axum::http::Request::builder()
            .method("POST")
            .uri(uri)
            .header(axum::http::header::CONTENT_TYPE, "text/plain")
            .body(axum::body::Body::from("username=ursula"))
            .unwrap();
        let res = send(&app, req).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST, "{}", uri);
        assert!(body_text(res).await.contains("400 Bad Request"));
    }
}

mod common;

use axum::http::{Method, StatusCode};
use common::{routes, TestApp};
use serde_json::{json, Value};

async fn register(app: &TestApp, username: &str, email: &str, password: &str) -> (StatusCode, Value) {
    app.request(
        Method::POST,
        routes::REGISTER,
        None,
        Some(json!({"username": username, "email": email, "password": password})),
    )
    .await
}

#[tokio::test]
async fn register_issues_a_working_token() {
    let app = TestApp::new();

    let (status, body) = register(&app, "reader", "Reader@Example.com", "secret123").await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["user"]["email"], "reader@example.com");
    assert_eq!(body["user"]["username"], "reader");
    assert!(body["user"]["profileImage"]
        .as_str()
        .unwrap()
        .contains("seed=reader"));
    assert!(body["user"].get("hashedPassword").is_none());

    let token = body["token"].as_str().unwrap();
    let (status, books) = app
        .request(Method::GET, routes::USER_BOOKS, Some(token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(books, json!([]));
}

#[tokio::test]
async fn register_validates_fields() {
    let app = TestApp::new();

    let (status, _) = register(&app, "reader", "reader@example.com", "123").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = register(&app, "ab", "reader@example.com", "secret123").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = register(&app, "reader", "", "secret123").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .request(Method::POST, routes::REGISTER, None, Some(json!({"username": "reader"})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn register_rejects_duplicates() {
    let app = TestApp::new();
    let (status, _) = register(&app, "reader", "reader@example.com", "secret123").await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = register(&app, "reader", "other@example.com", "secret123").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("already exists"));

    let (status, _) = register(&app, "another", "READER@example.com", "secret123").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn login_checks_the_password() {
    let app = TestApp::new();
    register(&app, "reader", "reader@example.com", "secret123").await;

    let (status, body) = app
        .request(
            Method::POST,
            routes::LOGIN,
            None,
            Some(json!({"email": "reader@example.com", "password": "wrong-password"})),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid credentials");

    let (status, _) = app
        .request(
            Method::POST,
            routes::LOGIN,
            None,
            Some(json!({"email": "nobody@example.com", "password": "secret123"})),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app
        .request(
            Method::POST,
            routes::LOGIN,
            None,
            Some(json!({"email": "reader@example.com", "password": "secret123"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["username"], "reader");
    assert!(body["token"].is_string());
}

#[tokio::test]
async fn login_requires_both_fields() {
    let app = TestApp::new();

    let (status, _) = app
        .request(Method::POST, routes::LOGIN, None, Some(json!({"email": "a@b.c"})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn logout_revokes_the_token() {
    let app = TestApp::new();
    let alice = app.user("alice").await;

    let (status, _) = app
        .request(Method::POST, routes::LOGOUT, Some(&alice.token), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.get(routes::BOOKS, &alice).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.request(Method::POST, routes::LOGOUT, None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn expired_token_is_rejected() {
    let app = TestApp::new();
    let user = app.db.seed_user("reader").await;
    let now = chrono::Utc::now();
    app.db
        .seed_session_expiring("stale", user.id, now - chrono::Duration::seconds(1));
    app.db
        .seed_session_expiring("fresh", user.id, now + chrono::Duration::hours(1));

    let (status, body) = app
        .request(Method::GET, routes::BOOKS, Some("stale"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["message"].is_string());

    let (status, _) = app
        .request(Method::GET, routes::BOOKS, Some("fresh"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn health_is_public() {
    let app = TestApp::new();

    let (status, body) = app.request(Method::GET, "/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!("ok"));
}

#![allow(dead_code)]

use std::sync::Arc;

use api_lib::web::{self, state::AppState};
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use bookshare_core::testing::{FakeMediaStore, InMemoryDatabase};
use chrono::Duration;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

pub const IMAGE: &str = "data:image/png;base64,aGVsbG8=";

pub mod routes {
    pub const REGISTER: &str = "/api/auth/register";
    pub const LOGIN: &str = "/api/auth/login";
    pub const LOGOUT: &str = "/api/auth/logout";
    pub const BOOKS: &str = "/api/books";
    pub const USER_BOOKS: &str = "/api/books/user";

    pub fn book(id: impl std::fmt::Display) -> String {
        format!("/api/books/{id}")
    }

    pub fn search(title: &str) -> String {
        format!("/api/books/title?title={title}")
    }

    pub fn page(page: &str, limit: &str) -> String {
        format!("/api/books?page={page}&limit={limit}")
    }
}

/// The full router wired to in-memory ports.
pub struct TestApp {
    pub router: Router,
    pub db: Arc<InMemoryDatabase>,
    pub media: Arc<FakeMediaStore>,
}

pub struct TestUser {
    pub id: Uuid,
    pub token: String,
}

impl TestApp {
    pub fn new() -> Self {
        let db = Arc::new(InMemoryDatabase::new());
        let media = Arc::new(FakeMediaStore::new());
        let state = Arc::new(AppState::new(db.clone(), media.clone(), Duration::days(1)));
        Self {
            router: web::router(state),
            db,
            media,
        }
    }

    /// Seeds a user directly in the store and hands out a token for it.
    pub async fn user(&self, username: &str) -> TestUser {
        let user = self.db.seed_user(username).await;
        let token = format!("token-{}", username);
        self.db.seed_session(&token, user.id);
        TestUser { id: user.id, token }
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let response = self
            .router
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
        (status, value)
    }

    pub async fn get(&self, uri: &str, user: &TestUser) -> (StatusCode, Value) {
        self.request(Method::GET, uri, Some(&user.token), None).await
    }

    pub async fn delete(&self, uri: &str, user: &TestUser) -> (StatusCode, Value) {
        self.request(Method::DELETE, uri, Some(&user.token), None).await
    }

    /// Creates a book through the API and returns its JSON.
    pub async fn create_book(&self, user: &TestUser, title: &str, rating: i64) -> Value {
        let (status, body) = self
            .request(
                Method::POST,
                routes::BOOKS,
                Some(&user.token),
                Some(json!({
                    "title": title,
                    "caption": "A caption",
                    "rating": rating,
                    "image": IMAGE,
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create failed: {body}");
        body
    }
}

mod common;

use axum::http::{Method, StatusCode};
use common::{routes, TestApp, IMAGE};
use serde_json::{json, Value};

fn ids(books: &Value) -> Vec<String> {
    books
        .as_array()
        .unwrap()
        .iter()
        .map(|b| b["_id"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn create_returns_hosted_book_owned_by_caller() {
    let app = TestApp::new();
    let alice = app.user("alice").await;

    let book = app.create_book(&alice, "Dune", 5).await;

    assert_eq!(book["user"], json!(alice.id));
    assert_eq!(book["rating"], 5);
    let image = book["image"].as_str().unwrap();
    assert!(image.starts_with("https://"));
    assert_ne!(image, IMAGE);
    assert!(book["createdAt"].is_string());
}

#[tokio::test]
async fn create_accepts_rating_as_string() {
    let app = TestApp::new();
    let alice = app.user("alice").await;

    let (status, body) = app
        .request(
            Method::POST,
            routes::BOOKS,
            Some(&alice.token),
            Some(json!({"title": "Dune", "caption": "Spice", "rating": "3", "image": IMAGE})),
        )
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["rating"], 3);
}

#[tokio::test]
async fn create_rejects_invalid_input_without_uploading() {
    let app = TestApp::new();
    let alice = app.user("alice").await;

    let cases = [
        json!({"caption": "Spice", "rating": 3, "image": IMAGE}),
        json!({"title": "Dune", "caption": "", "rating": 3, "image": IMAGE}),
        json!({"title": "Dune", "caption": "Spice", "image": IMAGE}),
        json!({"title": "Dune", "caption": "Spice", "rating": 3}),
        json!({"title": "Dune", "caption": "Spice", "rating": 0, "image": IMAGE}),
        json!({"title": "Dune", "caption": "Spice", "rating": "five", "image": IMAGE}),
        json!({"title": "Dune", "caption": "Spice", "rating": 3, "image": "https://x.test/a.png"}),
    ];
    for body in cases {
        let (status, response) = app
            .request(Method::POST, routes::BOOKS, Some(&alice.token), Some(body.clone()))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "accepted {body}");
        assert!(response["message"].is_string());
    }

    assert_eq!(app.media.uploads(), 0);
    let (_, page) = app.get(routes::BOOKS, &alice).await;
    assert_eq!(page["totalBooks"], 0);
}

#[tokio::test]
async fn create_reports_upload_failure_as_server_error() {
    let app = TestApp::new();
    let alice = app.user("alice").await;
    app.media.fail_uploads(true);

    let (status, body) = app
        .request(
            Method::POST,
            routes::BOOKS,
            Some(&alice.token),
            Some(json!({"title": "Dune", "caption": "Spice", "rating": 3, "image": IMAGE})),
        )
        .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["message"].is_string());
    let (_, page) = app.get(routes::BOOKS, &alice).await;
    assert_eq!(page["totalBooks"], 0);
}

#[tokio::test]
async fn book_routes_require_a_valid_token() {
    let app = TestApp::new();

    let (status, body) = app.request(Method::GET, routes::BOOKS, None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["message"].is_string());

    let (status, _) = app
        .request(Method::GET, routes::USER_BOOKS, Some("forged"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn feed_paginates_newest_first() {
    let app = TestApp::new();
    let alice = app.user("alice").await;
    for i in 0..12 {
        app.create_book(&alice, &format!("Book {i}"), 4).await;
    }

    let (status, page) = app.get(&routes::page("2", "5"), &alice).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["currentPage"], 2);
    assert_eq!(page["totalBooks"], 12);
    assert_eq!(page["totalPages"], 3);
    let books = page["books"].as_array().unwrap();
    assert_eq!(books.len(), 5);
    assert_eq!(books[0]["title"], "Book 6");
    assert_eq!(books[4]["title"], "Book 2");

    let dates: Vec<&str> = books.iter().map(|b| b["createdAt"].as_str().unwrap()).collect();
    let parsed: Vec<chrono::DateTime<chrono::Utc>> =
        dates.iter().map(|d| d.parse().unwrap()).collect();
    assert!(parsed.windows(2).all(|w| w[0] > w[1]));

    let (_, last) = app.get(&routes::page("3", "5"), &alice).await;
    assert_eq!(last["books"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn feed_falls_back_to_defaults_and_caps_limit() {
    let app = TestApp::new();
    let alice = app.user("alice").await;
    for i in 0..11 {
        app.create_book(&alice, &format!("Book {i}"), 2).await;
    }

    let (_, page) = app.get(&routes::page("abc", "-1"), &alice).await;
    assert_eq!(page["currentPage"], 1);
    assert_eq!(page["books"].as_array().unwrap().len(), 10);
    assert_eq!(page["totalPages"], 2);

    let (_, page) = app.get(&routes::page("1", "500"), &alice).await;
    assert_eq!(page["books"].as_array().unwrap().len(), 11);
    assert_eq!(page["totalPages"], 1);
}

#[tokio::test]
async fn feed_expands_owner_to_public_fields_only() {
    let app = TestApp::new();
    let alice = app.user("alice").await;
    let bob = app.user("bob").await;
    app.create_book(&alice, "Dune", 5).await;

    let (_, page) = app.get(routes::BOOKS, &bob).await;
    let owner = page["books"][0]["user"].as_object().unwrap();

    let mut keys: Vec<&str> = owner.keys().map(String::as_str).collect();
    keys.sort();
    assert_eq!(keys, ["_id", "profileImage", "username"]);
    assert_eq!(owner["username"], "alice");
}

#[tokio::test]
async fn user_books_lists_only_the_callers_books() {
    let app = TestApp::new();
    let alice = app.user("alice").await;
    let bob = app.user("bob").await;
    app.create_book(&alice, "First", 3).await;
    let newest = app.create_book(&alice, "Second", 4).await;
    app.create_book(&bob, "Bob's", 1).await;

    let (status, books) = app.get(routes::USER_BOOKS, &alice).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(books.as_array().unwrap().len(), 2);
    assert_eq!(books[0]["_id"], newest["_id"]);

    let carol = app.user("carol").await;
    let (status, books) = app.get(routes::USER_BOOKS, &carol).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(books, json!([]));
}

#[tokio::test]
async fn search_is_case_insensitive() {
    let app = TestApp::new();
    let alice = app.user("alice").await;
    let review = app.create_book(&alice, "My BOOK Review", 4).await;
    app.create_book(&alice, "Unrelated", 4).await;

    let (status, books) = app.get(&routes::search("book"), &alice).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&books), vec![review["_id"].as_str().unwrap().to_string()]);
    assert_eq!(books[0]["user"]["username"], "alice");
}

#[tokio::test]
async fn search_without_matches_is_not_found() {
    let app = TestApp::new();
    let alice = app.user("alice").await;
    app.create_book(&alice, "Dune", 4).await;

    let (status, body) = app.get(&routes::search("zzz"), &alice).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["message"].is_string());

    let (status, _) = app.get("/api/books/title", &alice).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = app.get(&routes::search(""), &alice).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn non_owner_cannot_delete() {
    let app = TestApp::new();
    let alice = app.user("alice").await;
    let bob = app.user("bob").await;
    let book = app.create_book(&alice, "Dune", 5).await;
    let id = book["_id"].as_str().unwrap();

    let (status, body) = app.delete(&routes::book(id), &bob).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body["message"].is_string());
    let (_, books) = app.get(routes::USER_BOOKS, &alice).await;
    assert_eq!(ids(&books), vec![id.to_string()]);
    assert!(app.media.deleted().is_empty());
}

#[tokio::test]
async fn delete_missing_book_is_not_found() {
    let app = TestApp::new();
    let alice = app.user("alice").await;

    let (status, _) = app.delete(&routes::book(uuid::Uuid::new_v4()), &alice).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.delete(&routes::book("not-a-uuid"), &alice).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_succeeds_even_when_image_cleanup_fails() {
    let app = TestApp::new();
    let alice = app.user("alice").await;
    let book = app.create_book(&alice, "Dune", 5).await;
    app.media.fail_deletes(true);

    let (status, body) = app
        .delete(&routes::book(book["_id"].as_str().unwrap()), &alice)
        .await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["message"].is_string());
    assert_eq!(app.media.delete_attempts().len(), 1);
    assert!(app.media.deleted().is_empty());
    let (_, page) = app.get(routes::BOOKS, &alice).await;
    assert_eq!(page["books"], json!([]));
}

#[tokio::test]
async fn create_list_delete_round_trip() {
    let app = TestApp::new();
    let alice = app.user("alice").await;

    let book = app.create_book(&alice, "Dune", 3).await;
    let (_, books) = app.get(routes::USER_BOOKS, &alice).await;
    assert_eq!(books[0]["_id"], book["_id"]);
    assert_eq!(books[0]["rating"], 3);

    let (status, _) = app
        .delete(&routes::book(book["_id"].as_str().unwrap()), &alice)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.media.deleted().len(), 1);

    let (_, books) = app.get(routes::USER_BOOKS, &alice).await;
    assert_eq!(books, json!([]));
}

//! Drives the client against the real router served over loopback, backed by
//! in-memory ports.

use std::sync::Arc;

use api_lib::web::{self, state::AppState};
use bookshare_client::{
    format_shared_date, BookApi, ClientError, FeedController, FeedMode, FetchOutcome,
    MemoryCredentialStore, NewBook, OwnBooks, SessionContext,
};
use bookshare_core::testing::{FakeMediaStore, InMemoryDatabase};

const COVER: &str = "aGVsbG8=";

async fn serve() -> (BookApi, Arc<FakeMediaStore>) {
    let db = Arc::new(InMemoryDatabase::new());
    let media = Arc::new(FakeMediaStore::new());
    let state = Arc::new(AppState::new(db, media.clone(), chrono::Duration::days(1)));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, web::router(state)).await.unwrap();
    });
    (BookApi::new(format!("http://{addr}")), media)
}

fn new_book(title: &str, rating: u8) -> NewBook {
    NewBook::new(title, "Worth reading", rating, COVER, "cover.png").unwrap()
}

#[tokio::test]
async fn share_browse_and_delete() {
    let (api, media) = serve().await;
    let store = Arc::new(MemoryCredentialStore::new());
    let mut ctx = SessionContext::init(store.clone()).await.unwrap();

    let auth = api
        .register("alice", "alice@example.com", "secret123")
        .await
        .unwrap();
    let session = ctx.refresh(auth).await.unwrap().clone();

    let created = api.create_book(&session, &new_book("Dune", 3)).await.unwrap();
    assert_eq!(created.user, session.user.id);
    assert!(created.image.starts_with(FakeMediaStore::HOST));
    assert!(!format_shared_date(created.created_at).is_empty());

    let mut shelf = OwnBooks::new();
    shelf.load(&api, &session).await.unwrap();
    assert_eq!(shelf.books()[0].id, created.id);
    assert_eq!(shelf.books()[0].rating, 3);

    shelf.delete(&api, &session, created.id).await.unwrap();
    assert!(shelf.books().is_empty());
    assert_eq!(media.deleted().len(), 1);

    shelf.load(&api, &session).await.unwrap();
    assert!(shelf.books().is_empty());
}

#[tokio::test]
async fn feed_pages_and_searches_over_http() {
    let (api, _media) = serve().await;
    let auth = api
        .register("alice", "alice@example.com", "secret123")
        .await
        .unwrap();
    let session = bookshare_client::Session::from(auth);

    for i in 0..7 {
        api.create_book(&session, &new_book(&format!("Volume {i}"), 4))
            .await
            .unwrap();
    }
    api.create_book(&session, &new_book("My BOOK Review", 5))
        .await
        .unwrap();

    let feed = FeedController::new(api.feed(session.clone()));
    feed.load_initial().await.unwrap();
    let snapshot = feed.snapshot().await;
    assert_eq!(snapshot.books.len(), 5);
    assert_eq!(snapshot.books[0].title, "My BOOK Review");
    assert_eq!(snapshot.books[0].user.username, "alice");
    assert!(snapshot.has_more);

    feed.load_more().await.unwrap();
    let snapshot = feed.snapshot().await;
    assert_eq!(snapshot.books.len(), 8);
    assert!(!snapshot.has_more);
    assert_eq!(feed.load_more().await.unwrap(), FetchOutcome::Skipped);

    feed.search("book").await.unwrap();
    let snapshot = feed.snapshot().await;
    assert_eq!(snapshot.mode, FeedMode::Search("book".to_string()));
    assert_eq!(snapshot.books.len(), 1);

    feed.search("no such title").await.unwrap();
    assert!(feed.snapshot().await.books.is_empty());

    feed.clear_search().await.unwrap();
    assert_eq!(feed.snapshot().await.books.len(), 5);
}

#[tokio::test]
async fn errors_carry_the_server_message() {
    let (api, _media) = serve().await;
    let alice = bookshare_client::Session::from(
        api.register("alice", "alice@example.com", "secret123")
            .await
            .unwrap(),
    );
    let bob = bookshare_client::Session::from(
        api.register("bob", "bob@example.com", "secret123")
            .await
            .unwrap(),
    );
    let book = api.create_book(&alice, &new_book("Dune", 5)).await.unwrap();

    let err = api.delete_book(&bob, book.id).await.unwrap_err();
    assert_eq!(err.status().map(|s| s.as_u16()), Some(403));

    let err = api.login("alice@example.com", "wrong-password").await.unwrap_err();
    assert!(err.is_unauthorized());
    assert!(matches!(err, ClientError::Api { ref message, .. } if message == "Invalid credentials"));

    api.logout(&alice).await.unwrap();
    let err = api.list_my_books(&alice).await.unwrap_err();
    assert!(err.is_unauthorized());
}

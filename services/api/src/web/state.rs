//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use bookshare_core::ports::{DatabaseService, MediaStorageService};
use bookshare_core::BookService;
use chrono::Duration;
use std::sync::Arc;

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn DatabaseService>,
    pub books: BookService,
    /// Lifetime of a bearer token issued at login/registration.
    pub session_ttl: Duration,
}

impl AppState {
    pub fn new(
        db: Arc<dyn DatabaseService>,
        media: Arc<dyn MediaStorageService>,
        session_ttl: Duration,
    ) -> Self {
        Self {
            books: BookService::new(db.clone(), media),
            db,
            session_ttl,
        }
    }
}

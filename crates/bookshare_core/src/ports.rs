//! crates/bookshare_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like databases or APIs.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{
    Book, BookWithOwner, ImagePayload, NewBook, UploadedImage, User, UserCredentials,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
    #[error("Unauthorized")]
    Unauthorized,
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait DatabaseService: Send + Sync {
    // --- User Management ---
    async fn create_user(
        &self,
        username: &str,
        email: &str,
        hashed_password: &str,
        profile_image: &str,
    ) -> PortResult<User>;

    async fn get_user_by_id(&self, user_id: Uuid) -> PortResult<User>;

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials>;

    // --- Auth Methods ---
    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()>;

    /// Resolves a live (non-expired) session to its user id.
    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid>;

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()>;

    // --- Book Management ---
    async fn create_book(&self, book: NewBook) -> PortResult<Book>;

    async fn get_book_by_id(&self, book_id: Uuid) -> PortResult<Book>;

    /// Newest first, skipping `offset` books.
    async fn list_books(&self, offset: u64, limit: u32) -> PortResult<Vec<BookWithOwner>>;

    async fn count_books(&self) -> PortResult<u64>;

    async fn list_books_by_owner(&self, owner_id: Uuid) -> PortResult<Vec<Book>>;

    /// Case-insensitive substring match on the title, newest first.
    async fn search_books_by_title(&self, query: &str) -> PortResult<Vec<BookWithOwner>>;

    async fn delete_book(&self, book_id: Uuid) -> PortResult<()>;
}

#[async_trait]
pub trait MediaStorageService: Send + Sync {
    /// Uploads an image and returns its durable, publicly reachable URL.
    async fn upload_image(&self, image: &ImagePayload) -> PortResult<UploadedImage>;

    /// Extracts the asset identifier from a URL, or `None` if this store
    /// does not host it.
    fn public_id_from_url(&self, url: &str) -> Option<String>;

    async fn delete_image(&self, public_id: &str) -> PortResult<()>;
}

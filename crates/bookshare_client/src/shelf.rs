//! crates/bookshare_client/src/shelf.rs
//!
//! The caller's own recommendations, as shown on the profile screen.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::api::BookApi;
use crate::error::ClientError;
use crate::models::OwnBook;
use crate::session::Session;

#[derive(Debug, Default)]
pub struct OwnBooks {
    books: Vec<OwnBook>,
}

impl OwnBooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn books(&self) -> &[OwnBook] {
        &self.books
    }

    pub async fn load(&mut self, api: &BookApi, session: &Session) -> Result<(), ClientError> {
        self.books = api.list_my_books(session).await?;
        Ok(())
    }

    /// Deletes on the server, then drops the book locally. On failure the
    /// list is left untouched.
    pub async fn delete(
        &mut self,
        api: &BookApi,
        session: &Session,
        id: Uuid,
    ) -> Result<String, ClientError> {
        let message = api.delete_book(session, id).await?;
        self.books.retain(|b| b.id != id);
        Ok(message)
    }
}

/// Renders a share date the way the app shows it, e.g. `5.3.2024`.
pub fn format_shared_date(date: DateTime<Utc>) -> String {
    date.format("%-d.%-m.%Y").to_string()
}

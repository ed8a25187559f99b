//! crates/bookshare_core/src/books.rs
//!
//! The book feed service: creation, the paginated feed, the owner's shelf,
//! title search and owner-authorized deletion. It only talks to the outside
//! world through the `DatabaseService` and `MediaStorageService` ports.

use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::{Book, BookPage, BookWithOwner, DomainError, ImagePayload, NewBook, Rating};
use crate::pagination::{total_pages, PageRequest};
use crate::ports::{DatabaseService, MediaStorageService, PortError};

//=========================================================================================
// Error Type
//=========================================================================================

/// Failure kinds of the feed service, each mapped to one wire status at the
/// HTTP boundary. Missing credentials never reach the service; the auth guard
/// rejects them before a `Caller` exists.
#[derive(Debug, thiserror::Error)]
pub enum BookError {
    #[error("{0}")]
    InvalidInput(String),
    #[error("You can only delete your own books")]
    Forbidden,
    #[error("{0}")]
    NotFound(String),
    #[error("Upstream failure: {0}")]
    Upstream(PortError),
}

impl From<PortError> for BookError {
    fn from(e: PortError) -> Self {
        match e {
            PortError::NotFound(msg) => BookError::NotFound(msg),
            other => BookError::Upstream(other),
        }
    }
}

impl From<DomainError> for BookError {
    fn from(e: DomainError) -> Self {
        BookError::InvalidInput(e.to_string())
    }
}

pub type BookResult<T> = Result<T, BookError>;

//=========================================================================================
// Inputs
//=========================================================================================

/// The identity resolved by the auth guard for the current request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Caller {
    pub user_id: Uuid,
}

impl Caller {
    pub fn new(user_id: Uuid) -> Self {
        Self { user_id }
    }
}

/// Unvalidated fields of a create request, exactly as the client sent them.
#[derive(Debug, Clone, Default)]
pub struct CreateBookInput {
    pub title: Option<String>,
    pub caption: Option<String>,
    pub rating: Option<i64>,
    pub image: Option<String>,
}

/// Port errors for a single-book lookup, with a client-facing not-found message.
fn book_lookup(e: PortError) -> BookError {
    match BookError::from(e) {
        BookError::NotFound(_) => BookError::NotFound("Book not found".to_string()),
        other => other,
    }
}

fn required(field: Option<String>) -> Option<String> {
    field
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

//=========================================================================================
// The Service
//=========================================================================================

#[derive(Clone)]
pub struct BookService {
    db: Arc<dyn DatabaseService>,
    media: Arc<dyn MediaStorageService>,
}

impl BookService {
    pub fn new(db: Arc<dyn DatabaseService>, media: Arc<dyn MediaStorageService>) -> Self {
        Self { db, media }
    }

    /// Validates, uploads the image, then persists the book.
    ///
    /// Nothing is written anywhere when validation fails, and no book is
    /// stored when the upload fails.
    pub async fn create(&self, input: CreateBookInput, caller: Caller) -> BookResult<Book> {
        let (Some(title), Some(caption), Some(rating), Some(image)) = (
            required(input.title),
            required(input.caption),
            input.rating,
            required(input.image),
        ) else {
            return Err(BookError::InvalidInput("Please provide all fields".to_string()));
        };
        let rating = Rating::try_from(rating)?;
        let payload = ImagePayload::parse(&image)?;

        let uploaded = self.media.upload_image(&payload).await.map_err(BookError::Upstream)?;

        let book = self
            .db
            .create_book(NewBook {
                title,
                caption,
                rating,
                image: uploaded.url.clone(),
                owner_id: caller.user_id,
            })
            .await
            .map_err(|e| {
                // No compensating delete: the asset stays orphaned.
                warn!(
                    public_id = %uploaded.public_id,
                    "Book insert failed after image upload: {}", e
                );
                BookError::Upstream(e)
            })?;

        info!(book_id = %book.id, owner = %caller.user_id, "Book created");
        Ok(book)
    }

    /// One page of the global feed, newest first.
    pub async fn list(&self, page: PageRequest, _caller: Caller) -> BookResult<BookPage> {
        let books = self.db.list_books(page.offset(), page.limit()).await?;
        let total_books = self.db.count_books().await?;

        Ok(BookPage {
            books,
            current_page: page.page(),
            total_books,
            total_pages: total_pages(total_books, page.limit()),
        })
    }

    /// Every book owned by the caller, newest first.
    pub async fn list_by_owner(&self, caller: Caller) -> BookResult<Vec<Book>> {
        Ok(self.db.list_books_by_owner(caller.user_id).await?)
    }

    /// Case-insensitive title search. An empty result is `NotFound`.
    pub async fn search_by_title(
        &self,
        title: Option<&str>,
        _caller: Caller,
    ) -> BookResult<Vec<BookWithOwner>> {
        let query = title.map(str::trim).filter(|t| !t.is_empty()).ok_or_else(|| {
            BookError::InvalidInput("Please provide a title to search for".to_string())
        })?;

        let books = self.db.search_books_by_title(query).await?;
        if books.is_empty() {
            return Err(BookError::NotFound(format!(
                "No books found matching '{}'",
                query
            )));
        }
        Ok(books)
    }

    /// Deletes a book owned by the caller.
    ///
    /// Order: existence, ownership, image cleanup, record removal. A failed
    /// image cleanup is logged and never stops the record removal.
    pub async fn delete(&self, book_id: Uuid, caller: Caller) -> BookResult<()> {
        let book = self.db.get_book_by_id(book_id).await.map_err(book_lookup)?;

        if book.owner_id != caller.user_id {
            warn!(%book_id, caller = %caller.user_id, "Rejected delete by non-owner");
            return Err(BookError::Forbidden);
        }

        if let Some(public_id) = self.media.public_id_from_url(&book.image) {
            if let Err(e) = self.media.delete_image(&public_id).await {
                warn!(%book_id, %public_id, "Failed to delete book image: {}", e);
            }
        }

        self.db.delete_book(book_id).await.map_err(book_lookup)?;

        info!(%book_id, "Book deleted");
        Ok(())
    }
}

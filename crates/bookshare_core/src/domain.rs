//! crates/bookshare_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or serialization format.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// A single book recommendation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Book {
    pub id: Uuid,
    pub title: String,
    pub caption: String,
    pub rating: Rating,
    /// Hosted URL of the cover image, never the uploaded payload.
    pub image: String,
    pub owner_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The subset of a user surfaced next to each book in the feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookOwner {
    pub id: Uuid,
    pub username: String,
    pub profile_image: String,
}

/// A book joined with a shallow projection of its owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookWithOwner {
    pub book: Book,
    pub owner: BookOwner,
}

/// Everything the document store needs to persist a new book.
#[derive(Debug, Clone)]
pub struct NewBook {
    pub title: String,
    pub caption: String,
    pub rating: Rating,
    pub image: String,
    pub owner_id: Uuid,
}

/// One page of the time-descending feed.
#[derive(Debug, Clone)]
pub struct BookPage {
    pub books: Vec<BookWithOwner>,
    pub current_page: u32,
    pub total_books: u64,
    pub total_pages: u64,
}

// Represents a user - used throughout app
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub profile_image: String,
    pub created_at: DateTime<Utc>,
}

// Only used internally for login/signup - contains sensitive data
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user: User,
    pub hashed_password: String,
}

/// Result of a successful media upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedImage {
    pub url: String,
    pub public_id: String,
}

//=========================================================================================
// Validated Value Types
//=========================================================================================

/// A star rating, always within `1..=5`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Rating(u8);

impl Rating {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    pub fn value(self) -> u8 {
        self.0
    }
}

impl TryFrom<i64> for Rating {
    type Error = DomainError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        if (Self::MIN as i64..=Self::MAX as i64).contains(&value) {
            Ok(Self(value as u8))
        } else {
            Err(DomainError::RatingOutOfRange(value))
        }
    }
}

/// A self-contained image payload, normalized to a `data:` URI.
///
/// Accepts either a full data URI (`data:image/png;base64,...`) or bare
/// base64, which is assumed to be JPEG. Hosted URLs are rejected: the media
/// store must receive the bytes, not a pointer to them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePayload {
    mime_type: String,
    data_uri: String,
}

impl ImagePayload {
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(DomainError::InvalidImage("image payload is empty".to_string()));
        }
        let lower = raw.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            return Err(DomainError::InvalidImage(
                "image must be uploaded data, not a hosted URL".to_string(),
            ));
        }

        let (mime_type, encoded) = match raw.strip_prefix("data:") {
            Some(rest) => {
                let (header, encoded) = rest.split_once(',').ok_or_else(|| {
                    DomainError::InvalidImage("data URI has no payload".to_string())
                })?;
                let mime_type = header.strip_suffix(";base64").ok_or_else(|| {
                    DomainError::InvalidImage("data URI must be base64 encoded".to_string())
                })?;
                if !mime_type.starts_with("image/") {
                    return Err(DomainError::InvalidImage(format!(
                        "unsupported media type '{}'",
                        mime_type
                    )));
                }
                (mime_type.to_string(), encoded)
            }
            None => ("image/jpeg".to_string(), raw),
        };

        if encoded.is_empty() {
            return Err(DomainError::InvalidImage("image payload is empty".to_string()));
        }
        STANDARD
            .decode(encoded)
            .map_err(|e| DomainError::InvalidImage(format!("invalid base64: {}", e)))?;

        let data_uri = format!("data:{};base64,{}", mime_type, encoded);
        Ok(Self { mime_type, data_uri })
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn data_uri(&self) -> &str {
        &self.data_uri
    }
}

/// Errors raised while constructing validated domain values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomainError {
    #[error("Rating must be between 1 and 5, got {0}")]
    RatingOutOfRange(i64),
    #[error("Invalid image: {0}")]
    InvalidImage(String),
}

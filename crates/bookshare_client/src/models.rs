//! crates/bookshare_client/src/models.rs
//!
//! Wire types exchanged with the Bookshare API. Field names follow the JSON
//! the server emits (`_id`, camelCase).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ClientError;

/// The public projection of a book's owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookOwner {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub username: String,
    pub profile_image: String,
}

/// A book as it appears in the feed and in search results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedBook {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub title: String,
    pub caption: String,
    pub rating: u8,
    pub image: String,
    pub user: BookOwner,
    pub created_at: DateTime<Utc>,
}

/// A book on the caller's own shelf; `user` is just the owner id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnBook {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub title: String,
    pub caption: String,
    pub rating: u8,
    pub image: String,
    pub user: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedPage {
    pub books: Vec<FeedBook>,
    pub current_page: u32,
    pub total_books: u64,
    pub total_pages: u64,
}

/// The signed-in account, as returned by register/login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUser {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub profile_image: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthPayload {
    pub token: String,
    pub user: SessionUser,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MessageBody {
    pub message: String,
}

/// A new recommendation, ready to post.
#[derive(Debug, Clone, Serialize)]
pub struct NewBook {
    pub title: String,
    pub caption: String,
    pub rating: u8,
    /// `data:image/<type>;base64,<data>`
    pub image: String,
}

impl NewBook {
    /// Builds the request from picker output: base64 image data plus the
    /// picked file's name, whose extension decides the media type.
    pub fn new(
        title: &str,
        caption: &str,
        rating: u8,
        image_base64: &str,
        file_name: &str,
    ) -> Result<Self, ClientError> {
        let (title, caption, image_base64) = (title.trim(), caption.trim(), image_base64.trim());
        if title.is_empty() || caption.is_empty() || image_base64.is_empty() || rating == 0 {
            return Err(ClientError::InvalidInput("Please fill in all fields".to_string()));
        }
        if rating > 5 {
            return Err(ClientError::InvalidInput(
                "Rating must be between 1 and 5".to_string(),
            ));
        }
        Ok(Self {
            title: title.to_string(),
            caption: caption.to_string(),
            rating,
            image: image_data_url(image_base64, file_name),
        })
    }
}

/// `image/<ext>` from the file extension, falling back to JPEG.
pub fn image_data_url(image_base64: &str, file_name: &str) -> String {
    let mime = match file_name.rsplit_once('.') {
        Some((_, ext)) if !ext.is_empty() && !ext.contains('/') => {
            match ext.to_ascii_lowercase().as_str() {
                "jpg" => "image/jpeg".to_string(),
                other => format!("image/{}", other),
            }
        }
        _ => "image/jpeg".to_string(),
    };
    format!("data:{};base64,{}", mime, image_base64)
}

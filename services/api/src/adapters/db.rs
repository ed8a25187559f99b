//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `DatabaseService` port from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use bookshare_core::domain::{
    Book, BookOwner, BookWithOwner, NewBook, Rating, User, UserCredentials,
};
use bookshare_core::ports::{DatabaseService, PortError, PortResult};
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `DatabaseService` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

/// Escapes `%`, `_` and `\` so user input matches literally inside `ILIKE`.
fn like_pattern(query: &str) -> String {
    let mut escaped = String::with_capacity(query.len() + 2);
    escaped.push('%');
    for c in query.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct UserRecord {
    id: Uuid,
    username: String,
    email: String,
    hashed_password: String,
    profile_image: String,
    created_at: DateTime<Utc>,
}
impl UserRecord {
    fn to_domain(self) -> User {
        User {
            id: self.id,
            username: self.username,
            email: self.email,
            profile_image: self.profile_image,
            created_at: self.created_at,
        }
    }

    fn to_credentials(mut self) -> UserCredentials {
        let hashed_password = std::mem::take(&mut self.hashed_password);
        UserCredentials {
            user: self.to_domain(),
            hashed_password,
        }
    }
}

#[derive(FromRow)]
struct BookRecord {
    id: Uuid,
    title: String,
    caption: String,
    rating: i16,
    image: String,
    owner_id: Uuid,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}
impl BookRecord {
    fn to_domain(self) -> PortResult<Book> {
        let rating = Rating::try_from(self.rating as i64)
            .map_err(|e| PortError::Unexpected(format!("Book {}: {}", self.id, e)))?;
        Ok(Book {
            id: self.id,
            title: self.title,
            caption: self.caption,
            rating,
            image: self.image,
            owner_id: self.owner_id,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(FromRow)]
struct BookWithOwnerRecord {
    #[sqlx(flatten)]
    book: BookRecord,
    owner_username: String,
    owner_profile_image: String,
}
impl BookWithOwnerRecord {
    fn to_domain(self) -> PortResult<BookWithOwner> {
        let book = self.book.to_domain()?;
        Ok(BookWithOwner {
            owner: BookOwner {
                id: book.owner_id,
                username: self.owner_username,
                profile_image: self.owner_profile_image,
            },
            book,
        })
    }
}

const BOOK_COLUMNS: &str =
    "b.id, b.title, b.caption, b.rating, b.image, b.owner_id, b.created_at, b.updated_at";

const USER_COLUMNS: &str = "id, username, email, hashed_password, profile_image, created_at";

//=========================================================================================
// `DatabaseService` Trait Implementation
//=========================================================================================

#[async_trait]
impl DatabaseService for DbAdapter {
    async fn create_user(
        &self,
        username: &str,
        email: &str,
        hashed_password: &str,
        profile_image: &str,
    ) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(&format!(
            "INSERT INTO users (id, username, email, hashed_password, profile_image) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {}",
            USER_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(username)
        .bind(email)
        .bind(hashed_password)
        .bind(profile_image)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                PortError::Conflict("User already exists".to_string())
            }
            _ => unexpected(e),
        })?;
        Ok(record.to_domain())
    }

    async fn get_user_by_id(&self, user_id: Uuid) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {} FROM users WHERE id = $1",
            USER_COLUMNS
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .ok_or_else(|| PortError::NotFound(format!("User {} not found", user_id)))?;
        Ok(record.to_domain())
    }

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        let record = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {} FROM users WHERE email = $1",
            USER_COLUMNS
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .ok_or_else(|| PortError::NotFound(format!("User {} not found", email)))?;
        Ok(record.to_credentials())
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        sqlx::query("INSERT INTO auth_sessions (id, user_id, expires_at) VALUES ($1, $2, $3)")
            .bind(session_id)
            .bind(user_id)
            .bind(expires_at)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid> {
        sqlx::query_scalar::<_, Uuid>(
            "SELECT user_id FROM auth_sessions WHERE id = $1 AND expires_at > now()",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .ok_or(PortError::Unauthorized)
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        sqlx::query("DELETE FROM auth_sessions WHERE id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn create_book(&self, book: NewBook) -> PortResult<Book> {
        let record = sqlx::query_as::<_, BookRecord>(
            "INSERT INTO books (id, title, caption, rating, image, owner_id) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING id, title, caption, rating, image, owner_id, created_at, updated_at",
        )
        .bind(Uuid::new_v4())
        .bind(&book.title)
        .bind(&book.caption)
        .bind(book.rating.value() as i16)
        .bind(&book.image)
        .bind(book.owner_id)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        record.to_domain()
    }

    async fn get_book_by_id(&self, book_id: Uuid) -> PortResult<Book> {
        sqlx::query_as::<_, BookRecord>(&format!(
            "SELECT {} FROM books b WHERE b.id = $1",
            BOOK_COLUMNS
        ))
        .bind(book_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .ok_or_else(|| PortError::NotFound(format!("Book {} not found", book_id)))?
        .to_domain()
    }

    async fn list_books(&self, offset: u64, limit: u32) -> PortResult<Vec<BookWithOwner>> {
        let records = sqlx::query_as::<_, BookWithOwnerRecord>(&format!(
            "SELECT {}, u.username AS owner_username, u.profile_image AS owner_profile_image \
             FROM books b JOIN users u ON u.id = b.owner_id \
             ORDER BY b.created_at DESC, b.id DESC \
             OFFSET $1 LIMIT $2",
            BOOK_COLUMNS
        ))
        .bind(offset as i64)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        records.into_iter().map(|r| r.to_domain()).collect()
    }

    async fn count_books(&self) -> PortResult<u64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM books")
            .fetch_one(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(count.max(0) as u64)
    }

    async fn list_books_by_owner(&self, owner_id: Uuid) -> PortResult<Vec<Book>> {
        let records = sqlx::query_as::<_, BookRecord>(&format!(
            "SELECT {} FROM books b WHERE b.owner_id = $1 ORDER BY b.created_at DESC, b.id DESC",
            BOOK_COLUMNS
        ))
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        records.into_iter().map(|r| r.to_domain()).collect()
    }

    async fn search_books_by_title(&self, query: &str) -> PortResult<Vec<BookWithOwner>> {
        let records = sqlx::query_as::<_, BookWithOwnerRecord>(&format!(
            "SELECT {}, u.username AS owner_username, u.profile_image AS owner_profile_image \
             FROM books b JOIN users u ON u.id = b.owner_id \
             WHERE b.title ILIKE $1 ESCAPE '\\' \
             ORDER BY b.created_at DESC, b.id DESC",
            BOOK_COLUMNS
        ))
        .bind(like_pattern(query))
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        records.into_iter().map(|r| r.to_domain()).collect()
    }

    async fn delete_book(&self, book_id: Uuid) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(book_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Book {} not found", book_id)));
        }
        Ok(())
    }
}

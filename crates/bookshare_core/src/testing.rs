//! crates/bookshare_core/src/testing.rs
//!
//! In-memory implementations of the ports, for unit and integration tests.
//! Enabled for this crate's own tests and, elsewhere, via the `test-util`
//! feature.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::domain::{
    Book, BookOwner, BookWithOwner, ImagePayload, NewBook, UploadedImage, User, UserCredentials,
};
use crate::ports::{DatabaseService, MediaStorageService, PortError, PortResult};

//=========================================================================================
// InMemoryDatabase
//=========================================================================================

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, UserCredentials>,
    sessions: HashMap<String, (Uuid, DateTime<Utc>)>,
    books: Vec<Book>,
    last_created_at: Option<DateTime<Utc>>,
}

impl Tables {
    /// Strictly increasing timestamps, so "newest first" is unambiguous
    /// even when books are created within the same clock tick.
    fn next_timestamp(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let ts = match self.last_created_at {
            Some(last) if now <= last => last + Duration::microseconds(1),
            _ => now,
        };
        self.last_created_at = Some(ts);
        ts
    }

    fn with_owner(&self, book: &Book) -> PortResult<BookWithOwner> {
        let creds = self
            .users
            .get(&book.owner_id)
            .ok_or_else(|| PortError::Unexpected(format!("Owner {} missing", book.owner_id)))?;
        Ok(BookWithOwner {
            book: book.clone(),
            owner: BookOwner {
                id: creds.user.id,
                username: creds.user.username.clone(),
                profile_image: creds.user.profile_image.clone(),
            },
        })
    }

    fn newest_first(&self) -> Vec<&Book> {
        let mut books: Vec<&Book> = self.books.iter().collect();
        books.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        books
    }
}

/// A `DatabaseService` backed by plain collections behind a mutex.
#[derive(Default)]
pub struct InMemoryDatabase {
    tables: Mutex<Tables>,
}

impl InMemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().expect("in-memory database lock poisoned")
    }

    /// Inserts a user with a throwaway password hash.
    pub async fn seed_user(&self, username: &str) -> User {
        self.create_user(
            username,
            &format!("{}@example.com", username),
            "not-a-real-hash",
            &format!("https://avatars.example.com/{}.svg", username),
        )
        .await
        .expect("seed user")
    }

    /// Registers a bearer token for `user_id`, valid for one day.
    pub fn seed_session(&self, token: &str, user_id: Uuid) {
        self.seed_session_expiring(token, user_id, Utc::now() + Duration::days(1));
    }

    pub fn seed_session_expiring(&self, token: &str, user_id: Uuid, expires_at: DateTime<Utc>) {
        self.tables()
            .sessions
            .insert(token.to_string(), (user_id, expires_at));
    }
}

#[async_trait]
impl DatabaseService for InMemoryDatabase {
    async fn create_user(
        &self,
        username: &str,
        email: &str,
        hashed_password: &str,
        profile_image: &str,
    ) -> PortResult<User> {
        let mut tables = self.tables();
        let taken = tables
            .users
            .values()
            .any(|c| c.user.email == email || c.user.username == username);
        if taken {
            return Err(PortError::Conflict("User already exists".to_string()));
        }
        let user = User {
            id: Uuid::new_v4(),
            username: username.to_string(),
            email: email.to_string(),
            profile_image: profile_image.to_string(),
            created_at: Utc::now(),
        };
        tables.users.insert(
            user.id,
            UserCredentials {
                user: user.clone(),
                hashed_password: hashed_password.to_string(),
            },
        );
        Ok(user)
    }

    async fn get_user_by_id(&self, user_id: Uuid) -> PortResult<User> {
        self.tables()
            .users
            .get(&user_id)
            .map(|c| c.user.clone())
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", user_id)))
    }

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        self.tables()
            .users
            .values()
            .find(|c| c.user.email == email)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", email)))
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        self.tables()
            .sessions
            .insert(session_id.to_string(), (user_id, expires_at));
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid> {
        match self.tables().sessions.get(session_id) {
            Some((user_id, expires_at)) if *expires_at > Utc::now() => Ok(*user_id),
            _ => Err(PortError::Unauthorized),
        }
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        self.tables().sessions.remove(session_id);
        Ok(())
    }

    async fn create_book(&self, book: NewBook) -> PortResult<Book> {
        let mut tables = self.tables();
        let now = tables.next_timestamp();
        let book = Book {
            id: Uuid::new_v4(),
            title: book.title,
            caption: book.caption,
            rating: book.rating,
            image: book.image,
            owner_id: book.owner_id,
            created_at: now,
            updated_at: now,
        };
        tables.books.push(book.clone());
        Ok(book)
    }

    async fn get_book_by_id(&self, book_id: Uuid) -> PortResult<Book> {
        self.tables()
            .books
            .iter()
            .find(|b| b.id == book_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Book {} not found", book_id)))
    }

    async fn list_books(&self, offset: u64, limit: u32) -> PortResult<Vec<BookWithOwner>> {
        let tables = self.tables();
        tables
            .newest_first()
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .map(|b| tables.with_owner(b))
            .collect()
    }

    async fn count_books(&self) -> PortResult<u64> {
        Ok(self.tables().books.len() as u64)
    }

    async fn list_books_by_owner(&self, owner_id: Uuid) -> PortResult<Vec<Book>> {
        Ok(self
            .tables()
            .newest_first()
            .into_iter()
            .filter(|b| b.owner_id == owner_id)
            .cloned()
            .collect())
    }

    async fn search_books_by_title(&self, query: &str) -> PortResult<Vec<BookWithOwner>> {
        let needle = query.to_lowercase();
        let tables = self.tables();
        tables
            .newest_first()
            .into_iter()
            .filter(|b| b.title.to_lowercase().contains(&needle))
            .map(|b| tables.with_owner(b))
            .collect()
    }

    async fn delete_book(&self, book_id: Uuid) -> PortResult<()> {
        let mut tables = self.tables();
        let before = tables.books.len();
        tables.books.retain(|b| b.id != book_id);
        if tables.books.len() == before {
            return Err(PortError::NotFound(format!("Book {} not found", book_id)));
        }
        Ok(())
    }
}

//=========================================================================================
// FakeMediaStore
//=========================================================================================

/// A `MediaStorageService` that hands out URLs on a fixed host and records
/// every call. Uploads and deletes can be switched to fail.
#[derive(Default)]
pub struct FakeMediaStore {
    uploads: AtomicUsize,
    delete_attempts: Mutex<Vec<String>>,
    deleted: Mutex<Vec<String>>,
    fail_uploads: AtomicBool,
    fail_deletes: AtomicBool,
}

impl FakeMediaStore {
    pub const HOST: &'static str = "https://media.test/bookshare/";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_uploads(&self, fail: bool) {
        self.fail_uploads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    pub fn uploads(&self) -> usize {
        self.uploads.load(Ordering::SeqCst)
    }

    /// Public ids passed to every delete, failed ones included.
    pub fn delete_attempts(&self) -> Vec<String> {
        self.delete_attempts.lock().expect("media lock poisoned").clone()
    }

    /// Public ids passed to successful deletes, in call order.
    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().expect("media lock poisoned").clone()
    }
}

#[async_trait]
impl MediaStorageService for FakeMediaStore {
    async fn upload_image(&self, image: &ImagePayload) -> PortResult<UploadedImage> {
        if self.fail_uploads.load(Ordering::SeqCst) {
            return Err(PortError::Unexpected("media store unavailable".to_string()));
        }
        self.uploads.fetch_add(1, Ordering::SeqCst);
        let ext = image.mime_type().trim_start_matches("image/");
        let public_id = Uuid::new_v4().simple().to_string();
        Ok(UploadedImage {
            url: format!("{}{}.{}", Self::HOST, public_id, ext),
            public_id,
        })
    }

    fn public_id_from_url(&self, url: &str) -> Option<String> {
        let file = url.strip_prefix(Self::HOST)?;
        file.split('.').next().map(str::to_string)
    }

    async fn delete_image(&self, public_id: &str) -> PortResult<()> {
        self.delete_attempts
            .lock()
            .expect("media lock poisoned")
            .push(public_id.to_string());
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(PortError::Unexpected("media store unavailable".to_string()));
        }
        self.deleted
            .lock()
            .expect("media lock poisoned")
            .push(public_id.to_string());
        Ok(())
    }
}

//! crates/bookshare_client/src/lib.rs
//!
//! Client side of Bookshare: the HTTP API wrapper, the persisted session and
//! the feed/profile state the app renders.

pub mod api;
pub mod error;
pub mod feed;
pub mod models;
pub mod session;
pub mod shelf;

pub use api::{ApiFeedSource, BookApi};
pub use error::ClientError;
pub use feed::{FeedController, FeedMode, FeedSnapshot, FeedSource, FeedState, FetchOutcome};
pub use models::{AuthPayload, BookOwner, FeedBook, FeedPage, NewBook, OwnBook, SessionUser};
pub use session::{CredentialStore, FileCredentialStore, MemoryCredentialStore, Session, SessionContext};
pub use shelf::{format_shared_date, OwnBooks};

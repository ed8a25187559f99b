//! crates/bookshare_client/src/feed.rs
//!
//! The home feed: paginated browsing and title search reconciled into one
//! ordered, de-duplicated list.
//!
//! `FeedState` is a plain state machine. Each fetch is started with a
//! `begin_*` call that returns a `FetchTicket`, and its outcome is fed back
//! through `complete_page`/`complete_search`. Starting a new browse, refresh
//! or search bumps the generation, so results from superseded requests are
//! dropped when they land. `FeedController` drives the machine against a
//! `FeedSource` without holding its lock across the network call.

use std::collections::HashSet;

use async_trait::async_trait;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::ClientError;
use crate::models::{FeedBook, FeedPage};

pub const DEFAULT_PAGE_SIZE: u32 = 5;

//=========================================================================================
// State Machine
//=========================================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedMode {
    Browse,
    Search(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchKind {
    Initial,
    Refresh,
    LoadMore,
    Search,
}

/// Identifies one outstanding fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    generation: u64,
    kind: FetchKind,
    page: u32,
    limit: u32,
    query: Option<String>,
}

impl FetchTicket {
    pub fn kind(&self) -> FetchKind {
        self.kind
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    Applied,
    /// A newer browse, refresh or search started while this was in flight.
    Stale,
    /// Nothing was fetched because a guard suppressed the request.
    Skipped,
}

#[derive(Debug)]
pub struct FeedState {
    books: Vec<FeedBook>,
    seen: HashSet<Uuid>,
    page: u32,
    has_more: bool,
    loading: bool,
    refreshing: bool,
    mode: FeedMode,
    generation: u64,
    page_size: u32,
}

impl Default for FeedState {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

impl FeedState {
    pub fn new(page_size: u32) -> Self {
        Self {
            books: Vec::new(),
            seen: HashSet::new(),
            page: 0,
            has_more: true,
            loading: false,
            refreshing: false,
            mode: FeedMode::Browse,
            generation: 0,
            page_size: page_size.max(1),
        }
    }

    pub fn books(&self) -> &[FeedBook] {
        &self.books
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn is_refreshing(&self) -> bool {
        self.refreshing
    }

    pub fn mode(&self) -> &FeedMode {
        &self.mode
    }

    fn ticket(&self, kind: FetchKind, page: u32, query: Option<String>) -> FetchTicket {
        FetchTicket {
            generation: self.generation,
            kind,
            page,
            limit: self.page_size,
            query,
        }
    }

    /// Starts browsing from page 1, leaving search mode.
    pub fn begin_initial(&mut self) -> FetchTicket {
        self.generation += 1;
        self.mode = FeedMode::Browse;
        self.loading = true;
        self.refreshing = false;
        self.ticket(FetchKind::Initial, 1, None)
    }

    /// Pull-to-refresh. In search mode the search is re-run instead.
    pub fn begin_refresh(&mut self) -> FetchTicket {
        self.generation += 1;
        self.loading = false;
        self.refreshing = true;
        match self.mode.clone() {
            FeedMode::Browse => self.ticket(FetchKind::Refresh, 1, None),
            FeedMode::Search(query) => self.ticket(FetchKind::Search, 1, Some(query)),
        }
    }

    /// The next page, or `None` while another fetch or a refresh is
    /// outstanding, when the feed is exhausted, or in search mode.
    pub fn begin_load_more(&mut self) -> Option<FetchTicket> {
        if self.loading || self.refreshing || !self.has_more {
            return None;
        }
        if let FeedMode::Search(_) = self.mode {
            return None;
        }
        self.loading = true;
        let next = self.page + 1;
        Some(self.ticket(FetchKind::LoadMore, next, None))
    }

    /// Enters search mode. A blank query returns to browsing instead.
    pub fn begin_search(&mut self, query: &str) -> FetchTicket {
        let query = query.trim();
        if query.is_empty() {
            return self.begin_initial();
        }
        self.generation += 1;
        self.mode = FeedMode::Search(query.to_string());
        self.has_more = false;
        self.loading = true;
        self.refreshing = false;
        self.ticket(FetchKind::Search, 1, Some(query.to_string()))
    }

    fn settle(&mut self) {
        self.loading = false;
        self.refreshing = false;
    }

    /// Applies the result of a browse fetch. On error the list is kept as is.
    pub fn complete_page(
        &mut self,
        ticket: &FetchTicket,
        result: Result<FeedPage, ClientError>,
    ) -> Result<FetchOutcome, ClientError> {
        if ticket.generation != self.generation {
            return Ok(FetchOutcome::Stale);
        }
        self.settle();
        let page = result?;

        match ticket.kind {
            FetchKind::LoadMore => self.merge(page.books),
            _ => self.replace(page.books),
        }
        self.page = ticket.page;
        self.has_more = u64::from(self.page) < page.total_pages;
        Ok(FetchOutcome::Applied)
    }

    /// Applies the result of a search. Not-found is an empty result.
    pub fn complete_search(
        &mut self,
        ticket: &FetchTicket,
        result: Result<Vec<FeedBook>, ClientError>,
    ) -> Result<FetchOutcome, ClientError> {
        if ticket.generation != self.generation {
            return Ok(FetchOutcome::Stale);
        }
        self.settle();
        let books = match result {
            Ok(books) => books,
            Err(e) if e.is_not_found() => Vec::new(),
            Err(e) => return Err(e),
        };

        self.replace(books);
        self.page = 1;
        self.has_more = false;
        Ok(FetchOutcome::Applied)
    }

    fn replace(&mut self, books: Vec<FeedBook>) {
        self.books.clear();
        self.seen.clear();
        self.merge(books);
    }

    /// Appends unseen books, keeping first-seen order.
    fn merge(&mut self, books: Vec<FeedBook>) {
        for book in books {
            if self.seen.insert(book.id) {
                self.books.push(book);
            }
        }
    }
}

//=========================================================================================
// Controller
//=========================================================================================

#[async_trait]
pub trait FeedSource: Send + Sync {
    async fn fetch_page(&self, page: u32, limit: u32) -> Result<FeedPage, ClientError>;

    /// Signals not-found when nothing matches.
    async fn search(&self, title: &str) -> Result<Vec<FeedBook>, ClientError>;
}

/// A copy of the feed for rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedSnapshot {
    pub books: Vec<FeedBook>,
    pub has_more: bool,
    pub loading: bool,
    pub refreshing: bool,
    pub mode: FeedMode,
}

pub struct FeedController<S> {
    source: S,
    state: Mutex<FeedState>,
}

impl<S: FeedSource> FeedController<S> {
    pub fn new(source: S) -> Self {
        Self::with_page_size(source, DEFAULT_PAGE_SIZE)
    }

    pub fn with_page_size(source: S, page_size: u32) -> Self {
        Self {
            source,
            state: Mutex::new(FeedState::new(page_size)),
        }
    }

    pub async fn load_initial(&self) -> Result<FetchOutcome, ClientError> {
        let ticket = self.state.lock().await.begin_initial();
        self.run(ticket).await
    }

    pub async fn refresh(&self) -> Result<FetchOutcome, ClientError> {
        let ticket = self.state.lock().await.begin_refresh();
        self.run(ticket).await
    }

    pub async fn load_more(&self) -> Result<FetchOutcome, ClientError> {
        let Some(ticket) = self.state.lock().await.begin_load_more() else {
            return Ok(FetchOutcome::Skipped);
        };
        self.run(ticket).await
    }

    pub async fn search(&self, query: &str) -> Result<FetchOutcome, ClientError> {
        let ticket = self.state.lock().await.begin_search(query);
        self.run(ticket).await
    }

    pub async fn clear_search(&self) -> Result<FetchOutcome, ClientError> {
        self.load_initial().await
    }

    async fn run(&self, ticket: FetchTicket) -> Result<FetchOutcome, ClientError> {
        match ticket.query() {
            Some(query) => {
                let result = self.source.search(query).await;
                self.state.lock().await.complete_search(&ticket, result)
            }
            None => {
                let result = self.source.fetch_page(ticket.page(), ticket.limit()).await;
                self.state.lock().await.complete_page(&ticket, result)
            }
        }
    }

    pub async fn snapshot(&self) -> FeedSnapshot {
        let state = self.state.lock().await;
        FeedSnapshot {
            books: state.books.clone(),
            has_more: state.has_more,
            loading: state.loading,
            refreshing: state.refreshing,
            mode: state.mode.clone(),
        }
    }
}

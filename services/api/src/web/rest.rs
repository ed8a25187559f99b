//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the book endpoints and the master
//! definition for the OpenAPI specification.

use crate::error::{HttpError, MessageResponse};
use crate::web::auth::{AuthResponse, LoginRequest, RegisterRequest, UserResponse};
use crate::web::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use bookshare_core::{Book, BookPage, BookWithOwner, Caller, CreateBookInput, PageRequest};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    IntoParams, Modify, OpenApi, ToSchema,
};
use uuid::Uuid;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::web::auth::register_handler,
        crate::web::auth::login_handler,
        crate::web::auth::logout_handler,
        create_book_handler,
        list_books_handler,
        list_user_books_handler,
        search_books_handler,
        delete_book_handler,
    ),
    components(
        schemas(
            RegisterRequest,
            LoginRequest,
            AuthResponse,
            UserResponse,
            CreateBookRequest,
            BookResponse,
            FeedBookResponse,
            OwnerResponse,
            BookListResponse,
            MessageResponse,
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "auth", description = "Account registration and bearer tokens."),
        (name = "books", description = "The book recommendation feed.")
    )
)]
pub struct ApiDoc;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer",
            SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
        );
    }
}

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

/// `rating` arrives either as a JSON number or as a numeric string.
#[derive(Deserialize, Debug, Clone)]
#[serde(untagged)]
pub enum RatingValue {
    Number(i64),
    Text(String),
}

impl RatingValue {
    fn into_number(self) -> Result<i64, HttpError> {
        match self {
            RatingValue::Number(n) => Ok(n),
            RatingValue::Text(s) => s.trim().parse::<i64>().map_err(|_| {
                HttpError::bad_request("Rating must be a whole number between 1 and 5")
            }),
        }
    }
}

#[derive(Deserialize, ToSchema)]
pub struct CreateBookRequest {
    pub title: Option<String>,
    pub caption: Option<String>,
    #[schema(value_type = Option<i64>, minimum = 1, maximum = 5)]
    pub rating: Option<RatingValue>,
    /// A `data:image/...;base64,` URL or bare base64.
    pub image: Option<String>,
}

/// A book as returned by create and the owner's list; `user` is the owner id.
#[derive(Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BookResponse {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub title: String,
    pub caption: String,
    pub rating: u8,
    pub image: String,
    pub user: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Book> for BookResponse {
    fn from(book: Book) -> Self {
        Self {
            id: book.id,
            title: book.title,
            caption: book.caption,
            rating: book.rating.value(),
            image: book.image,
            user: book.owner_id,
            created_at: book.created_at,
            updated_at: book.updated_at,
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OwnerResponse {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub username: String,
    pub profile_image: String,
}

/// A book in the feed or search results, with its owner expanded.
#[derive(Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FeedBookResponse {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub title: String,
    pub caption: String,
    pub rating: u8,
    pub image: String,
    pub user: OwnerResponse,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<BookWithOwner> for FeedBookResponse {
    fn from(entry: BookWithOwner) -> Self {
        let BookWithOwner { book, owner } = entry;
        Self {
            id: book.id,
            title: book.title,
            caption: book.caption,
            rating: book.rating.value(),
            image: book.image,
            user: OwnerResponse {
                id: owner.id,
                username: owner.username,
                profile_image: owner.profile_image,
            },
            created_at: book.created_at,
            updated_at: book.updated_at,
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BookListResponse {
    pub books: Vec<FeedBookResponse>,
    pub current_page: u32,
    pub total_books: u64,
    pub total_pages: u64,
}

impl From<BookPage> for BookListResponse {
    fn from(page: BookPage) -> Self {
        Self {
            books: page.books.into_iter().map(Into::into).collect(),
            current_page: page.current_page,
            total_books: page.total_books,
            total_pages: page.total_pages,
        }
    }
}

/// Raw pagination parameters; bad values fall back to defaults instead of
/// rejecting the request.
#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListQuery {
    /// 1-based page number (default 1).
    pub page: Option<String>,
    /// Page size (default 10, max 50).
    pub limit: Option<String>,
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SearchQuery {
    /// Case-insensitive substring of the title.
    pub title: Option<String>,
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// Create a book recommendation.
///
/// The image is uploaded to the media store first; the book is only stored
/// once a hosted URL exists.
#[utoipa::path(
    post,
    path = "/api/books",
    request_body = CreateBookRequest,
    responses(
        (status = 201, description = "Book created", body = BookResponse),
        (status = 400, description = "Missing or invalid field", body = MessageResponse),
        (status = 401, description = "Missing or invalid token", body = MessageResponse),
        (status = 500, description = "Upload or store failure", body = MessageResponse)
    ),
    security(("bearer" = [])),
    tag = "books"
)]
pub async fn create_book_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    payload: Result<Json<CreateBookRequest>, JsonRejection>,
) -> Result<impl IntoResponse, HttpError> {
    let Json(req) = payload?;
    let input = CreateBookInput {
        title: req.title,
        caption: req.caption,
        rating: req.rating.map(RatingValue::into_number).transpose()?,
        image: req.image,
    };

    let book = app_state.books.create(input, caller).await?;
    Ok((StatusCode::CREATED, Json(BookResponse::from(book))))
}

/// The global feed, newest first.
#[utoipa::path(
    get,
    path = "/api/books",
    params(ListQuery),
    responses(
        (status = 200, description = "One page of books", body = BookListResponse),
        (status = 401, description = "Missing or invalid token", body = MessageResponse),
        (status = 500, description = "Store failure", body = MessageResponse)
    ),
    security(("bearer" = [])),
    tag = "books"
)]
pub async fn list_books_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Query(query): Query<ListQuery>,
) -> Result<Json<BookListResponse>, HttpError> {
    let page = PageRequest::from_query(query.page.as_deref(), query.limit.as_deref());
    let page = app_state.books.list(page, caller).await?;
    Ok(Json(page.into()))
}

/// Every book owned by the caller, newest first.
#[utoipa::path(
    get,
    path = "/api/books/user",
    responses(
        (status = 200, description = "The caller's books", body = [BookResponse]),
        (status = 401, description = "Missing or invalid token", body = MessageResponse),
        (status = 500, description = "Store failure", body = MessageResponse)
    ),
    security(("bearer" = [])),
    tag = "books"
)]
pub async fn list_user_books_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
) -> Result<Json<Vec<BookResponse>>, HttpError> {
    let books = app_state.books.list_by_owner(caller).await?;
    Ok(Json(books.into_iter().map(Into::into).collect()))
}

/// Case-insensitive title search.
#[utoipa::path(
    get,
    path = "/api/books/title",
    params(SearchQuery),
    responses(
        (status = 200, description = "Matching books", body = [FeedBookResponse]),
        (status = 400, description = "Missing title", body = MessageResponse),
        (status = 401, description = "Missing or invalid token", body = MessageResponse),
        (status = 404, description = "No matches", body = MessageResponse),
        (status = 500, description = "Store failure", body = MessageResponse)
    ),
    security(("bearer" = [])),
    tag = "books"
)]
pub async fn search_books_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<FeedBookResponse>>, HttpError> {
    let books = app_state
        .books
        .search_by_title(query.title.as_deref(), caller)
        .await?;
    Ok(Json(books.into_iter().map(Into::into).collect()))
}

/// Delete one of the caller's books.
#[utoipa::path(
    delete,
    path = "/api/books/{id}",
    params(("id" = Uuid, Path, description = "The book id.")),
    responses(
        (status = 200, description = "Book deleted", body = MessageResponse),
        (status = 401, description = "Missing or invalid token", body = MessageResponse),
        (status = 403, description = "Caller does not own the book", body = MessageResponse),
        (status = 404, description = "Book not found", body = MessageResponse),
        (status = 500, description = "Store failure", body = MessageResponse)
    ),
    security(("bearer" = [])),
    tag = "books"
)]
pub async fn delete_book_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, HttpError> {
    // An id that cannot exist is reported like any other missing book.
    let book_id = Uuid::parse_str(&id)
        .map_err(|_| HttpError::new(StatusCode::NOT_FOUND, "Book not found"))?;

    app_state.books.delete(book_id, caller).await?;
    Ok(Json(MessageResponse {
        message: "Book deleted successfully".to_string(),
    }))
}

//! crates/bookshare_client/src/api.rs
//!
//! Thin reqwest wrapper over the Bookshare REST API.

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::json;
use uuid::Uuid;

use crate::error::ClientError;
use crate::feed::FeedSource;
use crate::models::{AuthPayload, FeedBook, FeedPage, MessageBody, NewBook, OwnBook};
use crate::session::Session;

#[derive(Clone)]
pub struct BookApi {
    client: Client,
    base_url: String,
}

impl BookApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    fn request(&self, method: Method, path: &str, session: Option<&Session>) -> RequestBuilder {
        let builder = self
            .client
            .request(method, format!("{}{}", self.base_url, path));
        match session {
            Some(session) => builder.bearer_auth(&session.token),
            None => builder,
        }
    }

    /// Sends the request and decodes a 2xx body, or turns the server's
    /// `{message}` into `ClientError::Api`.
    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ClientError> {
        let response = builder.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response.json::<T>().await?);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<MessageBody>(&body)
            .map(|m| m.message)
            .unwrap_or_else(|_| {
                status
                    .canonical_reason()
                    .unwrap_or("Request failed")
                    .to_string()
            });
        tracing::debug!("API call failed with {}: {}", status, message);
        Err(ClientError::Api { status, message })
    }

    //=====================================================================================
    // Auth
    //=====================================================================================

    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<AuthPayload, ClientError> {
        let body = json!({ "username": username, "email": email, "password": password });
        self.send(self.request(Method::POST, "/api/auth/register", None).json(&body))
            .await
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<AuthPayload, ClientError> {
        let body = json!({ "email": email, "password": password });
        self.send(self.request(Method::POST, "/api/auth/login", None).json(&body))
            .await
    }

    pub async fn logout(&self, session: &Session) -> Result<String, ClientError> {
        let body: MessageBody = self
            .send(self.request(Method::POST, "/api/auth/logout", Some(session)))
            .await?;
        Ok(body.message)
    }

    //=====================================================================================
    // Books
    //=====================================================================================

    pub async fn create_book(&self, session: &Session, book: &NewBook) -> Result<OwnBook, ClientError> {
        self.send(self.request(Method::POST, "/api/books", Some(session)).json(book))
            .await
    }

    pub async fn list_books(
        &self,
        session: &Session,
        page: u32,
        limit: u32,
    ) -> Result<FeedPage, ClientError> {
        let query = [("page", page.to_string()), ("limit", limit.to_string())];
        self.send(self.request(Method::GET, "/api/books", Some(session)).query(&query))
            .await
    }

    pub async fn list_my_books(&self, session: &Session) -> Result<Vec<OwnBook>, ClientError> {
        self.send(self.request(Method::GET, "/api/books/user", Some(session)))
            .await
    }

    /// A 404 here means nothing matched.
    pub async fn search_books(&self, session: &Session, title: &str) -> Result<Vec<FeedBook>, ClientError> {
        self.send(
            self.request(Method::GET, "/api/books/title", Some(session))
                .query(&[("title", title)]),
        )
        .await
    }

    pub async fn delete_book(&self, session: &Session, id: Uuid) -> Result<String, ClientError> {
        let path = format!("/api/books/{}", id);
        let body: MessageBody = self
            .send(self.request(Method::DELETE, &path, Some(session)))
            .await?;
        Ok(body.message)
    }

    /// Binds this client to a session for use as a feed source.
    pub fn feed(&self, session: Session) -> ApiFeedSource {
        ApiFeedSource {
            api: self.clone(),
            session,
        }
    }
}

pub struct ApiFeedSource {
    api: BookApi,
    session: Session,
}

#[async_trait]
impl FeedSource for ApiFeedSource {
    async fn fetch_page(&self, page: u32, limit: u32) -> Result<FeedPage, ClientError> {
        self.api.list_books(&self.session, page, limit).await
    }

    async fn search(&self, title: &str) -> Result<Vec<FeedBook>, ClientError> {
        self.api.search_books(&self.session, title).await
    }
}

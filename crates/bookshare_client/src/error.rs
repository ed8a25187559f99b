//! crates/bookshare_client/src/error.rs

use reqwest::StatusCode;

/// Errors surfaced by the client API, the credential store and the feed.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The request never produced a usable response.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-2xx status.
    #[error("{message} (status {status})")]
    Api { status: StatusCode, message: String },

    /// An authenticated call was attempted without a signed-in session.
    #[error("Not signed in")]
    NotAuthenticated,

    /// Input rejected before any request was sent.
    #[error("{0}")]
    InvalidInput(String),

    #[error("Credential store error: {0}")]
    Store(String),
}

impl ClientError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            ClientError::Http(e) => e.status(),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(StatusCode::NOT_FOUND)
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(StatusCode::UNAUTHORIZED)
    }
}

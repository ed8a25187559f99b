//! services/api/src/web/middleware.rs
//!
//! Authentication middleware for protecting routes.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use bookshare_core::{Caller, PortError};
use std::sync::Arc;
use tracing::{error, warn};

use crate::error::HttpError;
use crate::web::state::AppState;

/// Extracts the token from an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| {
            let (scheme, token) = v.trim().split_once(' ')?;
            scheme.eq_ignore_ascii_case("bearer").then(|| token.trim())
        })
        .filter(|t| !t.is_empty())
}

/// Middleware that validates the bearer token and resolves the caller.
///
/// If valid, inserts a `Caller` into request extensions for handlers to use.
/// If invalid or missing, returns 401 Unauthorized.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, HttpError> {
    // 1. Extract the bearer token
    let token = bearer_token(req.headers())
        .ok_or_else(|| HttpError::unauthorized("No authentication token, access denied"))?;

    // 2. Resolve it to a user id
    let user_id = state.db.validate_auth_session(token).await.map_err(|e| match e {
        PortError::Unauthorized | PortError::NotFound(_) => {
            warn!("Rejected invalid or expired token");
            HttpError::unauthorized("Token is not valid")
        }
        other => {
            error!("Failed to validate auth session: {:?}", other);
            HttpError::internal("Could not validate token")
        }
    })?;

    // 3. Insert the caller into request extensions
    req.extensions_mut().insert(Caller::new(user_id));

    // 4. Continue to the handler
    Ok(next.run(req).await)
}

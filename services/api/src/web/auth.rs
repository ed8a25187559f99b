//! services/api/src/web/auth.rs
//!
//! Authentication endpoints for user registration, login, and logout.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use bookshare_core::{PortError, User};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;
use utoipa::ToSchema;

use crate::error::{HttpError, MessageResponse};
use crate::web::middleware::bearer_token;
use crate::web::state::AppState;

const MIN_USERNAME_LEN: usize = 3;
const MIN_PASSWORD_LEN: usize = 6;

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// The public view of an account.
#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub profile_image: String,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            profile_image: user.profile_image,
            created_at: user.created_at,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserResponse,
}

//=========================================================================================
// Helpers
//=========================================================================================

fn non_empty(field: Option<String>) -> Option<String> {
    field.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

const AVATAR_BASE: &str = "https://api.dicebear.com/7.x/avataaars/svg";

/// Generated avatar for accounts that never uploaded a picture. The seed is
/// query-encoded.
fn avatar_url(username: &str) -> Result<String, HttpError> {
    reqwest::Url::parse_with_params(AVATAR_BASE, &[("seed", username)])
        .map(String::from)
        .map_err(|e| {
            error!("Failed to build avatar URL: {:?}", e);
            HttpError::internal("Failed to create user")
        })
}

/// Creates a server-side session and returns its id as the bearer token.
async fn issue_token(state: &AppState, user_id: Uuid) -> Result<String, HttpError> {
    let token = Uuid::new_v4().simple().to_string();
    let expires_at = Utc::now() + state.session_ttl;
    state
        .db
        .create_auth_session(&token, user_id, expires_at)
        .await
        .map_err(|e| {
            error!("Failed to create auth session: {:?}", e);
            HttpError::internal("Failed to create session")
        })?;
    Ok(token)
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /api/auth/register - Create a new user account
#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User created successfully", body = AuthResponse),
        (status = 400, description = "Invalid request or user already exists", body = MessageResponse),
        (status = 500, description = "Internal server error", body = MessageResponse)
    ),
    tag = "auth"
)]
pub async fn register_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<impl IntoResponse, HttpError> {
    let Json(req) = payload?;
    // 1. Validate input
    let (Some(username), Some(email), Some(password)) = (
        non_empty(req.username),
        non_empty(req.email),
        req.password.filter(|p| !p.is_empty()),
    ) else {
        return Err(HttpError::bad_request("All fields are required"));
    };
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(HttpError::bad_request(format!(
            "Password should be at least {} characters long",
            MIN_PASSWORD_LEN
        )));
    }
    if username.chars().count() < MIN_USERNAME_LEN {
        return Err(HttpError::bad_request(format!(
            "Username should be at least {} characters long",
            MIN_USERNAME_LEN
        )));
    }
    let email = normalize_email(&email);
    if !email.contains('@') {
        return Err(HttpError::bad_request("Email is not valid"));
    }

    // 2. Hash the password
    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| {
            error!("Failed to hash password: {:?}", e);
            HttpError::internal("Failed to hash password")
        })?
        .to_string();

    // 3. Create user in database
    let profile_image = avatar_url(&username)?;
    let user = state
        .db
        .create_user(&username, &email, &password_hash, &profile_image)
        .await
        .map_err(|e| match e {
            PortError::Conflict(_) => HttpError::bad_request("Email or username already exists"),
            other => {
                error!("Failed to create user: {:?}", other);
                HttpError::internal("Failed to create user")
            }
        })?;

    // 4. Issue a bearer token
    let token = issue_token(&state, user.id).await?;
    info!(user_id = %user.id, "User registered");

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            token,
            user: user.into(),
        }),
    ))
}

/// POST /api/auth/login - Login with existing account
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 400, description = "Missing fields", body = MessageResponse),
        (status = 401, description = "Invalid credentials", body = MessageResponse),
        (status = 500, description = "Internal server error", body = MessageResponse)
    ),
    tag = "auth"
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse, HttpError> {
    let Json(req) = payload?;
    let (Some(email), Some(password)) = (
        non_empty(req.email),
        req.password.filter(|p| !p.is_empty()),
    ) else {
        return Err(HttpError::bad_request("All fields are required"));
    };

    // 1. Get user by email
    let creds = state
        .db
        .get_user_by_email(&normalize_email(&email))
        .await
        .map_err(|e| match e {
            PortError::NotFound(_) => HttpError::unauthorized("Invalid credentials"),
            other => {
                error!("Failed to get user: {:?}", other);
                HttpError::internal("Authentication error")
            }
        })?;

    // 2. Verify password
    let parsed_hash = PasswordHash::new(&creds.hashed_password).map_err(|e| {
        error!("Failed to parse password hash: {:?}", e);
        HttpError::internal("Authentication error")
    })?;
    let valid = Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok();
    if !valid {
        return Err(HttpError::unauthorized("Invalid credentials"));
    }

    // 3. Issue a bearer token
    let token = issue_token(&state, creds.user.id).await?;
    info!(user_id = %creds.user.id, "User logged in");

    Ok(Json(AuthResponse {
        token,
        user: creds.user.into(),
    }))
}

/// POST /api/auth/logout - Invalidate the presented token
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses(
        (status = 200, description = "Logout successful", body = MessageResponse),
        (status = 401, description = "No active session", body = MessageResponse)
    ),
    security(("bearer" = [])),
    tag = "auth"
)]
pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, HttpError> {
    let token = bearer_token(&headers)
        .ok_or_else(|| HttpError::unauthorized("No authentication token, access denied"))?;

    state.db.delete_auth_session(token).await.map_err(|e| {
        error!("Failed to delete auth session: {:?}", e);
        HttpError::internal("Failed to logout")
    })?;

    Ok(Json(MessageResponse {
        message: "Logged out successfully".to_string(),
    }))
}

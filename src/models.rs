use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use validator::Validate;

use crate::policy::Role;

// --- Core Application Schemas (Mapped to Database) ---

/// User
///
/// Identity record stored in the `users` table.
/// The stored password hash is never written to JSON.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct User {
    pub id: i32,
    // Unique across all users.
    pub email: String,
    pub name: String,
    // 'autor' or 'admin'.
    pub role: String,
    #[serde(skip_serializing, default)]
    #[ts(skip)]
    pub password: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// Post
///
/// Content record from the `posts` table. `author` is free text and is unrelated to
/// `user_id`, which points at the owning account (cleared when that account is deleted).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Post {
    pub id: i32,
    pub title: String,
    pub subtitle: String,
    pub content: String,
    pub author: String,
    pub user_id: Option<i32>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

// --- Request Payloads (Input Schemas) ---

/// CreateUserRequest
///
/// Payload for `POST /Users` and `POST /Users/admin`.
/// Presence of every field is checked on the raw body before this is deserialized.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[ts(export)]
pub struct CreateUserRequest {
    #[validate(length(max = 200, message = "email deve ter no máximo 200 caracteres"))]
    pub email: String,
    #[validate(length(max = 200, message = "name deve ter no máximo 200 caracteres"))]
    pub name: String,
    pub role: String,
    pub password: String,
}

/// UpdateUserRequest
///
/// Partial update for `PATCH /Users/{id}`. Absent fields keep their stored value.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[ts(export)]
pub struct UpdateUserRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 200, message = "email deve ter no máximo 200 caracteres"))]
    pub email: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 200, message = "name deve ter no máximo 200 caracteres"))]
    pub name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl UpdateUserRequest {
    pub fn is_empty(&self) -> bool {
        self.email.is_none() && self.name.is_none() && self.role.is_none() && self.password.is_none()
    }
}

/// CreatePostRequest
///
/// Payload for `POST /Posts`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[ts(export)]
pub struct CreatePostRequest {
    #[validate(length(max = 200, message = "title deve ter no máximo 200 caracteres"))]
    pub title: String,
    #[validate(length(max = 200, message = "subtitle deve ter no máximo 200 caracteres"))]
    pub subtitle: String,
    #[validate(length(max = 20000, message = "content deve ter no máximo 20000 caracteres"))]
    pub content: String,
    #[validate(length(max = 200, message = "author deve ter no máximo 200 caracteres"))]
    pub author: String,
}

/// UpdatePostRequest
///
/// Partial update for `PUT /Posts/{id}`. Every field is optional.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[ts(export)]
pub struct UpdatePostRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 200, message = "title deve ter no máximo 200 caracteres"))]
    pub title: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 200, message = "subtitle deve ter no máximo 200 caracteres"))]
    pub subtitle: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 20000, message = "content deve ter no máximo 20000 caracteres"))]
    pub content: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 200, message = "author deve ter no máximo 200 caracteres"))]
    pub author: Option<String>,
}

/// LoginRequest
///
/// Credentials for `POST /auth`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// TokenResponse
///
/// Returned by a successful login. `expires_in` is in seconds.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

// --- Repository Inputs (Internal) ---

/// A user ready to be inserted. `password_hash` is already an Argon2 PHC string.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub name: String,
    pub role: Role,
    pub password_hash: String,
}

/// Column changes for a partial user update. `None` leaves the column untouched.
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub email: Option<String>,
    pub name: Option<String>,
    pub role: Option<Role>,
    pub password_hash: Option<String>,
}

/// A post ready to be inserted, with its optional owning user.
#[derive(Debug, Clone)]
pub struct NewPost {
    pub title: String,
    pub subtitle: String,
    pub content: String,
    pub author: String,
    pub user_id: Option<i32>,
}

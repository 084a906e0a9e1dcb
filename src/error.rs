use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Boxed cause attached to an `AppError` for diagnostics. Never serialized.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// ErrorBody
///
/// The uniform JSON body returned for every failed request.
/// `statusCode` always mirrors the HTTP status of the response.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub err: String,
}

/// AppError
///
/// Error taxonomy shared by every handler, extractor and middleware.
/// Converting into a response produces an `ErrorBody` with the matching status.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Missing or invalid input (400).
    #[error("{0}")]
    BadRequest(String),

    /// Missing, malformed or expired bearer token (401).
    #[error("{0}")]
    Unauthenticated(String),

    /// Authenticated caller whose role is not allowed on the route (403).
    #[error("{0}")]
    Unauthorized(String),

    /// No such record (404).
    #[error("{0}")]
    NotFound(String),

    /// Unique constraint violated by the persistence layer (409).
    #[error("{0}")]
    Conflict(String),

    /// Persistence or unexpected failure (500). The cause is only logged.
    #[error("{message}")]
    Internal {
        message: String,
        #[source]
        source: BoxError,
    },
}

impl AppError {
    pub fn internal(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Internal {
            message: message.into(),
            source: source.into(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            Self::Unauthorized(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The body this error renders to.
    pub fn body(&self) -> ErrorBody {
        ErrorBody {
            status_code: self.status_code().as_u16(),
            err: self.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        match &self {
            Self::Internal { message, source } => {
                tracing::error!(status = status.as_u16(), error = %message, cause = ?source, "request failed");
            }
            Self::Unauthenticated(message) | Self::Unauthorized(message) => {
                tracing::warn!(status = status.as_u16(), error = %message, "request rejected");
            }
            other => {
                tracing::debug!(status = status.as_u16(), error = %other, "request failed");
            }
        }

        (status, Json(self.body())).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(format!("Corpo da requisição inválido: {}", rejection.body_text()))
    }
}

/// Result alias used by handlers.
pub type AppResult<T> = Result<T, AppError>;

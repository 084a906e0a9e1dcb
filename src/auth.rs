use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind};
use serde::{Deserialize, Serialize};

use crate::{
    config::AppConfig,
    error::AppError,
    models::{TokenResponse, User},
    repository::UserRepositoryState,
};

/// Claims
///
/// Payload of every bearer token issued by `POST /auth`.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (sub): the numeric id of the user.
    pub sub: i32,
    /// Role at issue time. The extractor re-reads the current role from the store.
    pub role: String,
    /// Expiration Time (exp).
    pub exp: usize,
    /// Issued At (iat).
    pub iat: usize,
}

impl Claims {
    /// Claims valid from now for `expiry_hours`. Fails instead of wrapping when the
    /// expiry does not fit a timestamp.
    pub fn for_user(user: &User, expiry_hours: i64) -> Result<Self, AppError> {
        let now = Utc::now();
        let out_of_range = || {
            AppError::internal(
                "Não foi possível gerar o token",
                format!("token expiry of {expiry_hours}h is out of range"),
            )
        };

        let exp = Duration::try_hours(expiry_hours)
            .filter(|ttl| *ttl > Duration::zero())
            .and_then(|ttl| now.checked_add_signed(ttl))
            .ok_or_else(out_of_range)?;

        Ok(Self {
            sub: user.id,
            role: user.role.clone(),
            exp: usize::try_from(exp.timestamp()).map_err(|_| out_of_range())?,
            iat: usize::try_from(now.timestamp()).map_err(|_| out_of_range())?,
        })
    }
}

/// issue_token
///
/// Signs claims for `user` with the configured secret (HS256).
pub fn issue_token(user: &User, config: &AppConfig) -> Result<TokenResponse, AppError> {
    let claims = Claims::for_user(user, config.jwt_expiry_hours)?;
    let key = EncodingKey::from_secret(config.jwt_secret.as_bytes());

    let access_token = encode(&Header::default(), &claims, &key)
        .map_err(|e| AppError::internal("Não foi possível gerar o token", e))?;

    Ok(TokenResponse {
        access_token,
        token_type: "Bearer".to_string(),
        expires_in: (claims.exp - claims.iat) as i64,
    })
}

/// verify_token
///
/// Checks signature and expiry and returns the decoded claims.
pub fn verify_token(token: &str, secret: &str) -> Result<Claims, AppError> {
    let decoding_key = DecodingKey::from_secret(secret.as_bytes());

    let mut validation = Validation::default();
    validation.validate_exp = true;

    decode::<Claims>(token, &decoding_key, &validation)
        .map(|data| data.claims)
        .map_err(|e| {
            tracing::debug!(error = %e, "rejected bearer token");
            match e.kind() {
                ErrorKind::ExpiredSignature => AppError::Unauthenticated("Token expirado".to_string()),
                _ => AppError::Unauthenticated("Token inválido".to_string()),
            }
        })
}

/// AuthUser
///
/// Resolved identity of an authenticated request: the user id and the role the
/// Role Guard checks against.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: i32,
    pub role: String,
}

/// AuthUser Extractor Implementation
///
/// 1. Reuse an identity already resolved by the route policy middleware.
/// 2. Otherwise read `Authorization: Bearer <token>` and verify the JWT.
/// 3. Reload the user so deleted accounts and role changes apply immediately.
///
/// Rejection: `AppError::Unauthenticated` (401) on any failure.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    UserRepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<AuthUser>() {
            return Ok(user.clone());
        }

        let users = UserRepositoryState::from_ref(state);
        let config = AppConfig::from_ref(state);

        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::Unauthenticated("Token de acesso ausente".to_string()))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .or_else(|| auth_header.strip_prefix("bearer "))
            .ok_or_else(|| {
                AppError::Unauthenticated(
                    "Formato do cabeçalho Authorization inválido. Esperado: Bearer <token>"
                        .to_string(),
                )
            })?;

        let claims = verify_token(token, &config.jwt_secret)?;

        let user = users
            .find_by_id(claims.sub)
            .await
            .map_err(|e| AppError::internal("Não foi possível validar o usuário", e))?
            .ok_or_else(|| AppError::Unauthenticated("Usuário do token não existe".to_string()))?;

        Ok(AuthUser {
            id: user.id,
            role: user.role,
        })
    }
}

use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Auth Router Module
///
/// Unauthenticated gateway endpoints.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe for load balancers.
        .route("/health", get(|| async { "ok" }))
        // POST /auth
        // Exchanges credentials for a bearer token.
        .route("/auth", post(handlers::login))
}

use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Users Router Module
///
/// Listing, reading, signup and partial updates are public.
/// `POST /Users/admin` and `DELETE /Users/{id}` are admin-only.
pub fn user_routes() -> Router<AppState> {
    Router::new()
        // GET /Users, POST /Users
        // Signup always yields an `autor` account.
        .route(
            "/Users",
            get(handlers::list_users).post(handlers::create_user),
        )
        // POST /Users/admin
        // Static segment, so it wins over `/Users/{id}`.
        .route("/Users/admin", post(handlers::create_admin_user))
        // GET, PATCH, DELETE /Users/{id}
        .route(
            "/Users/{id}",
            get(handlers::get_user)
                .patch(handlers::update_user)
                .delete(handlers::delete_user),
        )
}

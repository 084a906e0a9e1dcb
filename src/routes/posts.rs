use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, put},
};

/// Posts Router Module
///
/// Reads are public. Create, update and delete require an `autor` or `admin` token;
/// the role check happens in the policy middleware before any handler runs.
pub fn post_routes() -> Router<AppState> {
    Router::new()
        // GET /Posts (public), POST /Posts (autor, admin)
        .route(
            "/Posts",
            get(handlers::list_posts).post(handlers::create_post),
        )
        // GET /Posts/{id} (public), PUT/DELETE /Posts/{id} (autor, admin)
        .route(
            "/Posts/{id}",
            put(handlers::update_post)
                .get(handlers::get_post)
                .delete(handlers::delete_post),
        )
}

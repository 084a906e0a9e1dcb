use axum::{
    Router,
    extract::{FromRef, FromRequestParts, MatchedPath, Request, State},
    http::HeaderName,
    middleware::{self, Next},
    response::Response,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod password;
pub mod policy;
pub mod repository;
pub mod validation;

// Resource routers (Posts, Users, Auth).
pub mod routes;

use auth::AuthUser;
use routes::{auth as auth_routes, posts, users};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use error::{AppError, AppResult, ErrorBody};
pub use repository::{
    PgPostRepository, PgUserRepository, PostRepository, PostRepositoryState, UserRepository,
    UserRepositoryState,
};

/// ApiDoc
///
/// Aggregates every `#[utoipa::path]` handler and `ToSchema` model into the
/// OpenAPI document served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::login,
        handlers::list_posts, handlers::get_post, handlers::create_post,
        handlers::update_post, handlers::delete_post,
        handlers::list_users, handlers::get_user, handlers::create_user,
        handlers::create_admin_user, handlers::update_user, handlers::delete_user
    ),
    components(
        schemas(
            models::User, models::Post, models::CreateUserRequest, models::UpdateUserRequest,
            models::CreatePostRequest, models::UpdatePostRequest, models::LoginRequest,
            models::TokenResponse, error::ErrorBody,
        )
    ),
    tags(
        (name = "Posts", description = "Blog posts"),
        (name = "Users", description = "User accounts"),
        (name = "Auth", description = "Token issuance")
    )
)]
struct ApiDoc;

/// AppState
///
/// Shared, cheaply clonable container for everything a request may need.
#[derive(Clone)]
pub struct AppState {
    /// User persistence (Postgres in production, in-memory in tests).
    pub users: UserRepositoryState,
    /// Post persistence.
    pub posts: PostRepositoryState,
    /// The loaded, immutable environment configuration.
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for UserRepositoryState {
    fn from_ref(app_state: &AppState) -> UserRepositoryState {
        app_state.users.clone()
    }
}

impl FromRef<AppState> for PostRepositoryState {
    fn from_ref(app_state: &AppState) -> PostRepositoryState {
        app_state.posts.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// authorize_route
///
/// Route policy middleware. Looks up the matched route template in
/// `policy::ROUTE_POLICIES`; public routes pass straight through.
///
/// For protected routes it resolves the caller through the `AuthUser` extractor (401 on
/// failure), applies the Role Guard (403 on a disallowed role) and stores the identity in
/// the request extensions so handlers extracting `AuthUser` reuse it.
/// A rejected request never reaches its handler.
async fn authorize_route(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let Some(roles) = request
        .extensions()
        .get::<MatchedPath>()
        .and_then(|path| policy::required_roles(request.method().as_str(), path.as_str()))
    else {
        return Ok(next.run(request).await);
    };

    let (mut parts, body) = request.into_parts();
    let user = AuthUser::from_request_parts(&mut parts, &state).await?;
    policy::authorize(&user.role, roles)?;

    tracing::debug!(user_id = user.id, role = %user.role, "route authorized");
    parts.extensions.insert(user);

    Ok(next.run(Request::from_parts(parts, body)).await)
}

/// create_router
///
/// Assembles the resource routers, the policy middleware, documentation and the
/// observability stack around the shared state.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    let api = Router::new()
        .merge(posts::post_routes())
        .merge(users::user_routes())
        .merge(auth_routes::auth_routes())
        // Runs after routing, so the matched template is known.
        .route_layer(middleware::from_fn_with_state(state.clone(), authorize_route))
        .with_state(state);

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(api)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// Span for one request, correlated by the `x-request-id` set above.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}

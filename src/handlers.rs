use crate::{
    AppState,
    auth::{self, AuthUser},
    error::{AppError, AppResult, ErrorBody},
    models::{
        CreatePostRequest, CreateUserRequest, LoginRequest, NewPost, NewUser, Post,
        TokenResponse, UpdatePostRequest, UpdateUserRequest, User, UserChanges,
    },
    password::{hash_password, verify_password},
    policy::Role,
    repository::RepositoryError,
    validation::{
        LOGIN_REQUIRED_FIELDS, POST_REQUIRED_FIELDS, USER_REQUIRED_FIELDS, into_object,
        into_payload, parse_id, require_fields,
    },
};
use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};
use serde_json::Value;

/// Request body as raw JSON, so missing-field checks run before typed deserialization
/// and malformed bodies still produce the uniform error shape.
type RawBody = Result<Json<Value>, JsonRejection>;

fn parse_role(raw: &str) -> AppResult<Role> {
    Role::parse(raw).ok_or_else(|| AppError::BadRequest(format!("Perfil inválido: {raw}")))
}

/// Translates a failed user write. Duplicate emails keep their own status (409).
fn user_write_error(err: RepositoryError, message: &str) -> AppError {
    match err {
        RepositoryError::DuplicateEmail(email) => {
            AppError::Conflict(format!("O email {email} já está cadastrado"))
        }
        other => AppError::internal(message, other),
    }
}

// --- Auth ---

/// login
///
/// [Public Route] Exchanges email + password for a bearer token.
/// Unknown email and wrong password are indistinguishable to the caller.
#[utoipa::path(
    post,
    path = "/auth",
    tag = "Auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Token issued", body = TokenResponse),
        (status = 400, description = "Missing credentials", body = ErrorBody),
        (status = 401, description = "Invalid credentials", body = ErrorBody)
    )
)]
pub async fn login(State(state): State<AppState>, body: RawBody) -> AppResult<Json<TokenResponse>> {
    let Json(body) = body?;
    let input = into_object(body)?;
    require_fields(LOGIN_REQUIRED_FIELDS, &input)?;
    let credentials: LoginRequest = serde_json::from_value(Value::Object(input))
        .map_err(|e| AppError::BadRequest(format!("Corpo da requisição inválido: {e}")))?;

    let invalid = || AppError::Unauthenticated("Credenciais inválidas".to_string());

    let user = state
        .users
        .find_by_email(&credentials.email)
        .await
        .map_err(|e| AppError::internal("Não foi possível realizar o login", e))?
        .ok_or_else(invalid)?;

    if !verify_password(&credentials.password, &user.password)? {
        tracing::info!(user_id = user.id, "login rejected: wrong password");
        return Err(invalid());
    }

    let token = auth::issue_token(&user, &state.config)?;
    tracing::info!(user_id = user.id, role = %user.role, "user logged in");

    Ok(Json(token))
}

// --- Posts ---

/// list_posts
///
/// [Public Route] Lists every post, newest first.
#[utoipa::path(
    get,
    path = "/Posts",
    tag = "Posts",
    responses(
        (status = 200, description = "All posts", body = [Post]),
        (status = 500, description = "Query failed", body = ErrorBody)
    )
)]
pub async fn list_posts(State(state): State<AppState>) -> AppResult<Json<Vec<Post>>> {
    let posts = state
        .posts
        .find_all()
        .await
        .map_err(|e| AppError::internal("Não foi possível listar os posts", e))?;

    Ok(Json(posts))
}

/// get_post
///
/// [Public Route] Retrieves a single post by id.
#[utoipa::path(
    get,
    path = "/Posts/{id}",
    tag = "Posts",
    params(("id" = i32, Path, description = "Post ID")),
    responses(
        (status = 200, description = "Found", body = Post),
        (status = 404, description = "Not found", body = ErrorBody)
    )
)]
pub async fn get_post(State(state): State<AppState>, Path(id): Path<String>) -> AppResult<Json<Post>> {
    let id = parse_id(&id)?;

    state
        .posts
        .find_by_id(id)
        .await
        .map_err(|e| AppError::internal("Não foi possível buscar o post", e))?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Post {id} não encontrado")))
}

/// create_post
///
/// [autor, admin] Creates a post owned by the caller.
/// All of title, subtitle, content and author must be present and non-empty.
#[utoipa::path(
    post,
    path = "/Posts",
    tag = "Posts",
    request_body = CreatePostRequest,
    responses(
        (status = 201, description = "Created", body = Post),
        (status = 400, description = "Missing fields", body = ErrorBody),
        (status = 401, description = "Not authenticated", body = ErrorBody),
        (status = 403, description = "Role not allowed", body = ErrorBody)
    )
)]
pub async fn create_post(
    caller: AuthUser,
    State(state): State<AppState>,
    body: RawBody,
) -> AppResult<(StatusCode, Json<Post>)> {
    let Json(body) = body?;
    let input = into_object(body)?;
    require_fields(POST_REQUIRED_FIELDS, &input)?;
    let payload: CreatePostRequest = into_payload(input)?;

    let post = state
        .posts
        .create(NewPost {
            title: payload.title,
            subtitle: payload.subtitle,
            content: payload.content,
            author: payload.author,
            user_id: Some(caller.id),
        })
        .await
        .map_err(|e| AppError::internal("Não foi possível criar o post", e))?;

    Ok((StatusCode::CREATED, Json(post)))
}

/// update_post
///
/// [autor, admin] Partial update: only the provided fields change.
#[utoipa::path(
    put,
    path = "/Posts/{id}",
    tag = "Posts",
    params(("id" = i32, Path, description = "Post ID")),
    request_body = UpdatePostRequest,
    responses(
        (status = 200, description = "Updated", body = Post),
        (status = 400, description = "Invalid id or body", body = ErrorBody),
        (status = 404, description = "Not found", body = ErrorBody)
    )
)]
pub async fn update_post(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: RawBody,
) -> AppResult<Json<Post>> {
    let id = parse_id(&id)?;
    let Json(body) = body?;
    let changes: UpdatePostRequest = into_payload(into_object(body)?)?;

    state
        .posts
        .update(id, changes)
        .await
        .map_err(|e| AppError::internal("Não foi possível atualizar o post", e))?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Post {id} não encontrado")))
}

/// delete_post
///
/// [autor, admin] Deletes a post. A missing id is a 404, never a silent success.
#[utoipa::path(
    delete,
    path = "/Posts/{id}",
    tag = "Posts",
    params(("id" = i32, Path, description = "Post ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not found", body = ErrorBody)
    )
)]
pub async fn delete_post(State(state): State<AppState>, Path(id): Path<String>) -> AppResult<StatusCode> {
    let id = parse_id(&id)?;

    let removed = state
        .posts
        .delete(id)
        .await
        .map_err(|e| AppError::internal("Não foi possível deletar o post.", e))?;

    if removed {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("Post {id} não encontrado")))
    }
}

// --- Users ---

/// list_users
///
/// [Public Route] Lists every user. Password hashes are never serialized.
#[utoipa::path(
    get,
    path = "/Users",
    tag = "Users",
    responses(
        (status = 200, description = "All users", body = [User]),
        (status = 500, description = "Query failed", body = ErrorBody)
    )
)]
pub async fn list_users(State(state): State<AppState>) -> AppResult<Json<Vec<User>>> {
    let users = state
        .users
        .find_all()
        .await
        .map_err(|e| AppError::internal("Não foi possível listar os usuários", e))?;

    Ok(Json(users))
}

/// get_user
///
/// [Public Route] Retrieves a single user by id.
#[utoipa::path(
    get,
    path = "/Users/{id}",
    tag = "Users",
    params(("id" = i32, Path, description = "User ID")),
    responses(
        (status = 200, description = "Found", body = User),
        (status = 404, description = "Not found", body = ErrorBody)
    )
)]
pub async fn get_user(State(state): State<AppState>, Path(id): Path<String>) -> AppResult<Json<User>> {
    let id = parse_id(&id)?;

    state
        .users
        .find_by_id(id)
        .await
        .map_err(|e| AppError::internal("Não foi possível buscar o usuário", e))?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Usuário {id} não encontrado")))
}

/// Shared create path for public signup and admin creation.
/// `role` overrides whatever the body asked for when set.
async fn insert_user(state: &AppState, body: Value, role: Option<Role>) -> AppResult<User> {
    let input = into_object(body)?;
    require_fields(USER_REQUIRED_FIELDS, &input)?;
    let payload: CreateUserRequest = into_payload(input)?;

    let role = match role {
        Some(role) => role,
        None => parse_role(&payload.role)?,
    };
    let password_hash = hash_password(&payload.password)?;

    state
        .users
        .create(NewUser {
            email: payload.email,
            name: payload.name,
            role,
            password_hash,
        })
        .await
        .map_err(|e| user_write_error(e, "Não foi possível criar o usuário"))
}

/// create_user
///
/// [Public Route] Open signup. `role` is required in the body but the account is
/// always created as `autor`; admins are created through `POST /Users/admin`.
#[utoipa::path(
    post,
    path = "/Users",
    tag = "Users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "Created", body = User),
        (status = 400, description = "Missing fields", body = ErrorBody),
        (status = 409, description = "Email already registered", body = ErrorBody)
    )
)]
pub async fn create_user(State(state): State<AppState>, body: RawBody) -> AppResult<(StatusCode, Json<User>)> {
    let Json(body) = body?;
    let user = insert_user(&state, body, Some(Role::Author)).await?;

    Ok((StatusCode::CREATED, Json(user)))
}

/// create_admin_user
///
/// [admin] Creates a user with the role given in the body.
#[utoipa::path(
    post,
    path = "/Users/admin",
    tag = "Users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "Created", body = User),
        (status = 400, description = "Missing fields or unknown role", body = ErrorBody),
        (status = 401, description = "Not authenticated", body = ErrorBody),
        (status = 403, description = "Caller is not admin", body = ErrorBody),
        (status = 409, description = "Email already registered", body = ErrorBody)
    )
)]
pub async fn create_admin_user(
    State(state): State<AppState>,
    body: RawBody,
) -> AppResult<(StatusCode, Json<User>)> {
    let Json(body) = body?;
    let user = insert_user(&state, body, None).await?;

    Ok((StatusCode::CREATED, Json(user)))
}

/// update_user
///
/// [Public Route] Partial update. The id and a non-empty body are required;
/// fields that are not sent keep their stored values.
#[utoipa::path(
    patch,
    path = "/Users/{id}",
    tag = "Users",
    params(("id" = i32, Path, description = "User ID")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "Updated", body = User),
        (status = 400, description = "Missing id or body", body = ErrorBody),
        (status = 404, description = "Not found", body = ErrorBody),
        (status = 500, description = "Update failed", body = ErrorBody)
    )
)]
pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: RawBody,
) -> AppResult<Json<User>> {
    let id = parse_id(&id)?;
    let Json(body) = body?;
    let payload: UpdateUserRequest = into_payload(into_object(body)?)?;

    if payload.is_empty() {
        return Err(AppError::BadRequest("Body is required".to_string()));
    }

    let changes = UserChanges {
        role: payload.role.as_deref().map(parse_role).transpose()?,
        password_hash: payload.password.as_deref().map(hash_password).transpose()?,
        email: payload.email,
        name: payload.name,
    };

    state
        .users
        .update(id, changes)
        .await
        .map_err(|e| user_write_error(e, "Não foi possível atualizar o usuário"))?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Usuário {id} não encontrado")))
}

/// delete_user
///
/// [admin] Deletes a user. Their posts are kept and lose the owner reference.
#[utoipa::path(
    delete,
    path = "/Users/{id}",
    tag = "Users",
    params(("id" = i32, Path, description = "User ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 401, description = "Not authenticated", body = ErrorBody),
        (status = 403, description = "Caller is not admin", body = ErrorBody),
        (status = 404, description = "Not found", body = ErrorBody)
    )
)]
pub async fn delete_user(State(state): State<AppState>, Path(id): Path<String>) -> AppResult<StatusCode> {
    let id = parse_id(&id)?;

    let removed = state
        .users
        .delete(id)
        .await
        .map_err(|e| AppError::internal("Não foi possível deletar o usuário.", e))?;

    if removed {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("Usuário {id} não encontrado")))
    }
}

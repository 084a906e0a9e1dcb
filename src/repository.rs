use crate::models::{NewPost, NewUser, Post, UpdatePostRequest, User, UserChanges};
use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Arc;

/// RepositoryError
///
/// Failures surfaced by the persistence layer. Handlers translate these into `AppError`.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    /// The unique constraint on `users.email` rejected the write.
    #[error("email '{0}' is already registered")]
    DuplicateEmail(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// UserRepository
///
/// Persistence contract for `User` records. Handlers only see this trait, so tests
/// can inject in-memory implementations.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_all(&self) -> RepositoryResult<Vec<User>>;
    async fn find_by_id(&self, id: i32) -> RepositoryResult<Option<User>>;
    async fn find_by_email(&self, email: &str) -> RepositoryResult<Option<User>>;
    async fn create(&self, user: NewUser) -> RepositoryResult<User>;
    /// Applies only the `Some` fields of `changes` and bumps `updated_at`.
    /// `None` when no user has this id.
    async fn update(&self, id: i32, changes: UserChanges) -> RepositoryResult<Option<User>>;
    /// `true` when a row was removed.
    async fn delete(&self, id: i32) -> RepositoryResult<bool>;
}

/// PostRepository
///
/// Persistence contract for `Post` records.
#[async_trait]
pub trait PostRepository: Send + Sync {
    async fn find_all(&self) -> RepositoryResult<Vec<Post>>;
    async fn find_by_id(&self, id: i32) -> RepositoryResult<Option<Post>>;
    async fn create(&self, post: NewPost) -> RepositoryResult<Post>;
    /// Partial update with the same semantics as `UserRepository::update`.
    async fn update(&self, id: i32, changes: UpdatePostRequest) -> RepositoryResult<Option<Post>>;
    async fn delete(&self, id: i32) -> RepositoryResult<bool>;
}

pub type UserRepositoryState = Arc<dyn UserRepository>;
pub type PostRepositoryState = Arc<dyn PostRepository>;

const USER_COLUMNS: &str = "id, email, name, role, password, created_at, updated_at";
const POST_COLUMNS: &str = "id, title, subtitle, content, author, user_id, created_at, updated_at";

/// Maps a unique-violation on insert/update to `DuplicateEmail`.
fn map_user_write_error(err: sqlx::Error, email: Option<&str>) -> RepositoryError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            return RepositoryError::DuplicateEmail(email.unwrap_or_default().to_string());
        }
    }
    RepositoryError::Database(err)
}

/// PgUserRepository
///
/// `UserRepository` backed by the `users` table.
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn find_all(&self) -> RepositoryResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY id"
        ))
        .fetch_all(&self.pool)
        .await?;

        tracing::debug!(count = users.len(), "loaded users");
        Ok(users)
    }

    async fn find_by_id(&self, id: i32) -> RepositoryResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> RepositoryResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn create(&self, user: NewUser) -> RepositoryResult<User> {
        let created = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (email, name, role, password, created_at, updated_at)
            VALUES ($1, $2, $3, $4, NOW(), NOW())
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&user.email)
        .bind(&user.name)
        .bind(user.role.as_str())
        .bind(&user.password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_user_write_error(e, Some(&user.email)))?;

        tracing::info!(user_id = created.id, role = %created.role, "created user");
        Ok(created)
    }

    /// COALESCE keeps the stored value for every column whose bind is NULL.
    async fn update(&self, id: i32, changes: UserChanges) -> RepositoryResult<Option<User>> {
        let updated = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
            SET email = COALESCE($2, email),
                name = COALESCE($3, name),
                role = COALESCE($4, role),
                password = COALESCE($5, password),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(changes.email.as_deref())
        .bind(changes.name.as_deref())
        .bind(changes.role.map(|role| role.as_str()))
        .bind(changes.password_hash.as_deref())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_user_write_error(e, changes.email.as_deref()))?;

        if updated.is_some() {
            tracing::info!(user_id = id, "updated user");
        }
        Ok(updated)
    }

    async fn delete(&self, id: i32) -> RepositoryResult<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        let removed = result.rows_affected() > 0;
        if removed {
            tracing::info!(user_id = id, "deleted user");
        }
        Ok(removed)
    }
}

/// PgPostRepository
///
/// `PostRepository` backed by the `posts` table.
pub struct PgPostRepository {
    pool: PgPool,
}

impl PgPostRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PostRepository for PgPostRepository {
    async fn find_all(&self) -> RepositoryResult<Vec<Post>> {
        let posts = sqlx::query_as::<_, Post>(&format!(
            "SELECT {POST_COLUMNS} FROM posts ORDER BY created_at DESC, id DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        tracing::debug!(count = posts.len(), "loaded posts");
        Ok(posts)
    }

    async fn find_by_id(&self, id: i32) -> RepositoryResult<Option<Post>> {
        let post = sqlx::query_as::<_, Post>(&format!(
            "SELECT {POST_COLUMNS} FROM posts WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(post)
    }

    async fn create(&self, post: NewPost) -> RepositoryResult<Post> {
        let created = sqlx::query_as::<_, Post>(&format!(
            r#"
            INSERT INTO posts (title, subtitle, content, author, user_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, NOW(), NOW())
            RETURNING {POST_COLUMNS}
            "#
        ))
        .bind(&post.title)
        .bind(&post.subtitle)
        .bind(&post.content)
        .bind(&post.author)
        .bind(post.user_id)
        .fetch_one(&self.pool)
        .await?;

        tracing::info!(post_id = created.id, user_id = ?created.user_id, "created post");
        Ok(created)
    }

    async fn update(&self, id: i32, changes: UpdatePostRequest) -> RepositoryResult<Option<Post>> {
        let updated = sqlx::query_as::<_, Post>(&format!(
            r#"
            UPDATE posts
            SET title = COALESCE($2, title),
                subtitle = COALESCE($3, subtitle),
                content = COALESCE($4, content),
                author = COALESCE($5, author),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {POST_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(changes.title)
        .bind(changes.subtitle)
        .bind(changes.content)
        .bind(changes.author)
        .fetch_optional(&self.pool)
        .await?;

        if updated.is_some() {
            tracing::info!(post_id = id, "updated post");
        }
        Ok(updated)
    }

    async fn delete(&self, id: i32) -> RepositoryResult<bool> {
        let result = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        let removed = result.rows_affected() > 0;
        if removed {
            tracing::info!(post_id = id, "deleted post");
        }
        Ok(removed)
    }
}

#![allow(dead_code)]

use async_trait::async_trait;
use axum::{body::Body, http::Request, response::Response};
use blog_api::{
    AppConfig, AppState, create_router,
    auth::issue_token,
    models::{NewPost, NewUser, Post, UpdatePostRequest, User, UserChanges},
    password::hash_password,
    policy::Role,
    repository::{
        PostRepository, PostRepositoryState, RepositoryError, RepositoryResult, UserRepository,
        UserRepositoryState,
    },
};
use chrono::Utc;
use serde_json::Value;
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicBool, Ordering},
};
use tower::ServiceExt;

// --- In-memory persistence shared by the handler and router tests ---

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    posts: Vec<Post>,
    next_user_id: i32,
    next_post_id: i32,
}

/// MemoryDb
///
/// Both repositories point at the same tables so that deleting a user can clear
/// `user_id` on their posts, like the foreign key does in Postgres.
/// Setting `fail` makes every call return a database error.
#[derive(Default)]
pub struct MemoryDb {
    tables: Mutex<Tables>,
    pub fail: AtomicBool,
}

impl MemoryDb {
    fn check(&self) -> RepositoryResult<()> {
        if self.fail.load(Ordering::SeqCst) {
            Err(RepositoryError::Database(sqlx::Error::PoolTimedOut))
        } else {
            Ok(())
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.fail.store(failing, Ordering::SeqCst);
    }

    pub fn users(&self) -> Vec<User> {
        self.tables.lock().unwrap().users.clone()
    }

    pub fn posts(&self) -> Vec<Post> {
        self.tables.lock().unwrap().posts.clone()
    }
}

pub struct MemoryUsers(pub Arc<MemoryDb>);
pub struct MemoryPosts(pub Arc<MemoryDb>);

#[async_trait]
impl UserRepository for MemoryUsers {
    async fn find_all(&self) -> RepositoryResult<Vec<User>> {
        self.0.check()?;
        Ok(self.0.users())
    }

    async fn find_by_id(&self, id: i32) -> RepositoryResult<Option<User>> {
        self.0.check()?;
        Ok(self.0.users().into_iter().find(|u| u.id == id))
    }

    async fn find_by_email(&self, email: &str) -> RepositoryResult<Option<User>> {
        self.0.check()?;
        Ok(self.0.users().into_iter().find(|u| u.email == email))
    }

    async fn create(&self, user: NewUser) -> RepositoryResult<User> {
        self.0.check()?;
        let mut tables = self.0.tables.lock().unwrap();
        if tables.users.iter().any(|u| u.email == user.email) {
            return Err(RepositoryError::DuplicateEmail(user.email));
        }

        tables.next_user_id += 1;
        let now = Utc::now();
        let created = User {
            id: tables.next_user_id,
            email: user.email,
            name: user.name,
            role: user.role.as_str().to_string(),
            password: user.password_hash,
            created_at: now,
            updated_at: now,
        };
        tables.users.push(created.clone());
        Ok(created)
    }

    async fn update(&self, id: i32, changes: UserChanges) -> RepositoryResult<Option<User>> {
        self.0.check()?;
        let mut tables = self.0.tables.lock().unwrap();
        if let Some(email) = &changes.email {
            if tables.users.iter().any(|u| u.id != id && &u.email == email) {
                return Err(RepositoryError::DuplicateEmail(email.clone()));
            }
        }

        let Some(user) = tables.users.iter_mut().find(|u| u.id == id) else {
            return Ok(None);
        };
        if let Some(email) = changes.email {
            user.email = email;
        }
        if let Some(name) = changes.name {
            user.name = name;
        }
        if let Some(role) = changes.role {
            user.role = role.as_str().to_string();
        }
        if let Some(hash) = changes.password_hash {
            user.password = hash;
        }
        user.updated_at = Utc::now();
        Ok(Some(user.clone()))
    }

    async fn delete(&self, id: i32) -> RepositoryResult<bool> {
        self.0.check()?;
        let mut tables = self.0.tables.lock().unwrap();
        let before = tables.users.len();
        tables.users.retain(|u| u.id != id);
        let removed = tables.users.len() < before;

        if removed {
            for post in tables.posts.iter_mut().filter(|p| p.user_id == Some(id)) {
                post.user_id = None;
            }
        }
        Ok(removed)
    }
}

#[async_trait]
impl PostRepository for MemoryPosts {
    async fn find_all(&self) -> RepositoryResult<Vec<Post>> {
        self.0.check()?;
        let mut posts = self.0.posts();
        posts.reverse();
        Ok(posts)
    }

    async fn find_by_id(&self, id: i32) -> RepositoryResult<Option<Post>> {
        self.0.check()?;
        Ok(self.0.posts().into_iter().find(|p| p.id == id))
    }

    async fn create(&self, post: NewPost) -> RepositoryResult<Post> {
        self.0.check()?;
        let mut tables = self.0.tables.lock().unwrap();
        tables.next_post_id += 1;
        let now = Utc::now();
        let created = Post {
            id: tables.next_post_id,
            title: post.title,
            subtitle: post.subtitle,
            content: post.content,
            author: post.author,
            user_id: post.user_id,
            created_at: now,
            updated_at: now,
        };
        tables.posts.push(created.clone());
        Ok(created)
    }

    async fn update(&self, id: i32, changes: UpdatePostRequest) -> RepositoryResult<Option<Post>> {
        self.0.check()?;
        let mut tables = self.0.tables.lock().unwrap();
        let Some(post) = tables.posts.iter_mut().find(|p| p.id == id) else {
            return Ok(None);
        };
        if let Some(title) = changes.title {
            post.title = title;
        }
        if let Some(subtitle) = changes.subtitle {
            post.subtitle = subtitle;
        }
        if let Some(content) = changes.content {
            post.content = content;
        }
        if let Some(author) = changes.author {
            post.author = author;
        }
        post.updated_at = Utc::now();
        Ok(Some(post.clone()))
    }

    async fn delete(&self, id: i32) -> RepositoryResult<bool> {
        self.0.check()?;
        let mut tables = self.0.tables.lock().unwrap();
        let before = tables.posts.len();
        tables.posts.retain(|p| p.id != id);
        Ok(tables.posts.len() < before)
    }
}

// --- State and request helpers ---

pub fn test_state() -> (AppState, Arc<MemoryDb>) {
    let db = Arc::new(MemoryDb::default());
    let state = AppState {
        users: Arc::new(MemoryUsers(db.clone())) as UserRepositoryState,
        posts: Arc::new(MemoryPosts(db.clone())) as PostRepositoryState,
        config: AppConfig::default(),
    };
    (state, db)
}

/// Inserts a user directly through the repository, bypassing the HTTP layer.
pub async fn seed_user(state: &AppState, email: &str, role: Role, password: &str) -> User {
    state
        .users
        .create(NewUser {
            email: email.to_string(),
            name: format!("User {email}"),
            role,
            password_hash: hash_password(password).unwrap(),
        })
        .await
        .unwrap()
}

pub async fn seed_post(state: &AppState, title: &str, user_id: Option<i32>) -> Post {
    state
        .posts
        .create(NewPost {
            title: title.to_string(),
            subtitle: "Subtitle".to_string(),
            content: "Content".to_string(),
            author: "Author".to_string(),
            user_id,
        })
        .await
        .unwrap()
}

/// `Authorization` header value for `user`, signed with the test config.
pub fn bearer_for(user: &User, config: &AppConfig) -> String {
    format!("Bearer {}", issue_token(user, config).unwrap().access_token)
}

/// Sends one request through the full router.
pub async fn send(state: &AppState, request: Request<Body>) -> Response {
    create_router(state.clone()).oneshot(request).await.unwrap()
}

pub fn json_request(method: &str, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("authorization", token);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn empty_request(method: &str, uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", token);
    }
    builder.body(Body::empty()).unwrap()
}

pub async fn body_json(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

mod common;

use blog_api::{AppState, create_router, policy::Role};
use common::{bearer_for, seed_user, test_state};
use serde_json::{Value, json};
use tokio::net::TcpListener;

pub struct TestApp {
    pub address: String,
    pub state: AppState,
}

/// Serves the full router on an ephemeral port, backed by the in-memory repositories.
async fn spawn_app() -> TestApp {
    let (state, _db) = test_state();
    let router = create_router(state.clone());

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    TestApp { address, state }
}

#[tokio::test]
async fn test_health_check() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/health", app.address))
        .send()
        .await
        .expect("req fail");

    assert!(response.status().is_success());
    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn test_openapi_document_is_served() {
    let app = spawn_app().await;

    let doc: Value = reqwest::get(format!("{}/api-docs/openapi.json", app.address))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert!(doc["paths"].get("/Posts").is_some());
    assert!(doc["paths"].get("/Users/admin").is_some());
}

#[tokio::test]
async fn test_post_lifecycle() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let autor = seed_user(&app.state, "ana@blog.com", Role::Author, "segredo").await;
    let token = bearer_for(&autor, &app.state.config);

    // Create
    let response = client
        .post(format!("{}/Posts", app.address))
        .header("authorization", &token)
        .json(&json!({ "title": "Olá", "subtitle": "S", "content": "C", "author": "Ana" }))
        .send()
        .await
        .expect("post fail");
    assert_eq!(response.status(), 201);
    let post: Value = response.json().await.unwrap();
    let id = post["id"].as_i64().unwrap();

    // Read
    let response = client
        .get(format!("{}/Posts/{}", app.address, id))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    // Update
    let response = client
        .put(format!("{}/Posts/{}", app.address, id))
        .header("authorization", &token)
        .json(&json!({ "content": "Editado" }))
        .send()
        .await
        .unwrap();
    let updated: Value = response.json().await.unwrap();
    assert_eq!(updated["content"], "Editado");
    assert_eq!(updated["title"], "Olá");

    // Delete
    let response = client
        .delete(format!("{}/Posts/{}", app.address, id))
        .header("authorization", &token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 204);

    let response = client
        .get(format!("{}/Posts/{}", app.address, id))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn test_delete_post_without_token_is_rejected() {
    let app = spawn_app().await;

    let response = reqwest::Client::new()
        .delete(format!("{}/Posts/1", app.address))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 401);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["statusCode"], 401);
}

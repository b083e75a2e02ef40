use reqwest::StatusCode;
use serde_json::{Value, json};
use std::sync::Arc;
use tokio::net::TcpListener;
use tutorial_api::{
    AppConfig, AppState, create_router,
    config::Env,
    models::{Snippet, TokenResponse, User},
    repository::{MemoryRepository, RepositoryState},
};

#[derive(Debug)]
pub struct TestApp {
    pub address: String,
    pub client: reqwest::Client,
}

impl TestApp {
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    async fn signup(&self, username: &str, password: &str) -> User {
        let response = self
            .client
            .post(self.url("/signup/"))
            .json(&json!({
                "username": username,
                "password1": password,
                "password2": password,
            }))
            .send()
            .await
            .expect("signup request");
        assert_eq!(response.status(), StatusCode::CREATED);
        response.json().await.unwrap()
    }

    async fn login(&self, username: &str, password: &str) -> String {
        let response = self
            .client
            .post(self.url("/login/"))
            .json(&json!({ "username": username, "password": password }))
            .send()
            .await
            .expect("login request");
        assert_eq!(response.status(), StatusCode::OK);
        let token: TokenResponse = response.json().await.unwrap();
        assert_eq!(token.token_type, "Bearer");
        token.access_token
    }
}

async fn spawn_app() -> TestApp {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    // Hyperlinks must point back at this server.
    let config = AppConfig {
        env: Env::Production,
        public_url: address.clone(),
        ..AppConfig::default()
    };
    let state = AppState {
        repo: Arc::new(MemoryRepository::new()) as RepositoryState,
        config,
    };
    let router = create_router(state);

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    TestApp {
        address,
        client: reqwest::Client::new(),
    }
}

#[tokio::test]
async fn test_health_check() {
    let app = spawn_app().await;
    let response = app.client.get(app.url("/health")).send().await.expect("req fail");
    assert!(response.status().is_success());
    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn test_api_root_lists_collections() {
    let app = spawn_app().await;
    let root: Value = app
        .client
        .get(app.url("/"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(root["users"], app.url("/users/"));
    assert_eq!(root["snippets"], app.url("/snippets/"));
    assert_eq!(root["questions"], app.url("/questions/"));
    assert_eq!(root["choices"], app.url("/choices/"));
}

#[tokio::test]
async fn test_snippet_ownership_flow() {
    let app = spawn_app().await;
    app.signup("alice", "wonderland-42").await;
    app.signup("bob", "builder-can-we-fix").await;
    let alice = app.login("alice", "wonderland-42").await;
    let bob = app.login("bob", "builder-can-we-fix").await;

    // Anonymous writes are refused.
    let response = app
        .client
        .post(app.url("/snippets/"))
        .json(&json!({ "code": "print(1)" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .client
        .post(app.url("/snippets/"))
        .bearer_auth(&alice)
        .json(&json!({ "title": "hello", "code": "print('hello')", "owner": "bob" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let snippet: Snippet = response.json().await.unwrap();
    assert_eq!(snippet.owner.as_deref(), Some("alice"));

    let detail = app.url(&format!("/snippets/{}/", snippet.id));

    // Anyone may read.
    let response = app.client.get(&detail).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Bob may not write.
    let response = app
        .client
        .put(&detail)
        .bearer_auth(&bob)
        .json(&json!({ "code": "print('bob')" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body: Value = response.json().await.unwrap();
    assert_eq!(
        body["detail"],
        "You do not have permission to perform this action."
    );

    let response = app.client.delete(&detail).bearer_auth(&bob).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // Alice may.
    let response = app
        .client
        .patch(&detail)
        .bearer_auth(&alice)
        .json(&json!({ "title": "renamed" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let updated: Snippet = response.json().await.unwrap();
    assert_eq!(updated.title, "renamed");

    let response = app.client.delete(&detail).bearer_auth(&alice).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app.client.get(&detail).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_highlight_is_html() {
    let app = spawn_app().await;
    app.signup("carol", "syntax-colours").await;
    let token = app.login("carol", "syntax-colours").await;

    let snippet: Snippet = app
        .client
        .post(app.url("/snippets/"))
        .bearer_auth(&token)
        .json(&json!({ "title": "demo", "code": "x = 1\n", "language": "python" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let response = app
        .client
        .get(app.url(&format!("/snippets/{}/highlight/", snippet.id)))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers()["content-type"].to_str().unwrap().to_string();
    assert!(content_type.starts_with("text/html"));
    let html = response.text().await.unwrap();
    assert!(html.contains("<pre"));
    assert!(html.contains("<title>demo</title>"));
}

#[tokio::test]
async fn test_bad_credentials_and_bad_token() {
    let app = spawn_app().await;
    app.signup("dave", "open-the-pod-bay").await;

    let response = app
        .client
        .post(app.url("/login/"))
        .json(&json!({ "username": "dave", "password": "wrong-password" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Invalid credentials fail even on a read.
    let response = app
        .client
        .get(app.url("/snippets/"))
        .bearer_auth("not-a-jwt")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_users_are_read_only_after_creation() {
    let app = spawn_app().await;
    let user = app.signup("erin", "correct-horse-staple").await;
    assert_eq!(user.age, 0);
    assert!(user.snippets.is_empty());

    let response = app
        .client
        .delete(app.url(&format!("/users/{}/", user.id)))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);

    let users: Vec<User> = app
        .client
        .get(app.url("/users/"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0].username, "erin");
}

#[tokio::test]
async fn test_signup_password_mismatch() {
    let app = spawn_app().await;
    let response = app
        .client
        .post(app.url("/signup/"))
        .json(&json!({
            "username": "frank",
            "password1": "first-password",
            "password2": "second-password",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert!(body["password2"].is_array());
}

#[tokio::test]
async fn test_polls_hyperlinks_resolve_against_server() {
    let app = spawn_app().await;

    let response = app
        .client
        .post(app.url("/questions/"))
        .json(&json!({ "question_text": "Tabs or spaces?", "pub_date": "2025-03-01T09:00:00Z" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let question: Value = response.json().await.unwrap();
    let question_url = question["url"].as_str().unwrap().to_string();

    let response = app
        .client
        .post(app.url("/choices/"))
        .json(&json!({ "question": question_url, "choice_text": "Spaces" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let choice: Value = response.json().await.unwrap();

    let question: Value = app
        .client
        .get(&question_url)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(question["choices"], json!([choice["url"]]));

    let response = app
        .client
        .post(app.url("/choices/"))
        .json(&json!({ "question": "http://elsewhere/polls/1/", "choice_text": "?" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_malformed_json_is_a_parse_error() {
    let app = spawn_app().await;
    let response = app
        .client
        .post(app.url("/questions/"))
        .header("content-type", "application/json")
        .body("{ not json")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert!(body["detail"].as_str().unwrap().starts_with("JSON parse error"));
}

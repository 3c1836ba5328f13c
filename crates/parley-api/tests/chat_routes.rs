use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use parley_api::auth::create_token;
use parley_api::{AppState, AppStateInner, router};
use parley_db::Database;
use parley_gateway::dispatcher::Dispatcher;

const SECRET: &str = "test-secret";

struct TestApp {
    state: AppState,
    app: Router,
}

impl TestApp {
    fn new() -> Self {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let state = AppStateInner::new(db, Dispatcher::new(), SECRET.into(), 3);
        let app = router(state.clone());
        Self { state, app }
    }

    /// Create a user directly and return `(id, bearer token)`.
    fn user(&self, name: &str) -> (i64, String) {
        let id = self.state.db.create_user(name, None, "unused-hash").unwrap();
        (id, create_token(SECRET, id, name).unwrap())
    }

    async fn call(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }
}

#[tokio::test]
async fn chat_routes_require_a_token() {
    let app = TestApp::new();
    let (status, _) = app.call(Method::GET, "/chat/conversations", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .call(Method::GET, "/chat/conversations", Some("not-a-jwt"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn register_then_login() {
    let app = TestApp::new();
    let creds = json!({ "username": "alice", "password": "correct horse", "nickname": "Al" });

    let (status, body) = app.call(Method::POST, "/auth/register", None, Some(creds.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(body["token"].is_string());

    let (status, _) = app.call(Method::POST, "/auth/register", None, Some(creds)).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = app
        .call(
            Method::POST,
            "/auth/login",
            None,
            Some(json!({ "username": "alice", "password": "correct horse" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "alice");

    let (status, _) = app
        .call(
            Method::POST,
            "/auth/login",
            None,
            Some(json!({ "username": "alice", "password": "wrong password" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn daily_limit_until_mutual_follow() {
    let app = TestApp::new();
    let (alice_id, alice) = app.user("alice");
    let (bob_id, bob) = app.user("bob");

    let text = json!({ "receiver_id": bob_id, "message_type": "text", "content": "hi" });
    for _ in 0..3 {
        let (status, body) = app
            .call(Method::POST, "/chat/messages", Some(&alice), Some(text.clone()))
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["content"], "hi");
    }

    let (status, body) = app
        .call(Method::POST, "/chat/check-limit", Some(&alice), Some(json!({ "receiver_id": bob_id })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["can_send"], false);
    assert_eq!(body["message_count"], 3);

    let (status, body) = app
        .call(Method::POST, "/chat/messages", Some(&alice), Some(text.clone()))
        .await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert!(body["error"].is_string());

    let (status, _) = app
        .call(Method::POST, &format!("/users/{}/follow", bob_id), Some(&alice), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = app
        .call(Method::POST, &format!("/users/{}/follow", alice_id), Some(&bob), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["followed_by"], true);

    let (status, _) = app
        .call(Method::POST, "/chat/messages", Some(&alice), Some(text))
        .await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn conversation_lifecycle() {
    let app = TestApp::new();
    let (_, alice) = app.user("alice");
    let (bob_id, bob) = app.user("bob");
    let (_, carol) = app.user("carol");

    let (status, body) = app
        .call(
            Method::POST,
            "/chat/messages",
            Some(&alice),
            Some(json!({ "receiver_id": bob_id, "message_type": "text", "content": "hello bob" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let conversation_id = body["conversation_id"].as_i64().unwrap();

    let (status, body) = app.call(Method::GET, "/chat/conversations", Some(&bob), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pagination"]["total"], 1);
    assert_eq!(body["conversations"][0]["unread_count"], 1);
    assert_eq!(body["conversations"][0]["other_user"]["username"], "alice");

    let messages_uri = format!("/chat/conversations/{}/messages", conversation_id);
    let (status, _) = app.call(Method::GET, &messages_uri, Some(&carol), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = app
        .call(Method::PUT, &format!("/chat/conversations/{}/read", conversation_id), Some(&bob), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["marked"], 1);

    let (status, body) = app.call(Method::GET, &messages_uri, Some(&bob), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["messages"][0]["is_read"], true);

    let (status, body) = app.call(Method::GET, "/notifications", Some(&bob), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pagination"]["total"], 1);

    let (status, _) = app
        .call(Method::DELETE, &format!("/chat/conversations/{}", conversation_id), Some(&alice), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, body) = app.call(Method::GET, "/chat/conversations", Some(&alice), None).await;
    assert_eq!(body["pagination"]["total"], 0);
    let (_, body) = app.call(Method::GET, "/chat/conversations", Some(&bob), None).await;
    assert_eq!(body["pagination"]["total"], 1);
}

#[tokio::test]
async fn rejects_bad_payloads() {
    let app = TestApp::new();
    let (alice_id, alice) = app.user("alice");
    let (bob_id, _) = app.user("bob");

    let cases = [
        json!({ "receiver_id": alice_id, "message_type": "text", "content": "me" }),
        json!({ "receiver_id": bob_id, "message_type": "text", "content": "  " }),
        json!({ "receiver_id": bob_id, "message_type": "image", "images": [] }),
        json!({ "receiver_id": bob_id, "message_type": "emoji", "emoji_id": 9999 }),
        json!({ "receiver_id": bob_id, "sender_id": bob_id, "message_type": "text", "content": "spoof" }),
    ];
    for case in cases {
        let (status, _) = app
            .call(Method::POST, "/chat/messages", Some(&alice), Some(case.clone()))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "payload {}", case);
    }
}

#[tokio::test]
async fn emoji_catalogue_is_seeded() {
    let app = TestApp::new();
    let (_, alice) = app.user("alice");

    let (status, body) = app.call(Method::GET, "/chat/emojis", Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(!body.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn malformed_paging_falls_back_to_defaults() {
    let app = TestApp::new();
    let (_, alice) = app.user("alice");

    let (status, body) = app
        .call(Method::GET, "/chat/conversations?page=abc&limit=xyz", Some(&alice), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pagination"]["page"], 1);
    assert_eq!(body["pagination"]["limit"], 20);
}

#[tokio::test]
async fn notifications_are_paged() {
    let app = TestApp::new();
    let (_, alice) = app.user("alice");
    let (bob_id, bob) = app.user("bob");

    for content in ["first", "second"] {
        let (status, _) = app
            .call(
                Method::POST,
                "/chat/messages",
                Some(&alice),
                Some(json!({ "receiver_id": bob_id, "message_type": "text", "content": content })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, body) = app
        .call(Method::GET, "/notifications?page=2&limit=1", Some(&bob), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pagination"]["total"], 2);
    assert_eq!(body["pagination"]["total_pages"], 2);
    assert_eq!(body["notifications"].as_array().unwrap().len(), 1);
}

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use jsonwebtoken::{EncodingKey, Header, encode};
use serde_json::{Value, json};
use tower::ServiceExt;

use cofound_api::middleware::TokenVerifier;
use cofound_api::{AppStateInner, router};
use cofound_db::Database;
use cofound_matching::{Limits, Matchmaker};
use cofound_types::api::Claims;

const SECRET: &str = "router-test-secret";
const ORIGIN: &str = "http://localhost:3000";

fn app() -> Router {
    let db = Database::open_in_memory().unwrap();
    let state = Arc::new(AppStateInner {
        matchmaker: Matchmaker::new(Arc::new(db), Limits::default()),
        verifier: TokenVerifier::from_secret(SECRET, vec![ORIGIN.to_string()]),
        environment: "test".to_string(),
    });
    router(state)
}

fn token(sub: &str) -> String {
    let claims = Claims {
        sub: sub.to_string(),
        exp: (chrono::Utc::now().timestamp() + 3600) as usize,
        nbf: None,
        azp: Some(ORIGIN.to_string()),
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(SECRET.as_bytes())).unwrap()
}

async fn call(app: &Router, method: &str, uri: &str, sub: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
    let mut req = Request::builder().method(method).uri(uri);
    if let Some(sub) = sub {
        req = req.header("authorization", format!("Bearer {}", token(sub)));
    }
    let req = match body {
        Some(body) => req
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap(),
        None => req.body(Body::empty()).unwrap(),
    };

    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

async fn onboard(app: &Router, sub: &str, name: &str, role: &str) -> Value {
    let (status, body) = call(
        app,
        "POST",
        "/users/onboarding",
        Some(sub),
        Some(json!({
            "email": format!("{name}@example.com"),
            "name": name,
            "role_intent": role,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body
}

fn intro() -> String {
    "I'm looking for a technical cofounder for a logistics startup. ".repeat(2)
}

#[tokio::test]
async fn health_is_public() {
    let app = app();
    let (status, body) = call(&app, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["database"], "connected");
}

#[tokio::test]
async fn identity_is_required() {
    let app = app();
    let (status, body) = call(&app, "GET", "/users/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "unauthorized");

    let (status, body) = call(&app, "GET", "/users/me", Some("user_new"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"], "User not found. Please complete onboarding first.");

    onboard(&app, "user_new", "newbie", "founder").await;
    let (status, body) = call(&app, "GET", "/users/me", Some("user_new"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "newbie");

    let (status, body) = call(
        &app,
        "POST",
        "/users/onboarding",
        Some("user_new"),
        Some(json!({ "email": "other@example.com", "name": "again", "role_intent": "founder" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "conflict");
}

#[tokio::test]
async fn invite_accept_and_message() {
    let app = app();
    onboard(&app, "user_a", "alice", "founder").await;
    let bob = onboard(&app, "user_b", "bob", "cofounder").await;
    let bob_id = bob["id"].as_str().unwrap().to_string();

    let (status, body) = call(&app, "GET", "/profiles/discover", Some("user_a"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (status, body) = call(
        &app,
        "POST",
        &format!("/matches/invite/{bob_id}"),
        Some("user_a"),
        Some(json!({ "message": "too short" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_input");

    let (status, body) = call(
        &app,
        "POST",
        &format!("/matches/invite/{bob_id}"),
        Some("user_a"),
        Some(json!({ "message": intro() })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["auto_connected"], false);
    assert_eq!(body["invites_remaining"], 19);
    let match_id = body["match_id"].as_str().unwrap().to_string();

    // Not connected yet.
    let (status, body) = call(
        &app,
        "POST",
        "/messages",
        Some("user_a"),
        Some(json!({ "match_id": match_id, "content": "hello?" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Messages can only be sent to connected users");

    let (status, body) = call(
        &app,
        "POST",
        &format!("/matches/{match_id}/intro/respond"),
        Some("user_b"),
        Some(json!({ "accept": true })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["status"], "connected");

    let (status, _) = call(
        &app,
        "POST",
        "/messages",
        Some("user_a"),
        Some(json!({ "match_id": match_id, "content": "Great, when can we talk?" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, body) = call(&app, "GET", "/messages/unread/count", Some("user_b"), None).await;
    assert_eq!(body["total_unread"], 2);
    assert_eq!(body["conversations"][&match_id], 2);

    let (status, body) = call(&app, "GET", "/messages", Some("user_b"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["other_user"]["name"], "alice");
    assert_eq!(body[0]["last_message"]["content"], "Great, when can we talk?");

    let (status, body) = call(
        &app,
        "PUT",
        &format!("/messages/match/{match_id}/read-all"),
        Some("user_b"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["marked"], 2);

    let (_, body) = call(&app, "GET", &format!("/messages/{match_id}"), Some("user_a"), None).await;
    let thread = body.as_array().unwrap();
    assert_eq!(thread.len(), 2);
    assert_eq!(thread[0]["message_type"], "intro_request");
    assert_eq!(thread[1]["is_read"], true);
}

#[tokio::test]
async fn saved_and_skipped_profiles() {
    let app = app();
    onboard(&app, "user_a", "alice", "founder").await;
    let bob = onboard(&app, "user_b", "bob", "cofounder").await;
    let carol = onboard(&app, "user_c", "carol", "cofounder").await;

    let (status, _) = call(
        &app,
        "POST",
        &format!("/profiles/{}/skip", carol["id"].as_str().unwrap()),
        Some("user_a"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) = call(
        &app,
        "POST",
        &format!("/profiles/{}/save", bob["id"].as_str().unwrap()),
        Some("user_a"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, body) = call(&app, "GET", "/profiles/discover", Some("user_a"), None).await;
    assert!(body.as_array().unwrap().is_empty());
    let (_, body) = call(&app, "GET", "/matches/recommendations", Some("user_a"), None).await;
    assert!(body.as_array().unwrap().is_empty());

    let (_, body) = call(&app, "GET", "/profiles/saved", Some("user_a"), None).await;
    assert_eq!(body[0]["name"], "bob");
    let (_, body) = call(&app, "GET", "/profiles/skipped", Some("user_a"), None).await;
    assert_eq!(body[0]["name"], "carol");

    let (_, body) = call(&app, "GET", "/profiles/count", Some("user_a"), None).await;
    assert_eq!(body["saved_count"], 1);
    assert_eq!(body["discover_count"], 0);

    let (status, body) = call(&app, "GET", "/matches?limit=500", Some("user_a"), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_input");
}

#[tokio::test]
async fn malformed_requests_use_error_body() {
    let app = app();
    let alice = onboard(&app, "user_a", "alice", "founder").await;
    let bob = onboard(&app, "user_b", "bob", "cofounder").await;
    let bob_id = bob["id"].as_str().unwrap().to_string();

    let (status, body) = call(&app, "GET", "/matches/not-a-uuid", Some("user_a"), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_input");
    assert_eq!(body["detail"], "Invalid ID");

    let (status, body) = call(&app, "PUT", "/messages/123/read", Some("user_a"), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Invalid ID");

    let (status, body) = call(
        &app,
        "POST",
        &format!("/matches/invite/{bob_id}"),
        Some("user_a"),
        Some(json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_input");
    assert_eq!(body["detail"], "Invalid request body");

    // No content type at all.
    let (status, body) = call(&app, "POST", "/messages", Some("user_a"), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Invalid request body");

    let (status, body) = call(&app, "GET", "/profiles/discover?limit=-1", Some("user_a"), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_input");
    assert_eq!(body["detail"], "Invalid query parameters");

    let (status, body) = call(
        &app,
        "GET",
        &format!("/users/{}", alice["id"].as_str().unwrap().replace('-', "z")),
        Some("user_b"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Invalid ID");
}

#[tokio::test]
async fn onboarding_rejects_bad_email() {
    let app = app();
    let (status, body) = call(
        &app,
        "POST",
        "/users/onboarding",
        Some("user_x"),
        Some(json!({ "email": "a b@c.d", "name": "Xavier", "role_intent": "founder" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_input");
    assert_eq!(body["detail"], "email is not a valid address");

    let (status, _) = call(&app, "GET", "/users/me", Some("user_x"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn repeated_invite_has_its_own_code() {
    let app = app();
    onboard(&app, "user_a", "alice", "founder").await;
    let bob = onboard(&app, "user_b", "bob", "cofounder").await;
    let uri = format!("/matches/invite/{}", bob["id"].as_str().unwrap());

    let (status, _) = call(&app, "POST", &uri, Some("user_a"), Some(json!({ "message": intro() }))).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, body) = call(&app, "POST", &uri, Some("user_a"), Some(json!({ "message": intro() }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "already_requested");
}

#[tokio::test]
async fn profile_update_and_public_view() {
    let app = app();
    let alice = onboard(&app, "user_a", "alice", "founder").await;
    onboard(&app, "user_b", "bob", "cofounder").await;
    let alice_id = alice["id"].as_str().unwrap().to_string();

    let (status, body) = call(&app, "PUT", "/users/me", Some("user_a"), Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "No fields to update");

    let (status, body) = call(
        &app,
        "PUT",
        "/users/me",
        Some("user_a"),
        Some(json!({ "name": "A" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "name must be between 2 and 255 characters");

    let (status, body) = call(
        &app,
        "PUT",
        "/users/me",
        Some("user_a"),
        Some(json!({ "bio": "Shipping freight software", "location": "Lisbon" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["bio"], "Shipping freight software");
    assert_eq!(body["name"], "alice");
    assert_eq!(body["id"], alice_id.as_str());

    let (status, body) = call(&app, "GET", &format!("/users/{alice_id}"), Some("user_b"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["location"], "Lisbon");
    assert_eq!(body["role_intent"], "founder");
    assert!(body.get("email").is_none());
    assert!(body.get("external_id").is_none());

    let missing = uuid::Uuid::new_v4();
    let (status, body) = call(&app, "GET", &format!("/users/{missing}"), Some("user_b"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"], "User not found");
}

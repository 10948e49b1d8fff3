mod common;

use chrono::Duration;
use common::default_policy;
use common::TestApp;
use reqwest::StatusCode;
use serde_json::json;
use serde_json::Value;

#[tokio::test]
async fn test_health() {
    let app = TestApp::spawn().await;

    let response = app.get("/health").send().await.expect("Failed to execute request");
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], 200);
}

#[tokio::test]
async fn test_register_success() {
    let app = TestApp::spawn().await;

    let response = app.register("a@b.com", "secret1").await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], 201);
    assert!(body["message"].is_string());
    assert_eq!(body["data"]["identity"], "a@b.com");
    assert!(body["data"]["id"].is_i64());
    assert!(body["data"]["createdAt"].is_string());
    // Registration issues no tokens
    assert!(body["data"].get("accessToken").is_none());
}

#[tokio::test]
async fn test_register_accepts_email_field() {
    let app = TestApp::spawn().await;

    let response = app
        .post("/api/auth/register")
        .json(&json!({ "email": "a@b.com", "password": "secret1" }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn test_register_duplicate_identity() {
    let app = TestApp::spawn().await;

    app.register("a@b.com", "secret1").await;
    let response = app.register("a@b.com", "another1").await;

    assert_eq!(response.status(), StatusCode::CONFLICT);

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], 409);
    assert!(body["data"].is_null());
}

#[tokio::test]
async fn test_register_validation() {
    let app = TestApp::spawn().await;

    let invalid_identity = app.register("not-an-email", "secret1").await;
    assert_eq!(invalid_identity.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let short_password = app.register("a@b.com", "12345").await;
    assert_eq!(short_password.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let long_password = app.register("a@b.com", &"x".repeat(65)).await;
    assert_eq!(long_password.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let body: Value = long_password.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], 422);
    assert!(body["data"].is_null());
}

#[tokio::test]
async fn test_malformed_json_uses_envelope() {
    let app = TestApp::spawn().await;

    let response = app
        .post("/api/auth/login")
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], 422);
    assert!(body["data"].is_null());

    let response = app
        .post("/api/auth/login")
        .json(&json!({ "identity": "a@b.com" }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], 422);
}

#[tokio::test]
async fn test_login_success() {
    let app = TestApp::spawn().await;
    app.register("a@b.com", "secret1").await;

    let response = app.login("a@b.com", "secret1").await;
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = response.json().await.expect("Failed to parse response");
    let data = &body["data"];
    assert_eq!(data["tokenType"], "Bearer");
    assert_eq!(data["expiresInMs"], 3_600_000);

    let access_token = data["accessToken"].as_str().unwrap();
    assert!(!data["refreshToken"].as_str().unwrap().is_empty());

    let claims = app
        .jwt_handler
        .verify(access_token, chrono::Utc::now())
        .expect("access token verifies");
    assert_eq!(claims.subject(), Some("a@b.com"));
}

#[tokio::test]
async fn test_login_failures_are_indistinguishable() {
    let app = TestApp::spawn().await;
    app.register("a@b.com", "secret1").await;

    let wrong_password = app.login("a@b.com", "wrong-password").await;
    let unknown_identity = app.login("nobody@b.com", "secret1").await;

    assert_eq!(wrong_password.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_identity.status(), StatusCode::UNAUTHORIZED);

    let wrong_password: Value = wrong_password.json().await.unwrap();
    let unknown_identity: Value = unknown_identity.json().await.unwrap();
    assert_eq!(wrong_password, unknown_identity);
}

#[tokio::test]
async fn test_repeated_login_keeps_single_refresh_token() {
    let app = TestApp::spawn().await;
    app.register("a@b.com", "secret1").await;

    let first: Value = app.login("a@b.com", "secret1").await.json().await.unwrap();
    let second: Value = app.login("a@b.com", "secret1").await.json().await.unwrap();

    let store = app.refresh_tokens.as_ref().unwrap();
    assert_eq!(store.len().await, 1);

    // Only the latest refresh token is usable
    let stale = app
        .refresh(first["data"]["refreshToken"].as_str().unwrap())
        .await;
    assert_eq!(stale.status(), StatusCode::UNAUTHORIZED);

    let current = app
        .refresh(second["data"]["refreshToken"].as_str().unwrap())
        .await;
    assert_eq!(current.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_refresh_returns_new_access_token_and_same_refresh_token() {
    let app = TestApp::spawn().await;
    let tokens = app.register_and_login("a@b.com", "secret1").await;
    let refresh_token = tokens["refreshToken"].as_str().unwrap();

    let response = app.refresh(refresh_token).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["data"]["refreshToken"], refresh_token);
    assert_eq!(body["data"]["expiresInMs"], 3_600_000);
    assert_eq!(body["data"]["tokenType"], "Bearer");

    let me = app
        .get_authenticated("/api/users/me", body["data"]["accessToken"].as_str().unwrap())
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(me.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_refresh_with_rotation() {
    let mut policy = default_policy();
    policy.rotate_refresh_tokens = true;
    let app = TestApp::spawn_with_policy(policy).await;

    let tokens = app.register_and_login("a@b.com", "secret1").await;
    let original = tokens["refreshToken"].as_str().unwrap().to_string();

    let body: Value = app.refresh(&original).await.json().await.unwrap();
    let rotated = body["data"]["refreshToken"].as_str().unwrap();
    assert_ne!(rotated, original);

    assert_eq!(app.refresh(&original).await.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(app.refresh(rotated).await.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_refresh_unknown_token() {
    let app = TestApp::spawn().await;

    let response = app.refresh("not-a-stored-token").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], 401);
    assert!(body["data"].is_null());
}

#[tokio::test]
async fn test_expired_refresh_token_is_removed() {
    let mut policy = default_policy();
    policy.refresh_ttl = Duration::milliseconds(200);
    let app = TestApp::spawn_with_policy(policy).await;

    let tokens = app.register_and_login("a@b.com", "secret1").await;
    let refresh_token = tokens["refreshToken"].as_str().unwrap();

    tokio::time::sleep(std::time::Duration::from_millis(300)).await;

    let response = app.refresh(refresh_token).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Refresh token expired, please log in again");

    assert!(app.refresh_tokens.as_ref().unwrap().is_empty().await);

    let body: Value = app.refresh(refresh_token).await.json().await.unwrap();
    assert_eq!(body["message"], "Invalid refresh token");
}

#[tokio::test]
async fn test_current_user_requires_authentication() {
    let app = TestApp::spawn().await;

    let anonymous = app
        .get("/api/users/me")
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);
    let body: Value = anonymous.json().await.unwrap();
    assert_eq!(body["status"], 401);
    assert!(body["data"].is_null());

    let garbage = app
        .get_authenticated("/api/users/me", "not.a.token")
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(garbage.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_current_user_returns_principal() {
    let app = TestApp::spawn().await;
    let tokens = app.register_and_login("a@b.com", "secret1").await;

    let response = app
        .get_authenticated("/api/users/me", tokens["accessToken"].as_str().unwrap())
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data"]["identity"], "a@b.com");
    assert!(body["data"]["userId"].is_i64());
}

#[tokio::test]
async fn test_refresh_token_is_not_an_access_token() {
    let app = TestApp::spawn().await;
    let tokens = app.register_and_login("a@b.com", "secret1").await;

    let response = app
        .get_authenticated("/api/users/me", tokens["refreshToken"].as_str().unwrap())
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_logout_invalidates_refresh_token() {
    let app = TestApp::spawn().await;
    let tokens = app.register_and_login("a@b.com", "secret1").await;
    let access_token = tokens["accessToken"].as_str().unwrap();

    let unauthenticated = app
        .post("/api/auth/logout")
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(unauthenticated.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .post_authenticated("/api/auth/logout", access_token)
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status(), StatusCode::OK);

    let refresh = app.refresh(tokens["refreshToken"].as_str().unwrap()).await;
    assert_eq!(refresh.status(), StatusCode::UNAUTHORIZED);

    // Logging out again is harmless
    let again = app
        .post_authenticated("/api/auth/logout", access_token)
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(again.status(), StatusCode::OK);
}

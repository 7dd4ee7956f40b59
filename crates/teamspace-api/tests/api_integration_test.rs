//! End-to-end tests of the HTTP API against an in-memory SQLite database

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use teamspace_api::{ApiServer, ApiServerConfig};
use teamspace_core::LogNotifier;
use teamspace_db::SeaOrmStore;
use tower::ServiceExt;

async fn create_test_server(debug: bool) -> ApiServer {
    let db = teamspace_db::connect("sqlite::memory:")
        .await
        .expect("Failed to connect to test database");
    teamspace_db::migrate(&db)
        .await
        .expect("Failed to run migrations");

    let config = ApiServerConfig {
        jwt_secret: "integration-test-secret".to_string(),
        debug,
        ..Default::default()
    };

    ApiServer::new(config, SeaOrmStore::new(db), Arc::new(LogNotifier))
}

async fn send(
    router: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().uri(uri).method(method);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

/// Register an account and return (user id, session token).
async fn register(router: &Router, first_name: &str, email: &str) -> (String, String) {
    let (status, body) = send(
        router,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({
            "first_name": first_name,
            "last_name": "Tester",
            "email": email,
            "password": "secret1",
            "password_confirmation": "secret1"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "register failed: {}", body);

    (
        body["user"]["id"].as_str().unwrap().to_string(),
        body["token"].as_str().unwrap().to_string(),
    )
}

#[tokio::test]
async fn test_health_and_openapi() {
    let server = create_test_server(false).await;
    let router = server.build_router();

    let (status, body) = send(&router, "GET", "/api/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, body) = send(&router, "GET", "/api/openapi.json", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"]["/api/tasks/{id}"].is_object());
}

#[tokio::test]
async fn test_register_sets_cookie_and_authenticates() {
    let server = create_test_server(false).await;
    let router = server.build_router();

    let request = Request::builder()
        .uri("/api/auth/register")
        .method("POST")
        .header("content-type", "application/json")
        .body(Body::from(
            json!({
                "first_name": "Ada",
                "last_name": "Lovelace",
                "phone": "+44 20 7946 0000",
                "email": "ada@example.com",
                "password": "secret1",
                "password_confirmation": "secret1"
            })
            .to_string(),
        ))
        .unwrap();
    let response = router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap()
        .to_string();
    assert!(cookie.starts_with("session_token="));
    assert!(cookie.contains("HttpOnly"));

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert!(body["user"].get("password_hash").is_none());

    // The cookie alone is enough to reach protected routes
    let token = body["token"].as_str().unwrap();
    let request = Request::builder()
        .uri("/api/auth/me")
        .header("cookie", format!("session_token={}", token))
        .body(Body::empty())
        .unwrap();
    let response = router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let me: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(me["email"], "ada@example.com");
    assert_eq!(me["phone"], "+44 20 7946 0000");
}

#[tokio::test]
async fn test_register_validation_errors() {
    let server = create_test_server(false).await;
    let router = server.build_router();

    let (status, body) = send(
        &router,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({
            "first_name": "Ada",
            "last_name": "Lovelace",
            "email": "not-an-email",
            "password": "short",
            "password_confirmation": "different"
        })),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "VALIDATION_FAILED");
    assert!(body["errors"]["email"].is_array());
    assert!(body["errors"]["password"].is_array());

    register(&router, "Ada", "ada@example.com").await;
    let (status, body) = send(
        &router,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({
            "first_name": "Other",
            "last_name": "Ada",
            "email": "ada@example.com",
            "password": "secret1",
            "password_confirmation": "secret1"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["errors"]["email"].is_array());
}

#[tokio::test]
async fn test_login_rejects_bad_credentials() {
    let server = create_test_server(false).await;
    let router = server.build_router();
    register(&router, "Ada", "ada@example.com").await;

    let (status, body) = send(
        &router,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({"email": "ada@example.com", "password": "wrong-password"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["errors"]["email"].is_array());

    let (status, body) = send(
        &router,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({"email": "ada@example.com", "password": "secret1"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["token"].is_string());
}

#[tokio::test]
async fn test_protected_routes_require_session() {
    let server = create_test_server(false).await;
    let router = server.build_router();

    let (status, body) = send(&router, "GET", "/api/workspaces", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "MISSING_AUTH");

    let (status, body) = send(&router, "GET", "/api/tasks", Some("garbage"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "INVALID_TOKEN");
}

#[tokio::test]
async fn test_logout_revokes_every_session() {
    let server = create_test_server(false).await;
    let router = server.build_router();
    let (_, first) = register(&router, "Ada", "ada@example.com").await;

    let (_, login) = send(
        &router,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({"email": "ada@example.com", "password": "secret1"})),
    )
    .await;
    let second = login["token"].as_str().unwrap().to_string();

    let (status, body) = send(&router, "POST", "/api/auth/logout", Some(&first), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["revoked_sessions"], 2);

    for token in [&first, &second] {
        let (status, body) = send(&router, "GET", "/api/auth/me", Some(token), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], "SESSION_REVOKED");
    }
}

#[tokio::test]
async fn test_change_password() {
    let server = create_test_server(false).await;
    let router = server.build_router();
    let (_, token) = register(&router, "Ada", "ada@example.com").await;

    let (status, body) = send(
        &router,
        "POST",
        "/api/auth/change-password",
        Some(&token),
        Some(json!({
            "current_password": "not-it",
            "password": "new-secret",
            "password_confirmation": "new-secret"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["errors"]["current_password"].is_array());

    let (status, _) = send(
        &router,
        "POST",
        "/api/auth/change-password",
        Some(&token),
        Some(json!({
            "current_password": "secret1",
            "password": "new-secret",
            "password_confirmation": "new-secret"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        &router,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({"email": "ada@example.com", "password": "new-secret"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_workspace_team_task_walkthrough() {
    let server = create_test_server(false).await;
    let router = server.build_router();
    let (a_id, a) = register(&router, "Alice", "alice@example.com").await;
    let (b_id, b) = register(&router, "Bob", "bob@example.com").await;

    let (status, ws) = send(
        &router,
        "POST",
        "/api/workspaces",
        Some(&a),
        Some(json!({"name": "Acme", "description": "Main workspace"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let ws_id = ws["id"].as_str().unwrap().to_string();

    let (status, team) = send(
        &router,
        "POST",
        "/api/teams",
        Some(&a),
        Some(json!({"name": "Platform", "workspace_id": ws_id})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let team_id = team["id"].as_str().unwrap().to_string();
    assert_eq!(team["members"][0]["role"], "leader");

    // Bob is not in any team yet
    let ws_uri = format!("/api/workspaces/{}", ws_id);
    let (status, _) = send(&router, "GET", &ws_uri, Some(&b), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, available) = send(
        &router,
        "GET",
        &format!("/api/teams/{}/available-users", team_id),
        Some(&a),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(available.as_array().unwrap().len(), 1);
    assert_eq!(available[0]["id"], b_id.as_str());

    let (status, _) = send(
        &router,
        "POST",
        &format!("/api/teams/{}/members", team_id),
        Some(&a),
        Some(json!({"user_id": b_id, "role": "member"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, detail) = send(&router, "GET", &ws_uri, Some(&b), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["teams"][0]["members"].as_array().unwrap().len(), 2);

    // Members cannot create tasks
    let (status, _) = send(
        &router,
        "POST",
        "/api/tasks",
        Some(&b),
        Some(json!({"title": "Nope", "workspace_id": ws_id, "team_id": team_id})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, task) = send(
        &router,
        "POST",
        "/api/tasks",
        Some(&a),
        Some(json!({
            "title": "Ship it",
            "workspace_id": ws_id,
            "team_id": team_id,
            "assigned_to": b_id
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(task["created_by"], a_id.as_str());
    let task_uri = format!("/api/tasks/{}", task["id"].as_str().unwrap());

    // The assignee's title change is dropped, progress is applied
    let (status, updated) = send(
        &router,
        "PUT",
        &task_uri,
        Some(&b),
        Some(json!({"title": "Renamed by Bob", "progress": 50})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["title"], "Ship it");
    assert_eq!(updated["progress"], 50);

    let (status, updated) = send(
        &router,
        "PUT",
        &task_uri,
        Some(&a),
        Some(json!({"title": "Ship it today"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["title"], "Ship it today");

    let (status, mine) = send(&router, "GET", "/api/tasks", Some(&b), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(mine.as_array().unwrap().len(), 1);

    let (status, team_tasks) = send(
        &router,
        "GET",
        &format!("/api/teams/{}/tasks", team_id),
        Some(&b),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(team_tasks.as_array().unwrap().len(), 1);

    // Only leaders delete tasks
    let (status, _) = send(&router, "DELETE", &task_uri, Some(&b), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = send(&router, "DELETE", &task_uri, Some(&a), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, body) = send(&router, "GET", &task_uri, Some(&a), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_last_leader_is_protected() {
    let server = create_test_server(false).await;
    let router = server.build_router();
    let (a_id, a) = register(&router, "Alice", "alice@example.com").await;

    let (_, ws) = send(
        &router,
        "POST",
        "/api/workspaces",
        Some(&a),
        Some(json!({"name": "Acme"})),
    )
    .await;
    let (_, team) = send(
        &router,
        "POST",
        "/api/teams",
        Some(&a),
        Some(json!({"name": "Platform", "workspace_id": ws["id"]})),
    )
    .await;
    let member_uri = format!(
        "/api/teams/{}/members/{}",
        team["id"].as_str().unwrap(),
        a_id
    );

    let (status, body) = send(&router, "DELETE", &member_uri, Some(&a), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "LAST_LEADER");

    let (status, body) = send(
        &router,
        "PUT",
        &member_uri,
        Some(&a),
        Some(json!({"role": "member"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "LAST_LEADER");
}

#[tokio::test]
async fn test_workspace_delete_and_creator_rules() {
    let server = create_test_server(false).await;
    let router = server.build_router();
    let (_, a) = register(&router, "Alice", "alice@example.com").await;
    let (_, b) = register(&router, "Bob", "bob@example.com").await;

    let (_, ws) = send(
        &router,
        "POST",
        "/api/workspaces",
        Some(&a),
        Some(json!({"name": "Acme"})),
    )
    .await;
    let ws_uri = format!("/api/workspaces/{}", ws["id"].as_str().unwrap());

    let (status, _) = send(
        &router,
        "PUT",
        &ws_uri,
        Some(&b),
        Some(json!({"name": "Stolen"})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(&router, "PUT", &ws_uri, Some(&a), Some(json!({"name": ""}))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["errors"]["name"].is_array());

    let (status, _) = send(&router, "DELETE", &ws_uri, Some(&b), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = send(&router, "DELETE", &ws_uri, Some(&a), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&router, "GET", &ws_uri, Some(&a), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (_, list) = send(&router, "GET", "/api/workspaces", Some(&a), None).await;
    assert!(list.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_password_reset_round_trip_in_debug_mode() {
    let server = create_test_server(true).await;
    let router = server.build_router();
    register(&router, "Ada", "ada@example.com").await;

    let (status, body) = send(
        &router,
        "POST",
        "/api/auth/forgot-password",
        None,
        Some(json!({"email": "ada@example.com"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let secret = body["debug_info"]["token"].as_str().unwrap().to_string();
    assert_eq!(secret.len(), 64);
    assert!(body["debug_info"]["reset_url"]
        .as_str()
        .unwrap()
        .starts_with("http://localhost:3000/reset-password?token="));

    let reset = json!({
        "email": "ada@example.com",
        "token": secret,
        "password": "brand-new",
        "password_confirmation": "brand-new"
    });
    let (status, _) = send(
        &router,
        "POST",
        "/api/auth/reset-password",
        None,
        Some(reset.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        &router,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({"email": "ada@example.com", "password": "brand-new"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // Tokens are single use
    let (status, body) = send(&router, "POST", "/api/auth/reset-password", None, Some(reset)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_TOKEN");
}

#[tokio::test]
async fn test_forgot_password_hides_token_outside_debug() {
    let server = create_test_server(false).await;
    let router = server.build_router();
    register(&router, "Ada", "ada@example.com").await;

    let (status, body) = send(
        &router,
        "POST",
        "/api/auth/forgot-password",
        None,
        Some(json!({"email": "ada@example.com"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.get("debug_info").is_none());

    let (status, body) = send(
        &router,
        "POST",
        "/api/auth/forgot-password",
        None,
        Some(json!({"email": "nobody@example.com"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["errors"]["email"].is_array());
}

#[tokio::test]
async fn test_malformed_bodies_use_error_shape() {
    let server = create_test_server(false).await;
    let router = server.build_router();
    let (_, token) = register(&router, "Alice", "alice@example.com").await;

    let (status, body) = send(
        &router,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({"email": "alice@example.com"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "VALIDATION_FAILED");
    assert!(body["errors"]["password"].is_array());

    let (status, body) = send(
        &router,
        "POST",
        "/api/workspaces",
        Some(&token),
        Some(json!({"name": 5})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["errors"]["name"].is_array());

    let request = Request::builder()
        .uri("/api/auth/login")
        .method("POST")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["code"], "INVALID_BODY");
}

#[tokio::test]
async fn test_null_description_clears_task_description() {
    let server = create_test_server(false).await;
    let router = server.build_router();
    let (_, token) = register(&router, "Alice", "alice@example.com").await;

    let (_, ws) = send(
        &router,
        "POST",
        "/api/workspaces",
        Some(&token),
        Some(json!({"name": "Acme"})),
    )
    .await;
    let (_, team) = send(
        &router,
        "POST",
        "/api/teams",
        Some(&token),
        Some(json!({"name": "Core", "workspace_id": ws["id"]})),
    )
    .await;
    let (status, task) = send(
        &router,
        "POST",
        "/api/tasks",
        Some(&token),
        Some(json!({
            "title": "Audit",
            "description": "quarterly",
            "workspace_id": ws["id"],
            "team_id": team["id"]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "create failed: {}", task);
    let uri = format!("/api/tasks/{}", task["id"].as_str().unwrap());

    let (status, updated) = send(
        &router,
        "PUT",
        &uri,
        Some(&token),
        Some(json!({"title": "Audit 2024"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["description"], "quarterly");

    let (status, updated) = send(
        &router,
        "PUT",
        &uri,
        Some(&token),
        Some(json!({"description": null})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(updated["description"].is_null());
}

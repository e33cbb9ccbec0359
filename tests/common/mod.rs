//! Shared helpers for HTTP API tests.

#![allow(dead_code)]

use std::sync::Arc;

use axum::http::header::AUTHORIZATION;
use axum_test::{TestResponse, TestServer};
use foundation::config::{AccountsConfig, WebConfig};
use foundation::web::handlers::AppState;
use foundation::web::middleware::JwtState;
use foundation::web::router::create_router;
use foundation::Database;
use serde_json::{json, Value};

pub const PASSWORD: &str = "Aa!15678";
pub const ADMIN: &str = "admin1";

pub fn test_web_config() -> WebConfig {
    WebConfig {
        cors_origins: vec![],
        jwt_secret: "test-secret-key-for-testing-only".to_string(),
        jwt_access_token_expiry_secs: 900,
        login_rate_limit: 100,
    }
}

/// Router over a fresh in-memory database.
pub async fn create_test_server() -> (TestServer, Arc<Database>) {
    create_test_server_with(test_web_config()).await
}

pub async fn create_test_server_with(config: WebConfig) -> (TestServer, Arc<Database>) {
    let db = Arc::new(
        Database::open_in_memory()
            .await
            .expect("Failed to create test database"),
    );

    let app_state = Arc::new(
        AppState::new(
            db.clone(),
            &config.jwt_secret,
            config.jwt_access_token_expiry_secs,
        )
        .with_accounts(AccountsConfig::default())
        .with_timezone("America/Phoenix"),
    );
    let jwt_state = Arc::new(JwtState::new(&config.jwt_secret));

    let router = create_router(app_state, jwt_state, &config);
    let server = TestServer::new(router).expect("Failed to create test server");
    (server, db)
}

pub fn bearer(token: &str) -> String {
    format!("Bearer {token}")
}

pub async fn login(server: &TestServer, username: &str, role: Option<&str>) -> TestResponse {
    let mut body = json!({ "username": username, "password": PASSWORD });
    if let Some(role) = role {
        body["role"] = json!(role);
    }
    server.post("/api/auth/login").json(&body).await
}

/// Log in and return the access token.
pub async fn token(server: &TestServer, username: &str, role: Option<&str>) -> String {
    let response = login(server, username, role).await;
    response.assert_status_ok();
    response.json::<Value>()["data"]["access_token"]
        .as_str()
        .expect("access token")
        .to_string()
}

/// Create the first administrator and return an admin token.
pub async fn setup_admin(server: &TestServer) -> String {
    server
        .post("/api/setup/admin")
        .json(&json!({
            "username": ADMIN,
            "password": PASSWORD,
            "password_confirm": PASSWORD,
            "email": "admin@example.com"
        }))
        .await
        .assert_status_ok();
    token(server, ADMIN, None).await
}

/// Invite `email` with `role` and return the invitation code.
pub async fn invite(server: &TestServer, admin_token: &str, email: &str, role: &str) -> String {
    let response = server
        .post("/api/admin/invitations")
        .add_header(AUTHORIZATION, bearer(admin_token))
        .json(&json!({ "email": email, "role": role }))
        .await;
    response.assert_status_ok();
    response.json::<Value>()["data"]["code"]
        .as_str()
        .expect("invitation code")
        .to_string()
}

pub async fn register(server: &TestServer, code: &str, username: &str) -> TestResponse {
    server
        .post("/api/auth/register")
        .json(&json!({
            "invitation_code": code,
            "username": username,
            "password": PASSWORD,
            "password_confirm": PASSWORD
        }))
        .await
}

/// Invite, register and log in a user holding `role`; returns their token.
pub async fn create_user(
    server: &TestServer,
    admin_token: &str,
    username: &str,
    role: &str,
) -> String {
    let code = invite(
        server,
        admin_token,
        &format!("{username}@example.com"),
        role,
    )
    .await;
    register(server, &code, username).await.assert_status_ok();
    token(server, username, None).await
}

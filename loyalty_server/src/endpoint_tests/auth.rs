use actix_web::{http::StatusCode, test::TestRequest};
use loyalty_common::Secret;
use serde_json::json;

use super::helpers::*;
use crate::{auth::TokenIssuer, config::ServerConfig};

fn credentials(login: &str, password: &str) -> serde_json::Value {
    json!({ "login": login, "password": password })
}

#[actix_web::test]
async fn health_check() {
    let (_, state) = memory_state();
    let reply = send(&state, TestRequest::get().uri("/health")).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body, "👍️\n");
}

#[actix_web::test]
async fn registration_issues_a_valid_token() {
    let (_, state) = memory_state();
    let auth = register(&state, "alice", "hunter2").await;
    let token = auth.strip_prefix("Bearer ").expect("Not a bearer token");
    let config = ServerConfig::default();
    let issuer = TokenIssuer::new(&config.hash_secret, config.token_expiry);
    let claims = issuer.validate(token).unwrap();
    assert_eq!(claims.sub, "alice");
    assert_eq!(claims.uid, 1);
}

#[actix_web::test]
async fn duplicate_login_is_a_conflict() {
    let (_, state) = memory_state();
    register(&state, "alice", "hunter2").await;
    let req = TestRequest::post().uri("/api/user/register").set_json(credentials("alice", "other"));
    let reply = send(&state, req).await;
    assert_eq!(reply.status, StatusCode::CONFLICT);
    assert!(reply.json()["error"].as_str().unwrap().contains("alice"));
}

#[actix_web::test]
async fn malformed_registrations_are_rejected() {
    let (_, state) = memory_state();
    let req = TestRequest::post()
        .uri("/api/user/register")
        .insert_header(("Content-Type", "application/json"))
        .set_payload("{\"login\": \"alice\"");
    assert_eq!(send(&state, req).await.status, StatusCode::BAD_REQUEST);
    let req = TestRequest::post().uri("/api/user/register").set_json(json!({ "login": "alice" }));
    assert_eq!(send(&state, req).await.status, StatusCode::BAD_REQUEST);
    let req = TestRequest::post().uri("/api/user/register").set_json(credentials("", "hunter2"));
    assert_eq!(send(&state, req).await.status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn login() {
    let (_, state) = memory_state();
    register(&state, "alice", "hunter2").await;

    let req = TestRequest::post().uri("/api/user/login").set_json(credentials("alice", "hunter2"));
    let reply = send(&state, req).await;
    assert_eq!(reply.status, StatusCode::OK);
    let auth = reply.authorization().unwrap();
    assert!(auth.starts_with("Bearer "));
    // The fresh token works on a protected route
    assert_eq!(send(&state, get("/api/user/balance", &auth)).await.status, StatusCode::OK);

    let req = TestRequest::post().uri("/api/user/login").set_json(credentials("alice", "wrong"));
    assert_eq!(send(&state, req).await.status, StatusCode::UNAUTHORIZED);
    let req = TestRequest::post().uri("/api/user/login").set_json(credentials("bob", "hunter2"));
    assert_eq!(send(&state, req).await.status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn protected_routes_need_a_valid_token() {
    let (_, state) = memory_state();
    let reply = send(&state, TestRequest::get().uri("/api/user/orders")).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    assert_eq!(reply.json()["error"], "Authentication Error. No access token was provided.");

    let reply = send(&state, get("/api/user/withdrawals", "Bearer not.a.token")).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);

    // Signed with a different secret
    let config = ServerConfig::default();
    let forger = TokenIssuer::new(&Secret::new("not the secret".to_string()), config.token_expiry);
    let user = loyalty_engine::db_types::User {
        id: 1,
        login: "alice".into(),
        password_hash: String::new(),
        created_at: chrono::Utc::now(),
    };
    let forged = forger.issue_token(&user).unwrap();
    let reply = send(&state, get("/api/user/balance", &TokenIssuer::bearer(&forged))).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
}

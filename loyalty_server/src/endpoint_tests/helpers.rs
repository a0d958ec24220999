use actix_web::{
    http::{
        header::{HeaderMap, AUTHORIZATION},
        StatusCode,
    },
    test,
    test::TestRequest,
    App,
};
use log::debug;
use loyalty_engine::{InMemoryStore, OrderManagement, UserManagement};

use crate::{config::ServerConfig, server::AppState};

#[derive(Debug)]
pub struct Reply {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl Reply {
    pub fn authorization(&self) -> Option<String> {
        self.headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok()).map(String::from)
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).unwrap_or_else(|e| panic!("Body is not JSON ({e}): {}", self.body))
    }
}

pub fn memory_state() -> (InMemoryStore, AppState<InMemoryStore>) {
    let _ = env_logger::try_init();
    let store = InMemoryStore::new();
    let state = AppState::new(store.clone(), &ServerConfig::default());
    (store, state)
}

/// Builds a fresh service around `state` and sends it a single request.
pub async fn send<B>(state: &AppState<B>, req: TestRequest) -> Reply
where B: OrderManagement + UserManagement {
    let state = state.clone();
    let app = test::init_service(App::new().configure(move |cfg| state.configure(cfg))).await;
    let res = test::call_service(&app, req.to_request()).await;
    let status = res.status();
    let headers = res.headers().clone();
    let body = test::read_body(res).await;
    let body = String::from_utf8_lossy(&body).into_owned();
    debug!("Response: {status} {body}");
    Reply { status, headers, body }
}

/// Registers `login` and returns the `Authorization` header value to use in later requests.
pub async fn register<B>(state: &AppState<B>, login: &str, password: &str) -> String
where B: OrderManagement + UserManagement {
    let req = TestRequest::post()
        .uri("/api/user/register")
        .set_json(serde_json::json!({ "login": login, "password": password }));
    let reply = send(state, req).await;
    assert_eq!(reply.status, StatusCode::OK, "registration failed: {}", reply.body);
    reply.authorization().expect("No Authorization header in registration response")
}

pub fn get(path: &str, auth: &str) -> TestRequest {
    TestRequest::get().uri(path).insert_header((AUTHORIZATION, auth))
}

pub fn post_text(path: &str, auth: &str, body: &str) -> TestRequest {
    TestRequest::post()
        .uri(path)
        .insert_header((AUTHORIZATION, auth))
        .insert_header(("Content-Type", "text/plain"))
        .set_payload(body.to_string())
}

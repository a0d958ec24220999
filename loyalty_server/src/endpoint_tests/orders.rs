use actix_web::{http::StatusCode, test::TestRequest};
use loyalty_common::Points;
use loyalty_engine::{
    db_types::{Order, OrderStatusType},
    test_utils::prepare_env::{prepare_test_env, random_db_path, tear_down},
    OrderManagement,
};
use serde_json::json;

use super::helpers::*;

const ORDERS: &str = "/api/user/orders";
const BALANCE: &str = "/api/user/balance";
const WITHDRAW: &str = "/api/user/balance/withdraw";
const WITHDRAWALS: &str = "/api/user/withdrawals";

fn withdraw_request(auth: &str, order: &str, sum: f64) -> TestRequest {
    TestRequest::post()
        .uri(WITHDRAW)
        .insert_header((actix_web::http::header::AUTHORIZATION, auth))
        .set_json(json!({ "order": order, "sum": sum }))
}

#[actix_web::test]
async fn order_submission_status_codes() {
    let (_, state) = memory_state();
    let alice = register(&state, "alice", "hunter2").await;
    let bob = register(&state, "bob", "letmein").await;

    assert_eq!(send(&state, post_text(ORDERS, &alice, "12345678903")).await.status, StatusCode::ACCEPTED);
    // Resubmission by the owner
    assert_eq!(send(&state, post_text(ORDERS, &alice, "12345678903\n")).await.status, StatusCode::OK);
    // Someone else's order
    assert_eq!(send(&state, post_text(ORDERS, &bob, "12345678903")).await.status, StatusCode::CONFLICT);
    // Fails the Luhn check
    assert_eq!(send(&state, post_text(ORDERS, &alice, "12345678904")).await.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(send(&state, post_text(ORDERS, &alice, "")).await.status, StatusCode::BAD_REQUEST);
    assert_eq!(send(&state, post_text(ORDERS, &alice, "12a45")).await.status, StatusCode::BAD_REQUEST);
    assert_eq!(send(&state, post_text(ORDERS, "", "2377225624")).await.status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn listing_orders() {
    let (store, state) = memory_state();
    let alice = register(&state, "alice", "hunter2").await;
    assert_eq!(send(&state, get(ORDERS, &alice)).await.status, StatusCode::NO_CONTENT);

    send(&state, post_text(ORDERS, &alice, "12345678903")).await;
    send(&state, post_text(ORDERS, &alice, "2377225624")).await;
    let order = store.fetch_order(&"2377225624".into()).await.unwrap().unwrap();
    store.save_order(&order.processed(Points::from_points(500))).await.unwrap();

    let reply = send(&state, get(ORDERS, &alice)).await;
    assert_eq!(reply.status, StatusCode::OK);
    let orders = reply.json();
    let orders = orders.as_array().unwrap();
    assert_eq!(orders.len(), 2);
    let new = orders.iter().find(|o| o["number"] == "12345678903").unwrap();
    assert_eq!(new["status"], "NEW");
    assert!(new.get("accrual").is_none());
    assert!(new["uploaded_at"].is_string());
    let processed = orders.iter().find(|o| o["number"] == "2377225624").unwrap();
    assert_eq!(processed["status"], "PROCESSED");
    assert_eq!(processed["accrual"], 500.0);

    // Other users don't see them
    let bob = register(&state, "bob", "letmein").await;
    assert_eq!(send(&state, get(ORDERS, &bob)).await.status, StatusCode::NO_CONTENT);
}

#[actix_web::test]
async fn balance_and_withdrawals() {
    let (store, state) = memory_state();
    let alice = register(&state, "alice", "hunter2").await;

    let balance = send(&state, get(BALANCE, &alice)).await.json();
    assert_eq!(balance, json!({ "current": 0.0, "withdrawn": 0.0 }));
    assert_eq!(send(&state, get(WITHDRAWALS, &alice)).await.status, StatusCode::NO_CONTENT);

    let order = Order::new("12345678903".into(), 1).processed(Points::from_hundredths(72998));
    store.save_order(&order).await.unwrap();
    // Processing orders never count towards the balance
    let pending = Order::new("1111111".into(), 1).with_status(OrderStatusType::Processing);
    store.save_order(&pending).await.unwrap();

    let reply = send(&state, withdraw_request(&alice, "2377225624", 1000.0)).await;
    assert_eq!(reply.status, StatusCode::PAYMENT_REQUIRED);
    let reply = send(&state, withdraw_request(&alice, "2377225625", 10.0)).await;
    assert_eq!(reply.status, StatusCode::UNPROCESSABLE_ENTITY);
    let reply = send(&state, withdraw_request(&alice, "2377225624", -1.0)).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    let reply = send(&state, withdraw_request("", "2377225624", 1.0)).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);

    let reply = send(&state, withdraw_request(&alice, "2377225624", 729.0)).await;
    assert_eq!(reply.status, StatusCode::OK, "{}", reply.body);

    let balance = send(&state, get(BALANCE, &alice)).await.json();
    assert_eq!(balance["current"], 0.98);
    assert_eq!(balance["withdrawn"], 729.0);

    let reply = send(&state, get(WITHDRAWALS, &alice)).await;
    assert_eq!(reply.status, StatusCode::OK);
    let withdrawals = reply.json();
    assert_eq!(withdrawals[0]["order"], "2377225624");
    assert_eq!(withdrawals[0]["sum"], 729.0);
    assert!(withdrawals[0]["processed_at"].is_string());
}

#[actix_web::test]
async fn sqlite_backed_order_flow() {
    let url = random_db_path();
    let db = prepare_test_env(&url).await;
    let state = crate::server::AppState::new(db.clone(), &crate::config::ServerConfig::default());
    let alice = register(&state, "alice", "hunter2").await;
    let bob = register(&state, "bob", "letmein").await;

    assert_eq!(send(&state, post_text(ORDERS, &alice, "49927398716")).await.status, StatusCode::ACCEPTED);
    assert_eq!(send(&state, post_text(ORDERS, &alice, "49927398716")).await.status, StatusCode::OK);
    assert_eq!(send(&state, post_text(ORDERS, &bob, "49927398716")).await.status, StatusCode::CONFLICT);

    let order = db.fetch_order(&"49927398716".into()).await.unwrap().unwrap();
    db.save_order(&order.processed(Points::from_points(300))).await.unwrap();
    let reply = send(&state, withdraw_request(&alice, "79927398713", 100.0)).await;
    assert_eq!(reply.status, StatusCode::OK, "{}", reply.body);
    let balance = send(&state, get(BALANCE, &alice)).await.json();
    assert_eq!(balance, json!({ "current": 200.0, "withdrawn": 100.0 }));
    let reply = send(&state, withdraw_request(&bob, "79927398713", 1.0)).await;
    assert_eq!(reply.status, StatusCode::PAYMENT_REQUIRED);
    tear_down(db).await;
}

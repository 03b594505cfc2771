use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use subledger_engine::SubscriptionEngine;
use subledger_nullables::{NullClock, NullCustody, NullStore};
use subledger_rpc::router;
use subledger_types::{AccountId, Amount};

const COST: u128 = 1_000_000_000;
const WEEK: u64 = 7 * 86_400;
const START: u64 = 1_700_000_000;

struct TestApp {
    app: Router,
    clock: Arc<NullClock>,
    custody: Arc<NullCustody>,
}

fn app() -> TestApp {
    let clock = Arc::new(NullClock::new(START));
    let custody = Arc::new(NullCustody::new());
    let engine = SubscriptionEngine::construct(
        Arc::new(NullStore::new()),
        clock.clone(),
        custody.clone(),
        AccountId::new("owner"),
        0,
        Amount::new(COST),
    )
    .unwrap();
    TestApp {
        app: router(Arc::new(engine)),
        clock,
        custody,
    }
}

async fn call(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn config_reports_ledger_parameters() {
    let t = app();
    let (status, body) = call(&t.app, get("/config")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["owner"], "owner");
    assert_eq!(body["period"], "weekly");
    assert_eq!(body["period_selector"], 0);
    assert_eq!(body["period_secs"], WEEK);
    assert_eq!(body["period_cost"], COST.to_string());
}

#[tokio::test]
async fn unknown_account_is_uninitialized() {
    let t = app();
    let (status, body) = call(&t.app, get("/accounts/alice")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["staked_amount"], "0");
    assert_eq!(body["deposit_timestamp"], 0);
    assert_eq!(body["active"], false);
    assert_eq!(body["status"], "uninitialized");
    assert_eq!(body["expires_at"], Value::Null);
}

#[tokio::test]
async fn subscribe_then_query() {
    let t = app();
    let (status, body) = call(
        &t.app,
        post("/subscriptions", json!({"account": "alice", "value": (3 * COST).to_string()})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["staked_amount"], (3 * COST).to_string());
    assert_eq!(body["deposit_timestamp"], START);
    assert_eq!(body["active"], true);
    assert_eq!(body["available_balance"], (2 * COST).to_string());
    assert_eq!(body["consumed_amount"], COST.to_string());
    assert_eq!(body["expires_at"], START + 3 * WEEK);
    assert_eq!(t.custody.held(), Amount::new(3 * COST));

    t.clock.advance(WEEK);
    let (_, body) = call(&t.app, get("/accounts/alice")).await;
    assert_eq!(body["available_balance"], COST.to_string());
}

#[tokio::test]
async fn duplicate_subscription_conflicts() {
    let t = app();
    let request = json!({"account": "alice", "value": COST.to_string()});
    call(&t.app, post("/subscriptions", request.clone())).await;
    let (status, body) = call(&t.app, post("/subscriptions", request)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "already_subscribed");
}

#[tokio::test]
async fn short_deposit_is_unprocessable() {
    let t = app();
    let (status, body) = call(
        &t.app,
        post("/subscriptions", json!({"account": "alice", "value": (COST - 1).to_string()})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["kind"], "insufficient_deposit");
}

#[tokio::test]
async fn malformed_value_is_bad_request() {
    let t = app();
    let (status, body) = call(
        &t.app,
        post("/subscriptions", json!({"account": "alice", "value": "lots"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "invalid_request");

    let (status, _) = call(
        &t.app,
        post("/subscriptions", json!({"account": "", "value": "1"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn increase_requires_subscription() {
    let t = app();
    let (status, body) = call(
        &t.app,
        post("/subscriptions/increase", json!({"account": "bob", "value": COST.to_string()})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "not_subscribed");
}

#[tokio::test]
async fn increase_adds_to_stake() {
    let t = app();
    call(
        &t.app,
        post("/subscriptions", json!({"account": "alice", "value": COST.to_string()})),
    )
    .await;
    let (status, body) = call(
        &t.app,
        post("/subscriptions/increase", json!({"account": "alice", "value": COST.to_string()})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["staked_amount"], (2 * COST).to_string());
    assert_eq!(body["deposit_timestamp"], START);
}

#[tokio::test]
async fn withdraw_pays_available_balance() {
    let t = app();
    call(
        &t.app,
        post("/subscriptions", json!({"account": "alice", "value": (3 * COST).to_string()})),
    )
    .await;
    let (status, body) = call(&t.app, post("/withdrawals", json!({"account": "alice"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["amount"], (2 * COST).to_string());
    assert_eq!(body["staked_amount"], COST.to_string());
    assert_eq!(t.custody.paid_to(&AccountId::new("alice")), Amount::new(2 * COST));

    let (status, body) = call(&t.app, post("/withdrawals", json!({"account": "alice"}))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["kind"], "nothing_to_withdraw");
}

#[tokio::test]
async fn custody_failure_is_server_error() {
    let t = app();
    t.custody.fail_receive(true);
    let (status, body) = call(
        &t.app,
        post("/subscriptions", json!({"account": "alice", "value": COST.to_string()})),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["kind"], "transfer_failed");

    let (_, body) = call(&t.app, get("/accounts/alice")).await;
    assert_eq!(body["status"], "uninitialized");
}

#[tokio::test]
async fn missing_field_is_bad_request() {
    let t = app();
    let (status, body) = call(&t.app, post("/subscriptions", json!({"account": "alice"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "invalid_request");
    assert!(body["error"].as_str().unwrap().contains("value"));
    assert!(t.custody.transfers().is_empty());
}

#[tokio::test]
async fn wrongly_typed_or_unparseable_body_is_bad_request() {
    let t = app();
    let (status, body) = call(
        &t.app,
        post("/subscriptions/increase", json!({"account": "alice", "value": 5})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "invalid_request");

    let request = Request::builder()
        .method("POST")
        .uri("/withdrawals")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = call(&t.app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "invalid_request");
}

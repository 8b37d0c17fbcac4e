use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode},
    response::Response,
};
use http_body_util::BodyExt;

use order_book_engine::{
    api::{OrderAck, router},
    state::AppState,
};
use serde_json::{Value, json};
use tower::ServiceExt;

fn test_app() -> Router {
    router(AppState::new())
}

async fn body_json(res: Response) -> Value {
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn json<T: serde::de::DeserializeOwned>(res: Response) -> T {
    let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
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
async fn create_order_rejects_zero_qty() {
    let app = test_app();
    let body = json!({ "side": "Buy", "order_type": "Limit", "price": 50.0, "quantity": 0.0 });

    let res = app.oneshot(post("/orders", body)).await.unwrap();

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let v = body_json(res).await;
    assert_eq!(v["error"], "quantity must be > 0");
}

#[tokio::test]
async fn create_order_rejects_negative_price() {
    let app = test_app();
    let body = json!({ "side": "Buy", "order_type": "Limit", "price": -1.0, "quantity": 1.0 });

    let res = app.oneshot(post("/orders", body)).await.unwrap();

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let v = body_json(res).await;
    assert!(v["error"].as_str().unwrap().contains("price"));
}

#[tokio::test]
async fn create_order_rejects_limit_without_price() {
    let app = test_app();
    let body = json!({ "side": "Buy", "order_type": "Limit", "quantity": 1.0 });

    let res = app.oneshot(post("/orders", body)).await.unwrap();

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let v = body_json(res).await;
    assert!(v["error"].as_str().unwrap().contains("price"));
}

#[tokio::test]
async fn create_order_rejects_malformed_json() {
    let app = test_app();
    let res = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/orders")
                .header("content-type", "application/json")
                .body(Body::from("{ not json"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn limit_order_rests_then_cancel_removes_it() {
    let app = test_app();

    let create = json!({ "side": "Buy", "order_type": "Limit", "price": 48.0, "quantity": 10.0 });
    let res = app.clone().oneshot(post("/orders", create)).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let ack: OrderAck = json(res).await;
    assert!(ack.trades.is_empty());
    let order_id = ack.order_id;

    let res = app
        .clone()
        .oneshot(Request::builder().uri("/book").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let snap = body_json(res).await;
    assert_eq!(snap["bids"][0][0].as_f64(), Some(48.0));
    assert_eq!(snap["bids"][0][1].as_f64(), Some(10.0));

    let res = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/orders/{}", order_id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = app
        .oneshot(Request::builder().uri("/book").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let snap = body_json(res).await;
    assert!(snap["bids"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn cancel_unknown_order_returns_404() {
    let app = test_app();
    let res = app
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/orders/999")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn crossing_limit_order_produces_a_trade_in_the_ack() {
    let app = test_app();

    let sell = json!({ "side": "Sell", "order_type": "Limit", "price": 100.0, "quantity": 1.0 });
    let res = app.clone().oneshot(post("/orders", sell)).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let buy = json!({ "side": "Buy", "order_type": "Limit", "price": 100.0, "quantity": 1.0 });
    let res = app.oneshot(post("/orders", buy)).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let ack: OrderAck = json(res).await;

    assert_eq!(ack.trades.len(), 1);
    assert_eq!(ack.trades[0].price, 100.0);
    assert_eq!(ack.trades[0].quantity, 1.0);
}

#[tokio::test]
async fn trades_endpoint_paginates_forward() {
    let app = test_app();

    let seed = json!({ "side": "Sell", "order_type": "Limit", "price": 52.0, "quantity": 3.0 });
    app.clone().oneshot(post("/orders", seed)).await.unwrap();

    let market_buy = |qty: f64| json!({ "side": "Buy", "order_type": "Market", "quantity": qty });
    for _ in 0..2 {
        let _ = app.clone().oneshot(post("/orders", market_buy(1.0))).await.unwrap();
    }

    let res = app
        .clone()
        .oneshot(Request::builder().uri("/trades?limit=1").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let page1 = body_json(res).await;
    assert_eq!(page1["items"].as_array().unwrap().len(), 1);
    let next = page1["next"].as_u64().unwrap();

    let res = app
        .oneshot(
            Request::builder()
                .uri(format!("/trades?limit=1&after={}", next))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let page2 = body_json(res).await;
    assert_eq!(page2["items"].as_array().unwrap().len(), 1);
    assert_ne!(page1["items"][0]["id"], page2["items"][0]["id"]);
}

//! Checkout and order administration endpoints.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::str::FromStr;

use axum::http::{Method, StatusCode};
use rust_decimal::Decimal;
use serde_json::{Value, json};

use order_tracker_core::OrderStatus;
use order_tracker_integration_tests::{TestContext, demo_checkout, request};

fn money(value: &Value) -> Decimal {
    Decimal::from_str(value.as_str().unwrap()).unwrap()
}

#[tokio::test]
async fn test_checkout_prices_order() {
    let ctx = TestContext::new();
    let token = ctx.customer_token(42);
    let body = serde_json::to_value(demo_checkout()).unwrap();

    let resp = ctx
        .send(request(Method::POST, "/orders", Some(&token), Some(&body)))
        .await;

    assert_eq!(resp.status, StatusCode::CREATED);
    let order = resp.json();
    assert_eq!(order["customer_id"], 42);
    assert_eq!(order["status"], "PENDING");
    assert_eq!(order["payment_status"], "PAID");
    assert_eq!(money(&order["subtotal"]), Decimal::new(4850, 2));
    assert_eq!(money(&order["shipping"]), Decimal::new(599, 2));
    assert_eq!(money(&order["tax"]), Decimal::new(388, 2));
    assert_eq!(money(&order["total"]), Decimal::new(5837, 2));
    assert!(order["events"].as_array().unwrap().is_empty());
    assert!(order["tracking_number"].is_null());
}

#[tokio::test]
async fn test_cash_on_delivery_paid_on_delivery() {
    let ctx = TestContext::new();
    let token = ctx.customer_token(42);
    let mut body = serde_json::to_value(demo_checkout()).unwrap();
    body["payment_method"] = json!("CASH_ON_DELIVERY");

    let resp = ctx
        .send(request(Method::POST, "/orders", Some(&token), Some(&body)))
        .await;
    assert_eq!(resp.status, StatusCode::CREATED);
    let created = resp.json();
    assert_eq!(created["payment_status"], "PENDING");

    let admin = ctx.admin_token();
    let resp = ctx
        .send(request(
            Method::PUT,
            &format!("/tracking/order/{}", created["id"]),
            Some(&admin),
            Some(&json!({ "status": "DELIVERED" })),
        ))
        .await;
    assert_eq!(resp.json()["order"]["payment_status"], "PAID");
}

#[tokio::test]
async fn test_empty_cart_rejected() {
    let ctx = TestContext::new();
    let token = ctx.customer_token(42);
    let mut body = serde_json::to_value(demo_checkout()).unwrap();
    body["items"] = json!([]);

    let resp = ctx
        .send(request(Method::POST, "/orders", Some(&token), Some(&body)))
        .await;

    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_amounts_too_large_to_store_are_rejected() {
    let ctx = TestContext::new();
    let token = ctx.customer_token(42);

    let mut body = serde_json::to_value(demo_checkout()).unwrap();
    body["items"][0]["quantity"] = json!(100_000);
    body["items"][0]["unit_price"] = json!("10000000000000000000000000");
    let resp = ctx
        .send(request(Method::POST, "/orders", Some(&token), Some(&body)))
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);

    // Each line is storable but their sum is not
    let mut body = serde_json::to_value(demo_checkout()).unwrap();
    for item in body["items"].as_array_mut().unwrap() {
        item["quantity"] = json!(1);
        item["unit_price"] = json!("9999999999.99");
    }
    let resp = ctx
        .send(request(Method::POST, "/orders", Some(&token), Some(&body)))
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert!(
        resp.json()["error"]
            .as_str()
            .unwrap()
            .contains("exceeds the maximum")
    );

    let resp = ctx
        .send(request(Method::GET, "/orders", Some(&token), None))
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    assert!(resp.json().as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_customer_lists_only_own_orders() {
    let ctx = TestContext::new();
    let first = ctx.place_order(42).await;
    ctx.place_order(7).await;
    let second = ctx.place_order(42).await;
    let token = ctx.customer_token(42);

    let resp = ctx.send(request(Method::GET, "/orders", Some(&token), None)).await;

    assert_eq!(resp.status, StatusCode::OK);
    let ids: Vec<Value> = resp
        .json()
        .as_array()
        .unwrap()
        .iter()
        .map(|o| o["id"].clone())
        .collect();
    assert_eq!(ids, vec![json!(second.id), json!(first.id)]);
}

#[tokio::test]
async fn test_admin_lists_by_status() {
    let ctx = TestContext::new();
    let a = ctx.place_order(1).await;
    ctx.advance(&ctx.place_order(2).await, OrderStatus::Shipped).await;
    let token = ctx.admin_token();

    let resp = ctx
        .send(request(
            Method::GET,
            "/admin/orders?status=PENDING",
            Some(&token),
            None,
        ))
        .await;

    assert_eq!(resp.status, StatusCode::OK);
    let orders = resp.json();
    let orders = orders.as_array().unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0]["id"], json!(a.id));
}

#[tokio::test]
async fn test_customer_cannot_list_all_orders() {
    let ctx = TestContext::new();
    let token = ctx.customer_token(42);

    let resp = ctx
        .send(request(Method::GET, "/admin/orders", Some(&token), None))
        .await;

    assert_eq!(resp.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_admin_deletes_order() {
    let ctx = TestContext::new();
    let order = ctx.place_order(42).await;
    let token = ctx.admin_token();
    let uri = format!("/admin/orders/{}", order.id);

    let resp = ctx.send(request(Method::DELETE, &uri, Some(&token), None)).await;
    assert_eq!(resp.status, StatusCode::NO_CONTENT);

    let resp = ctx.send(request(Method::DELETE, &uri, Some(&token), None)).await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_health_endpoints() {
    let ctx = TestContext::new();

    let resp = ctx.send(request(Method::GET, "/health", None, None)).await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.text(), "ok");

    let resp = ctx.send(request(Method::GET, "/health/ready", None, None)).await;
    assert_eq!(resp.status, StatusCode::OK);
    assert!(resp.headers.contains_key("x-request-id"));
}

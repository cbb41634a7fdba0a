//! Integration tests for the order tracker.
//!
//! # Running Tests
//!
//! ```bash
//! # In-process tests against the memory store
//! cargo test -p order-tracker-integration-tests
//!
//! # Including the PostgreSQL-backed tests (needs TRACKER_DATABASE_URL, migrated)
//! cargo test -p order-tracker-integration-tests -- --include-ignored
//! ```
//!
//! Requests go through the full router with `tower::ServiceExt::oneshot`,
//! so middleware, extractors and error mapping are all exercised.

#![allow(clippy::missing_panics_doc)]

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::Router;
use axum::body::{Body, Bytes};
use axum::extract::ConnectInfo;
use axum::http::{HeaderMap, Method, Request, StatusCode, header};
use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use secrecy::SecretString;
use serde_json::Value;
use tower::ServiceExt;

use order_tracker_core::{
    NewLineItem, Order, OrderStatus, PaymentMethod, ProductId, Role, ShippingAddress,
    TransitionPolicy, UserId,
};
use order_tracker_server::config::TrackerConfig;
use order_tracker_server::db::{InMemoryOrderStore, OrderStore};
use order_tracker_server::models::Principal;
use order_tracker_server::routes;
use order_tracker_server::services::{CheckoutRequest, StatusUpdate};
use order_tracker_server::state::AppState;

/// High-entropy secret that passes the server's secret checks.
pub const TEST_TOKEN_SECRET: &str = "k3Y!v9#Qm2@xL7$pR4%tW8^zB1&nC6*d";

/// Admin user used by most tests.
pub const ADMIN_ID: i32 = 1;

/// Socket peer attached to every request so the rate limiter can key on it.
pub const CLIENT_IP: IpAddr = IpAddr::V4(std::net::Ipv4Addr::new(203, 0, 113, 7));

/// A router and the state behind it.
pub struct TestContext {
    pub state: AppState,
    pub app: Router,
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

impl TestContext {
    /// Memory-backed app with enforced transitions.
    #[must_use]
    pub fn new() -> Self {
        Self::with_policy(TransitionPolicy::Enforced)
    }

    /// Memory-backed app with the given transition policy.
    #[must_use]
    pub fn with_policy(policy: TransitionPolicy) -> Self {
        Self::with_store(policy, Arc::new(InMemoryOrderStore::new()))
    }

    /// App over an arbitrary store.
    #[must_use]
    pub fn with_store(policy: TransitionPolicy, store: Arc<dyn OrderStore>) -> Self {
        let mut config = TrackerConfig::for_memory(SecretString::from(TEST_TOKEN_SECRET));
        config.transition_policy = policy;
        Self::with_config(config, store)
    }

    /// Memory-backed app that keys the rate limit on proxy headers.
    #[must_use]
    pub fn behind_trusted_proxy() -> Self {
        let mut config = TrackerConfig::for_memory(SecretString::from(TEST_TOKEN_SECRET));
        config.trust_proxy_headers = true;
        Self::with_config(config, Arc::new(InMemoryOrderStore::new()))
    }

    /// App over an arbitrary configuration and store.
    #[must_use]
    pub fn with_config(config: TrackerConfig, store: Arc<dyn OrderStore>) -> Self {
        let state = AppState::new(config, store);
        let app = routes::app(state.clone());
        Self { state, app }
    }

    /// Bearer token for `user` with `role`, valid for an hour.
    #[must_use]
    pub fn token(&self, user: i32, role: Role) -> String {
        self.state
            .tokens()
            .issue(
                Principal::new(UserId::new(user), role),
                Duration::hours(1),
                Utc::now(),
            )
            .expect("Failed to issue token")
    }

    #[must_use]
    pub fn admin_token(&self) -> String {
        self.token(ADMIN_ID, Role::Admin)
    }

    #[must_use]
    pub fn customer_token(&self, customer: i32) -> String {
        self.token(customer, Role::Customer)
    }

    /// Send a request through the router.
    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .app
            .clone()
            .oneshot(request)
            .await
            .expect("Router is infallible");

        let status = response.status();
        let headers = response.headers().clone();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Failed to read response body");

        TestResponse {
            status,
            headers,
            body,
        }
    }

    /// Place the demo order for `customer` through the service layer.
    pub async fn place_order(&self, customer: i32) -> Order {
        self.state
            .tracking()
            .create_order(
                &Principal::new(UserId::new(customer), Role::Customer),
                demo_checkout(),
            )
            .await
            .expect("Failed to place order")
    }

    /// Move `order` to `status` as the admin, bypassing HTTP.
    pub async fn advance(&self, order: &Order, status: OrderStatus) -> Order {
        self.state
            .tracking()
            .update_status(
                &Principal::new(UserId::new(ADMIN_ID), Role::Admin),
                order.id,
                StatusUpdate {
                    status,
                    ..StatusUpdate::default()
                },
            )
            .await
            .expect("Failed to advance order")
    }
}

/// A fully buffered response.
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TestResponse {
    /// Body parsed as JSON.
    #[must_use]
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).expect("Response body is not JSON")
    }

    /// Body as UTF-8 text.
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8(self.body.to_vec()).expect("Response body is not UTF-8")
    }
}

/// Build a request from `CLIENT_IP`, optionally authenticated and with a JSON body.
#[must_use]
pub fn request(method: Method, uri: &str, token: Option<&str>, body: Option<&Value>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .extension(ConnectInfo(SocketAddr::new(CLIENT_IP, 50_000)));

    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }

    let body = match body {
        Some(json) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };

    builder.body(body).expect("Failed to build request")
}

/// Replace the socket peer of `request`.
#[must_use]
pub fn from_peer(mut request: Request<Body>, peer: IpAddr) -> Request<Body> {
    request
        .extensions_mut()
        .insert(ConnectInfo(SocketAddr::new(peer, 50_000)));
    request
}

/// Two totes and a mug shipped to Arlington, paid by card.
///
/// Subtotal 48.50, below the free shipping threshold.
#[must_use]
pub fn demo_checkout() -> CheckoutRequest {
    CheckoutRequest {
        items: vec![
            NewLineItem {
                product_id: ProductId::new(101),
                name: "Canvas Tote".to_string(),
                quantity: 2,
                unit_price: Decimal::new(1800, 2),
            },
            NewLineItem {
                product_id: ProductId::new(205),
                name: "Enamel Mug".to_string(),
                quantity: 1,
                unit_price: Decimal::new(1250, 2),
            },
        ],
        shipping_address: ShippingAddress {
            full_name: "Grace Hopper".to_string(),
            line1: "1 Compiler Court".to_string(),
            line2: None,
            city: "Arlington".to_string(),
            state: "VA".to_string(),
            postal_code: "22201".to_string(),
            country: "US".to_string(),
            phone: Some("+1 555 0100".to_string()),
        },
        payment_method: PaymentMethod::Card,
        discount: None,
    }
}

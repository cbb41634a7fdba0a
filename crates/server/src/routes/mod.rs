//! HTTP route handlers for the order tracker.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                       - Liveness check
//! GET    /health/ready                 - Readiness check (store reachable)
//!
//! # Tracking
//! PUT    /tracking/order/{id}          - Transition status (admin)
//! GET    /tracking/order/{id}          - Tracking for one order (owner or admin)
//! PUT    /tracking/bulk-update         - Transition many orders (admin)
//! GET    /tracking/{tracking_number}   - Public lookup (rate limited)
//! GET    /track/{tracking_number}      - Public tracking page (rate limited)
//!
//! # Orders
//! POST   /orders                       - Checkout (customer)
//! GET    /orders                       - Caller's orders
//! GET    /admin/orders                 - All orders, ?status=&limit= (admin)
//! DELETE /admin/orders/{id}            - Hard delete (admin)
//! ```

pub mod orders;
pub mod page;
pub mod tracking;
pub mod views;

use std::time::Duration;

use axum::{
    Router,
    extract::State,
    http::{HeaderValue, Method, StatusCode, header},
    middleware as axum_middleware,
    routing::{delete, get, put},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tracing::Span;

use crate::middleware::{
    public_lookup_rate_limiter, request_id_middleware, security_headers_middleware,
};
use crate::state::AppState;

/// Create the tracking routes router.
///
/// Public lookups sit behind the per-IP rate limiter; authenticated routes do not.
pub fn tracking_routes(trust_proxy_headers: bool) -> Router<AppState> {
    let public = Router::new()
        .route("/{tracking_number}", get(tracking::public_tracking))
        .route_layer(public_lookup_rate_limiter(trust_proxy_headers));

    Router::new()
        .route(
            "/order/{id}",
            put(tracking::update_status).get(tracking::order_tracking),
        )
        .route("/bulk-update", put(tracking::bulk_update))
        .merge(public)
}

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new().route("/", get(orders::mine).post(orders::create))
}

/// Create the admin routes router.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/orders", get(orders::list))
        .route("/orders/{id}", delete(orders::delete))
}

/// Create the public tracking page router.
pub fn page_routes(trust_proxy_headers: bool) -> Router<AppState> {
    Router::new()
        .route("/{tracking_number}", get(page::show))
        .route_layer(public_lookup_rate_limiter(trust_proxy_headers))
}

/// Create all routes.
///
/// The public lookups key their rate limit on the socket peer, or on proxy
/// headers when `trust_proxy_headers` is set.
pub fn routes(trust_proxy_headers: bool) -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .nest("/tracking", tracking_routes(trust_proxy_headers))
        .nest("/track", page_routes(trust_proxy_headers))
        .nest("/orders", order_routes())
        .nest("/admin", admin_routes())
}

/// Build the application with its middleware stack.
///
/// Sentry layers are added by the binary on top of this. The router must be
/// served with `ConnectInfo<SocketAddr>` for the public rate limiter.
pub fn app(state: AppState) -> Router {
    let cors = state.config().cors_origin.as_deref().and_then(cors_layer);

    let mut router = routes(state.config().trust_proxy_headers)
        .layer(axum_middleware::from_fn(security_headers_middleware))
        .layer(axum_middleware::from_fn(request_id_middleware));

    if let Some(cors) = cors {
        router = router.layer(cors);
    }

    router
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = tracing::field::Empty,
                        user_id = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>, latency: Duration, span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .with_state(state)
}

fn cors_layer(origin: &str) -> Option<CorsLayer> {
    match HeaderValue::from_str(origin) {
        Ok(origin) => Some(
            CorsLayer::new()
                .allow_origin(origin)
                .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
                .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
                .max_age(Duration::from_secs(600)),
        ),
        Err(e) => {
            tracing::warn!(error = %e, origin, "Ignoring invalid TRACKER_CORS_ORIGIN");
            None
        }
    }
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the order store is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match state.tracking().store().ping().await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

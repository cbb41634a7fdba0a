//! Checkout and order administration endpoints.

use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::StatusCode,
};
use serde::Deserialize;
use tracing::instrument;

use order_tracker_core::{Order, OrderId, OrderStatus};

use crate::db::OrderFilter;
use crate::error::Result;
use crate::middleware::{RequireAdmin, RequireAuth};
use crate::services::CheckoutRequest;
use crate::state::AppState;

/// Query parameters for the admin order listing.
#[derive(Debug, Default, Deserialize)]
pub struct ListOrdersQuery {
    pub status: Option<OrderStatus>,
    pub limit: Option<u32>,
}

/// Place an order for the calling customer.
///
/// POST /orders
///
/// # Errors
///
/// 400 for a malformed body or invalid checkout input.
#[instrument(skip(state, principal, payload))]
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(principal): RequireAuth,
    payload: std::result::Result<Json<CheckoutRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Order>)> {
    let Json(request) = payload?;
    let order = state.tracking().create_order(&principal, request).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// The caller's orders, newest first.
///
/// GET /orders
///
/// # Errors
///
/// 500 if the store fails.
#[instrument(skip(state, principal))]
pub async fn mine(
    State(state): State<AppState>,
    RequireAuth(principal): RequireAuth,
) -> Result<Json<Vec<Order>>> {
    Ok(Json(state.tracking().orders_for(&principal).await?))
}

/// Every order, optionally filtered by status.
///
/// GET /admin/orders?status=SHIPPED&limit=20
///
/// # Errors
///
/// 400 for an unknown status value.
#[instrument(skip(state, principal, query))]
pub async fn list(
    State(state): State<AppState>,
    RequireAdmin(principal): RequireAdmin,
    query: std::result::Result<Query<ListOrdersQuery>, QueryRejection>,
) -> Result<Json<Vec<Order>>> {
    let Query(query) = query?;
    let filter = OrderFilter {
        status: query.status,
        limit: query.limit,
    };
    Ok(Json(state.tracking().list_orders(&principal, filter).await?))
}

/// Hard delete an order.
///
/// DELETE /admin/orders/{id}
///
/// # Errors
///
/// 404 when the order does not exist.
#[instrument(skip(state, principal))]
pub async fn delete(
    State(state): State<AppState>,
    RequireAdmin(principal): RequireAdmin,
    id: std::result::Result<Path<OrderId>, PathRejection>,
) -> Result<StatusCode> {
    let Path(id) = id?;
    state.tracking().delete_order(&principal, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

//! Tracking endpoints: status transitions, bulk updates and lookups.

use axum::{
    Json,
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::instrument;

use order_tracker_core::{Order, OrderId};

use super::views::{BulkUpdateResponse, PublicOrderView, TrackingResponse};
use crate::error::Result;
use crate::middleware::{RequireAdmin, RequireAuth};
use crate::services::{BulkStatusUpdate, StatusUpdate};
use crate::state::AppState;

/// Move an order to a new status and append a tracking event.
///
/// PUT /tracking/order/{id}
///
/// # Errors
///
/// 400 for a malformed body or shipment details, 404 for an unknown order,
/// 409 if the order changed concurrently, 422 for a disallowed transition.
#[instrument(skip(state, principal, payload))]
pub async fn update_status(
    State(state): State<AppState>,
    RequireAdmin(principal): RequireAdmin,
    id: std::result::Result<Path<OrderId>, PathRejection>,
    payload: std::result::Result<Json<StatusUpdate>, JsonRejection>,
) -> Result<Json<TrackingResponse<Order>>> {
    let Path(id) = id?;
    let Json(update) = payload?;

    let order = state
        .tracking()
        .update_status(&principal, id, update)
        .await?;

    Ok(Json(TrackingResponse::full(order)))
}

/// Read an order's tracking as its owner or an admin.
///
/// GET /tracking/order/{id}
///
/// # Errors
///
/// 404 when the order does not exist or belongs to someone else.
#[instrument(skip(state, principal))]
pub async fn order_tracking(
    State(state): State<AppState>,
    RequireAuth(principal): RequireAuth,
    id: std::result::Result<Path<OrderId>, PathRejection>,
) -> Result<Json<TrackingResponse<Order>>> {
    let Path(id) = id?;
    let order = state.tracking().order_for(&principal, id).await?;
    Ok(Json(TrackingResponse::full(order)))
}

/// Public tracking lookup by tracking number.
///
/// GET /tracking/{tracking_number}
///
/// # Errors
///
/// 404 when no order carries the tracking number.
#[instrument(skip(state))]
pub async fn public_tracking(
    State(state): State<AppState>,
    Path(tracking_number): Path<String>,
) -> Result<Json<TrackingResponse<PublicOrderView>>> {
    let order = state.tracking().public_lookup(&tracking_number).await?;
    Ok(Json(TrackingResponse::public(&order)))
}

/// Apply one status to many orders.
///
/// PUT /tracking/bulk-update
///
/// Responds 200 when every order was updated and 207 Multi-Status otherwise,
/// listing the failure for each order that was not changed.
///
/// # Errors
///
/// 400 for a malformed body or an empty batch.
#[instrument(skip(state, principal, payload))]
pub async fn bulk_update(
    State(state): State<AppState>,
    RequireAdmin(principal): RequireAdmin,
    payload: std::result::Result<Json<BulkStatusUpdate>, JsonRejection>,
) -> Result<Response> {
    let Json(update) = payload?;

    let outcome = state.tracking().bulk_update(&principal, update).await?;
    let status = if outcome.is_complete() {
        tracing::info!(count = outcome.updated.len(), "Bulk status update completed");
        StatusCode::OK
    } else {
        StatusCode::MULTI_STATUS
    };

    Ok((status, Json(BulkUpdateResponse::from(outcome))).into_response())
}

//! Order persistence.
//!
//! # Database: `order_tracker`
//!
//! ## Tables
//!
//! - `tracker.orders` - The order aggregate. Items, shipping address and
//!   tracking events are JSONB columns on the order row, so a status change
//!   is one conditional `UPDATE`.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/server/migrations/` and run via:
//! ```bash
//! cargo run -p order-tracker-cli -- migrate
//! ```
//!
//! Handlers never talk to a backend directly; they go through the
//! [`OrderStore`] trait, implemented by [`PgOrderStore`] and
//! [`InMemoryOrderStore`].

pub mod memory;
pub mod orders;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use order_tracker_core::{
    LineItem, Order, OrderId, OrderStatus, OrderTotals, PaymentMethod, PaymentStatus,
    ShipmentDetails, ShippingAddress, TrackingEvent, TrackingNumber, UserId,
};
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use memory::InMemoryOrderStore;
pub use orders::PgOrderStore;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation or a lost optimistic-concurrency race.
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// A priced order ready to be inserted. The store assigns the id.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub customer_id: UserId,
    pub items: Vec<LineItem>,
    pub shipping_address: ShippingAddress,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub totals: OrderTotals,
    pub created_at: DateTime<Utc>,
}

/// One status change applied to an order as a single write.
///
/// The write only succeeds while the stored order is still at
/// `expected_version`; any intervening write, including one that kept the
/// same status, makes it a conflict.
#[derive(Debug, Clone)]
pub struct StatusChange {
    /// Version the caller read before deciding on the change.
    pub expected_version: i32,
    /// Status to store.
    pub status: OrderStatus,
    /// Event appended to the order's log.
    pub event: TrackingEvent,
    /// Shipment details after the change (already merged with the current ones).
    pub shipment: ShipmentDetails,
    /// Payment status after the change.
    pub payment_status: PaymentStatus,
}

/// Filter for the admin order listing.
#[derive(Debug, Clone, Copy, Default)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
    pub limit: Option<u32>,
}

impl OrderFilter {
    /// Listing size used when no limit is given.
    pub const DEFAULT_LIMIT: u32 = 50;
    /// Largest accepted limit.
    pub const MAX_LIMIT: u32 = 500;

    /// The effective row limit.
    #[must_use]
    pub fn effective_limit(&self) -> u32 {
        self.limit
            .unwrap_or(Self::DEFAULT_LIMIT)
            .clamp(1, Self::MAX_LIMIT)
    }
}

/// Storage for order aggregates.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Insert a new order with status `PENDING` and no events.
    async fn insert(&self, order: NewOrder) -> Result<Order, RepositoryError>;

    /// Fetch an order by id.
    async fn get(&self, id: OrderId) -> Result<Option<Order>, RepositoryError>;

    /// Fetch an order by its tracking number.
    async fn find_by_tracking_number(
        &self,
        tracking_number: &TrackingNumber,
    ) -> Result<Option<Order>, RepositoryError>;

    /// A customer's orders, newest first.
    async fn list_for_customer(&self, customer_id: UserId)
    -> Result<Vec<Order>, RepositoryError>;

    /// All orders matching `filter`, newest first.
    async fn list(&self, filter: OrderFilter) -> Result<Vec<Order>, RepositoryError>;

    /// Atomically set the status, append the event, and store shipment and
    /// payment details.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order does not exist and
    /// `RepositoryError::Conflict` if it was written since `change.expected_version`
    /// was read or the tracking number belongs to another order.
    async fn apply_status_change(
        &self,
        id: OrderId,
        change: StatusChange,
    ) -> Result<Order, RepositoryError>;

    /// Hard delete. Returns whether a row was removed.
    async fn delete(&self, id: OrderId) -> Result<bool, RepositoryError>;

    /// Readiness check.
    async fn ping(&self) -> Result<(), RepositoryError>;
}

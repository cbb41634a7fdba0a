//! `PostgreSQL` order repository.
//!
//! Queries are checked at runtime (`query_as` with a row struct) so the crate
//! builds without a live database.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use sqlx::types::Json;

use order_tracker_core::{
    LineItem, Order, OrderId, OrderStatus, OrderTotals, PaymentMethod, PaymentStatus,
    ShipmentDetails, ShippingAddress, TrackingEvent, TrackingNumber, UserId,
};

use super::{NewOrder, OrderFilter, OrderStore, RepositoryError, StatusChange};

/// Build a query that returns full order rows.
macro_rules! order_query {
    ($head:literal, $tail:literal) => {
        concat!(
            $head,
            " id, customer_id, items, shipping_address, payment_method, payment_status,",
            " subtotal, shipping, tax, discount, total, status,",
            " tracking_number, carrier, tracking_url, estimated_delivery,",
            " tracking_events, version, created_at, updated_at ",
            $tail
        )
    };
}

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: i32,
    customer_id: i32,
    items: Json<Vec<LineItem>>,
    shipping_address: Json<ShippingAddress>,
    payment_method: PaymentMethod,
    payment_status: PaymentStatus,
    subtotal: Decimal,
    shipping: Decimal,
    tax: Decimal,
    discount: Decimal,
    total: Decimal,
    status: OrderStatus,
    tracking_number: Option<String>,
    carrier: Option<String>,
    tracking_url: Option<String>,
    estimated_delivery: Option<DateTime<Utc>>,
    tracking_events: Json<Vec<TrackingEvent>>,
    version: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = RepositoryError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let tracking_number = row
            .tracking_number
            .as_deref()
            .map(TrackingNumber::parse)
            .transpose()
            .map_err(|e| {
                RepositoryError::DataCorruption(format!(
                    "invalid tracking number on order {}: {e}",
                    row.id
                ))
            })?;

        let totals = OrderTotals {
            subtotal: row.subtotal,
            shipping: row.shipping,
            tax: row.tax,
            discount: row.discount,
            total: row.total,
        };
        if !totals.is_consistent() {
            return Err(RepositoryError::DataCorruption(format!(
                "order {} total does not match its components",
                row.id
            )));
        }

        Ok(Self {
            id: OrderId::new(row.id),
            customer_id: UserId::new(row.customer_id),
            items: row.items.0,
            shipping_address: row.shipping_address.0,
            payment_method: row.payment_method,
            payment_status: row.payment_status,
            totals,
            status: row.status,
            shipment: ShipmentDetails {
                tracking_number,
                carrier: row.carrier,
                tracking_url: row.tracking_url,
                estimated_delivery: row.estimated_delivery,
            },
            events: row.tracking_events.0,
            version: row.version,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Map unique violations on the tracking number index to a conflict.
fn map_write_error(e: sqlx::Error) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict("tracking number already in use".to_owned());
    }
    RepositoryError::Database(e)
}

/// Order repository backed by `PostgreSQL`.
#[derive(Clone)]
pub struct PgOrderStore {
    pool: PgPool,
}

impl PgOrderStore {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OrderStore for PgOrderStore {
    async fn insert(&self, order: NewOrder) -> Result<Order, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(order_query!(
            r"
            INSERT INTO tracker.orders (
                customer_id, items, shipping_address, payment_method, payment_status,
                subtotal, shipping, tax, discount, total, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $11)
            RETURNING",
            ""
        ))
        .bind(order.customer_id)
        .bind(Json(&order.items))
        .bind(Json(&order.shipping_address))
        .bind(order.payment_method)
        .bind(order.payment_status)
        .bind(order.totals.subtotal)
        .bind(order.totals.shipping)
        .bind(order.totals.tax)
        .bind(order.totals.discount)
        .bind(order.totals.total)
        .bind(order.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(map_write_error)?;

        row.try_into()
    }

    async fn get(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(order_query!(
            "SELECT",
            "FROM tracker.orders WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Order::try_from).transpose()
    }

    async fn find_by_tracking_number(
        &self,
        tracking_number: &TrackingNumber,
    ) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(order_query!(
            "SELECT",
            "FROM tracker.orders WHERE tracking_number = $1"
        ))
        .bind(tracking_number.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Order::try_from).transpose()
    }

    async fn list_for_customer(
        &self,
        customer_id: UserId,
    ) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(order_query!(
            "SELECT",
            "FROM tracker.orders WHERE customer_id = $1 ORDER BY created_at DESC, id DESC"
        ))
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Order::try_from).collect()
    }

    async fn list(&self, filter: OrderFilter) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(order_query!(
            "SELECT",
            r"FROM tracker.orders
            WHERE ($1::tracker.order_status IS NULL OR status = $1)
            ORDER BY created_at DESC, id DESC
            LIMIT $2"
        ))
        .bind(filter.status)
        .bind(i64::from(filter.effective_limit()))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Order::try_from).collect()
    }

    async fn apply_status_change(
        &self,
        id: OrderId,
        change: StatusChange,
    ) -> Result<Order, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(order_query!(
            r"
            UPDATE tracker.orders
            SET status = $3,
                tracking_events = tracking_events || $4,
                tracking_number = $5,
                carrier = $6,
                tracking_url = $7,
                estimated_delivery = $8,
                payment_status = $9,
                version = version + 1,
                updated_at = NOW()
            WHERE id = $1 AND version = $2
            RETURNING",
            ""
        ))
        .bind(id)
        .bind(change.expected_version)
        .bind(change.status)
        .bind(Json([&change.event]))
        .bind(change.shipment.tracking_number.as_ref().map(TrackingNumber::as_str))
        .bind(change.shipment.carrier.as_deref())
        .bind(change.shipment.tracking_url.as_deref())
        .bind(change.shipment.estimated_delivery)
        .bind(change.payment_status)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_write_error)?;

        match row {
            Some(row) => row.try_into(),
            None => {
                // Either the order is gone or another writer got there first
                let current: Option<i32> =
                    sqlx::query_scalar(r"SELECT version FROM tracker.orders WHERE id = $1")
                        .bind(id)
                        .fetch_optional(&self.pool)
                        .await?;
                match current {
                    None => Err(RepositoryError::NotFound),
                    Some(version) => Err(RepositoryError::Conflict(format!(
                        "order {id} is at version {version}, expected {}",
                        change.expected_version
                    ))),
                }
            }
        }
    }

    async fn delete(&self, id: OrderId) -> Result<bool, RepositoryError> {
        let result = sqlx::query(r"DELETE FROM tracker.orders WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

//! Status enums and the order status state machine.
//!
//! Orders move forward along a six-step happy path:
//!
//! ```text
//! PENDING -> CONFIRMED -> PROCESSING -> SHIPPED -> OUT_FOR_DELIVERY -> DELIVERED
//! ```
//!
//! `CANCELLED`, `RETURNED` and `REFUNDED` are terminal side-branches. The
//! allowed moves are decided by [`next`]; [`TransitionPolicy::Permissive`]
//! skips that check entirely.
//!
//! Statuses have two textual forms. JSON bodies go through serde and only
//! accept the exact `SCREAMING_SNAKE_CASE` name, so `"shipped"` in a request
//! body is a 400. [`FromStr`] is the lenient form used for query strings and
//! CLI arguments: it trims whitespace and ignores case.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Order lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "tracker.order_status", rename_all = "SCREAMING_SNAKE_CASE")
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    #[default]
    Pending,
    Confirmed,
    Processing,
    Shipped,
    OutForDelivery,
    Delivered,
    Cancelled,
    Returned,
    Refunded,
}

/// Error returned when a string is not one of the nine order statuses.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid order status: {0}")]
pub struct ParseStatusError(pub String);

impl OrderStatus {
    /// Every status, happy path first.
    pub const ALL: [Self; 9] = [
        Self::Pending,
        Self::Confirmed,
        Self::Processing,
        Self::Shipped,
        Self::OutForDelivery,
        Self::Delivered,
        Self::Cancelled,
        Self::Returned,
        Self::Refunded,
    ];

    /// The expected forward progression from placement to delivery.
    pub const HAPPY_PATH: [Self; 6] = [
        Self::Pending,
        Self::Confirmed,
        Self::Processing,
        Self::Shipped,
        Self::OutForDelivery,
        Self::Delivered,
    ];

    /// Wire representation (e.g. `OUT_FOR_DELIVERY`).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Confirmed => "CONFIRMED",
            Self::Processing => "PROCESSING",
            Self::Shipped => "SHIPPED",
            Self::OutForDelivery => "OUT_FOR_DELIVERY",
            Self::Delivered => "DELIVERED",
            Self::Cancelled => "CANCELLED",
            Self::Returned => "RETURNED",
            Self::Refunded => "REFUNDED",
        }
    }

    /// Human-readable label for timelines and pages.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "Order Placed",
            Self::Confirmed => "Confirmed",
            Self::Processing => "Processing",
            Self::Shipped => "Shipped",
            Self::OutForDelivery => "Out for Delivery",
            Self::Delivered => "Delivered",
            Self::Cancelled => "Cancelled",
            Self::Returned => "Returned",
            Self::Refunded => "Refunded",
        }
    }

    /// Event description used when the caller does not supply one.
    #[must_use]
    pub const fn default_description(self) -> &'static str {
        match self {
            Self::Pending => "Order placed",
            Self::Confirmed => "Order confirmed",
            Self::Processing => "Order is being processed",
            Self::Shipped => "Order shipped",
            Self::OutForDelivery => "Out for delivery",
            Self::Delivered => "Order delivered",
            Self::Cancelled => "Order cancelled",
            Self::Returned => "Order returned",
            Self::Refunded => "Order refunded",
        }
    }

    /// Position in [`Self::HAPPY_PATH`], or `None` for the terminal alternates.
    #[must_use]
    pub fn happy_path_index(self) -> Option<usize> {
        Self::HAPPY_PATH.iter().position(|s| *s == self)
    }

    /// Whether the order is not expected to progress further.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Delivered | Self::Cancelled | Self::Returned | Self::Refunded
        )
    }

    /// Cancelled, returned, or refunded: the statuses that leave the happy path.
    #[must_use]
    pub const fn is_terminal_alternate(self) -> bool {
        matches!(self, Self::Cancelled | Self::Returned | Self::Refunded)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lenient parse for query strings and CLI arguments; see the module docs.
impl FromStr for OrderStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase();
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == normalized)
            .ok_or_else(|| ParseStatusError(s.to_string()))
    }
}

/// A requested status change that the state machine does not allow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("cannot move order from {from} to {to}")]
pub struct InvalidTransition {
    /// Status the order currently has.
    pub from: OrderStatus,
    /// Status that was requested.
    pub to: OrderStatus,
}

/// Decide the status an order moves to when `requested` is asked for.
///
/// Rules:
/// - Re-applying the current status is allowed (it records a progress event).
/// - Forward moves along the happy path are allowed, including skips.
/// - `CANCELLED` is reachable from any non-terminal status.
/// - `RETURNED` is reachable from any happy-path status, including `DELIVERED`.
/// - `REFUNDED` is reachable from every other status.
/// - Everything else (backward moves, leaving a terminal status) is rejected.
///
/// # Errors
///
/// Returns [`InvalidTransition`] when the move is not allowed.
pub fn next(current: OrderStatus, requested: OrderStatus) -> Result<OrderStatus, InvalidTransition> {
    let allowed = if current == requested {
        true
    } else {
        match requested {
            OrderStatus::Refunded => true,
            OrderStatus::Returned => current.happy_path_index().is_some(),
            OrderStatus::Cancelled => !current.is_terminal(),
            _ => match (current.happy_path_index(), requested.happy_path_index()) {
                (Some(from), Some(to)) => to > from,
                _ => false,
            },
        }
    };

    if allowed {
        Ok(requested)
    } else {
        Err(InvalidTransition {
            from: current,
            to: requested,
        })
    }
}

/// How strictly status changes are checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TransitionPolicy {
    /// Consult [`next`] before every change.
    #[default]
    Enforced,
    /// Accept any status from any status.
    Permissive,
}

impl TransitionPolicy {
    /// Apply the policy to a requested change.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidTransition`] when the policy is `Enforced` and [`next`] rejects the move.
    pub fn apply(
        self,
        current: OrderStatus,
        requested: OrderStatus,
    ) -> Result<OrderStatus, InvalidTransition> {
        match self {
            Self::Enforced => next(current, requested),
            Self::Permissive => Ok(requested),
        }
    }
}

impl fmt::Display for TransitionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Enforced => write!(f, "enforced"),
            Self::Permissive => write!(f, "permissive"),
        }
    }
}

impl FromStr for TransitionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "enforced" => Ok(Self::Enforced),
            "permissive" => Ok(Self::Permissive),
            _ => Err(format!("invalid transition policy: {s}")),
        }
    }
}

/// Role carried by an authenticated principal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// A shopper who can read their own orders.
    Customer,
    /// Staff who can transition and delete any order.
    Admin,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Customer => write!(f, "customer"),
            Self::Admin => write!(f, "admin"),
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "customer" => Ok(Self::Customer),
            "admin" => Ok(Self::Admin),
            _ => Err(format!("invalid role: {s}")),
        }
    }
}

/// How the customer chose to pay at checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "tracker.payment_method", rename_all = "SCREAMING_SNAKE_CASE")
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    Card,
    Paypal,
    CashOnDelivery,
}

impl PaymentMethod {
    /// Payment status a new order starts with.
    ///
    /// The payment gateway is mocked and always captures immediately, so only
    /// cash on delivery starts out unpaid.
    #[must_use]
    pub const fn initial_payment_status(self) -> PaymentStatus {
        match self {
            Self::Card | Self::Paypal => PaymentStatus::Paid,
            Self::CashOnDelivery => PaymentStatus::Pending,
        }
    }
}

/// Payment state of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "tracker.payment_status", rename_all = "SCREAMING_SNAKE_CASE")
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
    Failed,
    Refunded,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    use OrderStatus::*;

    #[test]
    fn test_status_round_trips_through_wire_format() {
        for status in OrderStatus::ALL {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", status.as_str()));
            assert_eq!(status.as_str().parse::<OrderStatus>().unwrap(), status);
        }
    }

    #[test]
    fn test_status_parse_is_case_insensitive() {
        assert_eq!("out_for_delivery".parse::<OrderStatus>().unwrap(), OutForDelivery);
        assert_eq!(" shipped ".parse::<OrderStatus>().unwrap(), Shipped);
    }

    #[test]
    fn test_json_status_is_case_sensitive() {
        assert!(serde_json::from_str::<OrderStatus>("\"shipped\"").is_err());
        assert_eq!(serde_json::from_str::<OrderStatus>("\"SHIPPED\"").unwrap(), Shipped);
    }

    #[test]
    fn test_status_parse_rejects_unknown() {
        let err = "LOST".parse::<OrderStatus>().unwrap_err();
        assert_eq!(err.to_string(), "invalid order status: LOST");
        assert!(serde_json::from_str::<OrderStatus>("\"LOST\"").is_err());
    }

    #[test]
    fn test_happy_path_index() {
        assert_eq!(Pending.happy_path_index(), Some(0));
        assert_eq!(Delivered.happy_path_index(), Some(5));
        assert_eq!(Cancelled.happy_path_index(), None);
        assert_eq!(Refunded.happy_path_index(), None);
    }

    #[test]
    fn test_terminal_statuses() {
        let terminal: Vec<_> = OrderStatus::ALL
            .into_iter()
            .filter(|s| s.is_terminal())
            .collect();
        assert_eq!(terminal, vec![Delivered, Cancelled, Returned, Refunded]);
        assert!(!Delivered.is_terminal_alternate());
    }

    #[test]
    fn test_forward_moves_allowed_including_skips() {
        assert_eq!(next(Pending, Confirmed), Ok(Confirmed));
        assert_eq!(next(Pending, Delivered), Ok(Delivered));
        assert_eq!(next(Shipped, OutForDelivery), Ok(OutForDelivery));
    }

    #[test]
    fn test_same_status_allowed() {
        for status in OrderStatus::ALL {
            assert_eq!(next(status, status), Ok(status));
        }
    }

    #[test]
    fn test_backward_moves_rejected() {
        let err = next(Delivered, Pending).unwrap_err();
        assert_eq!(err.from, Delivered);
        assert_eq!(err.to, Pending);
        assert!(next(Shipped, Confirmed).is_err());
    }

    #[test]
    fn test_cancel_only_before_terminal() {
        assert!(next(Processing, Cancelled).is_ok());
        assert!(next(OutForDelivery, Cancelled).is_ok());
        assert!(next(Delivered, Cancelled).is_err());
        assert!(next(Returned, Cancelled).is_err());
    }

    #[test]
    fn test_return_from_happy_path_only() {
        assert!(next(Delivered, Returned).is_ok());
        assert!(next(Shipped, Returned).is_ok());
        assert!(next(Cancelled, Returned).is_err());
    }

    #[test]
    fn test_refund_reachable_from_everywhere_else() {
        for status in OrderStatus::ALL {
            assert_eq!(next(status, Refunded), Ok(Refunded));
        }
        assert!(next(Refunded, Pending).is_err());
        assert!(next(Cancelled, Shipped).is_err());
    }

    #[test]
    fn test_permissive_policy_accepts_anything() {
        assert_eq!(
            TransitionPolicy::Permissive.apply(Delivered, Pending),
            Ok(Pending)
        );
        assert!(TransitionPolicy::Enforced.apply(Delivered, Pending).is_err());
    }

    #[test]
    fn test_role_round_trip() {
        for role in [Role::Customer, Role::Admin] {
            assert_eq!(role.to_string().parse::<Role>().unwrap(), role);
        }
        assert!("root".parse::<Role>().is_err());
    }

    #[test]
    fn test_initial_payment_status() {
        assert_eq!(
            PaymentMethod::Card.initial_payment_status(),
            PaymentStatus::Paid
        );
        assert_eq!(
            PaymentMethod::CashOnDelivery.initial_payment_status(),
            PaymentStatus::Pending
        );
    }
}

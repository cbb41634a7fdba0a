//! Tracking events, tracking numbers, and shipment details.

use core::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::status::OrderStatus;

/// A timestamped, human-readable milestone in an order's fulfillment history.
///
/// Events are stored oldest-first in the order they were appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackingEvent {
    /// Status the order moved to when this event was recorded.
    pub status: OrderStatus,
    /// What happened (e.g. "Order confirmed").
    pub description: String,
    /// Where it happened, if known (e.g. "Memphis, TN hub").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// When it happened.
    pub timestamp: DateTime<Utc>,
}

impl TrackingEvent {
    /// Build an event, falling back to the status's standard description.
    ///
    /// Blank descriptions and locations are treated as absent.
    #[must_use]
    pub fn new(
        status: OrderStatus,
        description: Option<&str>,
        location: Option<&str>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        let description = description
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| status.default_description())
            .to_string();
        let location = location
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(String::from);

        Self {
            status,
            description,
            location,
            timestamp,
        }
    }
}

/// Errors that can occur when parsing a [`TrackingNumber`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TrackingNumberError {
    /// The input is shorter than the minimum length.
    #[error("tracking number must be at least {min} characters")]
    TooShort {
        /// Minimum allowed length.
        min: usize,
    },
    /// The input is longer than the maximum length.
    #[error("tracking number must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
    /// The input contains something other than ASCII letters, digits, or dashes.
    #[error("tracking number may only contain letters, digits, and dashes")]
    InvalidCharacter,
}

/// A carrier or store-issued tracking number.
///
/// The tracking number doubles as the capability for the public tracking
/// lookup, so it is validated strictly and compared case-insensitively
/// (stored uppercase).
///
/// ## Examples
///
/// ```
/// use order_tracker_core::TrackingNumber;
///
/// let tn = TrackingNumber::parse("trk-1z999aa1").unwrap();
/// assert_eq!(tn.as_str(), "TRK-1Z999AA1");
///
/// assert!(TrackingNumber::parse("short").is_err());
/// assert!(TrackingNumber::parse("has spaces 123").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TrackingNumber(String);

impl TrackingNumber {
    /// Minimum accepted length.
    pub const MIN_LENGTH: usize = 6;
    /// Maximum accepted length.
    pub const MAX_LENGTH: usize = 64;

    /// Parse and normalize a tracking number.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is outside 6-64 characters after trimming
    /// or contains characters other than ASCII letters, digits, and dashes.
    pub fn parse(s: &str) -> Result<Self, TrackingNumberError> {
        let trimmed = s.trim();

        if trimmed.len() < Self::MIN_LENGTH {
            return Err(TrackingNumberError::TooShort {
                min: Self::MIN_LENGTH,
            });
        }

        if trimmed.len() > Self::MAX_LENGTH {
            return Err(TrackingNumberError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }

        if !trimmed
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-')
        {
            return Err(TrackingNumberError::InvalidCharacter);
        }

        Ok(Self(trimmed.to_ascii_uppercase()))
    }

    /// Returns the tracking number as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TrackingNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for TrackingNumber {
    type Err = TrackingNumberError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for TrackingNumber {
    type Error = TrackingNumberError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<TrackingNumber> for String {
    fn from(value: TrackingNumber) -> Self {
        value.0
    }
}

/// Carrier-facing shipment details attached to an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ShipmentDetails {
    pub tracking_number: Option<TrackingNumber>,
    pub carrier: Option<String>,
    pub tracking_url: Option<String>,
    pub estimated_delivery: Option<DateTime<Utc>>,
}

impl ShipmentDetails {
    /// Overlay the fields that are set in `update`, keeping the rest.
    #[must_use]
    pub fn merged_with(&self, update: &Self) -> Self {
        Self {
            tracking_number: update
                .tracking_number
                .clone()
                .or_else(|| self.tracking_number.clone()),
            carrier: update.carrier.clone().or_else(|| self.carrier.clone()),
            tracking_url: update
                .tracking_url
                .clone()
                .or_else(|| self.tracking_url.clone()),
            estimated_delivery: update.estimated_delivery.or(self.estimated_delivery),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_event_uses_default_description() {
        let event = TrackingEvent::new(OrderStatus::Confirmed, None, None, Utc::now());
        assert_eq!(event.description, "Order confirmed");
        assert_eq!(event.location, None);
    }

    #[test]
    fn test_event_blank_fields_are_absent() {
        let event = TrackingEvent::new(OrderStatus::Shipped, Some("  "), Some(""), Utc::now());
        assert_eq!(event.description, "Order shipped");
        assert_eq!(event.location, None);
    }

    #[test]
    fn test_event_keeps_trimmed_caller_text() {
        let event = TrackingEvent::new(
            OrderStatus::Shipped,
            Some(" Left the warehouse "),
            Some(" Memphis, TN "),
            Utc::now(),
        );
        assert_eq!(event.description, "Left the warehouse");
        assert_eq!(event.location.as_deref(), Some("Memphis, TN"));
    }

    #[test]
    fn test_tracking_number_normalizes_case() {
        let tn = TrackingNumber::parse(" trk123abc ").unwrap();
        assert_eq!(tn.as_str(), "TRK123ABC");
    }

    #[test]
    fn test_tracking_number_length_limits() {
        assert_eq!(
            TrackingNumber::parse("ABC12"),
            Err(TrackingNumberError::TooShort { min: 6 })
        );
        assert_eq!(
            TrackingNumber::parse(&"A".repeat(65)),
            Err(TrackingNumberError::TooLong { max: 64 })
        );
    }

    #[test]
    fn test_tracking_number_rejects_punctuation() {
        assert_eq!(
            TrackingNumber::parse("TRK/../123"),
            Err(TrackingNumberError::InvalidCharacter)
        );
    }

    #[test]
    fn test_tracking_number_deserialize_validates() {
        assert!(serde_json::from_str::<TrackingNumber>("\"TRK123456\"").is_ok());
        assert!(serde_json::from_str::<TrackingNumber>("\"x\"").is_err());
    }

    #[test]
    fn test_shipment_merge_prefers_update() {
        let existing = ShipmentDetails {
            tracking_number: Some(TrackingNumber::parse("TRK000001").unwrap()),
            carrier: Some("UPS".to_string()),
            ..ShipmentDetails::default()
        };
        let update = ShipmentDetails {
            carrier: Some("FedEx".to_string()),
            ..ShipmentDetails::default()
        };

        let merged = existing.merged_with(&update);
        assert_eq!(merged.carrier.as_deref(), Some("FedEx"));
        assert_eq!(
            merged.tracking_number.as_ref().map(TrackingNumber::as_str),
            Some("TRK000001")
        );
    }
}

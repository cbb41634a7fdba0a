//! Core types for Order Tracker.
//!
//! This module provides type-safe wrappers for the order tracking domain.

pub mod id;
pub mod order;
pub mod price;
pub mod status;
pub mod tracking;

pub use id::*;
pub use order::{LineItem, NewLineItem, Order, ShippingAddress};
pub use price::{AmountError, MAX_AMOUNT, OrderTotals, PricingPolicy};
pub use status::*;
pub use tracking::{ShipmentDetails, TrackingEvent, TrackingNumber, TrackingNumberError};

//! Order Tracker Core - Shared types library.
//!
//! This crate provides the domain types used across all Order Tracker components:
//! - `server` - HTTP API for order creation, status transitions, and tracking lookups
//! - `cli` - Command-line tools for migrations, access tokens, and demo data
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Type-safe IDs, order statuses, pricing, and tracking events
//! - [`timeline`] - Maps an order's status and events onto a progress display

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod timeline;
pub mod types;

pub use timeline::{Timeline, TimelineDisplay, TimelineStep};
pub use types::*;

//! Order tracker server library.
//!
//! Order lifecycle and tracking over HTTP: admin status transitions with an
//! explicit state machine, owner-scoped and public tracking lookups, bulk
//! updates with partial success, and a server-rendered tracking page.
//!
//! The binary in `main.rs` wires configuration, logging and Sentry around
//! [`routes::app`]; tests drive the same router against
//! [`db::InMemoryOrderStore`].

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

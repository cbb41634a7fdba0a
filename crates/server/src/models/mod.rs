//! Domain models for the order tracking server.

pub mod principal;

pub use principal::Principal;

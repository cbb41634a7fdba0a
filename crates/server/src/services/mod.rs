//! Business logic services.

pub mod auth;
pub mod tracking;

pub use auth::{AuthError, TokenSigner};
pub use tracking::{
    BulkFailure, BulkOutcome, BulkStatusUpdate, CheckoutRequest, StatusUpdate, TrackingError,
    TrackingService,
};

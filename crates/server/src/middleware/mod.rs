//! HTTP middleware stack for the order tracker.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (hub per request, HTTP transaction)
//! 2. `TraceLayer` (request span)
//! 3. Request ID (recorded on the span, echoed in the response)
//! 4. Security headers
//! 5. CORS (only when `TRACKER_CORS_ORIGIN` is set)
//! 6. Rate limiting on the public tracking lookups (governor)
//!
//! Authentication is not a layer: handlers take [`RequireAuth`] or
//! [`RequireAdmin`] and pass the resulting principal on explicitly.

pub mod auth;
pub mod rate_limit;
pub mod request_id;
pub mod security_headers;

pub use auth::{AuthRejection, RequireAdmin, RequireAuth};
pub use rate_limit::{RateLimiterLayer, public_lookup_rate_limiter};
pub use request_id::request_id_middleware;
pub use security_headers::security_headers_middleware;

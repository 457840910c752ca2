//! HTTP middleware stack for storefront.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layer (capture errors)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (add unique ID to each request)
//! 4. Path normalization (accept trailing slashes)
//!
//! Identity is resolved per handler by the extractors in [`auth`].

pub mod auth;
pub mod request_id;

pub use auth::{CurrentShopper, GuestCart, RequireUser};
pub use request_id::{RequestId, request_id_middleware};

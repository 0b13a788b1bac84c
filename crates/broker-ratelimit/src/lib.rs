//! # Broker Ratelimit
//!
//! Fixed-window rate limiting for the password disclosure broker. Three
//! independently configured policies gate the sensitive entry points:
//!
//! - **Login**: keyed by client IP, blunts credential stuffing
//! - **Request creation**: keyed by requester identity, bounds queue spam
//! - **Secret view**: keyed by viewer identity, tight limit against
//!   brute-force polling of the disclosure endpoint
//!
//! Counters live in a shared map; increments are atomic per key. Expired
//! windows are replaced opportunistically on access and reclaimed by a
//! periodic sweep.

pub mod config;
pub mod error;
pub mod limiter;

pub use config::{PolicyConfig, RateLimitConfig};
pub use error::{RateLimitError, Result};
pub use limiter::{RateLimitPolicy, RateLimiter};

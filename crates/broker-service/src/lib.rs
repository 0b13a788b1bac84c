//! # Broker Service
//!
//! The orchestration layer of the disclosure broker. Wires the request
//! repository, encrypted secret cache, audit ledger, rate limiter, and
//! directory gateway into the request lifecycle:
//!
//! - **login** — directory authentication behind a per-IP rate limit
//! - **create** — validated, rate-limited request intake
//! - **review** — human approval or denial with atomic status transitions
//! - **view** — windowed disclosure of the decrypted secret
//!
//! A background [`ExpirySweeper`] purges closed disclosure windows, expires
//! stale pending requests, and evicts dead rate-limiter state.

pub mod config;
pub mod error;
pub mod lifecycle;
pub mod sweeper;

pub use config::ServiceConfig;
pub use error::{Result, ServiceError};
pub use lifecycle::{DisclosedSecret, LifecycleService, RequesterContext};
pub use sweeper::{ExpirySweeper, SweeperHandle};

//! # Broker Requests
//!
//! The state kept by the password disclosure broker:
//!
//! - **`PasswordRequest`**: one disclosure workflow instance with its
//!   lifecycle status (`pending -> approved | denied | expired`)
//! - **Hostname normalization**: the bit-exact rule for NetBIOS-style
//!   machine names
//! - **`RequestRepository`**: storage contract with an atomic conditional
//!   status transition, plus an in-memory implementation
//! - **`SecretCache`**: the short-lived store holding the encrypted secret
//!   during the disclosure window

pub mod cache;
pub mod error;
pub mod hostname;
pub mod repository;
pub mod types;

pub use cache::{CachedSecret, SecretCache};
pub use error::{RepositoryError, Result};
pub use hostname::normalize_hostname;
pub use repository::{InMemoryRequestRepository, RequestFilter, RequestRepository};
pub use types::{PasswordRequest, RequestStatus, ReviewOutcome};

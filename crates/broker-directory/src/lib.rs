//! # Broker Directory
//!
//! The contract between the disclosure broker and the directory service
//! holding machine objects and their managed local administrator secrets.
//!
//! The broker never talks LDAP itself; it consumes the [`DirectoryGateway`]
//! capability. "Not found" is an `Ok(None)` value, never an error: only
//! transport failures surface as [`DirectoryError`]. A [`StaticDirectory`]
//! in-memory implementation is provided for tests and local development.

pub mod error;
pub mod gateway;
pub mod static_dir;
pub mod types;

pub use error::{DirectoryError, Result};
pub use gateway::{with_timeout, DirectoryGateway};
pub use static_dir::StaticDirectory;
pub use types::{ComputerRecord, ManagedSecret, UserProfile};

//! Client for the Cattle Keeper API.
//!
//! [`ApiClient`] speaks the HTTP surface. [`HerdBook`] layers the audit side
//! cache on top: reads are reconciled against it, writes record who made
//! them, and the activity feed falls back to the last fetched copy when the
//! server is down.

pub mod api;
pub mod audit;
pub mod error;
pub mod herd_book;

pub use api::ApiClient;
pub use audit::{reconcile_cattle, reconcile_milk, AuditCache, AuditEntry, Namespace};
pub use error::{ClientError, ClientResult};
pub use herd_book::{ActivityFeed, BreedingEditMode, HerdBook};

//! # Storage Module
//!
//! Durable state for the record store: one SQLite table per entity type
//! behind repository traits, plus a flat-file blob store for images.
//!
//! ## Components
//!
//! - **connection.rs** - pool ownership, schema setup, per-table write guards
//! - **repositories/** - cattle, milk and activity repositories
//! - **images.rs** - uploaded image files
//! - **traits.rs** - the abstractions the domain layer depends on

pub mod connection;
pub mod images;
pub mod repositories;
pub mod traits;

pub use connection::DbConnection;
pub use images::LocalImageStore;
pub use repositories::{ActivityRepository, CattleRepository, MilkRepository};
pub use traits::{ActivityStorage, CattleStorage, Connection, ImageStorage, MilkStorage};

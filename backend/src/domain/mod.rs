//! # Domain Module
//!
//! Business rules for the herd record store.
//!
//! Services validate input, stamp identifiers and timestamps, call into the
//! storage traits, and append an activity entry after every committed
//! mutation. They are generic over [`Connection`](crate::storage::Connection)
//! so tests can run them against an in-memory database.
//!
//! ## Module Organization
//!
//! - **cattle_service**: profile CRUD and the partial-update merge
//! - **milk_service**: yield records and the production summary
//! - **activity_service**: the append-only activity log and its day view
//! - **image_service**: upload validation and stored-file naming
//! - **events**: post-commit events and the image janitor
//!
//! ## Business Rules
//!
//! - Only fields named in a patch change; absent fields keep their value
//! - A milk record's total is always recomputed from its two milkings
//! - Activity entries are never edited or removed
//! - A failed activity append or image cleanup never fails the mutation

pub mod activity_service;
pub mod cattle_service;
pub mod events;
pub mod image_service;
pub mod milk_service;

pub use activity_service::ActivityService;
pub use cattle_service::{CattleFilter, CattleService};
pub use events::{spawn_image_janitor, EventBus, StoreEvent};
pub use image_service::{ImageService, UploadedFile, ALLOWED_IMAGE_TYPES};
pub use milk_service::MilkService;

//! # Storage Traits
//!
//! Storage abstractions used by the domain layer. Every write method runs
//! as one atomic unit against the backing store; writes to the same entity
//! type are serialized by the implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shared::{ActivityEntry, Cattle, CattlePatch, ImageInfo, MilkRecord};

use crate::error::StoreResult;

/// Cattle profile persistence
#[async_trait]
pub trait CattleStorage: Send + Sync {
    /// Store a new record
    async fn store_cattle(&self, cattle: &Cattle) -> StoreResult<()>;

    async fn get_cattle(&self, id: &str) -> StoreResult<Option<Cattle>>;

    /// All records ordered by name ascending
    async fn list_cattle(&self) -> StoreResult<Vec<Cattle>>;

    /// Merge `patch` into the stored record and persist the result.
    ///
    /// Read, merge and write happen under the write guard, so two
    /// concurrent patches apply in turn (last write wins).
    async fn patch_cattle(
        &self,
        id: &str,
        patch: &CattlePatch,
        now: DateTime<Utc>,
    ) -> StoreResult<Cattle>;

    /// Remove a record, returning it as it was. `None` when absent.
    async fn delete_cattle(&self, id: &str) -> StoreResult<Option<Cattle>>;
}

/// Milk record persistence. Records are create/delete only.
#[async_trait]
pub trait MilkStorage: Send + Sync {
    async fn store_milk_record(&self, record: &MilkRecord) -> StoreResult<()>;

    /// Ordered by date descending, then creation order descending
    async fn list_milk_records(&self) -> StoreResult<Vec<MilkRecord>>;

    async fn delete_milk_record(&self, id: &str) -> StoreResult<Option<MilkRecord>>;
}

/// Append-only activity log
#[async_trait]
pub trait ActivityStorage: Send + Sync {
    async fn append_activity(&self, entry: &ActivityEntry) -> StoreResult<()>;

    /// Ordered by timestamp descending
    async fn list_activities(&self) -> StoreResult<Vec<ActivityEntry>>;
}

/// Blob store for uploaded images, addressed by generated filename
#[async_trait]
pub trait ImageStorage: Send + Sync {
    async fn save_image(&self, filename: &str, bytes: &[u8]) -> StoreResult<()>;

    async fn image_info(&self, filename: &str) -> StoreResult<ImageInfo>;

    /// Fails with `NotFound` when no such blob exists
    async fn delete_image(&self, filename: &str) -> StoreResult<()>;
}

/// Factory for the repositories backed by one connection
pub trait Connection: Send + Sync + Clone {
    type CattleRepository: CattleStorage + Clone;
    type MilkRepository: MilkStorage + Clone;
    type ActivityRepository: ActivityStorage + Clone;

    fn create_cattle_repository(&self) -> Self::CattleRepository;

    fn create_milk_repository(&self) -> Self::MilkRepository;

    fn create_activity_repository(&self) -> Self::ActivityRepository;
}

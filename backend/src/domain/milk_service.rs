use tracing::{info, warn};
use uuid::Uuid;

use shared::{
    summarize, ActivityAction, ActivityCategory, CreateMilkRecordInput, MilkRecord, MilkSummary,
    NewActivity,
};

use super::activity_service::{actor_name, now, ActivityService};
use crate::error::{StoreError, StoreResult};
use crate::storage::{Connection, MilkStorage};

/// Service for milk yield records. Records are never edited; a correction
/// is a delete followed by a new record.
#[derive(Clone)]
pub struct MilkService<C: Connection> {
    milk_repository: C::MilkRepository,
    activity_service: ActivityService<C>,
}

impl<C: Connection> MilkService<C> {
    pub fn new(connection: &C, activity_service: ActivityService<C>) -> Self {
        Self {
            milk_repository: connection.create_milk_repository(),
            activity_service,
        }
    }

    /// Store a record with its total recomputed from the two milkings
    pub async fn create_milk_record(
        &self,
        input: CreateMilkRecordInput,
        actor: Option<&str>,
    ) -> StoreResult<MilkRecord> {
        let mut new = input.validate()?;
        if new.added_by.is_none() {
            new.added_by = actor.map(str::to_string);
        }
        info!("Creating milk record: cow={}, date={}", new.cow_name, new.date);

        let record = MilkRecord::from_new(Uuid::new_v4().to_string(), new, now());
        self.milk_repository.store_milk_record(&record).await?;
        info!("Created milk record {} ({} total)", record.id, record.total_daily);

        self.activity_service
            .record_after_commit(NewActivity::new(
                actor_name(actor, record.added_by.as_deref()),
                ActivityAction::Add,
                ActivityCategory::Milk,
                &record.cow_name,
                format!(
                    "Added milk record for \"{}\" on {} (Morning: {} KG, Evening: {} KG, Total: {:.2} KG)",
                    record.cow_name,
                    record.date,
                    record.morning_amount,
                    record.evening_amount,
                    record.total_daily
                ),
            ))
            .await;

        Ok(record)
    }

    /// All records, or one cow's history when `cow_name` is given
    pub async fn list_milk_records(&self, cow_name: Option<&str>) -> StoreResult<Vec<MilkRecord>> {
        let mut records = self.milk_repository.list_milk_records().await?;
        if let Some(name) = cow_name.filter(|name| !name.trim().is_empty()) {
            records.retain(|record| record.is_for_cow(name));
        }
        info!("Found {} milk records", records.len());
        Ok(records)
    }

    pub async fn summary(&self) -> StoreResult<MilkSummary> {
        let records = self.milk_repository.list_milk_records().await?;
        Ok(summarize(&records))
    }

    pub async fn delete_milk_record(&self, id: &str, actor: Option<&str>) -> StoreResult<MilkRecord> {
        info!("Deleting milk record: {}", id);
        let record = self
            .milk_repository
            .delete_milk_record(id)
            .await?
            .ok_or_else(|| {
                warn!("Milk record not found: {}", id);
                StoreError::NotFound("Milk record")
            })?;

        self.activity_service
            .record_after_commit(NewActivity::new(
                actor_name(actor, None),
                ActivityAction::Delete,
                ActivityCategory::Milk,
                &record.cow_name,
                format!(
                    "Deleted milk record for \"{}\" on {} ({:.2} KG)",
                    record.cow_name, record.date, record.total_daily
                ),
            ))
            .await;

        Ok(record)
    }
}

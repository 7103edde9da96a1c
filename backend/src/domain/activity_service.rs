use chrono::{DateTime, FixedOffset, SubsecRound, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use shared::{ActivityDay, ActivityEntry, ActivityTimeline, CreateActivityInput, NewActivity};

use crate::error::StoreResult;
use crate::storage::{ActivityStorage, Connection};

/// Current time at the precision the store keeps.
pub(crate) fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Whoever acted: the request's user, then the record's own audit field.
pub(crate) fn actor_name(header: Option<&str>, recorded: Option<&str>) -> String {
    [header, recorded]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|name| !name.is_empty())
        .unwrap_or("unknown")
        .to_string()
}

/// Records and reads the activity log
#[derive(Clone)]
pub struct ActivityService<C: Connection> {
    activity_repository: C::ActivityRepository,
}

impl<C: Connection> ActivityService<C> {
    pub fn new(connection: &C) -> Self {
        Self {
            activity_repository: connection.create_activity_repository(),
        }
    }

    /// Validate and append a caller-supplied entry
    pub async fn create_activity(&self, input: CreateActivityInput) -> StoreResult<ActivityEntry> {
        let new = input.validate()?;
        self.record(new).await
    }

    /// Append an entry, stamping id and timestamp
    pub async fn record(&self, new: NewActivity) -> StoreResult<ActivityEntry> {
        let entry = ActivityEntry::from_new(Uuid::new_v4().to_string(), new, now());
        self.activity_repository.append_activity(&entry).await?;
        info!(
            "Recorded activity: {} {} {} by {}",
            entry.action, entry.category, entry.target, entry.user
        );
        Ok(entry)
    }

    /// Append after a committed mutation. Failure is logged, never returned.
    pub async fn record_after_commit(&self, new: NewActivity) {
        let target = new.target.clone();
        if let Err(e) = self.record(new).await {
            warn!("Failed to record activity for {}: {}", target, e);
        }
    }

    pub async fn list_activities(&self) -> StoreResult<Vec<ActivityEntry>> {
        let entries = self.activity_repository.list_activities().await?;
        info!("Found {} activities", entries.len());
        Ok(entries)
    }

    pub async fn timeline(&self) -> StoreResult<ActivityTimeline> {
        Ok(ActivityTimeline::new(self.activity_repository.list_activities().await?))
    }

    /// Entries grouped by calendar day as seen from `offset`, newest day first
    pub async fn list_grouped_by_day(&self, offset: FixedOffset) -> StoreResult<Vec<ActivityDay>> {
        let timeline = self.timeline().await?;
        Ok(timeline.grouped_by_day_in(offset).map(ActivityDay::from).collect())
    }
}

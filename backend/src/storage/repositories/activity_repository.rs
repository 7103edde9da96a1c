use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use shared::ActivityEntry;

use super::{parse_column, timestamp_text};
use crate::error::StoreResult;
use crate::storage::connection::DbConnection;
use crate::storage::traits::ActivityStorage;

/// Repository for the append-only activity log. There is no update or
/// delete path.
#[derive(Clone)]
pub struct ActivityRepository {
    db: DbConnection,
}

impl ActivityRepository {
    pub fn new(db: DbConnection) -> Self {
        Self { db }
    }

    fn entry_from_row(row: &SqliteRow) -> StoreResult<ActivityEntry> {
        Ok(ActivityEntry {
            id: row.try_get("id")?,
            timestamp: row.try_get("timestamp")?,
            user: row.try_get("user")?,
            action: parse_column(row, "action")?,
            category: parse_column(row, "category")?,
            target: row.try_get("target")?,
            details: row.try_get("details")?,
        })
    }
}

#[async_trait]
impl ActivityStorage for ActivityRepository {
    async fn append_activity(&self, entry: &ActivityEntry) -> StoreResult<()> {
        let _guard = self.db.write_guards().activities.lock().await;
        sqlx::query(
            r#"
            INSERT INTO activities (id, timestamp, user, action, category, target, details)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&entry.id)
        .bind(timestamp_text(&entry.timestamp))
        .bind(&entry.user)
        .bind(entry.action.as_str())
        .bind(entry.category.as_str())
        .bind(&entry.target)
        .bind(&entry.details)
        .execute(self.db.pool())
        .await?;
        Ok(())
    }

    async fn list_activities(&self) -> StoreResult<Vec<ActivityEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT id, timestamp, user, action, category, target, details
            FROM activities
            ORDER BY timestamp DESC, rowid DESC
            "#,
        )
        .fetch_all(self.db.pool())
        .await?;
        rows.iter().map(Self::entry_from_row).collect()
    }
}

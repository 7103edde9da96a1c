use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use shared::MilkRecord;

use super::timestamp_text;
use crate::error::StoreResult;
use crate::storage::connection::DbConnection;
use crate::storage::traits::MilkStorage;

const SELECT_MILK: &str = r#"
    SELECT id, cow_name, date, morning_amount, evening_amount, total_daily, added_by, created_at
    FROM milk_records
"#;

const NEWEST_FIRST: &str = "ORDER BY date DESC, created_at DESC, rowid DESC";

/// Repository for milk yield records
#[derive(Clone)]
pub struct MilkRepository {
    db: DbConnection,
}

impl MilkRepository {
    pub fn new(db: DbConnection) -> Self {
        Self { db }
    }

    fn record_from_row(row: &SqliteRow) -> StoreResult<MilkRecord> {
        Ok(MilkRecord {
            id: row.try_get("id")?,
            cow_name: row.try_get("cow_name")?,
            date: row.try_get("date")?,
            morning_amount: row.try_get("morning_amount")?,
            evening_amount: row.try_get("evening_amount")?,
            total_daily: row.try_get("total_daily")?,
            added_by: row.try_get("added_by")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

#[async_trait]
impl MilkStorage for MilkRepository {
    async fn store_milk_record(&self, record: &MilkRecord) -> StoreResult<()> {
        let _guard = self.db.write_guards().milk.lock().await;
        sqlx::query(
            r#"
            INSERT INTO milk_records (
                id, cow_name, date, morning_amount, evening_amount, total_daily, added_by, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.id)
        .bind(&record.cow_name)
        .bind(record.date)
        .bind(record.morning_amount)
        .bind(record.evening_amount)
        .bind(record.total_daily)
        .bind(&record.added_by)
        .bind(timestamp_text(&record.created_at))
        .execute(self.db.pool())
        .await?;
        Ok(())
    }

    async fn list_milk_records(&self) -> StoreResult<Vec<MilkRecord>> {
        let rows = sqlx::query(&format!("{} {}", SELECT_MILK, NEWEST_FIRST))
            .fetch_all(self.db.pool())
            .await?;
        rows.iter().map(Self::record_from_row).collect()
    }

    async fn delete_milk_record(&self, id: &str) -> StoreResult<Option<MilkRecord>> {
        let _guard = self.db.write_guards().milk.lock().await;
        let mut tx = self.db.pool().begin().await?;

        let row = sqlx::query(&format!("{} WHERE id = ?", SELECT_MILK))
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        let existing = row.as_ref().map(Self::record_from_row).transpose()?;
        if existing.is_some() {
            sqlx::query("DELETE FROM milk_records WHERE id = ?")
                .bind(id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(existing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{SubsecRound, Utc};
    use shared::CreateMilkRecordInput;

    async fn setup_test() -> MilkRepository {
        let db = DbConnection::init_test().await.expect("Failed to create test database");
        MilkRepository::new(db)
    }

    fn record(id: &str, cow: &str, date: &str, morning: f64, evening: f64) -> MilkRecord {
        let new = CreateMilkRecordInput {
            cow_name: Some(cow.to_string()),
            date: Some(date.to_string()),
            morning_amount: morning,
            evening_amount: evening,
            added_by: None,
        }
        .validate()
        .unwrap();
        MilkRecord::from_new(id.to_string(), new, Utc::now().trunc_subsecs(6))
    }

    #[tokio::test]
    async fn test_store_and_list() {
        let repo = setup_test().await;
        let milk = record("m1", "Bessie", "2024-05-01", 3.5, 4.0);
        repo.store_milk_record(&milk).await.expect("Failed to store record");

        let records = repo.list_milk_records().await.unwrap();
        assert_eq!(records, vec![milk]);
        assert_eq!(records[0].total_daily, 7.5);
    }

    #[tokio::test]
    async fn test_list_orders_by_date_then_creation_desc() {
        let repo = setup_test().await;
        // Same date and same creation instant: insertion order decides.
        let base = record("m1", "Bessie", "2024-05-01", 1.0, 1.0);
        let mut same_day = record("m2", "Daisy", "2024-05-01", 2.0, 2.0);
        same_day.created_at = base.created_at;
        let older = record("m3", "Bessie", "2024-04-30", 3.0, 3.0);

        for r in [&base, &older, &same_day] {
            repo.store_milk_record(r).await.unwrap();
        }

        let ids: Vec<_> = repo
            .list_milk_records()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec!["m2", "m1", "m3"]);
    }

    #[tokio::test]
    async fn test_multiple_records_same_cow_same_day_are_kept() {
        let repo = setup_test().await;
        repo.store_milk_record(&record("m1", "Bessie", "2024-05-01", 1.0, 1.0)).await.unwrap();
        repo.store_milk_record(&record("m2", "Bessie", "2024-05-01", 2.0, 2.0)).await.unwrap();
        assert_eq!(repo.list_milk_records().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_delete() {
        let repo = setup_test().await;
        repo.store_milk_record(&record("m1", "Bessie", "2024-05-01", 1.0, 1.0)).await.unwrap();

        assert!(repo.delete_milk_record("m1").await.unwrap().is_some());
        assert!(repo.delete_milk_record("m1").await.unwrap().is_none());
        assert!(repo.list_milk_records().await.unwrap().is_empty());
    }
}

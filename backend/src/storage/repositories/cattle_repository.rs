use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite};
use tracing::debug;

use shared::{apply_patch, BreedingInfo, Cattle, CattleAudit, CattlePatch, Sex};

use super::{parse_column, parse_optional_column, timestamp_text};
use crate::error::{StoreError, StoreResult};
use crate::storage::connection::DbConnection;
use crate::storage::traits::CattleStorage;

const SELECT_CATTLE: &str = r#"
    SELECT id, name, breed, date_of_birth, sex, image_url,
           served_date, mating_breed, expected_calf_birth_date,
           calf_birth_date, calf_sex, dried_date,
           created_by, created_at, last_edited_by, last_edited_at, last_edited_field
    FROM cattle
"#;

/// Repository for cattle profiles
#[derive(Clone)]
pub struct CattleRepository {
    db: DbConnection,
}

impl CattleRepository {
    pub fn new(db: DbConnection) -> Self {
        Self { db }
    }

    fn cattle_from_row(row: &SqliteRow) -> StoreResult<Cattle> {
        let sex: Sex = parse_column(row, "sex")?;
        let calf_sex: Option<Sex> = parse_optional_column(row, "calf_sex")?;
        Ok(Cattle {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            breed: row.try_get("breed")?,
            date_of_birth: row.try_get("date_of_birth")?,
            sex,
            image_url: row.try_get("image_url")?,
            breeding: BreedingInfo {
                served_date: row.try_get("served_date")?,
                mating_breed: row.try_get("mating_breed")?,
                expected_calf_birth_date: row.try_get("expected_calf_birth_date")?,
                calf_birth_date: row.try_get("calf_birth_date")?,
                calf_sex,
                dried_date: row.try_get("dried_date")?,
            },
            created_at: row.try_get("created_at")?,
            audit: CattleAudit {
                created_by: row.try_get("created_by")?,
                last_edited_by: row.try_get("last_edited_by")?,
                last_edited_at: row.try_get("last_edited_at")?,
                last_edited_field: row.try_get("last_edited_field")?,
            },
        })
    }

    async fn fetch_in<'e, E>(executor: E, id: &str) -> StoreResult<Option<Cattle>>
    where
        E: sqlx::Executor<'e, Database = Sqlite>,
    {
        let row = sqlx::query(&format!("{} WHERE id = ?", SELECT_CATTLE))
            .bind(id)
            .fetch_optional(executor)
            .await?;
        row.as_ref().map(Self::cattle_from_row).transpose()
    }
}

#[async_trait]
impl CattleStorage for CattleRepository {
    async fn store_cattle(&self, cattle: &Cattle) -> StoreResult<()> {
        let _guard = self.db.write_guards().cattle.lock().await;
        sqlx::query(
            r#"
            INSERT INTO cattle (
                id, name, breed, date_of_birth, sex, image_url,
                served_date, mating_breed, expected_calf_birth_date,
                calf_birth_date, calf_sex, dried_date, created_by, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&cattle.id)
        .bind(&cattle.name)
        .bind(&cattle.breed)
        .bind(cattle.date_of_birth)
        .bind(cattle.sex.as_str())
        .bind(&cattle.image_url)
        .bind(cattle.breeding.served_date)
        .bind(&cattle.breeding.mating_breed)
        .bind(cattle.breeding.expected_calf_birth_date)
        .bind(cattle.breeding.calf_birth_date)
        .bind(cattle.breeding.calf_sex.map(|s| s.as_str()))
        .bind(cattle.breeding.dried_date)
        .bind(&cattle.audit.created_by)
        .bind(timestamp_text(&cattle.created_at))
        .execute(self.db.pool())
        .await?;
        Ok(())
    }

    async fn get_cattle(&self, id: &str) -> StoreResult<Option<Cattle>> {
        Self::fetch_in(self.db.pool(), id).await
    }

    async fn list_cattle(&self) -> StoreResult<Vec<Cattle>> {
        let rows = sqlx::query(&format!("{} ORDER BY name ASC, rowid ASC", SELECT_CATTLE))
            .fetch_all(self.db.pool())
            .await?;
        rows.iter().map(Self::cattle_from_row).collect()
    }

    async fn patch_cattle(
        &self,
        id: &str,
        patch: &CattlePatch,
        now: DateTime<Utc>,
    ) -> StoreResult<Cattle> {
        let _guard = self.db.write_guards().cattle.lock().await;
        let mut tx = self.db.pool().begin().await?;

        let current = Self::fetch_in(&mut *tx, id)
            .await?
            .ok_or(StoreError::NotFound("Cattle record"))?;
        let updated = apply_patch(&current, patch, now)?;
        debug!("Patching cattle {} fields {:?}", id, patch.changes());

        // id and created_at are never written here.
        sqlx::query(
            r#"
            UPDATE cattle SET
                name = ?, breed = ?, date_of_birth = ?, sex = ?, image_url = ?,
                served_date = ?, mating_breed = ?, expected_calf_birth_date = ?,
                calf_birth_date = ?, calf_sex = ?, dried_date = ?,
                last_edited_by = ?, last_edited_at = ?, last_edited_field = ?
            WHERE id = ?
            "#,
        )
        .bind(&updated.name)
        .bind(&updated.breed)
        .bind(updated.date_of_birth)
        .bind(updated.sex.as_str())
        .bind(&updated.image_url)
        .bind(updated.breeding.served_date)
        .bind(&updated.breeding.mating_breed)
        .bind(updated.breeding.expected_calf_birth_date)
        .bind(updated.breeding.calf_birth_date)
        .bind(updated.breeding.calf_sex.map(|s| s.as_str()))
        .bind(updated.breeding.dried_date)
        .bind(&updated.audit.last_edited_by)
        .bind(updated.audit.last_edited_at.as_ref().map(timestamp_text))
        .bind(&updated.audit.last_edited_field)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(updated)
    }

    async fn delete_cattle(&self, id: &str) -> StoreResult<Option<Cattle>> {
        let _guard = self.db.write_guards().cattle.lock().await;
        let mut tx = self.db.pool().begin().await?;

        let existing = Self::fetch_in(&mut *tx, id).await?;
        if existing.is_some() {
            sqlx::query("DELETE FROM cattle WHERE id = ?")
                .bind(id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(existing)
    }
}

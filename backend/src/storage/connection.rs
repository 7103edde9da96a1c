use anyhow::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{migrate::MigrateDatabase, Sqlite, SqlitePool};
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

use super::repositories::{ActivityRepository, CattleRepository, MilkRepository};
use super::traits::Connection;

/// One write guard per table. Writes to different tables do not contend.
#[derive(Debug, Default)]
pub struct WriteGuards {
    pub cattle: Mutex<()>,
    pub milk: Mutex<()>,
    pub activities: Mutex<()>,
}

/// DbConnection owns the SQLite pool shared by every repository
#[derive(Clone)]
pub struct DbConnection {
    pool: Arc<SqlitePool>,
    guards: Arc<WriteGuards>,
}

impl DbConnection {
    /// Connect to `url`, creating the database if it doesn't exist
    pub async fn new(url: &str) -> Result<Self> {
        if !Sqlite::database_exists(url).await.unwrap_or(false) {
            info!("Creating database at {}", url);
            Sqlite::create_database(url).await?
        }

        let pool = SqlitePool::connect(url).await?;
        Self::setup_schema(&pool).await?;

        Ok(Self::from_pool(pool))
    }

    /// Open the database file at `path`, creating its parent directory
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        Self::new(&format!("sqlite://{}", path.display())).await
    }

    /// A private in-memory database.
    ///
    /// The pool holds exactly one connection that never expires, since the
    /// database lives only as long as that connection.
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;
        Self::setup_schema(&pool).await?;

        Ok(Self::from_pool(pool))
    }

    fn from_pool(pool: SqlitePool) -> Self {
        Self {
            pool: Arc::new(pool),
            guards: Arc::new(WriteGuards::default()),
        }
    }

    /// Initialize a test database
    #[cfg(test)]
    pub async fn init_test() -> Result<Self> {
        Self::in_memory().await
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Write guards shared by every repository created from this connection
    pub fn write_guards(&self) -> &WriteGuards {
        &self.guards
    }

    /// True when the database answers a trivial query
    pub async fn is_healthy(&self) -> bool {
        sqlx::query("SELECT 1").execute(self.pool()).await.is_ok()
    }

    /// Set up the required database schema
    async fn setup_schema(pool: &SqlitePool) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS cattle (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                breed TEXT NOT NULL,
                date_of_birth TEXT NOT NULL,
                sex TEXT NOT NULL CHECK (sex IN ('male', 'female')),
                image_url TEXT,
                served_date TEXT,
                mating_breed TEXT,
                expected_calf_birth_date TEXT,
                calf_birth_date TEXT,
                calf_sex TEXT CHECK (calf_sex IS NULL OR calf_sex IN ('male', 'female')),
                dried_date TEXT,
                created_by TEXT,
                created_at TEXT NOT NULL,
                last_edited_by TEXT,
                last_edited_at TEXT,
                last_edited_field TEXT
            );
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_cattle_name ON cattle(name);")
            .execute(pool)
            .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_cattle_sex ON cattle(sex);")
            .execute(pool)
            .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS milk_records (
                id TEXT PRIMARY KEY,
                cow_name TEXT NOT NULL,
                date TEXT NOT NULL,
                morning_amount REAL NOT NULL DEFAULT 0,
                evening_amount REAL NOT NULL DEFAULT 0,
                total_daily REAL NOT NULL DEFAULT 0,
                added_by TEXT,
                created_at TEXT NOT NULL
            );
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_milk_date_cow ON milk_records(date, cow_name);")
            .execute(pool)
            .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_milk_cow_name ON milk_records(cow_name);")
            .execute(pool)
            .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS activities (
                id TEXT PRIMARY KEY,
                timestamp TEXT NOT NULL,
                user TEXT NOT NULL,
                action TEXT NOT NULL CHECK (action IN ('add', 'edit', 'delete')),
                category TEXT NOT NULL CHECK (category IN ('cattle', 'milk')),
                target TEXT NOT NULL,
                details TEXT
            );
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_activities_timestamp ON activities(timestamp DESC);")
            .execute(pool)
            .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_activities_category ON activities(category);")
            .execute(pool)
            .await?;

        Ok(())
    }
}

impl Connection for DbConnection {
    type CattleRepository = CattleRepository;
    type MilkRepository = MilkRepository;
    type ActivityRepository = ActivityRepository;

    fn create_cattle_repository(&self) -> Self::CattleRepository {
        CattleRepository::new(self.clone())
    }

    fn create_milk_repository(&self) -> Self::MilkRepository {
        MilkRepository::new(self.clone())
    }

    fn create_activity_repository(&self) -> Self::ActivityRepository {
        ActivityRepository::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_database_is_healthy() {
        let db = DbConnection::init_test().await.expect("Failed to create test database");
        assert!(db.is_healthy().await);
    }

    #[tokio::test]
    async fn test_open_creates_file_and_parent_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("database.sqlite");

        let db = DbConnection::open(&path).await.expect("Failed to open database");
        assert!(path.exists());
        assert!(db.is_healthy().await);

        // Schema setup is idempotent.
        DbConnection::open(&path).await.expect("Failed to reopen database");
    }

    #[tokio::test]
    async fn test_closed_pool_reports_unhealthy() {
        let db = DbConnection::init_test().await.unwrap();
        db.pool().close().await;
        assert!(!db.is_healthy().await);
    }
}

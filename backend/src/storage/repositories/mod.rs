//! SQLite repositories, one per entity type.

pub mod activity_repository;
pub mod cattle_repository;
pub mod milk_repository;

pub use activity_repository::ActivityRepository;
pub use cattle_repository::CattleRepository;
pub use milk_repository::MilkRepository;

use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use std::str::FromStr;

use crate::error::{StoreError, StoreResult};

/// Fixed-width UTC timestamps sort correctly as text.
pub(crate) fn timestamp_text(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Decode a text column into an enum, flagging unknown values as corruption.
pub(crate) fn parse_column<T: FromStr>(row: &SqliteRow, column: &str) -> StoreResult<T> {
    let raw: String = row.try_get(column)?;
    raw.parse()
        .map_err(|_| StoreError::Corrupt(format!("{} = '{}'", column, raw)))
}

pub(crate) fn parse_optional_column<T: FromStr>(
    row: &SqliteRow,
    column: &str,
) -> StoreResult<Option<T>> {
    let raw: Option<String> = row.try_get(column)?;
    raw.map(|value| {
        value
            .parse()
            .map_err(|_| StoreError::Corrupt(format!("{} = '{}'", column, value)))
    })
    .transpose()
}

//! Record types and pure logic shared by the cattle-keeper server and client.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod activity;
pub mod cattle;
pub mod derived;
pub mod milk;
pub mod patch;
pub mod validation;

pub use activity::{
    ActivityAction, ActivityCategory, ActivityDay, ActivityEntry, ActivityTimeline,
    CreateActivityInput, DayGroup, DayGroups, NewActivity,
};
pub use cattle::{BreedingInfo, Cattle, CattleAudit, CreateCattleInput, NewCattle, Sex};
pub use derived::{age_in_months, age_label, total_daily};
pub use milk::{
    summarize, CowYield, CreateMilkRecordInput, DailyProduction, MilkRecord, MilkSummary,
    NewMilkRecord,
};
pub use patch::{apply_patch, breeding_edit_label, breeding_patch, CattleField, CattlePatch, PatchError};
pub use validation::ValidationError;

/// JSON envelope used by every API response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(default = "Option::default", skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            message: None,
        }
    }

    pub fn error(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            message: None,
        }
    }

    pub fn error_with_message(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::error(error)
        }
    }
}

impl ApiResponse<()> {
    /// Success without a payload, e.g. after a delete.
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: None,
            error: None,
            message: Some(message.into()),
        }
    }
}

/// Result of a successful image upload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageUpload {
    /// Publicly fetchable URL.
    pub url: String,
    /// Stored name, `<uuid><ext>`.
    pub filename: String,
    pub original_name: String,
    pub size: u64,
    pub mimetype: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageInfo {
    pub filename: String,
    pub size: u64,
    pub created: Option<DateTime<Utc>>,
    pub modified: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceStatus {
    Ok,
    Degraded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseStatus {
    Connected,
    Disconnected,
}

/// Health check payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthStatus {
    pub status: ServiceStatus,
    pub database: DatabaseStatus,
    pub timestamp: DateTime<Utc>,
    pub uptime_seconds: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiInfo {
    pub name: String,
    pub version: String,
    pub description: String,
    pub endpoints: std::collections::BTreeMap<String, String>,
}

use chrono::{DateTime, FixedOffset, NaiveDate, Offset, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::validation::{non_blank, RequiredFields, ValidationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityAction {
    Add,
    Edit,
    Delete,
}

impl ActivityAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityAction::Add => "add",
            ActivityAction::Edit => "edit",
            ActivityAction::Delete => "delete",
        }
    }
}

impl FromStr for ActivityAction {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "add" => Ok(ActivityAction::Add),
            "edit" => Ok(ActivityAction::Edit),
            "delete" => Ok(ActivityAction::Delete),
            other => Err(ValidationError::InvalidAction(other.to_string())),
        }
    }
}

impl fmt::Display for ActivityAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityCategory {
    Cattle,
    Milk,
}

impl ActivityCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityCategory::Cattle => "cattle",
            ActivityCategory::Milk => "milk",
        }
    }
}

impl FromStr for ActivityCategory {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "cattle" => Ok(ActivityCategory::Cattle),
            "milk" => Ok(ActivityCategory::Milk),
            other => Err(ValidationError::InvalidCategory(other.to_string())),
        }
    }
}

impl fmt::Display for ActivityCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable audit-log line. `details` is advisory text only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityEntry {
    pub id: String,
    /// Server-assigned creation time.
    pub timestamp: DateTime<Utc>,
    pub user: String,
    pub action: ActivityAction,
    pub category: ActivityCategory,
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ActivityEntry {
    pub fn from_new(id: String, new: NewActivity, timestamp: DateTime<Utc>) -> Self {
        Self {
            id,
            timestamp,
            user: new.user,
            action: new.action,
            category: new.category,
            target: new.target,
            details: new.details,
        }
    }
}

/// Validated activity, before the store assigns id and timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct NewActivity {
    pub user: String,
    pub action: ActivityAction,
    pub category: ActivityCategory,
    pub target: String,
    pub details: Option<String>,
}

impl NewActivity {
    pub fn new(
        user: impl Into<String>,
        action: ActivityAction,
        category: ActivityCategory,
        target: impl Into<String>,
        details: impl Into<String>,
    ) -> Self {
        Self {
            user: user.into(),
            action,
            category,
            target: target.into(),
            details: Some(details.into()),
        }
    }
}

/// Wire shape of an activity create request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateActivityInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl CreateActivityInput {
    pub fn validate(self) -> Result<NewActivity, ValidationError> {
        let mut required = RequiredFields::new();
        let user = required.take("user", self.user);
        let action = required.take("action", self.action);
        let category = required.take("category", self.category);
        let target = required.take("target", self.target);
        required.finish()?;

        Ok(NewActivity {
            user,
            action: action.parse()?,
            category: category.parse()?,
            target,
            details: non_blank(self.details),
        })
    }
}

/// Entries for one calendar day, newest first.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DayGroup<'a> {
    pub date: NaiveDate,
    pub entries: &'a [ActivityEntry],
}

/// Lazy iterator over day groups of a timeline.
///
/// Each group borrows a contiguous run of the timeline; nothing is copied
/// until a caller asks for it.
#[derive(Debug, Clone)]
pub struct DayGroups<'a> {
    remaining: &'a [ActivityEntry],
    offset: FixedOffset,
}

impl<'a> DayGroups<'a> {
    fn day_of(&self, entry: &ActivityEntry) -> NaiveDate {
        entry.timestamp.with_timezone(&self.offset).date_naive()
    }
}

impl<'a> Iterator for DayGroups<'a> {
    type Item = DayGroup<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let first = self.remaining.first()?;
        let date = self.day_of(first);
        let len = self
            .remaining
            .iter()
            .take_while(|entry| self.day_of(entry) == date)
            .count();
        let (entries, rest) = self.remaining.split_at(len);
        self.remaining = rest;
        Some(DayGroup { date, entries })
    }
}

/// Activity entries held in display order (timestamp descending).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActivityTimeline {
    entries: Vec<ActivityEntry>,
}

impl ActivityTimeline {
    /// Sorts newest first. Entries with equal timestamps keep their input order.
    pub fn new(mut entries: Vec<ActivityEntry>) -> Self {
        entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Self { entries }
    }

    pub fn entries(&self) -> &[ActivityEntry] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<ActivityEntry> {
        self.entries
    }

    /// Groups by UTC calendar date. Every call starts a fresh pass.
    pub fn grouped_by_day(&self) -> DayGroups<'_> {
        self.grouped_by_day_in(Utc.fix())
    }

    /// Groups by calendar date as seen from `offset`.
    pub fn grouped_by_day_in(&self, offset: FixedOffset) -> DayGroups<'_> {
        DayGroups {
            remaining: &self.entries,
            offset,
        }
    }
}

/// Owned form of a [`DayGroup`] for serialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityDay {
    pub date: NaiveDate,
    pub entries: Vec<ActivityEntry>,
}

impl From<DayGroup<'_>> for ActivityDay {
    fn from(group: DayGroup<'_>) -> Self {
        Self {
            date: group.date,
            entries: group.entries.to_vec(),
        }
    }
}

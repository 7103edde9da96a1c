use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::derived::total_daily;
use crate::validation::{non_blank, parse_date, RequiredFields, ValidationError};

/// One measurement of morning and evening yield for a named cow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MilkRecord {
    pub id: String,
    /// Free text, matched against cattle names case-insensitively.
    pub cow_name: String,
    pub date: NaiveDate,
    pub morning_amount: f64,
    pub evening_amount: f64,
    /// Always `morning_amount + evening_amount`.
    pub total_daily: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub added_by: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl MilkRecord {
    pub fn from_new(id: String, new: NewMilkRecord, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            cow_name: new.cow_name,
            date: new.date,
            morning_amount: new.morning_amount,
            evening_amount: new.evening_amount,
            total_daily: total_daily(new.morning_amount, new.evening_amount),
            added_by: new.added_by,
            created_at,
        }
    }

    /// Trimmed, case-insensitive name equality. Renaming a cow orphans its
    /// history.
    pub fn is_for_cow(&self, name: &str) -> bool {
        self.cow_name.trim().to_lowercase() == name.trim().to_lowercase()
    }
}

/// Validated create input.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMilkRecord {
    pub cow_name: String,
    pub date: NaiveDate,
    pub morning_amount: f64,
    pub evening_amount: f64,
    pub added_by: Option<String>,
}

/// Wire shape of a milk record create request.
///
/// Amounts are permissive: absent, null or non-numeric values become 0.
/// There is no `totalDaily` slot, so a caller-supplied total is discarded.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMilkRecordInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cow_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, deserialize_with = "lenient_amount")]
    pub morning_amount: f64,
    #[serde(default, deserialize_with = "lenient_amount")]
    pub evening_amount: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub added_by: Option<String>,
}

/// Coerce a JSON value to an amount, falling back to 0.
pub fn coerce_amount(value: &Value) -> f64 {
    let amount = match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.trim().parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    };
    if amount.is_finite() {
        amount
    } else {
        0.0
    }
}

fn lenient_amount<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(coerce_amount(&value))
}

impl CreateMilkRecordInput {
    pub fn validate(self) -> Result<NewMilkRecord, ValidationError> {
        let mut required = RequiredFields::new();
        let cow_name = required.take("cowName", self.cow_name);
        let date = required.take("date", self.date);
        required.finish()?;

        if self.morning_amount < 0.0 {
            return Err(ValidationError::NegativeAmount("morningAmount"));
        }
        if self.evening_amount < 0.0 {
            return Err(ValidationError::NegativeAmount("eveningAmount"));
        }

        Ok(NewMilkRecord {
            cow_name,
            date: parse_date("date", &date)?,
            morning_amount: self.morning_amount,
            evening_amount: self.evening_amount,
            added_by: non_blank(self.added_by),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CowYield {
    pub name: String,
    pub amount: f64,
}

/// All records for one calendar date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyProduction {
    pub date: NaiveDate,
    pub cows: Vec<CowYield>,
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MilkSummary {
    /// Newest date first.
    pub days: Vec<DailyProduction>,
    pub record_count: usize,
    pub total_production: f64,
    pub average_per_record: f64,
}

/// Daily production summaries plus overall totals.
pub fn summarize(records: &[MilkRecord]) -> MilkSummary {
    let mut by_date: BTreeMap<NaiveDate, DailyProduction> = BTreeMap::new();
    for record in records {
        let day = by_date.entry(record.date).or_insert_with(|| DailyProduction {
            date: record.date,
            cows: Vec::new(),
            total: 0.0,
        });
        day.cows.push(CowYield {
            name: record.cow_name.clone(),
            amount: record.total_daily,
        });
        day.total += record.total_daily;
    }

    let total_production: f64 = records.iter().map(|r| r.total_daily).sum();
    let average_per_record = if records.is_empty() {
        0.0
    } else {
        total_production / records.len() as f64
    };

    MilkSummary {
        days: by_date.into_values().rev().collect(),
        record_count: records.len(),
        total_production,
        average_per_record,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, cow: &str, date: &str, m: f64, e: f64) -> MilkRecord {
        let new = CreateMilkRecordInput {
            cow_name: Some(cow.to_string()),
            date: Some(date.to_string()),
            morning_amount: m,
            evening_amount: e,
            added_by: None,
        }
        .validate()
        .unwrap();
        MilkRecord::from_new(id.to_string(), new, Utc::now())
    }

    #[test]
    fn test_lenient_amounts() {
        let input: CreateMilkRecordInput = serde_json::from_str(
            r#"{"cowName":"Bessie","date":"2024-05-01","morningAmount":"3.5","eveningAmount":"lots","totalDaily":99}"#,
        )
        .unwrap();
        assert_eq!(input.morning_amount, 3.5);
        assert_eq!(input.evening_amount, 0.0);

        let input: CreateMilkRecordInput =
            serde_json::from_str(r#"{"cowName":"Bessie","date":"2024-05-01","eveningAmount":null}"#).unwrap();
        assert_eq!(input.morning_amount, 0.0);
        assert_eq!(input.evening_amount, 0.0);
    }

    #[test]
    fn test_total_is_recomputed() {
        let r = record("m1", "Bessie", "2024-05-01", 3.5, 4.0);
        assert_eq!(r.total_daily, 7.5);
    }

    #[test]
    fn test_missing_required_fields() {
        let err = CreateMilkRecordInput::default().validate().unwrap_err();
        assert_eq!(err, ValidationError::MissingFields(vec!["cowName", "date"]));
    }

    #[test]
    fn test_negative_amount_rejected() {
        let input = CreateMilkRecordInput {
            cow_name: Some("Bessie".to_string()),
            date: Some("2024-05-01".to_string()),
            morning_amount: -1.0,
            ..Default::default()
        };
        assert_eq!(
            input.validate().unwrap_err(),
            ValidationError::NegativeAmount("morningAmount")
        );
    }

    #[test]
    fn test_cow_name_matching() {
        let r = record("m1", "  Bessie ", "2024-05-01", 1.0, 1.0);
        assert!(r.is_for_cow("bessie"));
        assert!(r.is_for_cow("BESSIE  "));
        assert!(!r.is_for_cow("Bess"));
    }

    #[test]
    fn test_summarize() {
        let records = vec![
            record("m1", "Bessie", "2024-05-01", 3.5, 4.0),
            record("m2", "Daisy", "2024-05-01", 2.0, 2.5),
            record("m3", "Bessie", "2024-04-30", 3.0, 3.0),
        ];
        let summary = summarize(&records);

        assert_eq!(summary.record_count, 3);
        assert_eq!(summary.total_production, 18.0);
        assert_eq!(summary.average_per_record, 6.0);
        assert_eq!(summary.days.len(), 2);
        assert_eq!(summary.days[0].date, NaiveDate::from_ymd_opt(2024, 5, 1).unwrap());
        assert_eq!(summary.days[0].total, 12.0);
        assert_eq!(summary.days[0].cows.len(), 2);
        assert_eq!(summary.days[1].total, 6.0);
    }

    #[test]
    fn test_summarize_empty() {
        let summary = summarize(&[]);
        assert_eq!(summary.record_count, 0);
        assert_eq!(summary.average_per_record, 0.0);
        assert!(summary.days.is_empty());
    }
}

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::validation::{non_blank, parse_date, parse_optional_date, RequiredFields, ValidationError};

/// Sex of an animal or of a calf.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sex {
    Male,
    Female,
}

impl Sex {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sex::Male => "male",
            Sex::Female => "female",
        }
    }

    /// Parse a wire value, naming `field` in the error.
    pub fn parse_field(field: &'static str, value: &str) -> Result<Self, ValidationError> {
        value.parse().map_err(|_| ValidationError::InvalidSex {
            field,
            value: value.to_string(),
        })
    }
}

impl FromStr for Sex {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "male" => Ok(Sex::Male),
            "female" => Ok(Sex::Female),
            _ => Err(()),
        }
    }
}

impl fmt::Display for Sex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Breeding-cycle data, meaningful only for female cattle.
///
/// Every field is independently settable; no ordering between the dates is
/// enforced.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BreedingInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub served_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mating_breed: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_calf_birth_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calf_birth_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calf_sex: Option<Sex>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dried_date: Option<NaiveDate>,
}

impl BreedingInfo {
    pub fn is_empty(&self) -> bool {
        self == &BreedingInfo::default()
    }
}

/// Who created and last edited a record.
///
/// The store does not always hand these back, which is why clients keep a
/// side cache of them (see the client crate's reconciliation).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CattleAudit {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_edited_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_edited_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_edited_field: Option<String>,
}

/// A tracked animal profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cattle {
    /// Generated on create, stable for the record's lifetime.
    pub id: String,
    pub name: String,
    pub breed: String,
    pub date_of_birth: NaiveDate,
    pub sex: Sex,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(flatten)]
    pub breeding: BreedingInfo,
    /// Set once on create; updates never touch it.
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub audit: CattleAudit,
}

impl Cattle {
    pub fn from_new(id: String, new: NewCattle, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            name: new.name,
            breed: new.breed,
            date_of_birth: new.date_of_birth,
            sex: new.sex,
            image_url: new.image_url,
            breeding: new.breeding,
            created_at,
            audit: CattleAudit {
                created_by: new.created_by,
                ..CattleAudit::default()
            },
        }
    }

    /// Case-insensitive substring match on name or breed.
    pub fn matches_search(&self, term: &str) -> bool {
        let term = term.trim().to_lowercase();
        term.is_empty()
            || self.name.to_lowercase().contains(&term)
            || self.breed.to_lowercase().contains(&term)
    }
}

/// Validated create input, ready to be stamped with an id and timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct NewCattle {
    pub name: String,
    pub breed: String,
    pub date_of_birth: NaiveDate,
    pub sex: Sex,
    pub image_url: Option<String>,
    pub breeding: BreedingInfo,
    pub created_by: Option<String>,
}

/// Wire shape of a cattle create request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCattleInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub breed: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sex: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub served_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mating_breed: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_calf_birth_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calf_birth_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calf_sex: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dried_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
}

impl CreateCattleInput {
    /// Check required fields and parse typed values.
    pub fn validate(self) -> Result<NewCattle, ValidationError> {
        let mut required = RequiredFields::new();
        let name = required.take("name", self.name);
        let breed = required.take("breed", self.breed);
        let date_of_birth = required.take("dateOfBirth", self.date_of_birth);
        let sex = required.take("sex", self.sex);
        required.finish()?;

        let sex = Sex::parse_field("sex", &sex)?;
        let breeding = BreedingInfo {
            served_date: parse_optional_date("servedDate", self.served_date)?,
            mating_breed: non_blank(self.mating_breed),
            expected_calf_birth_date: parse_optional_date(
                "expectedCalfBirthDate",
                self.expected_calf_birth_date,
            )?,
            calf_birth_date: parse_optional_date("calfBirthDate", self.calf_birth_date)?,
            calf_sex: non_blank(self.calf_sex)
                .map(|v| Sex::parse_field("calfSex", &v))
                .transpose()?,
            dried_date: parse_optional_date("driedDate", self.dried_date)?,
        };
        if sex == Sex::Male && !breeding.is_empty() {
            return Err(ValidationError::BreedingOnMale);
        }

        Ok(NewCattle {
            name,
            breed,
            date_of_birth: parse_date("dateOfBirth", &date_of_birth)?,
            sex,
            image_url: non_blank(self.image_url),
            breeding,
            created_by: non_blank(self.created_by),
        })
    }
}

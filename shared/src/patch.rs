//! Partial updates of a cattle profile.
//!
//! A [`CattlePatch`] has one optional slot per allow-listed field. `None`
//! leaves the stored value alone; `Some("")` clears an optional field. The
//! effective change set is built by walking [`CattleField::ALLOWED`] in its
//! fixed order, so field names never leak into query construction.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cattle::{BreedingInfo, Cattle, Sex};
use crate::validation::{parse_date, DATE_FORMAT, ValidationError};

/// Every field a partial update may touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CattleField {
    Name,
    Breed,
    DateOfBirth,
    Sex,
    ImageUrl,
    ServedDate,
    MatingBreed,
    ExpectedCalfBirthDate,
    CalfBirthDate,
    CalfSex,
    DriedDate,
    LastEditedBy,
    LastEditedAt,
    LastEditedField,
}

impl CattleField {
    pub const ALLOWED: [CattleField; 14] = [
        CattleField::Name,
        CattleField::Breed,
        CattleField::DateOfBirth,
        CattleField::Sex,
        CattleField::ImageUrl,
        CattleField::ServedDate,
        CattleField::MatingBreed,
        CattleField::ExpectedCalfBirthDate,
        CattleField::CalfBirthDate,
        CattleField::CalfSex,
        CattleField::DriedDate,
        CattleField::LastEditedBy,
        CattleField::LastEditedAt,
        CattleField::LastEditedField,
    ];

    pub const BREEDING: [CattleField; 6] = [
        CattleField::ServedDate,
        CattleField::MatingBreed,
        CattleField::ExpectedCalfBirthDate,
        CattleField::CalfBirthDate,
        CattleField::CalfSex,
        CattleField::DriedDate,
    ];

    pub fn wire_name(self) -> &'static str {
        match self {
            CattleField::Name => "name",
            CattleField::Breed => "breed",
            CattleField::DateOfBirth => "dateOfBirth",
            CattleField::Sex => "sex",
            CattleField::ImageUrl => "imageUrl",
            CattleField::ServedDate => "servedDate",
            CattleField::MatingBreed => "matingBreed",
            CattleField::ExpectedCalfBirthDate => "expectedCalfBirthDate",
            CattleField::CalfBirthDate => "calfBirthDate",
            CattleField::CalfSex => "calfSex",
            CattleField::DriedDate => "driedDate",
            CattleField::LastEditedBy => "lastEditedBy",
            CattleField::LastEditedAt => "lastEditedAt",
            CattleField::LastEditedField => "lastEditedField",
        }
    }

    /// Label shown to users in `lastEditedField`.
    pub fn label(self) -> &'static str {
        match self {
            CattleField::Name => "Name",
            CattleField::Breed => "Breed",
            CattleField::DateOfBirth => "Date of Birth",
            CattleField::Sex => "Sex",
            CattleField::ImageUrl => "Photo",
            CattleField::ServedDate => "Served Date",
            CattleField::MatingBreed => "Mating Breed",
            CattleField::ExpectedCalfBirthDate => "Expected Calf Birth",
            CattleField::CalfBirthDate => "Calf Birth Date",
            CattleField::CalfSex => "Calf Sex",
            CattleField::DriedDate => "Dried Date",
            CattleField::LastEditedBy => "Last Edited By",
            CattleField::LastEditedAt => "Last Edited At",
            CattleField::LastEditedField => "Last Edited Field",
        }
    }
}

fn date_text(date: Option<chrono::NaiveDate>) -> Option<String> {
    date.map(|d| d.format(DATE_FORMAT).to_string())
}

impl Cattle {
    /// Current value of `field` in its wire text form.
    pub fn field_text(&self, field: CattleField) -> Option<String> {
        match field {
            CattleField::Name => Some(self.name.clone()),
            CattleField::Breed => Some(self.breed.clone()),
            CattleField::DateOfBirth => date_text(Some(self.date_of_birth)),
            CattleField::Sex => Some(self.sex.as_str().to_string()),
            CattleField::ImageUrl => self.image_url.clone(),
            CattleField::LastEditedBy => self.audit.last_edited_by.clone(),
            CattleField::LastEditedAt => self.audit.last_edited_at.map(|t| t.to_rfc3339()),
            CattleField::LastEditedField => self.audit.last_edited_field.clone(),
            breeding => self.breeding.field_text(breeding),
        }
    }

    fn set_field(&mut self, field: CattleField, raw: &str) -> Result<(), ValidationError> {
        let value = raw.trim();
        let blank = value.is_empty();
        match field {
            CattleField::Name | CattleField::Breed | CattleField::DateOfBirth | CattleField::Sex
                if blank =>
            {
                return Err(ValidationError::EmptyField(field.wire_name()));
            }
            CattleField::Name => self.name = value.to_string(),
            CattleField::Breed => self.breed = value.to_string(),
            CattleField::DateOfBirth => self.date_of_birth = parse_date("dateOfBirth", value)?,
            CattleField::Sex => self.sex = Sex::parse_field("sex", value)?,
            CattleField::ImageUrl => self.image_url = optional_text(value),
            CattleField::LastEditedBy => self.audit.last_edited_by = optional_text(value),
            // Always re-stamped after the merge.
            CattleField::LastEditedAt => {}
            CattleField::LastEditedField => self.audit.last_edited_field = optional_text(value),
            breeding => self.breeding.set_field(breeding, value)?,
        }
        Ok(())
    }
}

fn optional_text(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

fn optional_date(field: CattleField, value: &str) -> Result<Option<chrono::NaiveDate>, ValidationError> {
    if value.is_empty() {
        Ok(None)
    } else {
        parse_date(field.wire_name(), value).map(Some)
    }
}

impl BreedingInfo {
    pub fn field_text(&self, field: CattleField) -> Option<String> {
        match field {
            CattleField::ServedDate => date_text(self.served_date),
            CattleField::MatingBreed => self.mating_breed.clone(),
            CattleField::ExpectedCalfBirthDate => date_text(self.expected_calf_birth_date),
            CattleField::CalfBirthDate => date_text(self.calf_birth_date),
            CattleField::CalfSex => self.calf_sex.map(|s| s.as_str().to_string()),
            CattleField::DriedDate => date_text(self.dried_date),
            _ => None,
        }
    }

    fn set_field(&mut self, field: CattleField, value: &str) -> Result<(), ValidationError> {
        match field {
            CattleField::ServedDate => self.served_date = optional_date(field, value)?,
            CattleField::MatingBreed => self.mating_breed = optional_text(value),
            CattleField::ExpectedCalfBirthDate => {
                self.expected_calf_birth_date = optional_date(field, value)?
            }
            CattleField::CalfBirthDate => self.calf_birth_date = optional_date(field, value)?,
            CattleField::CalfSex => {
                self.calf_sex = if value.is_empty() {
                    None
                } else {
                    Some(Sex::parse_field("calfSex", value)?)
                }
            }
            CattleField::DriedDate => self.dried_date = optional_date(field, value)?,
            _ => {}
        }
        Ok(())
    }
}

/// Sparse update of a cattle profile. Unknown keys in the request body are
/// dropped by deserialization, which is what enforces the allow-list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CattlePatch {
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
    pub last_edited_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_edited_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_edited_field: Option<String>,
}

impl CattlePatch {
    pub fn slot(&self, field: CattleField) -> Option<&str> {
        let slot = match field {
            CattleField::Name => &self.name,
            CattleField::Breed => &self.breed,
            CattleField::DateOfBirth => &self.date_of_birth,
            CattleField::Sex => &self.sex,
            CattleField::ImageUrl => &self.image_url,
            CattleField::ServedDate => &self.served_date,
            CattleField::MatingBreed => &self.mating_breed,
            CattleField::ExpectedCalfBirthDate => &self.expected_calf_birth_date,
            CattleField::CalfBirthDate => &self.calf_birth_date,
            CattleField::CalfSex => &self.calf_sex,
            CattleField::DriedDate => &self.dried_date,
            CattleField::LastEditedBy => &self.last_edited_by,
            CattleField::LastEditedAt => &self.last_edited_at,
            CattleField::LastEditedField => &self.last_edited_field,
        };
        slot.as_deref()
    }

    pub fn set_slot(&mut self, field: CattleField, value: impl Into<String>) {
        let value = Some(value.into());
        match field {
            CattleField::Name => self.name = value,
            CattleField::Breed => self.breed = value,
            CattleField::DateOfBirth => self.date_of_birth = value,
            CattleField::Sex => self.sex = value,
            CattleField::ImageUrl => self.image_url = value,
            CattleField::ServedDate => self.served_date = value,
            CattleField::MatingBreed => self.mating_breed = value,
            CattleField::ExpectedCalfBirthDate => self.expected_calf_birth_date = value,
            CattleField::CalfBirthDate => self.calf_birth_date = value,
            CattleField::CalfSex => self.calf_sex = value,
            CattleField::DriedDate => self.dried_date = value,
            CattleField::LastEditedBy => self.last_edited_by = value,
            CattleField::LastEditedAt => self.last_edited_at = value,
            CattleField::LastEditedField => self.last_edited_field = value,
        }
    }

    /// Present slots, in allow-list order.
    pub fn changes(&self) -> Vec<(CattleField, &str)> {
        CattleField::ALLOWED
            .iter()
            .filter_map(|&field| self.slot(field).map(|value| (field, value)))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.changes().is_empty()
    }

    /// Labels of the content fields this patch touches, audit slots excluded.
    pub fn content_labels(&self) -> Vec<&'static str> {
        self.changes()
            .into_iter()
            .map(|(field, _)| field)
            .filter(|field| {
                !matches!(
                    field,
                    CattleField::LastEditedBy | CattleField::LastEditedAt | CattleField::LastEditedField
                )
            })
            .map(CattleField::label)
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PatchError {
    #[error("No fields to update")]
    NoOp,
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Merge `patch` into `current`, stamping `lastEditedAt` with `now`.
///
/// `id` and `createdAt` are never touched. The caller-supplied
/// `lastEditedAt` counts toward the change set but its value is discarded.
pub fn apply_patch(
    current: &Cattle,
    patch: &CattlePatch,
    now: DateTime<Utc>,
) -> Result<Cattle, PatchError> {
    let changes = patch.changes();
    if changes.is_empty() {
        return Err(PatchError::NoOp);
    }

    let mut updated = current.clone();
    for (field, value) in changes {
        updated.set_field(field, value)?;
    }
    if updated.sex == Sex::Male && !updated.breeding.is_empty() {
        return Err(ValidationError::BreedingOnMale.into());
    }
    updated.audit.last_edited_at = Some(now);
    Ok(updated)
}

/// `lastEditedField` text for a breeding-info edit.
///
/// Differing breeding fields are compared one by one against the prior
/// record; a photo change is listed first. Falls back to "Breeding Info"
/// when nothing detectably changed.
pub fn breeding_edit_label(prior: &Cattle, edited: &BreedingInfo, photo_changed: bool) -> String {
    let mut labels = Vec::new();
    if photo_changed {
        labels.push(CattleField::ImageUrl.label());
    }
    labels.extend(
        CattleField::BREEDING
            .iter()
            .filter(|&&field| prior.breeding.field_text(field) != edited.field_text(field))
            .map(|field| field.label()),
    );
    if labels.is_empty() {
        "Breeding Info".to_string()
    } else {
        labels.join(", ")
    }
}

/// Patch that turns `prior`'s breeding info into `edited`, clearing removed
/// values with empty strings.
pub fn breeding_patch(prior: &Cattle, edited: &BreedingInfo) -> CattlePatch {
    let mut patch = CattlePatch::default();
    for field in CattleField::BREEDING {
        let next = edited.field_text(field);
        if prior.breeding.field_text(field) != next {
            patch.set_slot(field, next.unwrap_or_default());
        }
    }
    patch
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cattle::CreateCattleInput;
    use chrono::{NaiveDate, TimeZone};

    fn cow() -> Cattle {
        let new = CreateCattleInput {
            name: Some("Bessie".to_string()),
            breed: Some("Jersey".to_string()),
            date_of_birth: Some("2020-01-01".to_string()),
            sex: Some("female".to_string()),
            mating_breed: Some("Angus".to_string()),
            created_by: Some("Lazarus".to_string()),
            ..Default::default()
        }
        .validate()
        .unwrap();
        Cattle::from_new("c1".to_string(), new, Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap())
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_empty_patch_is_noop() {
        assert_eq!(apply_patch(&cow(), &CattlePatch::default(), now()), Err(PatchError::NoOp));
    }

    #[test]
    fn test_name_only_patch_touches_name_and_timestamp() {
        let before = cow();
        let patch = CattlePatch {
            name: Some("X".to_string()),
            ..Default::default()
        };
        let after = apply_patch(&before, &patch, now()).unwrap();

        let mut expected = before.clone();
        expected.name = "X".to_string();
        expected.audit.last_edited_at = Some(now());
        assert_eq!(after, expected);
    }

    #[test]
    fn test_caller_timestamp_is_overridden() {
        let patch = CattlePatch {
            last_edited_at: Some("1999-01-01T00:00:00Z".to_string()),
            ..Default::default()
        };
        let after = apply_patch(&cow(), &patch, now()).unwrap();
        assert_eq!(after.audit.last_edited_at, Some(now()));
    }

    #[test]
    fn test_empty_string_clears_optional_field() {
        let patch = CattlePatch {
            mating_breed: Some(String::new()),
            ..Default::default()
        };
        let after = apply_patch(&cow(), &patch, now()).unwrap();
        assert_eq!(after.breeding.mating_breed, None);
    }

    #[test]
    fn test_empty_string_rejected_for_required_field() {
        let patch = CattlePatch {
            breed: Some(" ".to_string()),
            ..Default::default()
        };
        assert_eq!(
            apply_patch(&cow(), &patch, now()),
            Err(PatchError::Validation(ValidationError::EmptyField("breed")))
        );
    }

    #[test]
    fn test_created_fields_survive_patch() {
        let before = cow();
        let patch = CattlePatch {
            served_date: Some("2024-03-01".to_string()),
            last_edited_by: Some("Farmer2".to_string()),
            ..Default::default()
        };
        let after = apply_patch(&before, &patch, now()).unwrap();
        assert_eq!(after.id, before.id);
        assert_eq!(after.created_at, before.created_at);
        assert_eq!(after.audit.created_by.as_deref(), Some("Lazarus"));
        assert_eq!(after.audit.last_edited_by.as_deref(), Some("Farmer2"));
        assert_eq!(after.breeding.served_date, NaiveDate::from_ymd_opt(2024, 3, 1));
    }

    #[test]
    fn test_switching_to_male_with_breeding_rejected() {
        let patch = CattlePatch {
            sex: Some("male".to_string()),
            ..Default::default()
        };
        assert_eq!(
            apply_patch(&cow(), &patch, now()),
            Err(PatchError::Validation(ValidationError::BreedingOnMale))
        );
    }

    #[test]
    fn test_changes_follow_allow_list_order() {
        let patch = CattlePatch {
            dried_date: Some("2024-04-01".to_string()),
            name: Some("Daisy".to_string()),
            last_edited_field: Some("Name".to_string()),
            ..Default::default()
        };
        let fields: Vec<_> = patch.changes().into_iter().map(|(f, _)| f).collect();
        assert_eq!(
            fields,
            vec![CattleField::Name, CattleField::DriedDate, CattleField::LastEditedField]
        );
        assert_eq!(patch.content_labels(), vec!["Name", "Dried Date"]);
    }

    #[test]
    fn test_patch_deserialization_drops_unknown_keys() {
        let patch: CattlePatch =
            serde_json::from_str(r#"{"id":"other","createdAt":"2000-01-01","breed":"Holstein"}"#)
                .unwrap();
        assert_eq!(patch.changes(), vec![(CattleField::Breed, "Holstein")]);
    }

    #[test]
    fn test_breeding_edit_label() {
        let prior = cow();
        let mut edited = prior.breeding.clone();
        assert_eq!(breeding_edit_label(&prior, &edited, false), "Breeding Info");
        assert_eq!(breeding_edit_label(&prior, &edited, true), "Photo");

        edited.served_date = NaiveDate::from_ymd_opt(2024, 2, 2);
        edited.mating_breed = None;
        assert_eq!(
            breeding_edit_label(&prior, &edited, true),
            "Photo, Served Date, Mating Breed"
        );
    }

    #[test]
    fn test_breeding_patch_clears_and_sets() {
        let prior = cow();
        let edited = BreedingInfo {
            calf_sex: Some(Sex::Male),
            ..Default::default()
        };
        let patch = breeding_patch(&prior, &edited);
        assert_eq!(patch.mating_breed.as_deref(), Some(""));
        assert_eq!(patch.calf_sex.as_deref(), Some("male"));
        assert_eq!(patch.served_date, None);

        let after = apply_patch(&prior, &patch, now()).unwrap();
        assert_eq!(after.breeding, edited);
    }
}

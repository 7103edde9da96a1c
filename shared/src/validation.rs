//! Field-level validation shared by every record type.
//!
//! Create inputs arrive as loosely typed wire structs (`Option<String>` for
//! almost everything) so that a bad value produces a [`ValidationError`]
//! with a readable message instead of a deserializer rejection.

use chrono::NaiveDate;

/// Date format used for every calendar date on the wire and in storage.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Caller error: missing or invalid input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),
    #[error("{0} cannot be empty")]
    EmptyField(&'static str),
    #[error("Invalid {field}: expected 'male' or 'female', got '{value}'")]
    InvalidSex { field: &'static str, value: String },
    #[error("Invalid {field}: '{value}' is not a YYYY-MM-DD date")]
    InvalidDate { field: &'static str, value: String },
    #[error("Invalid action '{0}': expected add, edit or delete")]
    InvalidAction(String),
    #[error("Invalid category '{0}': expected cattle or milk")]
    InvalidCategory(String),
    #[error("{0} cannot be negative")]
    NegativeAmount(&'static str),
    #[error("Breeding information is only valid for female cattle")]
    BreedingOnMale,
    #[error("Invalid filename")]
    InvalidFilename,
    #[error("Invalid file type '{0}'. Allowed types: image/jpeg, image/png, image/gif, image/webp")]
    UnsupportedImageType(String),
    #[error("File exceeds the maximum size of {0} bytes")]
    FileTooLarge(usize),
    #[error("No file uploaded")]
    MissingFile,
    #[error("Invalid timezone offset: {0} minutes")]
    InvalidOffset(i32),
    #[error("Invalid request body: {0}")]
    InvalidBody(String),
}

/// Trim a wire value; blank strings count as absent.
pub fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Collects the names of required fields that are absent or blank.
#[derive(Debug, Default)]
pub struct RequiredFields {
    missing: Vec<&'static str>,
}

impl RequiredFields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the trimmed value, recording `field` as missing when blank.
    pub fn take(&mut self, field: &'static str, value: Option<String>) -> String {
        match non_blank(value) {
            Some(v) => v,
            None => {
                self.missing.push(field);
                String::new()
            }
        }
    }

    pub fn finish(self) -> Result<(), ValidationError> {
        if self.missing.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::MissingFields(self.missing))
        }
    }
}

pub fn parse_date(field: &'static str, value: &str) -> Result<NaiveDate, ValidationError> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).map_err(|_| ValidationError::InvalidDate {
        field,
        value: value.to_string(),
    })
}

/// Parse an optional date; blank means "not set".
pub fn parse_optional_date(
    field: &'static str,
    value: Option<String>,
) -> Result<Option<NaiveDate>, ValidationError> {
    non_blank(value).map(|v| parse_date(field, &v)).transpose()
}

/// Rejects filenames that could escape the managed upload directory.
pub fn validate_filename(filename: &str) -> Result<(), ValidationError> {
    if filename.is_empty()
        || filename.contains("..")
        || filename.contains('/')
        || filename.contains('\\')
    {
        return Err(ValidationError::InvalidFilename);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_fields_lists_every_missing_name() {
        let mut required = RequiredFields::new();
        let name = required.take("name", Some("  Bessie ".to_string()));
        required.take("breed", None);
        required.take("sex", Some("   ".to_string()));

        assert_eq!(name, "Bessie");
        let err = required.finish().unwrap_err();
        assert_eq!(err, ValidationError::MissingFields(vec!["breed", "sex"]));
        assert_eq!(err.to_string(), "Missing required fields: breed, sex");
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(
            parse_date("dateOfBirth", "2020-01-01").unwrap(),
            NaiveDate::from_ymd_opt(2020, 1, 1).unwrap()
        );
        assert!(parse_date("dateOfBirth", "2020-02-30").is_err());
        assert!(parse_date("dateOfBirth", "01/01/2020").is_err());
        assert_eq!(parse_optional_date("driedDate", Some(String::new())).unwrap(), None);
    }

    #[test]
    fn test_validate_filename() {
        assert!(validate_filename("3f2a.jpg").is_ok());
        assert!(validate_filename("../etc/passwd").is_err());
        assert!(validate_filename("a/b.png").is_err());
        assert!(validate_filename("a\\b.png").is_err());
        assert!(validate_filename("").is_err());
    }
}

//! Input validation for CRM records and query parameters.

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime};

/// Validation error types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A date parameter that could not be parsed.
    InvalidDate { field: String, value: String },
    /// Empty value where one is required.
    Empty(String),
    /// Value too long.
    TooLong { field: String, max: usize, actual: usize },
    /// Numeric value outside its allowed range.
    OutOfRange { field: String, value: String },
    /// Value not in the set of accepted values.
    InvalidValue { field: String, value: String },
}

impl ValidationError {
    /// Machine-readable error code returned to API callers.
    pub fn code(&self) -> &'static str {
        match self {
            ValidationError::InvalidDate { .. } => "INVALID_DATE_FORMAT",
            _ => "VALIDATION_ERROR",
        }
    }

    /// Name of the offending field.
    pub fn field(&self) -> &str {
        match self {
            ValidationError::InvalidDate { field, .. }
            | ValidationError::Empty(field)
            | ValidationError::TooLong { field, .. }
            | ValidationError::OutOfRange { field, .. }
            | ValidationError::InvalidValue { field, .. } => field,
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::InvalidDate { field, value } => {
                write!(f, "Invalid date format for {}: '{}' (expected YYYY-MM-DD)", field, value)
            }
            ValidationError::Empty(field) => write!(f, "{} cannot be empty", field),
            ValidationError::TooLong { field, max, actual } => {
                write!(f, "{} is too long ({} chars, max {})", field, actual, max)
            }
            ValidationError::OutOfRange { field, value } => {
                write!(f, "{} is out of range: {}", field, value)
            }
            ValidationError::InvalidValue { field, value } => {
                write!(f, "Invalid value for {}: '{}'", field, value)
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// Maximum allowed length for names and other short text fields.
pub const MAX_NAME_LENGTH: usize = 64;

/// Maximum allowed length for free-form notes.
pub const MAX_NOTES_LENGTH: usize = 2000;

/// Validate that a required text field is present and not too long.
pub fn validate_required(field: &str, value: &str, max: usize) -> Result<(), ValidationError> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Empty(field.to_string()));
    }

    validate_length(field, value, max)
}

/// Validate the length of a text field, counted in characters.
pub fn validate_length(field: &str, value: &str, max: usize) -> Result<(), ValidationError> {
    let actual = value.chars().count();
    if actual > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
            actual,
        });
    }
    Ok(())
}

/// Parse a date parameter.
///
/// Accepts `YYYY-MM-DD`, `YYYY/MM/DD`, `YYYY-MM-DD HH:MM:SS` and RFC 3339
/// timestamps. Only the calendar date is kept.
pub fn parse_date(field: &str, raw: &str) -> Result<NaiveDate, ValidationError> {
    let value = raw.trim();

    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Ok(date);
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y/%m/%d") {
        return Ok(date);
    }
    if let Ok(datetime) = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S") {
        return Ok(datetime.date());
    }
    if let Ok(datetime) = DateTime::parse_from_rfc3339(value) {
        return Ok(datetime.date_naive());
    }

    Err(ValidationError::InvalidDate {
        field: field.to_string(),
        value: raw.to_string(),
    })
}

/// Parse a date-time field into `YYYY-MM-DD HH:MM:SS`.
///
/// Accepts `YYYY-MM-DD HH:MM[:SS]`, `YYYY-MM-DDTHH:MM[:SS]` and RFC 3339
/// (converted to UTC).
pub fn parse_datetime(field: &str, raw: &str) -> Result<NaiveDateTime, ValidationError> {
    let value = raw.trim();

    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(datetime) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(datetime);
        }
    }
    if let Ok(datetime) = DateTime::parse_from_rfc3339(value) {
        return Ok(datetime.naive_utc());
    }

    Err(ValidationError::InvalidValue {
        field: field.to_string(),
        value: raw.to_string(),
    })
}

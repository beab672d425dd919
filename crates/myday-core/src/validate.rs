use crate::error::{ValidationError, ValidationErrorKind};

pub const DEFAULT_MIN_TITLE_LENGTH: usize = 3;

pub fn validate_new_task_title(raw: &str) -> Result<String, ValidationError> {
    validate_title_with_min(raw, DEFAULT_MIN_TITLE_LENGTH)
}

/// Length is counted in characters of the trimmed title.
pub fn validate_title_with_min(raw: &str, min_length: usize) -> Result<String, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ValidationError {
            kind: ValidationErrorKind::Required,
            min_length,
        });
    }

    if trimmed.chars().count() < min_length {
        return Err(ValidationError {
            kind: ValidationErrorKind::TooShort,
            min_length,
        });
    }

    Ok(trimmed.to_string())
}

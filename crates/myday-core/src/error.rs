use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationErrorKind {
    Required,
    TooShort,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{}", describe(.kind, .min_length))]
pub struct ValidationError {
    pub kind: ValidationErrorKind,
    pub min_length: usize,
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("task title cannot be empty")]
pub struct EmptyTitleError;

#[derive(Error, Debug)]
pub enum HydrateError {
    #[error("failed to read stored tasks under `{key}`")]
    Load {
        key: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },

    #[error("stored tasks under `{key}` are malformed")]
    Malformed {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

fn describe(kind: &ValidationErrorKind, min_length: &usize) -> String {
    match kind {
        ValidationErrorKind::Required => "task title is required".to_string(),
        ValidationErrorKind::TooShort => {
            format!("task title must be at least {min_length} characters")
        }
    }
}

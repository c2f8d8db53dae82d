use std::fmt;

/// A single failed client-side check, keyed by the form field it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

/// Every client-side check that failed for one form submission.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    errors: Vec<FieldError>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: &'static str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.errors.push(FieldError {
            field,
            message: message.into(),
        });
    }

    /// Records the outcome of a validator returning `Result<T, String>`,
    /// yielding the parsed value when it passed.
    pub fn check<T>(&mut self, field: &'static str, result: Result<T, String>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(message) => {
                self.add(field, message);
                None
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn has(&self, field: &str) -> bool {
        self.errors.iter().any(|e| e.field == field)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.errors.iter()
    }

    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for error in &self.errors {
            if !first {
                write!(f, "; ")?;
            }
            write!(f, "{}: {}", error.field, error.message)?;
            first = false;
        }
        Ok(())
    }
}

/// Errors surfaced to the operator. None of them is fatal: every call site
/// converts them into a notification and keeps the previous state.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum AdminError {
    #[error("validation failed: {0}")]
    Validation(ValidationErrors),
    #[error("network error: {0}")]
    Network(String),
    /// The backend answered `success: false` (or a non-2xx status); the
    /// message is shown verbatim.
    #[error("{message}")]
    Server { status: u16, message: String },
    #[error("not signed in or session expired, please log in again")]
    Unauthenticated,
    #[error("unable to decode response: {0}")]
    Decode(String),
    #[error("io error: {0}")]
    Io(String),
    #[error("csv error: {0}")]
    Csv(String),
    #[error("interrupted")]
    Interrupted,
}

impl AdminError {
    pub fn is_auth(&self) -> bool {
        matches!(self, AdminError::Unauthenticated)
    }

    /// Whether resubmitting the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AdminError::Network(_) | AdminError::Server { .. })
    }
}

impl From<ValidationErrors> for AdminError {
    fn from(errors: ValidationErrors) -> Self {
        AdminError::Validation(errors)
    }
}

impl From<std::io::Error> for AdminError {
    fn from(err: std::io::Error) -> Self {
        AdminError::Io(err.to_string())
    }
}

impl From<csv::Error> for AdminError {
    fn from(err: csv::Error) -> Self {
        AdminError::Csv(err.to_string())
    }
}

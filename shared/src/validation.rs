//! Per-field validation results for the entry forms.
//!
//! Forms never send a request while their [`ValidationResult`] is invalid;
//! each error names the field it belongs to so the UI can show it inline.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationErrorKind {
    Required,
    BelowMinimum { min: f64 },
    AboveMaximum { max: f64 },
    InvalidNumber,
    NotInteger,
    /// Wrong length or shape, e.g. a `YYYYMM` period.
    InvalidFormat { expected: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationError {
    pub field: String,
    #[serde(flatten)]
    pub kind: ValidationErrorKind,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, kind: ValidationErrorKind) -> Self {
        Self {
            field: field.into(),
            kind,
        }
    }

    /// Message shown next to the field.
    pub fn message(&self) -> String {
        match &self.kind {
            ValidationErrorKind::Required => "Campo requerido".to_string(),
            ValidationErrorKind::BelowMinimum { min } => {
                format!("Debe ser mayor o igual a {}", min)
            }
            ValidationErrorKind::AboveMaximum { max } => {
                format!("Debe ser menor o igual a {}", max)
            }
            ValidationErrorKind::InvalidNumber => "Debe ser un número".to_string(),
            ValidationErrorKind::NotInteger => "Debe ser un número entero".to_string(),
            ValidationErrorKind::InvalidFormat { expected } => {
                format!("Formato inválido, se espera {}", expected)
            }
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message())
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<ValidationError>,
}

impl Default for ValidationResult {
    fn default() -> Self {
        Self::valid()
    }
}

impl ValidationResult {
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            errors: Vec::new(),
        }
    }

    pub fn push(&mut self, error: ValidationError) {
        self.is_valid = false;
        self.errors.push(error);
    }

    /// Errors for one field, in the order they were found.
    pub fn errors_for<'a>(&'a self, field: &'a str) -> impl Iterator<Item = &'a ValidationError> + 'a {
        self.errors.iter().filter(move |e| e.field == field)
    }

    pub fn has_error(&self, field: &str) -> bool {
        self.errors.iter().any(|e| e.field == field)
    }

    pub fn into_result(self) -> Result<(), Vec<ValidationError>> {
        if self.is_valid {
            Ok(())
        } else {
            Err(self.errors)
        }
    }

    // Builder-style checks used by the form models.

    pub fn require_text(&mut self, field: &str, value: &str) -> &mut Self {
        if value.trim().is_empty() {
            self.push(ValidationError::new(field, ValidationErrorKind::Required));
        }
        self
    }

    pub fn require_some<T>(&mut self, field: &str, value: &Option<T>) -> &mut Self {
        if value.is_none() {
            self.push(ValidationError::new(field, ValidationErrorKind::Required));
        }
        self
    }

    pub fn min(&mut self, field: &str, value: f64, min: f64) -> &mut Self {
        if !value.is_finite() {
            self.push(ValidationError::new(field, ValidationErrorKind::InvalidNumber));
        } else if value < min {
            self.push(ValidationError::new(field, ValidationErrorKind::BelowMinimum { min }));
        }
        self
    }

    pub fn max(&mut self, field: &str, value: f64, max: f64) -> &mut Self {
        if value.is_finite() && value > max {
            self.push(ValidationError::new(field, ValidationErrorKind::AboveMaximum { max }));
        }
        self
    }

    pub fn integer(&mut self, field: &str, value: f64) -> &mut Self {
        if value.is_finite() && value.fract() != 0.0 {
            self.push(ValidationError::new(field, ValidationErrorKind::NotInteger));
        }
        self
    }

    pub fn digits(&mut self, field: &str, value: &str, len: usize) -> &mut Self {
        if value.len() != len || !value.chars().all(|c| c.is_ascii_digit()) {
            self.push(ValidationError::new(
                field,
                ValidationErrorKind::InvalidFormat {
                    expected: format!("{} dígitos", len),
                },
            ));
        }
        self
    }
}

//! Validation error types
//!
//! Structured validation errors with field-level details. Field errors are
//! keyed by field name in sorted order so the first message is stable.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Validation error with field-level details
#[derive(Debug, Error, Clone, PartialEq, Serialize, Deserialize)]
#[error("Validation failed: {message}")]
pub struct ValidationError {
    /// High-level validation message
    pub message: String,

    /// Field-specific errors
    pub field_errors: BTreeMap<String, Vec<FieldError>>,
}

impl ValidationError {
    /// Create a new validation error
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            field_errors: BTreeMap::new(),
        }
    }

    /// Add a field error
    pub fn add_field_error(
        mut self,
        field: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        self.field_errors
            .entry(field.into())
            .or_default()
            .push(FieldError {
                code: code.into(),
                message: message.into(),
            });
        self
    }

    /// Check if validation has any errors
    pub fn has_errors(&self) -> bool {
        !self.field_errors.is_empty()
    }

    /// Get total error count
    pub fn error_count(&self) -> usize {
        self.field_errors.values().map(|v| v.len()).sum()
    }

    /// Whether `field` failed with `code`
    pub fn has_field_code(&self, field: &str, code: &str) -> bool {
        self.field_errors
            .get(field)
            .map(|errors| errors.iter().any(|e| e.code == code))
            .unwrap_or(false)
    }

    /// First field message, if any
    pub fn first_message(&self) -> Option<String> {
        self.field_errors
            .values()
            .flat_map(|errors| errors.iter())
            .next()
            .map(|e| e.message.clone())
    }

    /// Fold another error's field errors into this one
    pub fn merge(mut self, other: ValidationError) -> Self {
        for (field, errors) in other.field_errors {
            self.field_errors.entry(field).or_default().extend(errors);
        }
        self
    }

    /// Convert `validator` derive output into a field-level error
    pub fn from_validator(message: impl Into<String>, errors: &validator::ValidationErrors) -> Self {
        let mut out = Self::new(message);
        for (field, field_errors) in errors.field_errors() {
            for error in field_errors.iter() {
                let text = error
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("{} is invalid", field));
                out = out.add_field_error(field.to_string(), error.code.to_string(), text);
            }
        }
        out
    }
}

/// Individual field validation error
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldError {
    /// Error code (e.g., "required", "too_long", "unsupported")
    pub code: String,

    /// Human-readable error message
    pub message: String,
}

/// Common validation rules
pub mod rules {
    use super::ValidationError;

    /// Validate string length in characters
    pub fn validate_length(
        field: &str,
        value: &str,
        min: Option<usize>,
        max: Option<usize>,
    ) -> Result<(), ValidationError> {
        let len = value.chars().count();

        if let Some(min) = min {
            if len < min {
                return Err(ValidationError::new("Validation failed").add_field_error(
                    field,
                    "too_short",
                    format!("Must be at least {} characters", min),
                ));
            }
        }

        if let Some(max) = max {
            if len > max {
                return Err(ValidationError::new("Validation failed").add_field_error(
                    field,
                    "too_long",
                    format!("Must be at most {} characters", max),
                ));
            }
        }

        Ok(())
    }

    /// Validate required field
    pub fn validate_required(field: &str, value: &str) -> Result<(), ValidationError> {
        if value.trim().is_empty() {
            return Err(ValidationError::new("Validation failed").add_field_error(
                field,
                "required",
                "This field is required",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::rules::*;
    use super::*;
    use validator::Validate;

    #[test]
    fn test_validation_error_builder() {
        let error = ValidationError::new("Upload rejected")
            .add_field_error("title", "required", "Title is required")
            .add_field_error("title", "too_long", "Title is too long")
            .add_field_error("description", "too_long", "Description is too long");

        assert_eq!(error.error_count(), 3);
        assert!(error.has_errors());
        assert_eq!(error.field_errors["title"].len(), 2);
        assert!(error.has_field_code("title", "too_long"));
        assert!(!error.has_field_code("description", "required"));
        // BTreeMap order: "description" sorts before "title"
        assert_eq!(error.first_message().unwrap(), "Description is too long");
    }

    #[test]
    fn test_length_counts_characters_not_bytes() {
        // 5 characters, 10+ bytes
        assert!(validate_length("title", "🎭🎭🎭🎭🎭", None, Some(5)).is_ok());
        assert!(validate_length("title", "🎭🎭🎭🎭🎭🎭", None, Some(5)).is_err());
        assert!(validate_length("name", "Jo", Some(3), Some(10)).is_err());
    }

    #[test]
    fn test_required_rejects_blank() {
        assert!(validate_required("title", "Carnival").is_ok());
        assert!(validate_required("title", "   ").is_err());
        assert!(validate_required("title", "").is_err());
    }

    #[derive(Validate)]
    struct Form {
        #[validate(length(max = 3, message = "Too long"))]
        name: String,
    }

    #[test]
    fn test_from_validator() {
        let form = Form {
            name: "abcd".into(),
        };
        let errors = form.validate().unwrap_err();
        let converted = ValidationError::from_validator("Form rejected", &errors);

        assert!(converted.has_field_code("name", "length"));
        assert_eq!(converted.first_message().unwrap(), "Too long");
    }

    #[test]
    fn test_merge() {
        let a = ValidationError::new("a").add_field_error("title", "required", "x");
        let b = ValidationError::new("b").add_field_error("title", "too_long", "y");
        let merged = a.merge(b);
        assert_eq!(merged.error_count(), 2);
        assert_eq!(merged.message, "a");
    }
}

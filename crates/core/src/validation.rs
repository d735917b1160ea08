//! Input validation utilities
//!
//! Provides centralized validation functions with consistent error messages.

use std::fmt;
use thiserror::Error;

/// A validation error with field information
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub struct ValidationError {
  pub field: String,
  pub message: String,
}

impl fmt::Display for ValidationError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}: {}", self.field, self.message)
  }
}

impl ValidationError {
  /// Create error for missing required field
  pub fn missing(field: impl Into<String>) -> Self {
    let field = field.into();
    Self {
      message: format!("{} is required", field),
      field,
    }
  }
}

/// Result type for validation
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Validate that a required string field is present and non-empty
pub fn require_non_empty(value: &str, field: &str) -> ValidationResult<()> {
  if value.is_empty() {
    return Err(ValidationError::missing(field));
  }
  Ok(())
}

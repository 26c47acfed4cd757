//! Configuration validation
//!
//! Validates Mailbase configuration for correctness:
//! - The address pattern compiles and cannot match a section header
//! - The file extension is a bare extension
//! - The default threshold is at least 1

use super::mailbase_config::MailbaseConfig;
use crate::mail::AddressPattern;
use crate::storage::ListKind;

/// Validation error details
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validation result
pub type ValidationResult = std::result::Result<(), Vec<ValidationError>>;

/// Validate a Mailbase configuration, collecting every problem
pub fn validate_config(config: &MailbaseConfig) -> ValidationResult {
    let mut errors = Vec::new();

    if config.address_pattern.trim().is_empty() {
        errors.push(ValidationError::new(
            "address_pattern",
            "Address pattern cannot be empty",
        ));
    } else {
        match AddressPattern::new(config.address_pattern.as_str()) {
            Ok(pattern) => {
                // Headers must stay distinguishable from entries in list files.
                for kind in ListKind::ALL {
                    if pattern.matches(kind.header()) {
                        errors.push(ValidationError::new(
                            "address_pattern",
                            format!("Pattern matches the section header {}", kind.header()),
                        ));
                    }
                }
                if pattern.matches("") {
                    errors.push(ValidationError::new(
                        "address_pattern",
                        "Pattern matches the empty string",
                    ));
                }
            }
            Err(e) => {
                errors.push(ValidationError::new(
                    "address_pattern",
                    format!("Invalid regular expression: {}", e),
                ));
            }
        }
    }

    let ext = &config.file_extension;
    if ext.is_empty() {
        errors.push(ValidationError::new(
            "file_extension",
            "File extension cannot be empty",
        ));
    } else if ext.contains(['.', '/', '\\']) || ext.chars().any(char::is_whitespace) {
        errors.push(ValidationError::new(
            "file_extension",
            format!("Invalid file extension '{}': use a bare name such as 'mbl'", ext),
        ));
    }

    if config.default_threshold == 0 {
        errors.push(ValidationError::new(
            "default_threshold",
            "Threshold must be at least 1",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validate and convert to a single crate error
pub fn validate_config_result(config: &MailbaseConfig) -> crate::Result<()> {
    validate_config(config).map_err(|errors| {
        let message = errors
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ");
        crate::MailbaseError::Config(message)
    })
}

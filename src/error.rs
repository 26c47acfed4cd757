//! Error types for Mailbase
//!
//! Defines the crate-wide error enum covering configuration, I/O and store failures.
//! Uses thiserror for ergonomic error handling.

use crate::storage::StoreError;
use thiserror::Error;

/// Result type alias for Mailbase operations
pub type Result<T> = std::result::Result<T, MailbaseError>;

/// Comprehensive error type for Mailbase operations
#[derive(Error, Debug)]
pub enum MailbaseError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Address pattern does not compile
    #[error("Invalid address pattern: {0}")]
    Pattern(#[from] regex::Error),

    /// Address store errors (load, save, exclusivity, lookups)
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

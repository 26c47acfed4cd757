//! Configuration system
//!
//! Loads ~/.config/mailbase/config.yaml with support for:
//! - The address pattern used for validation and extraction
//! - Naming of new list files
//! - The list file to reopen by default
//! - The bounce threshold used by `process`

mod mailbase_config;
pub mod validation;

pub use mailbase_config::MailbaseConfig;
pub use validation::{validate_config, validate_config_result, ValidationError};

//! Mailbase configuration file handling
//!
//! Loads and manages the ~/.config/mailbase/config.yaml file.

use crate::mail::{AddressPattern, DEFAULT_ADDRESS_PATTERN};
use crate::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::num::NonZeroU32;
use std::path::{Path, PathBuf};

fn default_address_pattern() -> String {
    DEFAULT_ADDRESS_PATTERN.to_string()
}

fn default_file_extension() -> String {
    "mbl".to_string()
}

fn default_threshold() -> u32 {
    3
}

/// Mailbase configuration
///
/// The address pattern is the single rule the store applies for validation,
/// extraction and normalization. Everything else is CLI convenience.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailbaseConfig {
    /// Regular expression an address must fully match
    #[serde(default = "default_address_pattern")]
    pub address_pattern: String,

    /// Extension given to list files created without one
    #[serde(default = "default_file_extension")]
    pub file_extension: String,

    /// List file used when none is given on the command line
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_file: Option<PathBuf>,

    /// Bounce count that `process` must exceed to retire an address
    #[serde(default = "default_threshold")]
    pub default_threshold: u32,
}

impl MailbaseConfig {
    /// Create a configuration with defaults
    pub fn new() -> Self {
        Self {
            address_pattern: default_address_pattern(),
            file_extension: default_file_extension(),
            last_file: None,
            default_threshold: default_threshold(),
        }
    }

    /// Load configuration from the default path, or defaults if it does not exist
    pub fn load_default_or_new() -> Result<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load(&path)
        } else {
            tracing::debug!(path = %path.display(), "No configuration file, using defaults");
            Ok(Self::new())
        }
    }

    /// Load configuration from a specific path
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(crate::MailbaseError::Config(format!(
                "Config file not found: {}",
                path.display()
            )));
        }

        tracing::info!(path = %path.display(), "Loading Mailbase configuration");

        let content = fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&content)?;

        tracing::debug!(
            pattern = %config.address_pattern,
            threshold = config.default_threshold,
            "Configuration loaded successfully"
        );

        Ok(config)
    }

    /// Save configuration to a specific path
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        tracing::info!(path = %path.display(), "Saving Mailbase configuration");

        let yaml = serde_yaml::to_string(self)?;
        fs::write(path, yaml)?;

        Ok(())
    }

    /// Get the default config directory (~/.config/mailbase)
    pub fn config_dir() -> PathBuf {
        // Always use ~/.config for consistency across platforms (macOS, Linux)
        let mut path = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push(".config");
        path.push("mailbase");
        path
    }

    /// Get the default config path (~/.config/mailbase/config.yaml)
    pub fn default_path() -> PathBuf {
        Self::config_dir().join("config.yaml")
    }

    /// Compile the configured address pattern
    pub fn compile_pattern(&self) -> Result<AddressPattern> {
        Ok(AddressPattern::new(self.address_pattern.as_str())?)
    }

    /// Threshold for `process`, rejecting zero
    pub fn threshold(&self) -> Result<NonZeroU32> {
        NonZeroU32::new(self.default_threshold).ok_or_else(|| {
            crate::MailbaseError::Config("default_threshold must be at least 1".to_string())
        })
    }

    /// Name for a list file created without a path: `untitled.<extension>`
    pub fn default_file_name(&self) -> String {
        format!("untitled.{}", self.file_extension)
    }

    /// Append the configured extension to paths that have none
    pub fn with_extension(&self, path: impl Into<PathBuf>) -> PathBuf {
        let mut path = path.into();
        if path.extension().is_none() {
            path.set_extension(&self.file_extension);
        }
        path
    }

    /// Remember the list file to reopen next time
    pub fn remember_file(&mut self, path: &Path) -> bool {
        let absolute = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        if self.last_file.as_deref() == Some(absolute.as_path()) {
            return false;
        }
        self.last_file = Some(absolute);
        true
    }
}

impl Default for MailbaseConfig {
    fn default() -> Self {
        Self::new()
    }
}

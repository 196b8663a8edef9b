//! heaplens.toml configuration
//!
//! Per-inspection settings that can be checked into a project instead of
//! repeated on every command line. Command-line flags override file values.
//!
//! # Example heaplens.toml
//!
//! ```toml
//! [duplicate_strings]
//! threshold = 25
//!
//! [self_references]
//! threshold = 2
//! ```

use crate::inspection::{DEFAULT_DUPLICATE_THRESHOLD, DEFAULT_SELF_REFERENCE_THRESHOLD};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Settings for one inspection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InspectionSettings {
    /// Minimum count for a finding to be reported; signed so that bad input
    /// is reported as a configuration error instead of a parse error
    pub threshold: i64,
}

/// Root configuration for heaplens.toml
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InspectConfig {
    pub duplicate_strings: InspectionSettings,
    pub self_references: InspectionSettings,
}

impl Default for InspectConfig {
    fn default() -> Self {
        Self {
            duplicate_strings: InspectionSettings {
                threshold: DEFAULT_DUPLICATE_THRESHOLD as i64,
            },
            self_references: InspectionSettings {
                threshold: DEFAULT_SELF_REFERENCE_THRESHOLD as i64,
            },
        }
    }
}

impl InspectConfig {
    /// Load configuration from a TOML file
    ///
    /// # Example
    ///
    /// ```no_run
    /// use heaplens::config::InspectConfig;
    ///
    /// # fn main() -> anyhow::Result<()> {
    /// let config = InspectConfig::from_file("heaplens.toml")?;
    /// println!("duplicate threshold: {}", config.duplicate_strings.threshold);
    /// # Ok(())
    /// # }
    /// ```
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;

        Self::from_toml_str(&content)
    }

    /// Load configuration from a TOML string
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse TOML")
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.duplicate_strings.threshold < 0 {
            return Err(format!(
                "duplicate_strings.threshold must be non-negative, got {}",
                self.duplicate_strings.threshold
            ));
        }

        if self.self_references.threshold < 0 {
            return Err(format!(
                "self_references.threshold must be non-negative, got {}",
                self.self_references.threshold
            ));
        }

        Ok(())
    }
}

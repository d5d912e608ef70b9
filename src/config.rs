//! Configuration for packet generation.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Packet generation configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PacketConfig {
    /// Directory holding the library's PDF files.
    pub library_dir: PathBuf,

    /// JSON file backing the document registry.
    pub registry_path: PathBuf,

    /// Directory where finished packets are written.
    pub output_dir: PathBuf,

    /// Page count at which an automatic run may stop for a document.
    pub soft_limit: usize,

    /// Page count a run should not exceed by committing one chapter.
    pub hard_limit: usize,

    /// Bound on ascend-then-advance attempts when looking for the next chapter.
    pub recovery_attempts: usize,
}

impl Default for PacketConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl PacketConfig {
    /// Create new configuration with defaults.
    pub fn new() -> Self {
        Self {
            library_dir: PathBuf::from("library"),
            registry_path: PathBuf::from("library.json"),
            output_dir: PathBuf::from("."),
            soft_limit: 40,
            hard_limit: 60,
            recovery_attempts: 5,
        }
    }

    /// Load configuration from a JSON file. Missing fields keep their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Set the library directory.
    pub fn with_library_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.library_dir = dir.into();
        self
    }

    /// Set the registry file.
    pub fn with_registry_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.registry_path = path.into();
        self
    }

    /// Set the output directory.
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// Set both page limits.
    pub fn with_limits(mut self, soft_limit: usize, hard_limit: usize) -> Self {
        self.soft_limit = soft_limit;
        self.hard_limit = hard_limit;
        self
    }

    /// Set the recovery attempt bound.
    pub fn with_recovery_attempts(mut self, attempts: usize) -> Self {
        self.recovery_attempts = attempts;
        self
    }

    /// Check that the limits are usable.
    pub fn validate(&self) -> Result<()> {
        if self.soft_limit == 0 {
            return Err(Error::InvalidConfig("soft limit must be positive".to_string()));
        }
        if self.soft_limit >= self.hard_limit {
            return Err(Error::InvalidConfig(format!(
                "soft limit ({}) must be below hard limit ({})",
                self.soft_limit, self.hard_limit
            )));
        }
        if self.recovery_attempts == 0 {
            return Err(Error::InvalidConfig(
                "at least one recovery attempt is required".to_string(),
            ));
        }
        Ok(())
    }
}

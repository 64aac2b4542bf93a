//! Builder configuration

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};

/// Forge configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForgeConfig {
    /// First sequence number issued by every factory
    pub sequence_start: u64,
    /// Save each successful build tree, children first
    pub persist_on_build: bool,
    /// Let references match objects built earlier in the same tree
    pub reuse_pending_references: bool,
}

impl ForgeConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from TOML, filling missing keys with defaults
    ///
    /// # Errors
    /// Returns [`ConfigError::Parse`] for malformed input.
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(input)?)
    }

    /// With first sequence number
    #[inline]
    #[must_use]
    pub fn with_sequence_start(mut self, start: u64) -> Self {
        self.sequence_start = start;
        self
    }

    /// With persistence on build
    #[inline]
    #[must_use]
    pub fn with_persist_on_build(mut self, persist: bool) -> Self {
        self.persist_on_build = persist;
        self
    }

    /// With reuse of objects pending in the same tree
    #[inline]
    #[must_use]
    pub fn with_reuse_pending_references(mut self, reuse: bool) -> Self {
        self.reuse_pending_references = reuse;
        self
    }
}

impl Default for ForgeConfig {
    fn default() -> Self {
        Self {
            sequence_start: 1,
            persist_on_build: true,
            reuse_pending_references: true,
        }
    }
}

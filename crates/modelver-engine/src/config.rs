//! Engine configuration

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Errors raised while loading an [`EngineConfig`]
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Configuration file could not be read
    #[error("cannot read config {}: {source}", .path.display())]
    Io {
        /// File that was requested
        path: PathBuf,
        /// Underlying I/O failure
        #[source]
        source: std::io::Error,
    },

    /// Configuration text is not valid TOML for [`EngineConfig`]
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is out of range
    #[error("invalid config value for {key}: {reason}")]
    Invalid {
        /// Offending key
        key: &'static str,
        /// What is wrong with it
        reason: String,
    },
}

/// Migration engine configuration
///
/// Every key is optional in TOML; missing keys take their defaults and
/// unknown keys are rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Accept a document declaring the release right after the latest one
    pub allow_newer_versions: bool,
    /// Validate the input against its declared version before any rule runs
    pub validate_input: bool,
    /// Report fields dropped by lossy-acknowledged rules as info entries
    pub report_acknowledged_drops: bool,
    /// Maximum entries of the schema lookup cache
    pub schema_cache_capacity: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            allow_newer_versions: true,
            validate_input: true,
            report_acknowledged_drops: false,
            schema_cache_capacity: 4096,
        }
    }
}

impl EngineConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With newer-version leniency
    #[inline]
    #[must_use]
    pub fn with_allow_newer_versions(mut self, allow: bool) -> Self {
        self.allow_newer_versions = allow;
        self
    }

    /// With input validation
    #[inline]
    #[must_use]
    pub fn with_validate_input(mut self, validate: bool) -> Self {
        self.validate_input = validate;
        self
    }

    /// With reporting of acknowledged drops
    #[inline]
    #[must_use]
    pub fn with_report_acknowledged_drops(mut self, report: bool) -> Self {
        self.report_acknowledged_drops = report;
        self
    }

    /// With schema cache capacity
    #[inline]
    #[must_use]
    pub fn with_schema_cache_capacity(mut self, capacity: u64) -> Self {
        self.schema_cache_capacity = capacity;
        self
    }

    /// Parse from TOML text
    ///
    /// # Errors
    /// Returns [`ConfigError::Parse`] for malformed text or unknown keys,
    /// [`ConfigError::Invalid`] for out-of-range values
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.check()?;
        Ok(config)
    }

    /// Load from a TOML file
    ///
    /// # Errors
    /// Returns [`ConfigError::Io`] if the file cannot be read, otherwise as
    /// [`EngineConfig::from_toml_str`]
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&text)?;
        tracing::debug!(path = %path.display(), ?config, "loaded engine config");
        Ok(config)
    }

    fn check(&self) -> Result<(), ConfigError> {
        if self.schema_cache_capacity == 0 {
            return Err(ConfigError::Invalid {
                key: "schema_cache_capacity",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

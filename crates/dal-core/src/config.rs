//! Resolver configuration
//!
//! Bounds for the two safeguards of a resolution: the recursion depth of
//! the circular-dependency guard and the number of propagation passes.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default depth of the circular-dependency guard
pub const DEFAULT_MAX_RECURSION_DEPTH: usize = 64;

/// Default number of fixed-point propagation passes
pub const DEFAULT_MAX_ITERATIONS: usize = 1000;

/// Limits applied by resolution and containment queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResolverConfig {
    /// Maximum number of components on a recursion path
    pub max_recursion_depth: usize,
    /// Maximum number of propagation passes before giving up
    pub max_iterations: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_recursion_depth: DEFAULT_MAX_RECURSION_DEPTH,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }
}

impl ResolverConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With recursion depth limit
    #[inline]
    #[must_use]
    pub fn with_max_recursion_depth(mut self, depth: usize) -> Self {
        self.max_recursion_depth = depth;
        self
    }

    /// With propagation pass limit
    #[inline]
    #[must_use]
    pub fn with_max_iterations(mut self, iterations: usize) -> Self {
        self.max_iterations = iterations;
        self
    }

    /// Parse from TOML text; missing keys take their defaults
    ///
    /// # Errors
    /// Returns error on malformed TOML or out-of-range values
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML file
    ///
    /// # Errors
    /// Returns error if the file cannot be read or is invalid
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Reject limits that would make every query fail
    ///
    /// # Errors
    /// Returns error if a limit is zero
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_recursion_depth == 0 {
            return Err(ConfigError::Invalid(
                "max_recursion_depth must be at least 1".into(),
            ));
        }
        if self.max_iterations == 0 {
            return Err(ConfigError::Invalid("max_iterations must be at least 1".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_limits() {
        let config = ResolverConfig::default();
        assert_eq!(config.max_recursion_depth, 64);
        assert_eq!(config.max_iterations, 1000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn toml_fills_missing_keys() {
        let config = ResolverConfig::from_toml_str("max_iterations = 10").unwrap();
        assert_eq!(config.max_iterations, 10);
        assert_eq!(config.max_recursion_depth, DEFAULT_MAX_RECURSION_DEPTH);
    }

    #[test]
    fn toml_rejects_unknown_keys() {
        assert!(matches!(
            ResolverConfig::from_toml_str("max_depth = 3"),
            Err(ConfigError::Toml(_))
        ));
    }

    #[test]
    fn zero_limits_are_invalid() {
        assert!(matches!(
            ResolverConfig::from_toml_str("max_recursion_depth = 0"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(ResolverConfig::new().with_max_iterations(0).validate().is_err());
    }

    #[test]
    fn reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("resolver.toml");
        std::fs::write(&path, "max_recursion_depth = 8\n").unwrap();
        let config = ResolverConfig::from_toml_file(&path).unwrap();
        assert_eq!(config.max_recursion_depth, 8);
    }
}

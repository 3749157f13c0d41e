//! Configuration for relation mocking

use crate::error::ConfigError;
use mockrel_model::{DisabledConnection, RELATED_SET_SUFFIX};
use serde::{Deserialize, Serialize};

/// Settings shared by the planner, patcher chains and the disabled
/// connection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MockConfig {
    /// Prefix marking test methods of a decorated suite
    pub test_prefix: String,
    /// Suffix appended to default to-many accessor names
    pub related_set_suffix: String,
    /// Whether decorated callables receive the substitution handles
    pub pass_mocks: bool,
    /// Whether a failed activation stops the patches already started
    pub rollback_on_failure: bool,
    /// Database features reported as unsupported
    pub disabled_features: Vec<String>,
}

impl MockConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse configuration from TOML; missing keys take defaults
    ///
    /// # Errors
    /// Returns error on malformed TOML or an empty test prefix
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Check values that serde cannot
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.test_prefix.is_empty() {
            return Err(ConfigError::Invalid {
                field: "test_prefix",
                message: "must not be empty".to_string(),
            });
        }
        Ok(())
    }

    /// With test prefix
    #[inline]
    #[must_use]
    pub fn with_test_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.test_prefix = prefix.into();
        self
    }

    /// With handle passing
    #[inline]
    #[must_use]
    pub fn with_pass_mocks(mut self, pass_mocks: bool) -> Self {
        self.pass_mocks = pass_mocks;
        self
    }

    /// With rollback on partial activation
    #[inline]
    #[must_use]
    pub fn with_rollback_on_failure(mut self, rollback: bool) -> Self {
        self.rollback_on_failure = rollback;
        self
    }

    /// With disabled database features
    #[must_use]
    pub fn with_disabled_features<I, S>(mut self, features: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.disabled_features = features.into_iter().map(Into::into).collect();
        self
    }

    /// Connection honouring `disabled_features`
    #[must_use]
    pub fn connection(&self) -> DisabledConnection {
        DisabledConnection::with_disabled_features(self.disabled_features.iter().cloned())
    }
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            test_prefix: "test".to_string(),
            related_set_suffix: RELATED_SET_SUFFIX.to_string(),
            pass_mocks: false,
            rollback_on_failure: true,
            disabled_features: Vec::new(),
        }
    }
}

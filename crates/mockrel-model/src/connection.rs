//! Disabled database connection
//!
//! Stands in for a real database connection so model code can run without
//! one. Every feature reports as supported except the ones explicitly
//! disabled, and any attempt to execute SQL fails with a clear error.

use crate::error::ModelError;
use std::collections::BTreeSet;

/// Feature that is always reported as enabled
pub const MOCKED_FEATURE: &str = "is_mocked";

/// Password shown in place of the real one
pub const MASKED_PASSWORD: &str = "****";

/// User shown in place of the real one
pub const MASKED_USER: &str = "**Database disabled for unit tests**";

/// Connection that refuses to execute SQL
#[derive(Debug, Clone, Default)]
pub struct DisabledConnection {
    disabled_features: BTreeSet<String>,
}

impl DisabledConnection {
    /// Create connection with every feature enabled
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create connection with some features turned off
    #[must_use]
    pub fn with_disabled_features<I, S>(features: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            disabled_features: features
                .into_iter()
                .map(Into::into)
                .filter(|f| f != MOCKED_FEATURE)
                .collect(),
        }
    }

    /// Check whether a database feature is reported as supported
    #[must_use]
    pub fn has_feature(&self, feature: &str) -> bool {
        !self.disabled_features.contains(feature)
    }

    /// Features that were disabled
    pub fn disabled_features(&self) -> impl Iterator<Item = &str> {
        self.disabled_features.iter().map(String::as_str)
    }

    /// Refuse to run a query for `model`
    pub fn execute_sql<T>(&self, model: &str) -> Result<T, ModelError> {
        tracing::debug!(model, "blocked SQL execution on disabled connection");
        Err(ModelError::SqlNotSupported {
            model: model.to_string(),
        })
    }

    /// Range accepted for integer fields
    #[inline]
    #[must_use]
    pub fn integer_field_range(&self) -> (i64, i64) {
        (i64::MIN, i64::MAX)
    }

    /// Longest identifier the backend accepts
    #[inline]
    #[must_use]
    pub fn max_name_length(&self) -> usize {
        usize::MAX
    }

    /// User reported in diagnostics
    #[inline]
    #[must_use]
    pub fn user(&self) -> &'static str {
        MASKED_USER
    }

    /// Password reported in diagnostics
    #[inline]
    #[must_use]
    pub fn password(&self) -> &'static str {
        MASKED_PASSWORD
    }
}

//! Error types for relation mocking
//!
//! Provides error handling for:
//! - Patch activation failures (missing target attributes)
//! - Illegal patcher chain transitions
//! - Configuration loading

use crate::state::ChainState;
use mockrel_model::ModelError;

/// Errors raised while applying or reverting patches
#[derive(Debug, thiserror::Error)]
pub enum PatchError {
    /// Target attribute does not resolve on the class
    #[error("{target} does not have the attribute '{attribute}'")]
    AttributeNotFound {
        /// Class being patched
        target: String,
        /// Attribute that was requested
        attribute: String,
    },

    /// Patch started twice without stopping
    #[error("patch {target}.{attribute} is already started")]
    AlreadyStarted {
        /// Class being patched
        target: String,
        /// Patched attribute
        attribute: String,
    },

    /// Patch stopped without being started
    #[error("patch {target}.{attribute} is not started")]
    NotStarted {
        /// Class being patched
        target: String,
        /// Patched attribute
        attribute: String,
    },

    /// Chain state machine rejected a transition
    #[error("illegal patcher chain transition: {from:?} -> {to:?}")]
    IllegalTransition {
        /// Current state
        from: ChainState,
        /// Requested state
        to: ChainState,
    },

    /// Building a replacement failed
    #[error("model error: {0}")]
    Model(#[from] ModelError),
}

impl PatchError {
    /// Create attribute-not-found error
    pub fn attribute_not_found(target: impl Into<String>, attribute: impl Into<String>) -> Self {
        Self::AttributeNotFound {
            target: target.into(),
            attribute: attribute.into(),
        }
    }

    /// Check if error was raised while applying a substitution
    #[inline]
    #[must_use]
    pub fn is_activation_failure(&self) -> bool {
        matches!(self, Self::AttributeNotFound { .. } | Self::Model(_))
    }
}

/// Errors loading [`crate::MockConfig`]
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML could not be parsed into a configuration
    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// Configuration parsed but is unusable
    #[error("invalid configuration value for '{field}': {message}")]
    Invalid {
        /// Offending field
        field: &'static str,
        /// What is wrong with it
        message: String,
    },
}

/// Result type alias for patch operations
pub type PatchResult<T> = Result<T, PatchError>;

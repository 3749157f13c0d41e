//! Error types for the model runtime
//!
//! Provides error handling for:
//! - Relation reads that find no related object
//! - Operations that would reach the (disabled) database
//! - Fake collection lookups
//! - Attribute resolution on model classes

/// Errors raised by model classes, instances and fake collections
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    /// Single-valued relation read with nothing stored for the instance
    #[error("Mock {model} has no {accessor}.")]
    RelatedObjectDoesNotExist {
        /// Class of the instance the relation was read on
        model: String,
        /// Public accessor name of the relation
        accessor: String,
    },

    /// An operation tried to reach the database
    #[error("Mock database tried to execute SQL for {model} model.")]
    SqlNotSupported {
        /// Model the query was built for
        model: String,
    },

    /// Direct assignment to the reverse side of a to-many relation
    #[error("Direct assignment to the reverse side of a related set is prohibited. Use {accessor}.set() instead.")]
    DirectAssignment {
        /// Accessor that was assigned
        accessor: String,
    },

    /// `get` matched nothing
    #[error("{model} matching query does not exist.")]
    DoesNotExist {
        /// Model of the queried collection
        model: String,
    },

    /// `get` matched more than one object
    #[error("get() returned more than one {model} -- it returned {count}!")]
    MultipleObjectsReturned {
        /// Model of the queried collection
        model: String,
        /// Number of matches
        count: usize,
    },

    /// Attribute is not defined on the class or any of its parents
    #[error("type object '{model}' has no attribute '{attribute}'")]
    UnknownAttribute {
        /// Class that was searched
        model: String,
        /// Attribute that was requested
        attribute: String,
    },

    /// Attribute exists but has the wrong kind for the operation
    #[error("'{model}.{attribute}' is not a {expected}")]
    WrongAttributeKind {
        /// Class owning the attribute
        model: String,
        /// Attribute that was requested
        attribute: String,
        /// Kind the caller expected
        expected: &'static str,
    },

    /// Relation value has the wrong cardinality for the accessor
    #[error("'{accessor}' holds a {actual}, not a {expected}")]
    WrongRelatedKind {
        /// Accessor that was read
        accessor: String,
        /// Kind the caller expected
        expected: &'static str,
        /// Kind actually stored
        actual: &'static str,
    },

    /// A weakly referenced model class has been dropped
    #[error("model '{0}' is no longer alive")]
    ModelDropped(String),

    /// A model with the same name is already registered
    #[error("model '{0}' is already registered")]
    DuplicateModel(String),

    /// No model registered under the name
    #[error("no model registered as '{0}'")]
    NoSuchModel(String),
}

impl ModelError {
    /// Create unknown attribute error
    pub fn unknown_attribute(model: impl Into<String>, attribute: impl Into<String>) -> Self {
        Self::UnknownAttribute {
            model: model.into(),
            attribute: attribute.into(),
        }
    }

    /// Create does-not-exist error for a relation accessor
    pub fn related_object_does_not_exist(
        model: impl Into<String>,
        accessor: impl Into<String>,
    ) -> Self {
        Self::RelatedObjectDoesNotExist {
            model: model.into(),
            accessor: accessor.into(),
        }
    }

    /// Check if error signals an absent related object
    #[inline]
    #[must_use]
    pub fn is_does_not_exist(&self) -> bool {
        matches!(
            self,
            Self::RelatedObjectDoesNotExist { .. } | Self::DoesNotExist { .. }
        )
    }
}

/// Result type alias for model operations
pub type ModelResult<T> = Result<T, ModelError>;

//! mockrel Model Runtime
//!
//! In-process stand-in for an ORM model layer, so model code can be
//! exercised without a database.
//!
//! # Core Concepts
//!
//! - [`ModelClass`]: named table of attribute bindings with inheritance parents
//! - [`Instance`]: object of a model class, identified by its `Arc`
//! - [`RelationDescriptor`]: accessor through which instances read relations
//! - [`MockSet`]: in-memory fake collection
//! - [`DisabledConnection`]: connection that refuses to execute SQL
//! - [`ModelRegistry`]: models by name sharing one connection
//!
//! # Example
//!
//! ```rust
//! use mockrel_model::{Instance, ModelError, ModelRegistry};
//!
//! let registry = ModelRegistry::new();
//! let order = registry.define("Order", |b| b).unwrap();
//! registry.define("LineItem", |b| b).unwrap();
//! registry.foreign_key("LineItem", "order", "Order", Some("items")).unwrap();
//!
//! // Unpatched relations reach for the database and fail loudly
//! let instance = Instance::new(&order);
//! assert!(matches!(
//!     instance.related("items"),
//!     Err(ModelError::SqlNotSupported { .. })
//! ));
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod connection;
pub mod error;
pub mod instance;
pub mod mockset;
pub mod model;
pub mod registry;
pub mod relation;

// Re-exports
pub use connection::DisabledConnection;
pub use error::{ModelError, ModelResult};
pub use instance::{Instance, InstanceRef};
pub use mockset::MockSet;
pub use model::{Attribute, Manager, ModelBuilder, ModelClass, ModelRef, SaveOp, SaveStub, OBJECTS, SAVE};
pub use registry::ModelRegistry;
pub use relation::{
    Cardinality, DatabaseRelation, Related, RelationDescriptor, RelationField, RELATED_SET_SUFFIX,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with model classes
    pub use crate::{
        Attribute, Cardinality, Instance, InstanceRef, MockSet, ModelClass, ModelError,
        ModelRef, ModelRegistry, Related, RelationDescriptor, RelationField,
    };
}

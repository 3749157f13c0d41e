//! mockrel Core
//!
//! Relation-graph mocking for unit tests: substitutes every database-facing
//! attribute of a set of models with in-memory stand-ins, and reverts them
//! afterwards.
//!
//! # Core Operations
//!
//! - **Plan**: walk models and their ancestors, queue one patch per `save`,
//!   `objects` and declared relation accessor
//! - **Activate**: apply the patches in order through a [`PatcherChain`]
//! - **Deactivate**: revert them in reverse, on scope exit or manually
//!
//! # Architecture
//!
//! ```text
//! models → ModelWalk → RelationPatchPlanner → PatchEntry* → PatcherChain
//!                                                              │
//!                 enter()/scope() · decorate() · decorate_suite() · start()/stop()
//!                                                              │
//!            RelationAccessor ── WeakIdentityCache<Instance, Related>
//! ```
//!
//! # Example
//!
//! ```rust
//! use mockrel_core::mocked_relations;
//! use mockrel_model::{Instance, ModelRegistry};
//! use serde_json::json;
//!
//! let registry = ModelRegistry::new();
//! let order = registry.define("Order", |b| b).unwrap();
//! registry.define("LineItem", |b| b).unwrap();
//! registry.foreign_key("LineItem", "order", "Order", Some("items")).unwrap();
//!
//! mocked_relations(&[order.clone()])
//!     .scope(|_| {
//!         let instance = Instance::new(&order);
//!         let items = instance.related_set("items").unwrap();
//!         items.create(json!({"sku": "A-1"})).unwrap();
//!         assert_eq!(instance.related_set("items").unwrap().count(), 1);
//!         instance.save().unwrap();
//!     })
//!     .unwrap();
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod accessor;
pub mod cache;
pub mod chain;
pub mod config;
pub mod error;
pub mod patch;
pub mod planner;
pub mod state;
pub mod suite;
pub mod walker;

// Re-exports for convenience
pub use accessor::{
    CreateEmptySet, MissPolicy, OneToManyAccessor, OneToOneAccessor, RaiseDoesNotExist,
    RelationAccessor,
};
pub use cache::{IdentityKey, WeakIdentityCache};
pub use chain::{ChainGuard, PatcherChain};
pub use config::MockConfig;
pub use error::{ConfigError, PatchError, PatchResult};
pub use patch::{AttributePatch, Patch, PatchEntry, PatchHandle, PatchTarget, Replacement};
pub use planner::RelationPatchPlanner;
pub use state::ChainState;
pub use suite::{Member, TestFn, TestSuite};
pub use walker::{walk_models, ModelWalk};

use mockrel_model::{ModelRef, ModelRegistry};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Chain mocking the relations of `models` with default settings
///
/// Wrapped callables do not receive the substitution handles.
#[must_use]
pub fn mocked_relations(models: &[ModelRef]) -> PatcherChain {
    mocked_relations_with(&MockConfig::default(), models)
}

/// Chain mocking the relations of `models` under `config`
#[must_use]
pub fn mocked_relations_with(config: &MockConfig, models: &[ModelRef]) -> PatcherChain {
    RelationPatchPlanner::new(config.clone()).plan(models)
}

/// Model registry whose models share a disabled database connection
#[must_use]
pub fn setup(config: &MockConfig) -> ModelRegistry {
    tracing::debug!(
        disabled_features = config.disabled_features.len(),
        "database disabled for unit tests"
    );
    ModelRegistry::with_connection(config.connection())
}

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for mocking model relations
    pub use crate::chain::{ChainGuard, PatcherChain};
    pub use crate::config::MockConfig;
    pub use crate::error::{PatchError, PatchResult};
    pub use crate::patch::PatchHandle;
    pub use crate::suite::TestSuite;
    pub use crate::{mocked_relations, mocked_relations_with, setup};
    pub use mockrel_model::prelude::*;
}

//! Model registry
//!
//! Provides [`ModelRegistry`], the application-level table of model classes
//! sharing one disabled connection.

use crate::connection::DisabledConnection;
use crate::error::{ModelError, ModelResult};
use crate::model::{ModelBuilder, ModelRef};
use crate::relation::{self, RelationField};
use indexmap::IndexMap;
use parking_lot::RwLock;
use std::sync::Arc;

/// Registry of model classes by name
#[derive(Debug, Default)]
pub struct ModelRegistry {
    connection: Arc<DisabledConnection>,
    models: RwLock<IndexMap<String, ModelRef>>,
}

impl ModelRegistry {
    /// Create empty registry with a fully enabled connection
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create empty registry sharing `connection`
    #[must_use]
    pub fn with_connection(connection: DisabledConnection) -> Self {
        Self {
            connection: Arc::new(connection),
            models: RwLock::new(IndexMap::new()),
        }
    }

    /// Connection shared by registered models
    #[inline]
    #[must_use]
    pub fn connection(&self) -> &Arc<DisabledConnection> {
        &self.connection
    }

    /// Build and register a model
    ///
    /// # Errors
    /// Returns error if the name is already registered
    pub fn define<F>(&self, name: &str, configure: F) -> ModelResult<ModelRef>
    where
        F: FnOnce(ModelBuilder) -> ModelBuilder,
    {
        if self.contains(name) {
            return Err(ModelError::DuplicateModel(name.to_string()));
        }
        let builder = ModelBuilder::new(name).connection(Arc::clone(&self.connection));
        let model = configure(builder).build();
        self.models
            .write()
            .insert(name.to_string(), Arc::clone(&model));
        tracing::debug!(model = name, "registered model");
        Ok(model)
    }

    /// Model registered under `name`
    pub fn model(&self, name: &str) -> ModelResult<ModelRef> {
        self.models
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| ModelError::NoSuchModel(name.to_string()))
    }

    /// Check if `name` is registered
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.models.read().contains_key(name)
    }

    /// All models in registration order
    #[must_use]
    pub fn models(&self) -> Vec<ModelRef> {
        self.models.read().values().cloned().collect()
    }

    /// Number of registered models
    #[must_use]
    pub fn len(&self) -> usize {
        self.models.read().len()
    }

    /// Check if nothing is registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.models.read().is_empty()
    }

    /// Declare a foreign key `from.field -> to` between registered models
    pub fn foreign_key(
        &self,
        from: &str,
        field: &str,
        to: &str,
        related_name: Option<&str>,
    ) -> ModelResult<RelationField> {
        Ok(relation::foreign_key(
            &self.model(from)?,
            field,
            &self.model(to)?,
            related_name,
        ))
    }

    /// Declare a one-to-one `from.field -> to` between registered models
    pub fn one_to_one(
        &self,
        from: &str,
        field: &str,
        to: &str,
        related_name: Option<&str>,
    ) -> ModelResult<RelationField> {
        Ok(relation::one_to_one(
            &self.model(from)?,
            field,
            &self.model(to)?,
            related_name,
        ))
    }

    /// Declare a many-to-many `from.field -> to` between registered models
    pub fn many_to_many(
        &self,
        from: &str,
        field: &str,
        to: &str,
        related_name: Option<&str>,
    ) -> ModelResult<RelationField> {
        Ok(relation::many_to_many(
            &self.model(from)?,
            field,
            &self.model(to)?,
            related_name,
        ))
    }
}

//! Model instances
//!
//! Instances are shared as [`InstanceRef`]; the `Arc` identity is what
//! relation accessors key their per-instance state on.

use crate::error::{ModelError, ModelResult};
use crate::mockset::MockSet;
use crate::model::{Attribute, ModelRef, SaveOp};
use crate::relation::{Related, RelationDescriptor};
use parking_lot::RwLock;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

/// Shared handle to an instance
pub type InstanceRef = Arc<Instance>;

/// Object of a model class with a JSON field map
pub struct Instance {
    model: ModelRef,
    fields: RwLock<Map<String, Value>>,
}

impl Instance {
    /// Create instance with no fields set
    #[must_use]
    pub fn new(model: &ModelRef) -> InstanceRef {
        Self::with_fields(model, Value::Null)
    }

    /// Create instance from a JSON object; non-objects give no fields
    #[must_use]
    pub fn with_fields(model: &ModelRef, fields: Value) -> InstanceRef {
        let fields = match fields {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Arc::new(Self {
            model: Arc::clone(model),
            fields: RwLock::new(fields),
        })
    }

    /// Class of this instance
    #[inline]
    #[must_use]
    pub fn model(&self) -> &ModelRef {
        &self.model
    }

    /// Field value
    #[must_use]
    pub fn get(&self, field: &str) -> Option<Value> {
        self.fields.read().get(field).cloned()
    }

    /// Set a field value
    pub fn set(&self, field: &str, value: impl Into<Value>) {
        self.fields.write().insert(field.to_string(), value.into());
    }

    /// Snapshot of all fields
    #[must_use]
    pub fn fields(&self) -> Map<String, Value> {
        self.fields.read().clone()
    }

    /// Check if a field holds `value`
    #[must_use]
    pub fn matches(&self, field: &str, value: &Value) -> bool {
        self.fields.read().get(field) == Some(value)
    }

    /// Read a relation through the bound accessor
    pub fn related(self: &Arc<Self>, name: &str) -> ModelResult<Related> {
        self.descriptor(name)?.read(self)
    }

    /// Read a to-many relation
    pub fn related_set(self: &Arc<Self>, name: &str) -> ModelResult<MockSet> {
        self.related(name)?.into_set(name)
    }

    /// Read a one-to-one relation
    pub fn related_object(self: &Arc<Self>, name: &str) -> ModelResult<InstanceRef> {
        self.related(name)?.into_object(name)
    }

    /// Write a relation through the bound accessor
    pub fn set_related(self: &Arc<Self>, name: &str, value: impl Into<Related>) -> ModelResult<()> {
        self.descriptor(name)?.write(self, value.into())
    }

    /// Persist through the bound `save`
    pub fn save(&self) -> ModelResult<()> {
        match self.model.save_op()? {
            SaveOp::Stub(stub) => {
                stub.record();
                Ok(())
            }
            SaveOp::Database => self.model.connection().execute_sql(self.model.name()),
        }
    }

    /// Reload fields from the database; a no-op without one
    pub fn refresh_from_db(&self) {
        tracing::trace!(model = self.model.name(), "refresh_from_db skipped");
    }

    fn descriptor(&self, name: &str) -> ModelResult<Arc<dyn RelationDescriptor>> {
        match self.model.attribute(name)? {
            Attribute::Relation(descriptor) => Ok(descriptor),
            _ => Err(ModelError::WrongAttributeKind {
                model: self.model.name().to_string(),
                attribute: name.to_string(),
                expected: "relation accessor",
            }),
        }
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("model", &self.model.name())
            .field("fields", &*self.fields.read())
            .finish()
    }
}

//! Model classes
//!
//! A [`ModelClass`] is the runtime stand-in for an ORM model class: a named
//! table of attribute bindings plus relation metadata and inheritance
//! parents. Attribute bindings are mutable so that tests can substitute
//! them and later restore the originals.

use crate::connection::DisabledConnection;
use crate::error::{ModelError, ModelResult};
use crate::mockset::MockSet;
use crate::relation::{self, RelationDescriptor, RelationField};
use indexmap::IndexMap;
use parking_lot::RwLock;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Shared handle to a model class
pub type ModelRef = Arc<ModelClass>;

/// Name of the persistence operation
pub const SAVE: &str = "save";

/// Name of the default collection manager
pub const OBJECTS: &str = "objects";

/// Value bound to an attribute name on a model class
#[derive(Debug, Clone)]
pub enum Attribute {
    /// Persistence operation
    Save(SaveOp),

    /// Collection manager (`objects`)
    Manager(Manager),

    /// Relation accessor
    Relation(Arc<dyn RelationDescriptor>),

    /// Plain class-level value
    Value(serde_json::Value),
}

impl Attribute {
    /// Short name of the binding kind
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Save(_) => "save operation",
            Self::Manager(_) => "manager",
            Self::Relation(_) => "relation accessor",
            Self::Value(_) => "value",
        }
    }

    /// Relation accessor, if this is one
    #[inline]
    #[must_use]
    pub fn as_relation(&self) -> Option<&Arc<dyn RelationDescriptor>> {
        match self {
            Self::Relation(descriptor) => Some(descriptor),
            _ => None,
        }
    }

    /// Check whether two bindings are the same object
    ///
    /// Plain values compare by equality; everything else by identity.
    #[must_use]
    pub fn same_binding(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Save(SaveOp::Database), Self::Save(SaveOp::Database)) => true,
            (Self::Save(SaveOp::Stub(a)), Self::Save(SaveOp::Stub(b))) => Arc::ptr_eq(a, b),
            (Self::Manager(Manager::Database), Self::Manager(Manager::Database)) => true,
            (Self::Manager(Manager::Fake(a)), Self::Manager(Manager::Fake(b))) => a.ptr_eq(b),
            (Self::Relation(a), Self::Relation(b)) => {
                Arc::as_ptr(a).cast::<()>() == Arc::as_ptr(b).cast::<()>()
            }
            (Self::Value(a), Self::Value(b)) => a == b,
            _ => false,
        }
    }
}

/// Implementation of the persistence operation
#[derive(Debug, Clone)]
pub enum SaveOp {
    /// Writes through the database connection
    Database,

    /// Records calls without persisting anything
    Stub(Arc<SaveStub>),
}

impl SaveOp {
    /// Check if this is a stand-in
    #[inline]
    #[must_use]
    pub fn is_stub(&self) -> bool {
        matches!(self, Self::Stub(_))
    }
}

/// Stand-in for `save` that only counts calls
#[derive(Debug)]
pub struct SaveStub {
    name: String,
    calls: AtomicUsize,
}

impl SaveStub {
    /// Create stub with a diagnostic name such as `Order.save`
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            calls: AtomicUsize::new(0),
        }
    }

    /// Diagnostic name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Record one call
    pub fn record(&self) {
        self.calls.fetch_add(1, Ordering::Relaxed);
    }

    /// Number of recorded calls
    #[inline]
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }

    /// Check if called at least once
    #[inline]
    #[must_use]
    pub fn called(&self) -> bool {
        self.call_count() > 0
    }
}

/// Collection manager bound as `objects`
#[derive(Debug, Clone)]
pub enum Manager {
    /// Queries the database
    Database,

    /// Serves an in-memory fake collection
    Fake(MockSet),
}

/// Runtime model class
pub struct ModelClass {
    name: String,
    parents: Vec<ModelRef>,
    attributes: RwLock<IndexMap<String, Attribute>>,
    related_objects: RwLock<Vec<RelationField>>,
    many_to_many: RwLock<Vec<RelationField>>,
    connection: Arc<DisabledConnection>,
}

impl ModelClass {
    /// Start building a model class
    #[inline]
    #[must_use]
    pub fn builder(name: impl Into<String>) -> ModelBuilder {
        ModelBuilder::new(name)
    }

    /// Display name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name used for default relation names (`lineitem`, `lineitem_set`)
    #[must_use]
    pub fn model_name(&self) -> String {
        self.name.to_lowercase()
    }

    /// Direct inheritance parents
    #[inline]
    #[must_use]
    pub fn parents(&self) -> &[ModelRef] {
        &self.parents
    }

    /// Connection used by database-backed bindings
    #[inline]
    #[must_use]
    pub fn connection(&self) -> &Arc<DisabledConnection> {
        &self.connection
    }

    /// Check whether `other` is this class or one of its ancestors
    #[must_use]
    pub fn is_subclass_of(&self, other: &ModelClass) -> bool {
        std::ptr::eq(self, other) || self.parents.iter().any(|p| p.is_subclass_of(other))
    }

    /// Resolve an attribute through the inheritance chain
    ///
    /// Own bindings win; parents are searched depth-first in declaration
    /// order.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<Attribute> {
        if let Some(attr) = self.own_attribute(name) {
            return Some(attr);
        }
        self.parents.iter().find_map(|parent| parent.lookup(name))
    }

    /// Class-level read of an attribute
    ///
    /// For relations this yields the accessor itself rather than a related
    /// value.
    pub fn attribute(&self, name: &str) -> ModelResult<Attribute> {
        self.lookup(name)
            .ok_or_else(|| ModelError::unknown_attribute(&self.name, name))
    }

    /// Check whether the attribute resolves on this class
    #[inline]
    #[must_use]
    pub fn has_attribute(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    /// Binding declared on this class itself
    #[must_use]
    pub fn own_attribute(&self, name: &str) -> Option<Attribute> {
        self.attributes.read().get(name).cloned()
    }

    /// Check whether the attribute is declared on this class itself
    #[must_use]
    pub fn declares(&self, name: &str) -> bool {
        self.attributes.read().contains_key(name)
    }

    /// Names of own attributes in declaration order
    #[must_use]
    pub fn attribute_names(&self) -> Vec<String> {
        self.attributes.read().keys().cloned().collect()
    }

    /// Bind an attribute on this class, returning the previous own binding
    pub fn replace_attribute(&self, name: &str, attr: Attribute) -> Option<Attribute> {
        self.attributes.write().insert(name.to_string(), attr)
    }

    /// Remove an own binding, exposing any inherited one again
    pub fn remove_attribute(&self, name: &str) -> Option<Attribute> {
        self.attributes.write().shift_remove(name)
    }

    /// Reverse relations pointing at this class
    #[must_use]
    pub fn related_objects(&self) -> Vec<RelationField> {
        self.related_objects.read().clone()
    }

    /// Forward many-to-many relations declared on this class
    #[must_use]
    pub fn many_to_many(&self) -> Vec<RelationField> {
        self.many_to_many.read().clone()
    }

    /// Reverse relations of this class and every ancestor
    #[must_use]
    pub fn all_related_objects(&self) -> Vec<RelationField> {
        let mut fields = self.related_objects();
        for parent in &self.parents {
            fields.extend(parent.all_related_objects());
        }
        fields
    }

    /// Many-to-many relations of this class and every ancestor
    #[must_use]
    pub fn all_many_to_many(&self) -> Vec<RelationField> {
        let mut fields = self.many_to_many();
        for parent in &self.parents {
            fields.extend(parent.all_many_to_many());
        }
        fields
    }

    pub(crate) fn push_related_object(&self, field: RelationField) {
        self.related_objects.write().push(field);
    }

    pub(crate) fn push_many_to_many(&self, field: RelationField) {
        self.many_to_many.write().push(field);
    }

    /// Resolved persistence operation
    pub fn save_op(&self) -> ModelResult<SaveOp> {
        match self.attribute(SAVE)? {
            Attribute::Save(op) => Ok(op),
            _ => Err(ModelError::WrongAttributeKind {
                model: self.name.clone(),
                attribute: SAVE.to_string(),
                expected: "save operation",
            }),
        }
    }

    /// Check whether `save` is currently a stand-in
    #[must_use]
    pub fn save_is_stubbed(&self) -> bool {
        self.save_op().is_ok_and(|op| op.is_stub())
    }

    /// Fake collection served by `objects`
    pub fn objects(&self) -> ModelResult<MockSet> {
        match self.attribute(OBJECTS)? {
            Attribute::Manager(Manager::Fake(set)) => Ok(set),
            Attribute::Manager(Manager::Database) => self.connection.execute_sql(&self.name),
            _ => Err(ModelError::WrongAttributeKind {
                model: self.name.clone(),
                attribute: OBJECTS.to_string(),
                expected: "manager",
            }),
        }
    }
}

impl fmt::Debug for ModelClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelClass")
            .field("name", &self.name)
            .field(
                "parents",
                &self.parents.iter().map(|p| p.name()).collect::<Vec<_>>(),
            )
            .field("attributes", &self.attribute_names())
            .finish()
    }
}

/// Builder for [`ModelClass`]
#[derive(Debug)]
pub struct ModelBuilder {
    name: String,
    parents: Vec<ModelRef>,
    manager: bool,
    attributes: IndexMap<String, Attribute>,
    connection: Arc<DisabledConnection>,
}

impl ModelBuilder {
    /// Create builder for a concrete model with an `objects` manager
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parents: Vec::new(),
            manager: true,
            attributes: IndexMap::new(),
            connection: Arc::new(DisabledConnection::new()),
        }
    }

    /// Use a shared connection
    #[inline]
    #[must_use]
    pub fn connection(mut self, connection: Arc<DisabledConnection>) -> Self {
        self.connection = connection;
        self
    }

    /// Inherit from `parent` (multi-table inheritance)
    #[inline]
    #[must_use]
    pub fn parent(mut self, parent: &ModelRef) -> Self {
        self.parents.push(Arc::clone(parent));
        self
    }

    /// Build without an `objects` manager
    #[inline]
    #[must_use]
    pub fn without_manager(mut self) -> Self {
        self.manager = false;
        self
    }

    /// Bind a plain class-level value
    #[must_use]
    pub fn value(mut self, name: impl Into<String>, value: serde_json::Value) -> Self {
        self.attributes.insert(name.into(), Attribute::Value(value));
        self
    }

    /// Build the class and link it to its parents
    #[must_use]
    pub fn build(self) -> ModelRef {
        let mut attributes = IndexMap::new();
        attributes.insert(SAVE.to_string(), Attribute::Save(SaveOp::Database));
        if self.manager {
            attributes.insert(OBJECTS.to_string(), Attribute::Manager(Manager::Database));
        }
        attributes.extend(self.attributes);

        let model = Arc::new(ModelClass {
            name: self.name,
            parents: self.parents,
            attributes: RwLock::new(attributes),
            related_objects: RwLock::new(Vec::new()),
            many_to_many: RwLock::new(Vec::new()),
            connection: self.connection,
        });

        for parent in model.parents() {
            let link = format!("{}_ptr", parent.model_name());
            relation::one_to_one(&model, &link, parent, None);
        }

        model
    }
}

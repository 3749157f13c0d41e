//! Relation metadata and accessors
//!
//! Relations are declared between two model classes. Declaring one records
//! a [`RelationField`] on the model that owns the accessor and binds a
//! [`DatabaseRelation`] under the accessor name. Instances read and write
//! related values through whatever [`RelationDescriptor`] is currently bound.

use crate::connection::DisabledConnection;
use crate::error::{ModelError, ModelResult};
use crate::instance::InstanceRef;
use crate::mockset::MockSet;
use crate::model::{Attribute, ModelClass, ModelRef};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, Weak};

/// Suffix of default to-many accessor names
pub const RELATED_SET_SUFFIX: &str = "_set";

/// Relation cardinality
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cardinality {
    /// Single related object on each side
    OneToOne,

    /// Reverse side of a foreign key
    OneToMany,

    /// Many related objects on each side
    ManyToMany,
}

impl Cardinality {
    /// Check if the accessor yields a collection
    #[inline]
    #[must_use]
    pub fn is_to_many(self) -> bool {
        !matches!(self, Self::OneToOne)
    }

    /// Stable lowercase name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OneToOne => "one_to_one",
            Self::OneToMany => "one_to_many",
            Self::ManyToMany => "many_to_many",
        }
    }
}

impl fmt::Display for Cardinality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metadata of one relation as seen from the model owning the accessor
///
/// The related model is held strongly, so a relation keeps the class on
/// its other side alive the way a class definition would. Inheritance links
/// and many-to-many pairs therefore form class cycles that live until the
/// process exits. The owning model is held weakly since it owns the field.
#[derive(Debug, Clone)]
pub struct RelationField {
    name: String,
    accessor_name: String,
    remote_field: String,
    cardinality: Cardinality,
    model: Weak<ModelClass>,
    model_name: String,
    related_model: ModelRef,
    related_model_name: String,
}

impl RelationField {
    /// Relation name (`items`, `lineitem`)
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Attribute the accessor is bound to (`items`, `lineitem_set`)
    #[inline]
    #[must_use]
    pub fn accessor_name(&self) -> &str {
        &self.accessor_name
    }

    /// Field on the related model that declared the relation
    #[inline]
    #[must_use]
    pub fn remote_field(&self) -> &str {
        &self.remote_field
    }

    /// Relation cardinality
    #[inline]
    #[must_use]
    pub fn cardinality(&self) -> Cardinality {
        self.cardinality
    }

    /// Name of the model owning the accessor
    #[inline]
    #[must_use]
    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    /// Name of the model on the other side
    #[inline]
    #[must_use]
    pub fn related_model_name(&self) -> &str {
        &self.related_model_name
    }

    /// Model owning the accessor
    pub fn model(&self) -> ModelResult<ModelRef> {
        self.model
            .upgrade()
            .ok_or_else(|| ModelError::ModelDropped(self.model_name.clone()))
    }

    /// Model on the other side of the relation
    #[inline]
    #[must_use]
    pub fn related_model(&self) -> ModelRef {
        Arc::clone(&self.related_model)
    }
}

/// Value read from or written to a relation accessor
#[derive(Debug, Clone)]
pub enum Related {
    /// To-many relations yield a collection
    Many(MockSet),

    /// One-to-one relations yield a single object
    One(InstanceRef),
}

impl Related {
    /// Short name of the value kind
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Many(_) => "collection",
            Self::One(_) => "object",
        }
    }

    /// Collection, or a kind mismatch naming `accessor`
    pub fn into_set(self, accessor: &str) -> ModelResult<MockSet> {
        match self {
            Self::Many(set) => Ok(set),
            other => Err(ModelError::WrongRelatedKind {
                accessor: accessor.to_string(),
                expected: "collection",
                actual: other.kind(),
            }),
        }
    }

    /// Single object, or a kind mismatch naming `accessor`
    pub fn into_object(self, accessor: &str) -> ModelResult<InstanceRef> {
        match self {
            Self::One(instance) => Ok(instance),
            other => Err(ModelError::WrongRelatedKind {
                accessor: accessor.to_string(),
                expected: "object",
                actual: other.kind(),
            }),
        }
    }

    /// Check if both values are the same collection or object
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Many(a), Self::Many(b)) => a.ptr_eq(b),
            (Self::One(a), Self::One(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<MockSet> for Related {
    fn from(set: MockSet) -> Self {
        Self::Many(set)
    }
}

impl From<InstanceRef> for Related {
    fn from(instance: InstanceRef) -> Self {
        Self::One(instance)
    }
}

/// Property-like surface through which an instance reads and writes a
/// relation
pub trait RelationDescriptor: Send + Sync + fmt::Debug {
    /// Metadata of the relation
    fn field(&self) -> &RelationField;

    /// Instance-level read
    fn read(&self, instance: &InstanceRef) -> ModelResult<Related>;

    /// Instance-level write
    fn write(&self, instance: &InstanceRef, value: Related) -> ModelResult<()>;

    /// Accessor this one shadows, if any
    fn original(&self) -> Option<&Arc<dyn RelationDescriptor>> {
        None
    }

    /// Check whether this accessor serves values from memory
    fn is_mock(&self) -> bool {
        false
    }
}

/// Accessor backed by the database connection
#[derive(Debug)]
pub struct DatabaseRelation {
    field: RelationField,
    connection: Arc<DisabledConnection>,
}

impl DatabaseRelation {
    /// Wrap relation metadata
    #[must_use]
    pub fn new(field: RelationField, connection: Arc<DisabledConnection>) -> Self {
        Self { field, connection }
    }
}

impl RelationDescriptor for DatabaseRelation {
    fn field(&self) -> &RelationField {
        &self.field
    }

    fn read(&self, _instance: &InstanceRef) -> ModelResult<Related> {
        self.connection.execute_sql(self.field.related_model_name())
    }

    fn write(&self, _instance: &InstanceRef, _value: Related) -> ModelResult<()> {
        if self.field.cardinality.is_to_many() {
            return Err(ModelError::DirectAssignment {
                accessor: self.field.accessor_name.clone(),
            });
        }
        self.connection.execute_sql(self.field.related_model_name())
    }
}

/// Reverse relation installed on `to` when `from` declares a foreign key
///
/// The accessor is `related_name` when given, else `<from>_set`.
pub fn foreign_key(
    from: &ModelRef,
    field: &str,
    to: &ModelRef,
    related_name: Option<&str>,
) -> RelationField {
    let name = related_name.map_or_else(|| from.model_name(), str::to_string);
    let accessor = related_name.map_or_else(
        || format!("{}{RELATED_SET_SUFFIX}", from.model_name()),
        str::to_string,
    );
    let rel = make_field(name, accessor, field, Cardinality::OneToMany, to, from);
    install_reverse(to, rel)
}

/// Reverse relation installed on `to` when `from` declares a one-to-one
///
/// The accessor is `related_name` when given, else the lowercase name of
/// `from`.
pub fn one_to_one(
    from: &ModelRef,
    field: &str,
    to: &ModelRef,
    related_name: Option<&str>,
) -> RelationField {
    let name = related_name.map_or_else(|| from.model_name(), str::to_string);
    let rel = make_field(name.clone(), name, field, Cardinality::OneToOne, to, from);
    install_reverse(to, rel)
}

/// Forward relation on `from` plus reverse relation on `to`
///
/// Returns the forward field.
pub fn many_to_many(
    from: &ModelRef,
    field: &str,
    to: &ModelRef,
    related_name: Option<&str>,
) -> RelationField {
    let forward = make_field(
        field.to_string(),
        field.to_string(),
        field,
        Cardinality::ManyToMany,
        from,
        to,
    );
    bind(from, &forward);
    from.push_many_to_many(forward.clone());

    let name = related_name.map_or_else(|| from.model_name(), str::to_string);
    let accessor = related_name.map_or_else(
        || format!("{}{RELATED_SET_SUFFIX}", from.model_name()),
        str::to_string,
    );
    let reverse = make_field(name, accessor, field, Cardinality::ManyToMany, to, from);
    install_reverse(to, reverse);

    forward
}

fn make_field(
    name: String,
    accessor_name: String,
    remote_field: &str,
    cardinality: Cardinality,
    model: &ModelRef,
    related_model: &ModelRef,
) -> RelationField {
    RelationField {
        name,
        accessor_name,
        remote_field: remote_field.to_string(),
        cardinality,
        model: Arc::downgrade(model),
        model_name: model.name().to_string(),
        related_model: Arc::clone(related_model),
        related_model_name: related_model.name().to_string(),
    }
}

fn install_reverse(model: &ModelRef, field: RelationField) -> RelationField {
    bind(model, &field);
    model.push_related_object(field.clone());
    field
}

fn bind(model: &ModelRef, field: &RelationField) {
    let descriptor = DatabaseRelation::new(field.clone(), Arc::clone(model.connection()));
    model.replace_attribute(&field.accessor_name, Attribute::Relation(Arc::new(descriptor)));
}

//! In-memory relation accessors
//!
//! [`RelationAccessor`] shadows an original accessor and keeps one related
//! value per instance in a [`WeakIdentityCache`]. The two variants differ
//! only in what a read does when nothing is stored for the instance:
//!
//! - [`OneToManyAccessor`] materialises an empty [`MockSet`] of the related
//!   model and keeps it, so later reads return the same collection
//! - [`OneToOneAccessor`] fails with `RelatedObjectDoesNotExist`

use crate::cache::WeakIdentityCache;
use mockrel_model::{
    Instance, InstanceRef, MockSet, ModelError, ModelResult, Related, RelationDescriptor,
    RelationField,
};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// What a read does when no value is stored for the instance
pub trait MissPolicy: Send + Sync + 'static {
    /// Policy name for diagnostics
    const NAME: &'static str;

    /// Value to store and return, or the error to raise
    fn on_miss(field: &RelationField, instance: &InstanceRef) -> ModelResult<Related>;
}

/// Create an empty collection of the related model
#[derive(Debug, Clone, Copy, Default)]
pub struct CreateEmptySet;

impl MissPolicy for CreateEmptySet {
    const NAME: &'static str = "one_to_many";

    fn on_miss(field: &RelationField, instance: &InstanceRef) -> ModelResult<Related> {
        let related = field.related_model();
        tracing::trace!(
            model = instance.model().name(),
            accessor = field.accessor_name(),
            related = related.name(),
            "materialised empty related set"
        );
        Ok(Related::Many(MockSet::new(&related)))
    }
}

/// Raise the related-object-does-not-exist error
#[derive(Debug, Clone, Copy, Default)]
pub struct RaiseDoesNotExist;

impl MissPolicy for RaiseDoesNotExist {
    const NAME: &'static str = "one_to_one";

    fn on_miss(field: &RelationField, instance: &InstanceRef) -> ModelResult<Related> {
        Err(ModelError::related_object_does_not_exist(
            instance.model().name(),
            field.accessor_name(),
        ))
    }
}

/// Accessor serving relation values from a per-instance cache
pub struct RelationAccessor<P: MissPolicy> {
    original: Arc<dyn RelationDescriptor>,
    cache: WeakIdentityCache<Instance, Related>,
    _policy: PhantomData<P>,
}

/// Accessor for to-many relations
pub type OneToManyAccessor = RelationAccessor<CreateEmptySet>;

/// Accessor for one-to-one relations
pub type OneToOneAccessor = RelationAccessor<RaiseDoesNotExist>;

impl<P: MissPolicy> RelationAccessor<P> {
    /// Shadow `original`
    #[must_use]
    pub fn new(original: Arc<dyn RelationDescriptor>) -> Self {
        Self {
            original,
            cache: WeakIdentityCache::new(),
            _policy: PhantomData,
        }
    }

    /// Per-instance storage
    #[inline]
    #[must_use]
    pub fn cache(&self) -> &WeakIdentityCache<Instance, Related> {
        &self.cache
    }
}

impl<P: MissPolicy> RelationDescriptor for RelationAccessor<P> {
    fn field(&self) -> &RelationField {
        self.original.field()
    }

    fn read(&self, instance: &InstanceRef) -> ModelResult<Related> {
        self.cache
            .get_or_try_insert_with(instance, || P::on_miss(self.field(), instance))
    }

    fn write(&self, instance: &InstanceRef, value: Related) -> ModelResult<()> {
        self.cache.set(instance, value);
        Ok(())
    }

    fn original(&self) -> Option<&Arc<dyn RelationDescriptor>> {
        Some(&self.original)
    }

    fn is_mock(&self) -> bool {
        true
    }
}

impl<P: MissPolicy> fmt::Debug for RelationAccessor<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelationAccessor")
            .field("policy", &P::NAME)
            .field("accessor", &self.field().accessor_name())
            .field("cache", &self.cache)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockrel_model::relation::{foreign_key, one_to_one};
    use mockrel_model::{Attribute, ModelClass, ModelRef};
    use serde_json::json;

    fn shop() -> (ModelRef, ModelRef, ModelRef) {
        let order = ModelClass::builder("Order").build();
        let item = ModelClass::builder("LineItem").build();
        let receipt = ModelClass::builder("Receipt").build();
        foreign_key(&item, "order", &order, Some("items"));
        one_to_one(&receipt, "order", &order, None);
        (order, item, receipt)
    }

    fn original(model: &ModelRef, name: &str) -> Arc<dyn RelationDescriptor> {
        match model.own_attribute(name) {
            Some(Attribute::Relation(d)) => d,
            other => panic!("expected relation, got {other:?}"),
        }
    }

    #[test]
    fn to_many_read_is_identity_stable() {
        let (order, _item, _receipt) = shop();
        let accessor = OneToManyAccessor::new(original(&order, "items"));
        let instance = Instance::new(&order);

        let first = accessor.read(&instance).unwrap();
        let second = accessor.read(&instance).unwrap();
        assert!(first.ptr_eq(&second));
    }

    #[test]
    fn to_many_set_is_typed_to_related_model() {
        let (order, _item, _receipt) = shop();
        let accessor = OneToManyAccessor::new(original(&order, "items"));
        let set = accessor
            .read(&Instance::new(&order))
            .unwrap()
            .into_set("items")
            .unwrap();

        assert_eq!(set.model_name(), "LineItem");
        assert_eq!(set.count(), 0);
    }

    #[test]
    fn to_many_instances_are_isolated() {
        let (order, item, _) = shop();
        let accessor = OneToManyAccessor::new(original(&order, "items"));
        let a = Instance::with_fields(&order, json!({"number": 1}));
        let b = Instance::with_fields(&order, json!({"number": 1}));

        let filled = MockSet::new(&item);
        filled.create(json!({"sku": "X"})).unwrap();
        accessor.write(&a, Related::Many(filled)).unwrap();

        let on_b = accessor.read(&b).unwrap().into_set("items").unwrap();
        assert_eq!(on_b.count(), 0);
    }

    #[test]
    fn to_many_read_outlives_related_handle() {
        let order = ModelClass::builder("Order").build();
        {
            let item = ModelClass::builder("LineItem").build();
            foreign_key(&item, "order", &order, Some("items"));
        }
        let accessor = OneToManyAccessor::new(original(&order, "items"));

        let set = accessor
            .read(&Instance::new(&order))
            .unwrap()
            .into_set("items")
            .unwrap();
        assert_eq!(set.model_name(), "LineItem");
        assert_eq!(set.count(), 0);
        set.create(json!({"sku": "B-2"})).unwrap();
        assert_eq!(set.count(), 1);
    }

    #[test]
    fn one_to_one_unset_raises() {
        let (order, _, _) = shop();
        let accessor = OneToOneAccessor::new(original(&order, "receipt"));
        let instance = Instance::new(&order);

        let err = accessor.read(&instance).unwrap_err();
        assert_eq!(err.to_string(), "Mock Order has no receipt.");
        assert!(accessor.cache().is_empty());
    }

    #[test]
    fn one_to_one_returns_written_value() {
        let (order, _, receipt) = shop();
        let accessor = OneToOneAccessor::new(original(&order, "receipt"));
        let instance = Instance::new(&order);
        let value = Instance::new(&receipt);

        accessor
            .write(&instance, Related::One(Arc::clone(&value)))
            .unwrap();
        let read = accessor.read(&instance).unwrap().into_object("receipt").unwrap();
        assert!(Arc::ptr_eq(&read, &value));
    }

    #[test]
    fn metadata_delegates_to_original() {
        let (order, _, _) = shop();
        let inner = original(&order, "items");
        let accessor = OneToManyAccessor::new(Arc::clone(&inner));

        assert_eq!(accessor.field().accessor_name(), "items");
        assert_eq!(accessor.field().related_model_name(), "LineItem");
        assert!(accessor.is_mock());
        assert!(!inner.is_mock());
        assert!(accessor.original().is_some());
    }
}

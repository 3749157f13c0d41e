//! In-memory fake collection
//!
//! [`MockSet`] stands in for a queryable result set. Clones share storage,
//! so a collection handed out by a relation accessor reflects later
//! additions made through any clone.

use crate::error::{ModelError, ModelResult};
use crate::instance::{Instance, InstanceRef};
use crate::model::{ModelClass, ModelRef};
use parking_lot::RwLock;
use serde_json::Value;
use std::fmt;
use std::sync::{Arc, Weak};

/// Fake collection of instances of one model
#[derive(Clone)]
pub struct MockSet {
    inner: Arc<MockSetInner>,
}

struct MockSetInner {
    model: Weak<ModelClass>,
    model_name: String,
    name: Option<String>,
    items: RwLock<Vec<InstanceRef>>,
}

impl MockSet {
    /// Create empty collection of `model`
    #[must_use]
    pub fn new(model: &ModelRef) -> Self {
        Self::build(model, None, Vec::new())
    }

    /// Create empty collection with a diagnostic name such as `Order.objects`
    #[must_use]
    pub fn named(model: &ModelRef, name: impl Into<String>) -> Self {
        Self::build(model, Some(name.into()), Vec::new())
    }

    /// Create collection holding `items`
    #[must_use]
    pub fn from_items(model: &ModelRef, items: Vec<InstanceRef>) -> Self {
        Self::build(model, None, items)
    }

    fn build(model: &ModelRef, name: Option<String>, items: Vec<InstanceRef>) -> Self {
        Self {
            inner: Arc::new(MockSetInner {
                model: Arc::downgrade(model),
                model_name: model.name().to_string(),
                name,
                items: RwLock::new(items),
            }),
        }
    }

    /// Model of the collected instances
    pub fn model(&self) -> ModelResult<ModelRef> {
        self.inner
            .model
            .upgrade()
            .ok_or_else(|| ModelError::ModelDropped(self.inner.model_name.clone()))
    }

    /// Name of the collected model
    #[inline]
    #[must_use]
    pub fn model_name(&self) -> &str {
        &self.inner.model_name
    }

    /// Diagnostic name
    #[inline]
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.inner.name.as_deref()
    }

    /// Create an instance from JSON fields and add it
    pub fn create(&self, fields: Value) -> ModelResult<InstanceRef> {
        let model = self.model()?;
        let instance = Instance::with_fields(&model, fields);
        self.add(Arc::clone(&instance));
        Ok(instance)
    }

    /// Add an existing instance
    pub fn add(&self, instance: InstanceRef) {
        self.inner.items.write().push(instance);
    }

    /// Remove an instance by identity
    pub fn remove(&self, instance: &InstanceRef) -> bool {
        let mut items = self.inner.items.write();
        let before = items.len();
        items.retain(|item| !Arc::ptr_eq(item, instance));
        items.len() != before
    }

    /// Remove everything
    pub fn clear(&self) {
        self.inner.items.write().clear();
    }

    /// Snapshot of all instances
    #[must_use]
    pub fn all(&self) -> Vec<InstanceRef> {
        self.inner.items.read().clone()
    }

    /// Number of instances
    #[must_use]
    pub fn count(&self) -> usize {
        self.inner.items.read().len()
    }

    /// Check if anything is stored
    #[must_use]
    pub fn exists(&self) -> bool {
        self.count() > 0
    }

    /// Check if `instance` is stored
    #[must_use]
    pub fn contains(&self, instance: &InstanceRef) -> bool {
        self.inner
            .items
            .read()
            .iter()
            .any(|item| Arc::ptr_eq(item, instance))
    }

    /// First instance
    #[must_use]
    pub fn first(&self) -> Option<InstanceRef> {
        self.inner.items.read().first().cloned()
    }

    /// Last instance
    #[must_use]
    pub fn last(&self) -> Option<InstanceRef> {
        self.inner.items.read().last().cloned()
    }

    /// Detached collection of instances whose `field` equals `value`
    #[must_use]
    pub fn filter(&self, field: &str, value: &Value) -> Self {
        let matching = self
            .inner
            .items
            .read()
            .iter()
            .filter(|item| item.matches(field, value))
            .cloned()
            .collect();
        Self {
            inner: Arc::new(MockSetInner {
                model: self.inner.model.clone(),
                model_name: self.inner.model_name.clone(),
                name: None,
                items: RwLock::new(matching),
            }),
        }
    }

    /// Exactly one instance whose `field` equals `value`
    pub fn get(&self, field: &str, value: &Value) -> ModelResult<InstanceRef> {
        let mut matching = self.filter(field, value).all();
        match matching.len() {
            0 => Err(ModelError::DoesNotExist {
                model: self.inner.model_name.clone(),
            }),
            1 => Ok(matching.remove(0)),
            count => Err(ModelError::MultipleObjectsReturned {
                model: self.inner.model_name.clone(),
                count,
            }),
        }
    }

    /// Check if both handles share storage
    #[inline]
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for MockSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockSet")
            .field("model", &self.inner.model_name)
            .field("name", &self.inner.name)
            .field("count", &self.count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn create_adds_to_set() {
        let item = ModelClass::builder("LineItem").build();
        let set = MockSet::named(&item, "Order.items");

        let created = set.create(json!({"sku": "A-1"})).unwrap();
        assert_eq!(set.count(), 1);
        assert!(set.contains(&created));
        assert_eq!(created.model().name(), "LineItem");
        assert_eq!(set.name(), Some("Order.items"));
    }

    #[test]
    fn clones_share_storage() {
        let item = ModelClass::builder("LineItem").build();
        let set = MockSet::new(&item);
        let alias = set.clone();

        alias.create(json!({})).unwrap();
        assert_eq!(set.count(), 1);
        assert!(set.ptr_eq(&alias));
    }

    #[test]
    fn filter_is_detached() {
        let item = ModelClass::builder("LineItem").build();
        let set = MockSet::new(&item);
        set.create(json!({"sku": "A"})).unwrap();
        set.create(json!({"sku": "B"})).unwrap();

        let only_a = set.filter("sku", &json!("A"));
        assert_eq!(only_a.count(), 1);
        assert!(!only_a.ptr_eq(&set));

        only_a.clear();
        assert_eq!(set.count(), 2);
    }

    #[test]
    fn get_reports_missing_and_duplicates() {
        let item = ModelClass::builder("LineItem").build();
        let set = MockSet::new(&item);
        set.create(json!({"sku": "A"})).unwrap();
        set.create(json!({"sku": "A"})).unwrap();
        set.create(json!({"sku": "B"})).unwrap();

        assert!(set.get("sku", &json!("B")).is_ok());
        assert_eq!(
            set.get("sku", &json!("C")).unwrap_err(),
            ModelError::DoesNotExist {
                model: "LineItem".to_string()
            }
        );
        assert_eq!(
            set.get("sku", &json!("A")).unwrap_err(),
            ModelError::MultipleObjectsReturned {
                model: "LineItem".to_string(),
                count: 2
            }
        );
    }

    #[test]
    fn remove_by_identity() {
        let item = ModelClass::builder("LineItem").build();
        let set = MockSet::new(&item);
        let a = set.create(json!({"sku": "A"})).unwrap();
        let twin = Instance::with_fields(&item, json!({"sku": "A"}));

        assert!(!set.remove(&twin));
        assert!(set.remove(&a));
        assert!(!set.exists());
    }
}

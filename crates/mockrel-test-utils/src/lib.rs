//! Testing utilities for mockrel workspace
//!
//! Shared model graphs and tracing setup.

#![allow(missing_docs)]

use mockrel_model::relation::{foreign_key, many_to_many};
use mockrel_model::{Instance, InstanceRef, ModelClass, ModelRef, ModelRegistry};
use serde_json::json;
use tracing_subscriber::EnvFilter;

/// Install a test-writer subscriber filtered by `RUST_LOG`
///
/// Safe to call from every test; only the first call installs.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

/// Order graph registered in a [`ModelRegistry`]
///
/// - `Order.items`: to-many reverse of `LineItem.order`
/// - `Order.receipt`: one-to-one reverse of `Receipt.order`
/// - `Customer.order_set`: to-many reverse of `Order.customer`
/// - `Order.tags` / `Tag.order_set`: many-to-many
#[derive(Debug)]
pub struct Shop {
    pub registry: ModelRegistry,
    pub order: ModelRef,
    pub line_item: ModelRef,
    pub receipt: ModelRef,
    pub customer: ModelRef,
    pub tag: ModelRef,
}

pub fn shop() -> Shop {
    shop_in(ModelRegistry::new())
}

pub fn shop_in(registry: ModelRegistry) -> Shop {
    let order = registry.define("Order", |b| b).unwrap();
    let line_item = registry.define("LineItem", |b| b).unwrap();
    let receipt = registry.define("Receipt", |b| b).unwrap();
    let customer = registry.define("Customer", |b| b).unwrap();
    let tag = registry.define("Tag", |b| b).unwrap();

    registry
        .foreign_key("LineItem", "order", "Order", Some("items"))
        .unwrap();
    registry.one_to_one("Receipt", "order", "Order", None).unwrap();
    registry
        .foreign_key("Order", "customer", "Customer", None)
        .unwrap();
    registry.many_to_many("Order", "tags", "Tag", None).unwrap();

    Shop {
        registry,
        order,
        line_item,
        receipt,
        customer,
        tag,
    }
}

impl Shop {
    pub fn models(&self) -> Vec<ModelRef> {
        vec![
            self.order.clone(),
            self.line_item.clone(),
            self.receipt.clone(),
            self.customer.clone(),
            self.tag.clone(),
        ]
    }

    pub fn new_order(&self, number: i64) -> InstanceRef {
        Instance::with_fields(&self.order, json!({ "number": number }))
    }
}

/// Multi-table inheritance graph
///
/// - `Parent.items`: to-many reverse of `Item.parent`
/// - `Child(Parent)` with many-to-many `Child.tags`
/// - `Parent.child`: one-to-one link created by inheritance
#[derive(Debug)]
pub struct Lineage {
    pub parent: ModelRef,
    pub child: ModelRef,
    pub item: ModelRef,
    pub tag: ModelRef,
}

pub fn lineage() -> Lineage {
    let parent = ModelClass::builder("Parent").build();
    let item = ModelClass::builder("Item").build();
    foreign_key(&item, "parent", &parent, Some("items"));

    let child = ModelClass::builder("Child").parent(&parent).build();
    let tag = ModelClass::builder("Tag").build();
    many_to_many(&child, "tags", &tag, None);

    Lineage {
        parent,
        child,
        item,
        tag,
    }
}

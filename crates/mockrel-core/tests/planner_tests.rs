use mockrel_core::{mocked_relations, MockConfig, PatchTarget, RelationPatchPlanner, Replacement};
use mockrel_test_utils::{lineage, shop};
use pretty_assertions::assert_eq;
use std::sync::Arc;

fn labels(targets: &[PatchTarget]) -> Vec<String> {
    targets.iter().map(ToString::to_string).collect()
}

#[test]
fn test_child_plan_covers_ancestors() {
    let graph = lineage();
    let chain = mocked_relations(&[Arc::clone(&graph.child)]);

    assert_eq!(
        labels(&chain.targets()),
        [
            "Child.save",
            "Child.objects",
            "Child.tags",
            "Parent.save",
            "Parent.objects",
            "Parent.items",
            "Parent.child",
        ]
    );
}

#[test]
fn test_explicit_ancestor_not_duplicated() {
    let graph = lineage();
    let alone = mocked_relations(&[Arc::clone(&graph.child)]);
    let both = mocked_relations(&[Arc::clone(&graph.child), Arc::clone(&graph.parent)]);

    assert_eq!(labels(&both.targets()), labels(&alone.targets()));
    let saves = both
        .targets()
        .into_iter()
        .filter(|t| t.to_string() == "Parent.save")
        .count();
    assert_eq!(saves, 1);
}

#[test]
fn test_inherited_relations_are_not_patched_on_child() {
    let graph = lineage();
    let chain = mocked_relations(&[Arc::clone(&graph.child)]);
    let child_targets: Vec<_> = chain
        .targets()
        .into_iter()
        .filter(|t| t.target == "Child")
        .map(|t| t.attribute)
        .collect();

    assert_eq!(child_targets, ["save", "objects", "tags"]);
}

#[test]
fn test_replacement_matches_cardinality() {
    let shop = shop();
    let entries = RelationPatchPlanner::default().entries(&[Arc::clone(&shop.order)]);
    let kinds: Vec<_> = entries
        .iter()
        .map(|e| {
            let kind = match e.replacement() {
                Replacement::SaveStub => "save",
                Replacement::FakeManager => "manager",
                Replacement::OneToMany(_) => "to_many",
                Replacement::OneToOne(_) => "to_one",
                Replacement::Fixed(_) => "fixed",
            };
            format!("{}:{kind}", e.attribute())
        })
        .collect();

    assert_eq!(
        kinds,
        [
            "save:save",
            "objects:manager",
            "items:to_many",
            "receipt:to_one",
            "tags:to_many",
        ]
    );
}

#[test]
fn test_whole_shop_plan() {
    let shop = shop();
    let chain = mocked_relations(&shop.models());

    assert_eq!(
        labels(&chain.targets()),
        [
            "Order.save",
            "Order.objects",
            "Order.items",
            "Order.receipt",
            "Order.tags",
            "LineItem.save",
            "LineItem.objects",
            "Receipt.save",
            "Receipt.objects",
            "Customer.save",
            "Customer.objects",
            "Customer.order_set",
            "Tag.save",
            "Tag.objects",
            "Tag.order_set",
        ]
    );
}

#[test]
fn test_active_models_are_skipped() {
    let graph = lineage();
    let outer = mocked_relations(&[Arc::clone(&graph.child)]);

    outer
        .scope(|_| {
            let nested = mocked_relations(&[Arc::clone(&graph.parent)]);
            assert!(nested.is_empty());

            let partial = mocked_relations(&[Arc::clone(&graph.child), Arc::clone(&graph.tag)]);
            assert_eq!(
                labels(&partial.targets()),
                ["Tag.save", "Tag.objects", "Tag.child_set"]
            );
        })
        .unwrap();

    assert_eq!(mocked_relations(&[Arc::clone(&graph.parent)]).len(), 4);
}

#[test]
fn test_config_controls_handle_passing() {
    let graph = lineage();
    let models = [Arc::clone(&graph.item)];

    assert!(!mocked_relations(&models).pass_mocks());
    let config = MockConfig::default().with_pass_mocks(true);
    assert!(mockrel_core::mocked_relations_with(&config, &models).pass_mocks());
}

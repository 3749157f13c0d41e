use mockrel_core::{mocked_relations, setup, MockConfig};
use mockrel_model::connection::{MASKED_PASSWORD, MOCKED_FEATURE};
use mockrel_model::{Instance, ModelError};
use std::sync::Arc;

#[test]
fn test_setup_disables_configured_features() {
    let config = MockConfig::default().with_disabled_features(["supports_transactions"]);
    let registry = setup(&config);
    let order = registry.define("Order", |b| b).unwrap();

    let connection = order.connection();
    assert!(Arc::ptr_eq(connection, registry.connection()));
    assert!(!connection.has_feature("supports_transactions"));
    assert!(connection.has_feature("can_return_rows_from_bulk_insert"));
    assert!(connection.has_feature(MOCKED_FEATURE));
    assert_eq!(connection.password(), MASKED_PASSWORD);
}

#[test]
fn test_setup_keeps_mocked_feature_enabled() {
    let config = MockConfig::default().with_disabled_features([MOCKED_FEATURE, "supports_json_field"]);
    let registry = setup(&config);

    assert!(registry.connection().has_feature(MOCKED_FEATURE));
    assert_eq!(
        registry.connection().disabled_features().collect::<Vec<_>>(),
        ["supports_json_field"]
    );
}

#[test]
fn test_unpatched_models_reach_disabled_database() {
    let registry = setup(&MockConfig::default());
    let order = registry.define("Order", |b| b).unwrap();
    let instance = Instance::new(&order);

    let err = instance.save().unwrap_err();
    assert!(matches!(err, ModelError::SqlNotSupported { .. }));
    assert_eq!(
        err.to_string(),
        "Mock database tried to execute SQL for Order model."
    );
    assert!(order.objects().is_err());

    mocked_relations(&[Arc::clone(&order)])
        .scope(|_| {
            instance.save().unwrap();
            assert_eq!(order.objects().unwrap().count(), 0);
        })
        .unwrap();
}

#[test]
fn test_setup_from_toml() {
    let config = MockConfig::from_toml_str(
        r#"
        disabled_features = ["supports_transactions"]
        "#,
    )
    .unwrap();
    let registry = setup(&config);

    assert!(!registry.connection().has_feature("supports_transactions"));
}

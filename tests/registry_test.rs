//! Tests for the class table.

use docmodels::{ClassRegistry, DocumentClass, Field, RegistryError, Validator, Value};
use serde_json::json;

#[test]
fn test_build_registers_globally() {
    let class = DocumentClass::builder("RegistryTestGlobalUser")
        .field(Field::string("name").required())
        .build()
        .unwrap();

    let global = ClassRegistry::global();
    assert!(global.contains("RegistryTestGlobalUser"));
    assert!(class.registry().is_some());

    let doc = global
        .create("RegistryTestGlobalUser", json!({"name": "Alice"}))
        .unwrap();
    assert_eq!(doc["name"], Value::from("Alice"));
}

#[test]
fn test_global_duplicate_name_fails() {
    DocumentClass::builder("RegistryTestDuplicate").build().unwrap();
    let result = DocumentClass::builder("RegistryTestDuplicate").build();
    assert_eq!(
        result.unwrap_err(),
        RegistryError::DuplicateName("RegistryTestDuplicate".into())
    );
}

#[test]
fn test_global_lazy_reference() {
    let wrapper = DocumentClass::builder("RegistryTestWrapper")
        .field(Field::document("inner", "RegistryTestInner"))
        .build()
        .unwrap();
    DocumentClass::builder("RegistryTestInner")
        .field(Field::integer("n"))
        .build()
        .unwrap();

    let doc = wrapper.create(json!({"inner": {"n": "5"}})).unwrap();
    assert_eq!(doc["inner"]["n"], Value::Int(5));
}

#[test]
fn test_isolated_registry_does_not_see_global_classes() {
    DocumentClass::builder("RegistryTestOnlyGlobal").build().unwrap();

    let registry = ClassRegistry::new();
    let local = DocumentClass::builder("RegistryTestLocal")
        .field(Field::document("other", "RegistryTestOnlyGlobal"))
        .build_in(&registry)
        .unwrap();

    let errors = local.create(json!({"other": {}})).unwrap_err();
    assert_eq!(errors.first().code(), "unresolved_reference");
}

#[test]
fn test_unresolved_refs_tracks_registration() {
    let registry = ClassRegistry::new();
    DocumentClass::builder("Library")
        .field(Field::list_of("shelves", Validator::document("Shelf")))
        .field(Field::document("owner", "Person"))
        .field(Field::map_of("index", Validator::document("Shelf")))
        .build_in(&registry)
        .unwrap();

    assert_eq!(registry.unresolved_refs(), vec!["Person", "Shelf"]);

    DocumentClass::builder("Shelf").build_in(&registry).unwrap();
    assert_eq!(registry.unresolved_refs(), vec!["Person"]);

    DocumentClass::builder("Person").build_in(&registry).unwrap();
    assert!(registry.unresolved_refs().is_empty());
}

#[test]
fn test_names_in_registration_order() {
    let registry = ClassRegistry::new();
    for name in ["C", "A", "B"] {
        DocumentClass::builder(name).build_in(&registry).unwrap();
    }
    assert_eq!(registry.names(), vec!["C", "A", "B"]);
    assert_eq!(registry.len(), 3);
}

#[test]
fn test_validator_for_unknown_field_is_rejected() {
    let registry = ClassRegistry::new();
    let result = DocumentClass::builder("Checked")
        .field(Field::string("a"))
        .model_validator("b", |_, v| Ok(v.clone()))
        .build_in(&registry);

    assert_eq!(
        result.unwrap_err(),
        RegistryError::UnknownValidatorField {
            document: "Checked".into(),
            field: "b".into(),
        }
    );
    assert!(!registry.contains("Checked"));
}

#[test]
fn test_inherited_key_conflict_is_rejected() {
    let registry = ClassRegistry::new();
    let base = DocumentClass::builder("KeyBase")
        .field(Field::string("a").external_name("shared"))
        .build_in(&registry)
        .unwrap();
    let result = DocumentClass::builder("KeyChild")
        .extends(&base)
        .field(Field::string("b").external_name("shared"))
        .build_in(&registry);

    assert!(matches!(result, Err(RegistryError::ConflictingKey { .. })));
}

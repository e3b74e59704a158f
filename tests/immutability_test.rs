//! Tests for immutable fields and frozen documents.

use docmodels::{ClassRegistry, DocumentClass, ErrorKind, Field, Meta, Value};
use serde_json::json;

#[test]
fn test_second_set_of_immutable_field_fails() {
    let registry = ClassRegistry::new();
    let class = DocumentClass::builder("Account")
        .field(Field::string("id").immutable().required())
        .field(Field::string("owner"))
        .build_in(&registry)
        .unwrap();

    let mut account = class.create(json!({"id": "acc-1"})).unwrap();

    let errors = account.set("id", "acc-2").unwrap_err();
    assert_eq!(
        errors.kind(),
        &ErrorKind::ImmutableField { field: "id".into() }
    );
    assert_eq!(account["id"], Value::from("acc-1"));

    account.set("owner", "alice").unwrap();
    account.set("owner", "bob").unwrap();
    assert_eq!(account["owner"], Value::from("bob"));
}

#[test]
fn test_immutable_field_can_be_filled_once_when_omitted() {
    let registry = ClassRegistry::new();
    let class = DocumentClass::builder("Lazy")
        .field(Field::string("token").immutable())
        .meta(Meta::new().omit_missing_fields(true))
        .build_in(&registry)
        .unwrap();

    let mut doc = class.create(json!({})).unwrap();
    assert!(!doc.contains_key("token"));

    doc.set("token", "t1").unwrap();
    assert!(doc.set("token", "t2").is_err());
    assert_eq!(doc["token"], Value::from("t1"));
}

#[test]
fn test_update_fills_omitted_immutable_field_once() {
    let registry = ClassRegistry::new();
    let class = DocumentClass::builder("Ticket")
        .field(Field::string("id").immutable())
        .field(Field::string("title"))
        .meta(Meta::new().omit_missing_fields(true))
        .build_in(&registry)
        .unwrap();

    let mut doc = class.create(json!({})).unwrap();
    let errors = doc
        .update([("id", "first"), ("title", "a"), ("id", "second")])
        .unwrap_err();
    assert_eq!(errors.len(), 1);
    assert_eq!(
        errors.kind(),
        &ErrorKind::ImmutableField { field: "id".into() }
    );
    assert!(!doc.contains_key("id"));
    assert!(!doc.contains_key("title"));

    doc.update([("id", "first"), ("title", "a"), ("title", "b")]).unwrap();
    assert_eq!(doc.to_json(), json!({"id": "first", "title": "b"}));
    assert!(doc.update([("id", "second")]).is_err());
    assert_eq!(doc["id"], Value::from("first"));
}

#[test]
fn test_update_and_push_respect_immutability() {
    let registry = ClassRegistry::new();
    let class = DocumentClass::builder("Ledger")
        .field(Field::list("entries").immutable())
        .field(Field::string("name"))
        .build_in(&registry)
        .unwrap();

    let mut ledger = class.create(json!({"entries": [1]})).unwrap();

    assert_eq!(
        ledger.push("entries", 2i64).unwrap_err().first().code(),
        "immutable_field"
    );
    let errors = ledger
        .update([("name", Value::from("main")), ("entries", Value::from(vec![3i64]))])
        .unwrap_err();
    assert_eq!(errors.len(), 1);
    assert_eq!(ledger.to_json(), json!({"entries": [1], "name": null}));
}

#[test]
fn test_frozen_class_rejects_every_set() {
    let registry = ClassRegistry::new();
    let class = DocumentClass::builder("Constant")
        .field(Field::integer("value"))
        .meta(Meta::new().immutable(true))
        .build_in(&registry)
        .unwrap();

    let mut constant = class.create(json!({"value": 1})).unwrap();
    assert!(constant.is_frozen());
    assert!(constant.set("value", 2i64).is_err());
    assert!(constant.update([("value", 3i64)]).is_err());
    assert_eq!(constant["value"], Value::Int(1));
}

#[test]
fn test_model_validators_run_before_freezing() {
    let registry = ClassRegistry::new();
    let class = DocumentClass::builder("Normalized")
        .field(Field::string("code"))
        .model_validator("code", |_, code| {
            Ok(Value::from(code.as_str().unwrap_or_default().to_uppercase()))
        })
        .meta(Meta::new().immutable(true))
        .build_in(&registry)
        .unwrap();

    let doc = class.create(json!({"code": "abc"})).unwrap();
    assert_eq!(doc["code"], Value::from("ABC"));
    assert!(doc.is_frozen());
}

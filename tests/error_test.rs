//! Tests for error reporting from document operations.

use docmodels::{
    ClassRegistry, DocumentClass, DocumentError, DocumentErrors, ErrorKind, Field, FieldPath,
};
use serde_json::json;
use stillwater::prelude::*;

fn profile(registry: &ClassRegistry) -> std::sync::Arc<DocumentClass> {
    DocumentClass::builder("Profile")
        .field(Field::string("username").required().max_length(8))
        .field(Field::integer("age"))
        .field(Field::list_of("emails", docmodels::Cast::String).max_length(2))
        .build_in(registry)
        .unwrap()
}

#[test]
fn test_errors_are_queryable_by_path_and_code() {
    let registry = ClassRegistry::new();
    let class = profile(&registry);

    let errors = class
        .create(json!({
            "username": "much-too-long",
            "age": "ancient",
            "emails": ["a", "b", "c"],
            "extra": true
        }))
        .unwrap_err();

    assert_eq!(errors.len(), 4);
    assert_eq!(errors.with_code("validation").len(), 2);
    assert_eq!(errors.with_code("type_mismatch").len(), 1);
    assert_eq!(errors.with_code("unknown_field").len(), 1);
    assert_eq!(errors.at_path(&FieldPath::from_field("age")).len(), 1);
    assert!(errors.at_path(&FieldPath::from_field("missing")).is_empty());
}

#[test]
fn test_errors_display() {
    let registry = ClassRegistry::new();
    let class = profile(&registry);

    let errors = class.create(json!({"age": 1.5})).unwrap_err();
    let display = errors.to_string();
    assert!(display.starts_with("Document validation failed with 2 error(s):"));
    assert!(display.contains("1. username: field 'username' is required for Profile"));
    assert!(display.contains("2. age: field 'age' expected integer, got float 1.5"));
}

#[test]
fn test_errors_implement_std_error() {
    let registry = ClassRegistry::new();
    let class = profile(&registry);

    fn construct(class: &std::sync::Arc<DocumentClass>) -> Result<(), Box<dyn std::error::Error>> {
        class.create(json!({}))?;
        Ok(())
    }

    let error = construct(&class).unwrap_err();
    assert!(error.to_string().contains("username"));
}

#[test]
fn test_errors_from_separate_operations_combine() {
    let registry = ClassRegistry::new();
    let class = profile(&registry);

    let first = class.create(json!({})).unwrap_err();
    let mut doc = class.create(json!({"username": "bob"})).unwrap();
    let second = doc.set("age", "x").unwrap_err();

    let combined = first.combine(second);
    assert_eq!(combined.len(), 2);
    let codes: Vec<&str> = combined.iter().map(DocumentError::code).collect();
    assert_eq!(codes, ["required", "type_mismatch"]);
}

#[test]
fn test_error_kind_messages() {
    let cases = [
        (
            ErrorKind::UnknownField {
                field: "nick".into(),
                document: "User".into(),
            },
            "unknown field 'nick' for User",
        ),
        (
            ErrorKind::FieldCollision {
                field: "rate".into(),
                document: "Loan".into(),
            },
            "key 'rate' collides with a declared field of Loan",
        ),
        (
            ErrorKind::UnresolvedReference {
                name: "Ghost".into(),
            },
            "document class 'Ghost' is not registered",
        ),
        (
            ErrorKind::ImmutableField { field: "id".into() },
            "field 'id' is immutable",
        ),
        (
            ErrorKind::Validation {
                field: "age".into(),
                cause: "must be at least 0".into(),
            },
            "invalid value for field 'age': must be at least 0",
        ),
    ];

    for (kind, message) in cases {
        assert_eq!(kind.to_string(), message);
    }
}

#[test]
fn test_errors_into_vec() {
    let errors = DocumentErrors::from_vec(vec![
        DocumentError::new(
            FieldPath::from_field("a"),
            ErrorKind::ImmutableField { field: "a".into() },
        ),
        DocumentError::new(
            FieldPath::from_field("b"),
            ErrorKind::ImmutableField { field: "b".into() },
        ),
    ])
    .unwrap();

    let all = errors.into_vec();
    assert_eq!(all.len(), 2);
    assert_eq!(all[1].path.to_string(), "b");
}

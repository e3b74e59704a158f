//! Tests for field kinds, casts and built-in validators.

use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::NaiveDate;
use docmodels::{
    ClassRegistry, DocumentClass, ErrorKind, Field, Validator, Value, ValueKind,
};
use rust_decimal::Decimal;
use serde_json::json;

fn single(registry: &ClassRegistry, field: Field) -> Arc<DocumentClass> {
    DocumentClass::builder("Single")
        .field(field)
        .build_in(registry)
        .unwrap()
}

#[test]
fn test_decimal_field() {
    let registry = ClassRegistry::new();
    let class = single(&registry, Field::decimal("price"));

    let doc = class.create(json!({"price": "10.50"})).unwrap();
    assert_eq!(
        doc["price"],
        Value::Decimal(Decimal::from_str("10.50").unwrap())
    );
    assert_eq!(doc.to_json(), json!({"price": "10.50"}));

    let doc = class.create(json!({"price": 0.1})).unwrap();
    assert_eq!(doc.to_json(), json!({"price": "0.1"}));
}

#[test]
fn test_datetime_fields() {
    let registry = ClassRegistry::new();
    let class = DocumentClass::builder("Event")
        .field(Field::datetime("at"))
        .field(Field::datetime_format("day", "%Y-%m-%d"))
        .build_in(&registry)
        .unwrap();

    let doc = class
        .create(json!({"at": "2020-01-02T03:04:05.678Z", "day": "2020-01-02"}))
        .unwrap();

    let day = NaiveDate::from_ymd_opt(2020, 1, 2)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap();
    assert_eq!(doc["day"], Value::DateTime(day));
    assert_eq!(
        doc.to_json(),
        json!({"at": "2020-01-02T03:04:05.678Z", "day": "2020-01-02T00:00:00Z"})
    );

    let errors = class.create(json!({"day": "02/01/2020"})).unwrap_err();
    assert_eq!(
        errors.kind(),
        &ErrorKind::TypeMismatch {
            field: "day".into(),
            expected: "datetime in format %Y-%m-%d".into(),
            got: r#"string "02/01/2020""#.into(),
        }
    );
}

#[test]
fn test_boolean_field() {
    let registry = ClassRegistry::new();
    let class = single(&registry, Field::boolean("active"));

    assert_eq!(class.create(json!({"active": "on"})).unwrap()["active"], Value::Bool(true));
    assert_eq!(class.create(json!({"active": 0})).unwrap()["active"], Value::Bool(false));
    assert!(class.create(json!({"active": "sometimes"})).is_err());
}

#[test]
fn test_choices_and_pattern() {
    let registry = ClassRegistry::new();
    let class = DocumentClass::builder("Ticket")
        .field(Field::string("status").choices(["open", "closed"]).default("open"))
        .field(
            Field::string("code")
                .validator(Validator::pattern(r"^[A-Z]{3}-\d+$").unwrap())
                .required(),
        )
        .build_in(&registry)
        .unwrap();

    let doc = class.create(json!({"code": "ABC-12"})).unwrap();
    assert_eq!(doc["status"], Value::from("open"));

    let errors = class
        .create(json!({"status": "pending", "code": "abc"}))
        .unwrap_err();
    assert_eq!(errors.len(), 2);
    assert!(errors.iter().all(|e| e.code() == "validation"));
}

#[test]
fn test_default_is_validated() {
    let registry = ClassRegistry::new();
    let class = DocumentClass::builder("Defaults")
        .field(Field::integer("count").default("1"))
        .build_in(&registry)
        .unwrap();
    assert_eq!(class.create(json!({})).unwrap()["count"], Value::Int(1));

    let broken = DocumentClass::builder("BrokenDefault")
        .field(Field::integer("count").default("one"))
        .build_in(&registry)
        .unwrap();
    let errors = broken.create(json!({})).unwrap_err();
    assert_eq!(errors.first().code(), "type_mismatch");
}

#[test]
fn test_default_producer_runs_per_instance() {
    let registry = ClassRegistry::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let class = single(
        &registry,
        Field::integer("serial").default_with(move || {
            Value::from(counter.fetch_add(1, Ordering::SeqCst) as i64 + 100)
        }),
    );

    let a = class.create(json!({})).unwrap();
    let b = class.create(json!({})).unwrap();
    let c = class.create(json!({"serial": 7})).unwrap();

    assert_eq!(a["serial"], Value::Int(100));
    assert_eq!(b["serial"], Value::Int(101));
    assert_eq!(c["serial"], Value::Int(7));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn test_transform_validator() {
    let registry = ClassRegistry::new();
    let class = single(
        &registry,
        Field::string("email").validator(Validator::transform(|value| {
            let text = value.as_str().unwrap_or_default().trim().to_lowercase();
            if text.contains('@') {
                Ok(Value::from(text))
            } else {
                Err("not an email address".to_string())
            }
        })),
    );

    let doc = class.create(json!({"email": "  Max@Example.COM "})).unwrap();
    assert_eq!(doc["email"], Value::from("max@example.com"));

    let errors = class.create(json!({"email": "max"})).unwrap_err();
    assert_eq!(
        errors.kind(),
        &ErrorKind::Validation {
            field: "email".into(),
            cause: "not an email address".into(),
        }
    );
}

#[test]
fn test_untyped_field_with_kind_check() {
    let registry = ClassRegistry::new();
    let class = single(
        &registry,
        Field::new("payload").validator(Validator::kinds(&[ValueKind::Map, ValueKind::List])),
    );

    let doc = class.create(json!({"payload": [1, {"a": true}]})).unwrap();
    assert_eq!(doc.to_json(), json!({"payload": [1, {"a": true}]}));
    assert!(class.create(json!({"payload": 1})).is_err());
}

#[test]
fn test_numeric_range() {
    let registry = ClassRegistry::new();
    let class = single(
        &registry,
        Field::float("ratio").validator(Validator::range(0.0, 1.0)),
    );
    assert!(class.create(json!({"ratio": "0.25"})).is_ok());
    assert!(class.create(json!({"ratio": 1.5})).is_err());
}

#[test]
fn test_collection_fields_require_collections() {
    let registry = ClassRegistry::new();
    let class = DocumentClass::builder("Collections")
        .field(Field::list("tags"))
        .field(Field::map("attrs"))
        .build_in(&registry)
        .unwrap();

    let errors = class
        .create(json!({"tags": "a,b", "attrs": [1]}))
        .unwrap_err();
    let expected: Vec<String> = errors
        .iter()
        .filter_map(|e| match &e.kind {
            ErrorKind::TypeMismatch { expected, .. } => Some(expected.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(expected, ["list", "mapping"]);
}

//! Validated document instances.

use std::fmt;
use std::ops::Index;
use std::sync::Arc;

use indexmap::IndexMap;
use stillwater::Validation;

use crate::error::{DocumentError, DocumentErrors, ErrorKind};
use crate::path::FieldPath;
use crate::schema::{Field, FieldKind, Schema};
use crate::validation::ValidationContext;
use crate::value::{Value, NULL};

use super::DocumentClass;

/// A validated document: an ordered mapping from storage keys to values.
///
/// Declared fields come first, in schema order, followed by accepted extra
/// keys. Every mutation goes through the owning field's validation.
///
/// # Example
///
/// ```rust
/// use docmodels::{ClassRegistry, DocumentClass, Field, Value};
/// use serde_json::json;
///
/// let registry = ClassRegistry::new();
/// let todo = DocumentClass::builder("Todo")
///     .field(Field::string("title").required())
///     .field(Field::boolean("done").default(false))
///     .field(Field::list_of("tags", docmodels::Cast::String))
///     .build_in(&registry)
///     .unwrap();
///
/// let mut item = todo.create(json!({"title": "Write docs"})).unwrap();
/// item.set("done", "yes").unwrap();
/// item.push("tags", "docs").unwrap();
///
/// assert_eq!(item["done"], Value::Bool(true));
/// assert_eq!(item, json!({"title": "Write docs", "done": true, "tags": ["docs"]}));
/// assert!(item.set("done", "perhaps").is_err());
/// ```
#[derive(Clone)]
pub struct Document {
    class: Arc<DocumentClass>,
    values: IndexMap<String, Value>,
    frozen: bool,
}

impl Document {
    pub(crate) fn new(class: Arc<DocumentClass>, values: IndexMap<String, Value>) -> Self {
        Self {
            class,
            values,
            frozen: false,
        }
    }

    pub(crate) fn raw(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Stores a value without validation, keeping the key's position.
    pub(crate) fn store(&mut self, key: &str, value: Value) {
        if let Some(slot) = self.values.get_mut(key) {
            *slot = value;
        } else {
            self.values.insert(key.to_string(), value);
        }
    }

    pub(crate) fn freeze(&mut self) {
        self.frozen = true;
    }

    pub fn class(&self) -> &Arc<DocumentClass> {
        &self.class
    }

    /// True if the class is immutable; every set fails.
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Reads a value by storage key or attribute name.
    ///
    /// A declared field that was left out of the instance reads as null;
    /// unknown names give `None`.
    pub fn get(&self, name: &str) -> Option<&Value> {
        if let Some(value) = self.values.get(name) {
            return Some(value);
        }
        let schema = self.class.schema();
        let field = schema.field(name)?;
        Some(self.values.get(field.key()).unwrap_or(&NULL))
    }

    /// Validates and stores one value.
    ///
    /// # Errors
    ///
    /// Fails on immutable fields, frozen documents, undeclared names when
    /// extra fields are not allowed, and values the field rejects. The
    /// document is unchanged on failure.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<(), DocumentErrors> {
        let schema = self.class.schema();
        let (key, value) = self.prepare(&schema, name, value.into()).into_result()?;
        self.place(&schema, key, value);
        Ok(())
    }

    /// Validates every entry first and stores them only if all pass.
    ///
    /// An immutable field that is still unset accepts one entry; a second
    /// entry for it in the same batch is rejected.
    ///
    /// # Errors
    ///
    /// Returns the failures of all rejected entries; nothing is stored.
    pub fn update<I, K, V>(&mut self, entries: I) -> Result<(), DocumentErrors>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        let schema = self.class.schema();
        let mut errors: Vec<DocumentError> = Vec::new();
        let mut accepted: Vec<(String, Value)> = Vec::new();
        for (name, value) in entries {
            match self.prepare(&schema, name.as_ref(), value.into()) {
                Validation::Success((key, value)) => {
                    // An immutable field takes one value per batch.
                    let repeated = schema.field_by_key(&key).filter(|field| {
                        field.is_immutable() && accepted.iter().any(|(seen, _)| *seen == key)
                    });
                    match repeated {
                        Some(field) => errors.push(DocumentError::new(
                            FieldPath::from_field(&key),
                            ErrorKind::ImmutableField {
                                field: field.name().to_string(),
                            },
                        )),
                        None => accepted.push((key, value)),
                    }
                }
                Validation::Failure(e) => errors.extend(e),
            }
        }

        if let Some(errors) = DocumentErrors::from_vec(errors) {
            return Err(errors);
        }
        for (key, value) in accepted {
            self.place(&schema, key, value);
        }
        Ok(())
    }

    /// Validates `item` against a list field's item pipeline and appends it.
    ///
    /// # Errors
    ///
    /// Fails if `name` is not a declared list field, if the field is
    /// immutable or the document frozen, or if the item is rejected.
    pub fn push(&mut self, name: &str, item: impl Into<Value>) -> Result<(), DocumentErrors> {
        let schema = self.class.schema();
        let field = self.writable_field(&schema, name)?;
        let key = field.key().to_string();
        let ctx = ValidationContext::for_class(&self.class, FieldPath::from_field(&key));

        if !matches!(field.kind(), FieldKind::List(_)) {
            return Err(DocumentErrors::at(
                ctx.path(),
                ErrorKind::TypeMismatch {
                    field: field.name().to_string(),
                    expected: "list field".to_string(),
                    got: match field.kind() {
                        FieldKind::Document(_) => "document field",
                        FieldKind::Map(_) => "mapping field",
                        _ => "value field",
                    }
                    .to_string(),
                },
            ));
        }

        let mut items = match self.values.get(&key) {
            Some(Value::List(items)) => items.clone(),
            _ => Vec::new(),
        };
        let item = field.run_item(item.into(), items.len(), &ctx).into_result()?;
        items.push(item);
        let list = field
            .validators()
            .run(Value::List(items), &ctx, field.name())
            .into_result()?;

        self.place(&schema, key, list);
        Ok(())
    }

    fn writable_field<'s>(&self, schema: &'s Schema, name: &str) -> Result<&'s Field, DocumentErrors> {
        let path = FieldPath::from_field(name);
        let Some(field) = schema.field(name) else {
            return Err(DocumentErrors::at(
                &path,
                ErrorKind::UnknownField {
                    field: name.to_string(),
                    document: self.class.name().to_string(),
                },
            ));
        };
        if self.frozen || (field.is_immutable() && self.values.contains_key(field.key())) {
            return Err(DocumentErrors::at(
                &path,
                ErrorKind::ImmutableField {
                    field: field.name().to_string(),
                },
            ));
        }
        Ok(field)
    }

    /// Resolves a value for `name` without storing it.
    fn prepare(
        &self,
        schema: &Schema,
        name: &str,
        value: Value,
    ) -> Validation<(String, Value), DocumentErrors> {
        if schema.field(name).is_none() {
            let path = FieldPath::from_field(name);
            if self.frozen {
                return Validation::Failure(DocumentErrors::at(
                    &path,
                    ErrorKind::ImmutableField {
                        field: name.to_string(),
                    },
                ));
            }
            if schema.policy().allow_extra_fields {
                return Validation::Success((name.to_string(), value));
            }
        }

        let field = match self.writable_field(schema, name) {
            Ok(field) => field,
            Err(errors) => return Validation::Failure(errors),
        };
        let key = field.key().to_string();
        let ctx = ValidationContext::for_class(&self.class, FieldPath::from_field(&key));
        field
            .resolve(Some(value), &ctx, self.class.name())
            .map(|resolved| (key, resolved.value))
    }

    /// Stores a validated value; a declared field missing from the instance
    /// goes back to its schema position.
    fn place(&mut self, schema: &Schema, key: String, value: Value) {
        if let Some(slot) = self.values.get_mut(&key) {
            *slot = value;
            return;
        }
        let position = schema
            .field_by_key(&key)
            .and_then(|field| schema.position(field.name()));
        match position {
            Some(position) => {
                let index = schema
                    .fields()
                    .take(position)
                    .filter(|field| self.values.contains_key(field.key()))
                    .count();
                self.values.shift_insert(index, key, value);
            }
            None => {
                self.values.insert(key, value);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// True if `key` is a stored key.
    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.values.values()
    }

    pub fn iter(&self) -> indexmap::map::Iter<'_, String, Value> {
        self.values.iter()
    }

    /// The stored values with nested documents converted to mappings.
    pub fn as_mapping(&self) -> IndexMap<String, Value> {
        self.values
            .iter()
            .map(|(key, value)| (key.clone(), value.to_plain()))
            .collect()
    }

    /// The stored values, nested documents kept as they are.
    pub fn into_mapping(self) -> IndexMap<String, Value> {
        self.values
    }

    /// JSON form of the document, in storage order.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.values
                .iter()
                .map(|(key, value)| (key.clone(), value.to_json()))
                .collect(),
        )
    }
}

impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        self.values == other.values
    }
}

impl PartialEq<serde_json::Value> for Document {
    fn eq(&self, other: &serde_json::Value) -> bool {
        &self.to_json() == other
    }
}

impl Index<&str> for Document {
    type Output = Value;

    /// Unknown keys read as null.
    fn index(&self, name: &str) -> &Value {
        self.get(name).unwrap_or(&NULL)
    }
}

impl<'a> IntoIterator for &'a Document {
    type Item = (&'a String, &'a Value);
    type IntoIter = indexmap::map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.iter()
    }
}

impl From<Document> for Value {
    fn from(doc: Document) -> Self {
        Value::Document(doc)
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ", self.class.name())?;
        f.debug_map().entries(self.values.iter()).finish()
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json())
    }
}

const _: () = {
    const fn assert_send<T: Send>() {}
    const fn assert_sync<T: Sync>() {}
    assert_send::<Document>();
    assert_sync::<Document>();
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ClassRegistry;
    use crate::schema::Meta;
    use serde_json::json;

    fn class(meta: Meta) -> (ClassRegistry, Arc<DocumentClass>) {
        let registry = ClassRegistry::new();
        let class = DocumentClass::builder("Profile")
            .field(Field::string("first"))
            .field(Field::integer("second").external_name("Second Field"))
            .field(Field::string("third"))
            .field(Field::string("id").immutable())
            .meta(meta)
            .build_in(&registry)
            .unwrap();
        (registry, class)
    }

    #[test]
    fn test_get_by_key_or_name() {
        let (_r, class) = class(Meta::new());
        let doc = class.create(json!({"Second Field": "2"})).unwrap();
        assert_eq!(doc.get("Second Field"), Some(&Value::Int(2)));
        assert_eq!(doc.get("second"), Some(&Value::Int(2)));
        assert_eq!(doc.get("nope"), None);
        assert_eq!(doc["nope"], Value::Null);
    }

    #[test]
    fn test_omitted_field_reads_null_and_returns_to_position() {
        let (_r, class) = class(Meta::new().omit_missing_fields(true));
        let mut doc = class.create(json!({"third": "c"})).unwrap();
        assert_eq!(doc.keys().collect::<Vec<_>>(), ["third"]);
        assert_eq!(doc.get("first"), Some(&Value::Null));

        doc.set("first", "a").unwrap();
        doc.set("second", 2i64).unwrap();
        assert_eq!(
            doc.keys().collect::<Vec<_>>(),
            ["first", "Second Field", "third"]
        );
    }

    #[test]
    fn test_set_rejects_invalid_value_without_change() {
        let (_r, class) = class(Meta::new());
        let mut doc = class.create(json!({"Second Field": 1})).unwrap();
        let errors = doc.set("second", "many").unwrap_err();
        assert_eq!(errors.first().code(), "type_mismatch");
        assert_eq!(errors.first().path.to_string(), r#"["Second Field"]"#);
        assert_eq!(doc["second"], Value::Int(1));

        assert!(doc.set("first", 10i64).is_ok());
        assert_eq!(doc["first"], Value::from("10"));
    }

    #[test]
    fn test_immutable_field() {
        let (_r, class) = class(Meta::new().omit_missing_fields(true));
        let mut doc = class.create(json!({})).unwrap();
        doc.set("id", "abc").unwrap();
        let errors = doc.set("id", "def").unwrap_err();
        assert_eq!(
            errors.kind(),
            &ErrorKind::ImmutableField { field: "id".into() }
        );
        assert_eq!(doc["id"], Value::from("abc"));
    }

    #[test]
    fn test_frozen_document() {
        let (_r, class) = class(Meta::new().immutable(true).allow_extra_fields(true));
        let mut doc = class.create(json!({"first": "a", "extra": 1})).unwrap();
        assert!(doc.is_frozen());
        assert_eq!(doc.set("first", "b").unwrap_err().first().code(), "immutable_field");
        assert_eq!(doc.set("extra", 2i64).unwrap_err().first().code(), "immutable_field");
        assert_eq!(doc.set("new", 2i64).unwrap_err().first().code(), "immutable_field");
        assert_eq!(doc, json!({"first": "a", "Second Field": null, "third": null, "id": null, "extra": 1}));
    }

    #[test]
    fn test_extra_fields_on_set() {
        let (_r, strict) = class(Meta::new());
        let mut doc = strict.create(json!({})).unwrap();
        assert_eq!(doc.set("nick", "x").unwrap_err().first().code(), "unknown_field");

        let (_r2, open) = class(Meta::new().allow_extra_fields(true));
        let mut doc = open.create(json!({})).unwrap();
        doc.set("nick", json!({"any": [1, 2]})).unwrap();
        assert_eq!(doc["nick"], Value::from(json!({"any": [1, 2]})));
        assert_eq!(doc.keys().last(), Some("nick"));
    }

    #[test]
    fn test_update_is_atomic() {
        let (_r, class) = class(Meta::new());
        let mut doc = class.create(json!({"first": "a"})).unwrap();

        let errors = doc
            .update([("first", Value::from("b")), ("second", Value::from("x")), ("bogus", Value::Null)])
            .unwrap_err();
        assert_eq!(errors.len(), 2);
        assert_eq!(doc["first"], Value::from("a"));

        doc.update([("first", "b"), ("third", "c")]).unwrap();
        assert_eq!(doc["first"], Value::from("b"));
        assert_eq!(doc["third"], Value::from("c"));
    }

    #[test]
    fn test_push() {
        let registry = ClassRegistry::new();
        let class = DocumentClass::builder("Bag")
            .field(Field::list_of("numbers", crate::schema::Cast::Integer).max_length(2))
            .field(Field::string("label"))
            .build_in(&registry)
            .unwrap();
        let mut doc = class.create(json!({})).unwrap();

        doc.push("numbers", "1").unwrap();
        doc.push("numbers", 2i64).unwrap();
        assert_eq!(doc["numbers"], Value::from(vec![1i64, 2]));

        let errors = doc.push("numbers", 3i64).unwrap_err();
        assert_eq!(errors.first().code(), "validation");
        assert_eq!(doc["numbers"], Value::from(vec![1i64, 2]));

        assert_eq!(doc.push("label", "x").unwrap_err().first().code(), "type_mismatch");
        assert_eq!(doc.push("missing", "x").unwrap_err().first().code(), "unknown_field");
    }

    #[test]
    fn test_push_item_error_path() {
        let registry = ClassRegistry::new();
        let class = DocumentClass::builder("Scores")
            .field(Field::list_of("values", crate::schema::Cast::Float))
            .build_in(&registry)
            .unwrap();
        let mut doc = class.create(json!({"values": [1.0]})).unwrap();
        let errors = doc.push("values", "high").unwrap_err();
        assert_eq!(errors.first().path.to_string(), "values[1]");
    }

    #[test]
    fn test_mapping_protocol() {
        let (_r, class) = class(Meta::new());
        let doc = class.create(json!({"first": "a", "third": "c"})).unwrap();
        assert_eq!(doc.len(), 4);
        assert!(doc.contains_key("Second Field"));
        assert!(!doc.contains_key("second"));

        let pairs: Vec<(&String, &Value)> = (&doc).into_iter().collect();
        assert_eq!(pairs[0], (&"first".to_string(), &Value::from("a")));
        assert_eq!(doc.values().filter(|v| v.is_null()).count(), 2);
        assert_eq!(doc.iter().count(), 4);
    }

    #[test]
    fn test_equality_ignores_class_identity() {
        let (_r, class) = class(Meta::new());
        let a = class.create(json!({"first": "x"})).unwrap();
        let b = class.create(json!({"first": "x", "Second Field": null})).unwrap();
        assert_eq!(a, b);
        assert_eq!(Value::from(a.clone()), Value::Map(a.as_mapping()));
    }

    #[test]
    fn test_display_and_debug() {
        let (_r, class) = class(Meta::new());
        let doc = class.create(json!({"first": "x"})).unwrap();
        assert_eq!(
            doc.to_string(),
            r#"{"first":"x","Second Field":null,"third":null,"id":null}"#
        );
        assert!(format!("{:?}", doc).starts_with("Profile {"));
    }
}

//! Field declarations, validator pipelines and merged class schemas.
//!
//! A [`Schema`] is the ordered, inheritance-merged view of a document class:
//! every [`Field`] in declaration order, the cross-field validators and the
//! resolved [`Meta`] policy. It is built once per class and then shared.
//!
//! # Example
//!
//! ```rust
//! use docmodels::{ClassRegistry, DocumentClass, Field, Meta};
//!
//! let registry = ClassRegistry::new();
//! let base = DocumentClass::builder("Base")
//!     .field(Field::string("id").required())
//!     .field(Field::string("kind").default("base"))
//!     .meta(Meta::new().allow_extra_fields(true))
//!     .build_in(&registry)
//!     .unwrap();
//! let derived = DocumentClass::builder("Derived")
//!     .extends(&base)
//!     .field(Field::integer("size"))
//!     .field(Field::string("kind").default("derived"))
//!     .build_in(&registry)
//!     .unwrap();
//!
//! let schema = derived.schema();
//! let names: Vec<&str> = schema.fields().map(|f| f.name()).collect();
//! assert_eq!(names, ["id", "kind", "size"]);
//! assert!(schema.policy().allow_extra_fields);
//! ```

mod cast;
mod field;
mod reference;
mod validator;

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::document::{Document, DocumentClass};
use crate::registry::RegistryError;
use crate::value::Value;

pub use cast::Cast;
pub use field::{DefaultValue, Field, FieldKind, Origin, Resolved};
pub use reference::DocumentRef;
pub use validator::{CheckFn, Pipeline, TransformFn, Validator};

/// A cross-field validator: receives the constructed document and the current
/// value of its field, and returns the value to store.
pub type ModelValidatorFn = Arc<dyn Fn(&Document, &Value) -> Result<Value, String> + Send + Sync>;

/// Document-level options declared on one class.
///
/// Unset options are inherited from parents; options set nowhere are false.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Meta {
    allow_extra_fields: Option<bool>,
    omit_missing_fields: Option<bool>,
    immutable: Option<bool>,
}

impl Meta {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep input keys that match no field instead of rejecting them.
    pub fn allow_extra_fields(mut self, allow: bool) -> Self {
        self.allow_extra_fields = Some(allow);
        self
    }

    /// Leave fields that were neither given nor defaulted out of the instance.
    pub fn omit_missing_fields(mut self, omit: bool) -> Self {
        self.omit_missing_fields = Some(omit);
        self
    }

    /// Freeze instances after construction.
    pub fn immutable(mut self, immutable: bool) -> Self {
        self.immutable = Some(immutable);
        self
    }

    /// Reads options from a JSON object.
    ///
    /// Keys are matched case-insensitively; `omit_missed_fields` is accepted as
    /// an alias of `omit_missing_fields`. Unknown keys are ignored and values
    /// are read by truthiness.
    ///
    /// ```rust
    /// use docmodels::Meta;
    /// use serde_json::json;
    ///
    /// let meta = Meta::from_options(&json!({"Allow_Extra_Fields": true, "omit_missed_fields": 1}));
    /// let policy = meta.policy();
    /// assert!(policy.allow_extra_fields);
    /// assert!(policy.omit_missing_fields);
    /// assert!(!policy.immutable);
    /// ```
    pub fn from_options(options: &serde_json::Value) -> Self {
        let mut meta = Self::default();
        let Some(options) = options.as_object() else {
            return meta;
        };
        for (key, value) in options {
            let flag = Some(truthy(value));
            match key.to_ascii_lowercase().as_str() {
                "allow_extra_fields" => meta.allow_extra_fields = flag,
                "omit_missing_fields" | "omit_missed_fields" => meta.omit_missing_fields = flag,
                "immutable" => meta.immutable = flag,
                _ => {}
            }
        }
        meta
    }

    /// Options of `self`, overridden by every option `derived` sets.
    pub fn overlay(self, derived: &Meta) -> Meta {
        Meta {
            allow_extra_fields: derived.allow_extra_fields.or(self.allow_extra_fields),
            omit_missing_fields: derived.omit_missing_fields.or(self.omit_missing_fields),
            immutable: derived.immutable.or(self.immutable),
        }
    }

    /// Resolves unset options to false.
    pub fn policy(&self) -> MetaPolicy {
        MetaPolicy {
            allow_extra_fields: self.allow_extra_fields.unwrap_or(false),
            omit_missing_fields: self.omit_missing_fields.unwrap_or(false),
            immutable: self.immutable.unwrap_or(false),
        }
    }
}

fn truthy(value: &serde_json::Value) -> bool {
    use serde_json::Value as Json;
    match value {
        Json::Null => false,
        Json::Bool(b) => *b,
        Json::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Json::String(s) => !s.is_empty(),
        Json::Array(items) => !items.is_empty(),
        Json::Object(map) => !map.is_empty(),
    }
}

/// Resolved document-level policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetaPolicy {
    pub allow_extra_fields: bool,
    pub omit_missing_fields: bool,
    pub immutable: bool,
}

/// The merged schema of a document class.
pub struct Schema {
    fields: IndexMap<String, Field>,
    model_validators: IndexMap<String, ModelValidatorFn>,
    meta: Meta,
}

impl Schema {
    /// Merges parents (in declaration order) and then own declarations.
    ///
    /// A redeclared field keeps the position of its first declaration and
    /// takes the content of its last one.
    pub(crate) fn merge(
        parents: &[Arc<DocumentClass>],
        fields: &[Field],
        model_validators: &[(String, ModelValidatorFn)],
        meta: &Meta,
    ) -> Self {
        let mut merged = Schema {
            fields: IndexMap::new(),
            model_validators: IndexMap::new(),
            meta: Meta::default(),
        };

        for parent in parents {
            let inherited = parent.schema();
            for (name, field) in &inherited.fields {
                merged.fields.insert(name.clone(), field.clone());
            }
            for (name, validator) in &inherited.model_validators {
                merged
                    .model_validators
                    .insert(name.clone(), Arc::clone(validator));
            }
            merged.meta = merged.meta.overlay(&inherited.meta);
        }

        for field in fields {
            merged.fields.insert(field.name().to_string(), field.clone());
        }
        for (name, validator) in model_validators {
            merged
                .model_validators
                .insert(name.clone(), Arc::clone(validator));
        }
        merged.meta = merged.meta.overlay(meta);
        merged
    }

    /// Rejects schemas that store two fields under one key or validate a
    /// field that does not exist.
    pub(crate) fn check(&self, document: &str) -> Result<(), RegistryError> {
        let mut keys = HashSet::new();
        for field in self.fields.values() {
            if !keys.insert(field.key()) {
                return Err(RegistryError::ConflictingKey {
                    document: document.to_string(),
                    key: field.key().to_string(),
                });
            }
        }
        for name in self.model_validators.keys() {
            if !self.fields.contains_key(name) {
                return Err(RegistryError::UnknownValidatorField {
                    document: document.to_string(),
                    field: name.clone(),
                });
            }
        }
        Ok(())
    }

    /// Fields in schema order.
    pub fn fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.values()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Looks a field up by its storage key, then by its attribute name.
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.field_by_key(name).or_else(|| self.field_by_name(name))
    }

    pub fn field_by_key(&self, key: &str) -> Option<&Field> {
        self.fields.values().find(|field| field.key() == key)
    }

    pub fn field_by_name(&self, name: &str) -> Option<&Field> {
        self.fields.get(name)
    }

    /// Schema position of the field with attribute name `name`.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.fields.get_index_of(name)
    }

    /// Cross-field validators keyed by field name, in declaration order.
    pub fn model_validators(&self) -> impl Iterator<Item = (&str, &ModelValidatorFn)> {
        self.model_validators
            .iter()
            .map(|(name, validator)| (name.as_str(), validator))
    }

    /// Merged options as declared.
    pub fn meta(&self) -> &Meta {
        &self.meta
    }

    pub fn policy(&self) -> MetaPolicy {
        self.meta.policy()
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("fields", &self.fields)
            .field(
                "model_validators",
                &self.model_validators.keys().collect::<Vec<_>>(),
            )
            .field("meta", &self.meta)
            .finish()
    }
}

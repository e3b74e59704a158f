//! Document classes and their instances.
//!
//! A [`DocumentClass`] is declared with [`DocumentClass::builder`], registered
//! in a [`ClassRegistry`], and constructs [`Document`] instances from
//! loosely-typed input.

pub(crate) mod assembler;
mod instance;

use std::fmt;
use std::sync::{Arc, OnceLock};

use indexmap::IndexMap;
use rayon::prelude::*;

use crate::error::DocumentErrors;
use crate::registry::{ClassRegistry, RegistryError, RegistryHandle};
use crate::schema::{Field, Meta, ModelValidatorFn, Schema};
use crate::validation::ValidationContext;
use crate::value::Value;
use crate::ValidationResult;

pub use instance::Document;

/// A declared document type.
///
/// The merged [`Schema`] is built on first use and shared afterwards.
/// Classes registered in an isolated [`ClassRegistry`] resolve lazy
/// references only while that registry is alive.
///
/// # Example
///
/// ```rust
/// use docmodels::{ClassRegistry, DocumentClass, Field};
/// use serde_json::json;
///
/// let registry = ClassRegistry::new();
/// let address = DocumentClass::builder("Address")
///     .field(Field::string("city").default("Saint-Petersburg"))
///     .field(Field::string("street").required())
///     .build_in(&registry)
///     .unwrap();
/// let person = DocumentClass::builder("Person")
///     .field(Field::string("name").required())
///     .field(Field::document("address", &address))
///     .field(Field::integer("insurance_number"))
///     .build_in(&registry)
///     .unwrap();
///
/// let max = person
///     .create(json!({
///         "name": "Max",
///         "address": {"street": "Nevskii 10"},
///         "insurance_number": "111"
///     }))
///     .unwrap();
///
/// assert_eq!(
///     max.to_json(),
///     json!({
///         "name": "Max",
///         "address": {"city": "Saint-Petersburg", "street": "Nevskii 10"},
///         "insurance_number": 111
///     })
/// );
/// ```
pub struct DocumentClass {
    name: String,
    parents: Vec<Arc<DocumentClass>>,
    fields: Vec<Field>,
    model_validators: Vec<(String, ModelValidatorFn)>,
    meta: Meta,
    registry: RegistryHandle,
    schema: OnceLock<Arc<Schema>>,
}

impl DocumentClass {
    /// Starts declaring a class.
    pub fn builder(name: impl Into<String>) -> DocumentClassBuilder {
        DocumentClassBuilder {
            name: name.into(),
            parents: Vec::new(),
            fields: Vec::new(),
            model_validators: Vec::new(),
            meta: Meta::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Direct parents in declaration order.
    pub fn parents(&self) -> &[Arc<DocumentClass>] {
        &self.parents
    }

    /// Fields declared on this class itself.
    pub fn declared_fields(&self) -> &[Field] {
        &self.fields
    }

    /// Options declared on this class itself.
    pub fn declared_meta(&self) -> &Meta {
        &self.meta
    }

    /// The merged schema, built on first call.
    pub fn schema(&self) -> Arc<Schema> {
        let schema = self.schema.get_or_init(|| {
            let schema = Schema::merge(&self.parents, &self.fields, &self.model_validators, &self.meta);
            tracing::debug!(
                class = %self.name,
                fields = schema.len(),
                "built document schema"
            );
            Arc::new(schema)
        });
        Arc::clone(schema)
    }

    /// The class table this class was registered in, while it is alive.
    pub fn registry(&self) -> Option<ClassRegistry> {
        self.registry.upgrade()
    }

    /// True if `self` is `other` or inherits from it.
    pub fn is_subclass_of(&self, other: &DocumentClass) -> bool {
        std::ptr::eq(self, other) || self.parents.iter().any(|p| p.is_subclass_of(other))
    }

    /// Validates `data` into a document, accumulating field errors.
    pub fn validate(self: &Arc<Self>, data: impl Into<Value>) -> ValidationResult<Document> {
        assembler::construct(self, data.into(), IndexMap::new(), &ValidationContext::detached())
    }

    /// Constructs a document from a mapping.
    ///
    /// # Errors
    ///
    /// Returns every field failure of the input, or the first cross-field
    /// validator failure.
    pub fn create(self: &Arc<Self>, data: impl Into<Value>) -> Result<Document, DocumentErrors> {
        self.validate(data).into_result()
    }

    /// Constructs a document from a mapping plus overrides that win over it.
    pub fn create_with<I, K, V>(
        self: &Arc<Self>,
        data: impl Into<Value>,
        overrides: I,
    ) -> Result<Document, DocumentErrors>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let overrides = overrides
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        assembler::construct(self, data.into(), overrides, &ValidationContext::detached())
            .into_result()
    }

    /// Keyword-style construction.
    #[deprecated(note = "use `create` or `create_with`")]
    pub fn from_fields<I, K, V>(self: &Arc<Self>, fields: I) -> Result<Document, DocumentErrors>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        self.create_with(Value::Null, fields)
    }

    /// Constructs independent documents in parallel.
    pub fn create_all<V>(self: &Arc<Self>, inputs: Vec<V>) -> Vec<Result<Document, DocumentErrors>>
    where
        V: Into<Value> + Send,
    {
        inputs
            .into_par_iter()
            .map(|data| self.create(data))
            .collect()
    }
}

impl fmt::Debug for DocumentClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentClass")
            .field("name", &self.name)
            .field(
                "parents",
                &self.parents.iter().map(|p| p.name()).collect::<Vec<_>>(),
            )
            .field("fields", &self.fields)
            .field("meta", &self.meta)
            .finish()
    }
}

const _: () = {
    const fn assert_send<T: Send>() {}
    const fn assert_sync<T: Sync>() {}
    assert_send::<DocumentClass>();
    assert_sync::<DocumentClass>();
};

/// Builder for [`DocumentClass`].
pub struct DocumentClassBuilder {
    name: String,
    parents: Vec<Arc<DocumentClass>>,
    fields: Vec<Field>,
    model_validators: Vec<(String, ModelValidatorFn)>,
    meta: Meta,
}

impl DocumentClassBuilder {
    /// Inherits fields, validators and options from `parent`. Parents merge
    /// in the order they are added.
    pub fn extends(mut self, parent: &Arc<DocumentClass>) -> Self {
        self.parents.push(Arc::clone(parent));
        self
    }

    pub fn field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    pub fn fields(mut self, fields: impl IntoIterator<Item = Field>) -> Self {
        self.fields.extend(fields);
        self
    }

    pub fn meta(mut self, meta: Meta) -> Self {
        self.meta = meta;
        self
    }

    /// Adds a cross-field validator for `field`, run after construction with
    /// the document and the field's value. Its result replaces the value.
    pub fn model_validator<F>(mut self, field: impl Into<String>, validator: F) -> Self
    where
        F: Fn(&Document, &Value) -> Result<Value, String> + Send + Sync + 'static,
    {
        self.model_validators.push((field.into(), Arc::new(validator)));
        self
    }

    /// Builds the class and registers it in the process-wide table.
    ///
    /// # Errors
    ///
    /// Fails if the name is taken or the merged fields are inconsistent.
    pub fn build(self) -> Result<Arc<DocumentClass>, RegistryError> {
        self.build_in(ClassRegistry::global())
    }

    /// Builds the class and registers it in `registry`.
    ///
    /// # Errors
    ///
    /// Fails if the name is taken or the merged fields are inconsistent.
    pub fn build_in(self, registry: &ClassRegistry) -> Result<Arc<DocumentClass>, RegistryError> {
        Schema::merge(&self.parents, &self.fields, &self.model_validators, &self.meta)
            .check(&self.name)?;

        let class = Arc::new(DocumentClass {
            name: self.name,
            parents: self.parents,
            fields: self.fields,
            model_validators: self.model_validators,
            meta: self.meta,
            registry: registry.downgrade(),
            schema: OnceLock::new(),
        });
        registry.register(Arc::clone(&class))?;
        Ok(class)
    }
}

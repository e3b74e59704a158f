//! Field descriptors.
//!
//! A [`Field`] describes one named slot of a document: its storage key, its
//! kind, the pipeline its values go through, its default and whether it is
//! required or immutable.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use stillwater::Validation;

use crate::document::assembler;
use crate::error::{DocumentError, DocumentErrors, ErrorKind};
use crate::validation::ValidationContext;
use crate::value::Value;

use super::cast::Cast;
use super::reference::DocumentRef;
use super::validator::{Pipeline, Validator};

/// What a field holds.
#[derive(Debug, Clone)]
pub enum FieldKind {
    /// A single value run through the field's validators.
    Value,
    /// A nested document of the referenced class.
    Document(DocumentRef),
    /// A list whose items go through the given pipeline.
    List(Pipeline),
    /// A string-keyed mapping whose values go through the given pipeline.
    Map(Pipeline),
}

/// A field default: a fixed value cloned per instance, or a producer called
/// once per instance.
#[derive(Clone)]
pub enum DefaultValue {
    Value(Value),
    Producer(Arc<dyn Fn() -> Value + Send + Sync>),
}

impl DefaultValue {
    /// Produces a fresh default.
    pub fn produce(&self) -> Value {
        match self {
            DefaultValue::Value(value) => value.clone(),
            DefaultValue::Producer(producer) => producer(),
        }
    }
}

impl fmt::Debug for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefaultValue::Value(value) => f.debug_tuple("Value").field(value).finish(),
            DefaultValue::Producer(_) => f.write_str("Producer"),
        }
    }
}

/// Where a resolved value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Input,
    Default,
    /// Nothing was given and there is no default.
    Empty,
}

/// A resolved field value.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved {
    pub value: Value,
    pub origin: Origin,
}

/// A field declaration.
///
/// # Example
///
/// ```rust
/// use docmodels::{Field, Validator};
///
/// let rate = Field::float("interest_rate")
///     .external_name("Interest Rate")
///     .validator(Validator::range(0.0, 1.0))
///     .default(0.05);
///
/// assert_eq!(rate.name(), "interest_rate");
/// assert_eq!(rate.key(), "Interest Rate");
/// assert!(!rate.is_required());
/// ```
#[derive(Debug, Clone)]
pub struct Field {
    name: String,
    external_name: Option<String>,
    kind: FieldKind,
    validators: Pipeline,
    default: Option<DefaultValue>,
    required: bool,
    immutable: bool,
}

impl Field {
    /// A value field with no validators.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_kind(name, FieldKind::Value)
    }

    fn with_kind(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            external_name: None,
            kind,
            validators: Pipeline::new(),
            default: None,
            required: false,
            immutable: false,
        }
    }

    fn cast(name: impl Into<String>, cast: Cast) -> Self {
        Self::new(name).validator(cast)
    }

    pub fn integer(name: impl Into<String>) -> Self {
        Self::cast(name, Cast::Integer)
    }

    pub fn float(name: impl Into<String>) -> Self {
        Self::cast(name, Cast::Float)
    }

    pub fn decimal(name: impl Into<String>) -> Self {
        Self::cast(name, Cast::Decimal)
    }

    pub fn string(name: impl Into<String>) -> Self {
        Self::cast(name, Cast::String)
    }

    pub fn boolean(name: impl Into<String>) -> Self {
        Self::cast(name, Cast::Boolean)
    }

    /// A datetime field parsed with the default layout.
    pub fn datetime(name: impl Into<String>) -> Self {
        Self::cast(name, Cast::datetime())
    }

    /// A datetime field parsed with a custom `chrono` layout.
    pub fn datetime_format(name: impl Into<String>, format: impl Into<String>) -> Self {
        Self::cast(name, Cast::datetime_format(format))
    }

    /// A nested document field.
    pub fn document(name: impl Into<String>, class: impl Into<DocumentRef>) -> Self {
        Self::with_kind(name, FieldKind::Document(class.into()))
    }

    /// A list field accepting any items.
    pub fn list(name: impl Into<String>) -> Self {
        Self::with_kind(name, FieldKind::List(Pipeline::new()))
    }

    /// A list field whose items go through `items`.
    pub fn list_of(name: impl Into<String>, items: impl Into<Pipeline>) -> Self {
        Self::with_kind(name, FieldKind::List(items.into()))
    }

    /// A mapping field accepting any values.
    pub fn map(name: impl Into<String>) -> Self {
        Self::with_kind(name, FieldKind::Map(Pipeline::new()))
    }

    /// A mapping field whose values go through `values`.
    pub fn map_of(name: impl Into<String>, values: impl Into<Pipeline>) -> Self {
        Self::with_kind(name, FieldKind::Map(values.into()))
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn immutable(mut self) -> Self {
        self.immutable = true;
        self
    }

    /// Stores the field under `key` instead of its name.
    pub fn external_name(mut self, key: impl Into<String>) -> Self {
        self.external_name = Some(key.into());
        self
    }

    /// A fixed default, cloned for every instance.
    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(DefaultValue::Value(value.into()));
        self
    }

    /// A default produced afresh for every instance.
    pub fn default_with<F>(mut self, producer: F) -> Self
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        self.default = Some(DefaultValue::Producer(Arc::new(producer)));
        self
    }

    /// Appends a stage to the field's pipeline.
    pub fn validator(mut self, stage: impl Into<Validator>) -> Self {
        self.validators.push(stage.into());
        self
    }

    pub fn min_length(self, min: usize) -> Self {
        self.validator(Validator::min_length(min))
    }

    pub fn max_length(self, max: usize) -> Self {
        self.validator(Validator::max_length(max))
    }

    pub fn choices<I, V>(self, choices: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.validator(Validator::choices(choices))
    }

    /// Attribute-style name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Key the value is stored under.
    pub fn key(&self) -> &str {
        self.external_name.as_deref().unwrap_or(&self.name)
    }

    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }

    pub fn validators(&self) -> &Pipeline {
        &self.validators
    }

    pub fn default_value(&self) -> Option<&DefaultValue> {
        self.default.as_ref()
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn is_immutable(&self) -> bool {
        self.immutable
    }

    /// The empty value of the field's kind.
    pub fn empty(&self) -> Value {
        match self.kind {
            FieldKind::Value | FieldKind::Document(_) => Value::Null,
            FieldKind::List(_) => Value::List(Vec::new()),
            FieldKind::Map(_) => Value::Map(IndexMap::new()),
        }
    }

    /// The value for a field missing from the input with no default.
    ///
    /// A document field is built from an empty mapping when its class
    /// accepts one and does not already enclose the field.
    fn absent(&self, ctx: &ValidationContext) -> Value {
        match &self.kind {
            FieldKind::Document(reference) => {
                assembler::embed_empty(reference, ctx).unwrap_or(Value::Null)
            }
            _ => self.empty(),
        }
    }

    /// Lazy class names this field refers to, including inside item pipelines.
    pub fn lazy_refs(&self) -> Vec<&str> {
        let mut refs: Vec<&str> = match &self.kind {
            FieldKind::Document(reference) => reference.lazy_name().into_iter().collect(),
            FieldKind::List(items) | FieldKind::Map(items) => stage_refs(items).collect(),
            FieldKind::Value => Vec::new(),
        };
        refs.extend(stage_refs(&self.validators));
        refs
    }

    /// Resolves the raw input for this field.
    ///
    /// `ctx` must already point at the field. An absent value falls back to
    /// the default, then to the empty value; a null is kept as null unless
    /// the field is required. Required fields also reject an empty string.
    pub fn resolve(
        &self,
        raw: Option<Value>,
        ctx: &ValidationContext,
        document: &str,
    ) -> Validation<Resolved, DocumentErrors> {
        let (value, origin) = match raw {
            Some(value) => (value, Origin::Input),
            None => match &self.default {
                Some(default) => (default.produce(), Origin::Default),
                None if self.required => return self.missing(ctx, document),
                None => {
                    return Validation::Success(Resolved {
                        value: self.absent(ctx),
                        origin: Origin::Empty,
                    })
                }
            },
        };

        if self.required && (value.is_null() || value.as_str() == Some("")) {
            return self.missing(ctx, document);
        }
        if value.is_null() {
            return Validation::Success(Resolved {
                value: Value::Null,
                origin,
            });
        }

        self.run(value, ctx)
            .map(|value| Resolved { value, origin })
    }

    fn missing(&self, ctx: &ValidationContext, document: &str) -> Validation<Resolved, DocumentErrors> {
        Validation::Failure(DocumentErrors::at(
            ctx.path(),
            ErrorKind::RequiredField {
                field: self.name.clone(),
                document: document.to_string(),
            },
        ))
    }

    /// Runs a non-null value through the field's kind handling and validators.
    pub(crate) fn run(&self, value: Value, ctx: &ValidationContext) -> Validation<Value, DocumentErrors> {
        let built = match &self.kind {
            FieldKind::Value => Validation::Success(value),
            FieldKind::Document(reference) => assembler::embed(reference, value, ctx, &self.name),
            FieldKind::List(items) => self.build_list(items, value, ctx),
            FieldKind::Map(items) => self.build_map(items, value, ctx),
        };
        match built {
            Validation::Success(value) => self.validators.run(value, ctx, &self.name),
            failure => failure,
        }
    }

    /// Validates one new item of a list field at `index`.
    pub(crate) fn run_item(
        &self,
        item: Value,
        index: usize,
        ctx: &ValidationContext,
    ) -> Validation<Value, DocumentErrors> {
        match &self.kind {
            FieldKind::List(items) => items.run(item, &ctx.push_index(index), &self.name),
            _ => Validation::Failure(self.mismatch(ctx, "list field", &self.empty())),
        }
    }

    fn build_list(
        &self,
        items: &Pipeline,
        value: Value,
        ctx: &ValidationContext,
    ) -> Validation<Value, DocumentErrors> {
        let input = match value {
            Value::List(items) => items,
            other => return Validation::Failure(self.mismatch(ctx, "list", &other)),
        };

        let mut errors: Vec<DocumentError> = Vec::new();
        let mut built = Vec::with_capacity(input.len());
        for (index, item) in input.into_iter().enumerate() {
            match items.run(item, &ctx.push_index(index), &self.name) {
                Validation::Success(item) => built.push(item),
                Validation::Failure(e) => errors.extend(e),
            }
        }

        match DocumentErrors::from_vec(errors) {
            Some(errors) => Validation::Failure(errors),
            None => Validation::Success(Value::List(built)),
        }
    }

    fn build_map(
        &self,
        items: &Pipeline,
        value: Value,
        ctx: &ValidationContext,
    ) -> Validation<Value, DocumentErrors> {
        let input = match value {
            Value::Map(map) => map,
            Value::Document(doc) => doc.into_mapping(),
            other => return Validation::Failure(self.mismatch(ctx, "mapping", &other)),
        };

        let mut errors: Vec<DocumentError> = Vec::new();
        let mut built = IndexMap::with_capacity(input.len());
        for (key, item) in input {
            match items.run(item, &ctx.push_key(&key), &self.name) {
                Validation::Success(item) => {
                    built.insert(key, item);
                }
                Validation::Failure(e) => errors.extend(e),
            }
        }

        match DocumentErrors::from_vec(errors) {
            Some(errors) => Validation::Failure(errors),
            None => Validation::Success(Value::Map(built)),
        }
    }

    fn mismatch(&self, ctx: &ValidationContext, expected: &str, got: &Value) -> DocumentErrors {
        DocumentErrors::at(
            ctx.path(),
            ErrorKind::TypeMismatch {
                field: self.name.clone(),
                expected: expected.to_string(),
                got: got.describe(),
            },
        )
    }
}

fn stage_refs(pipeline: &Pipeline) -> impl Iterator<Item = &str> {
    pipeline.stages().filter_map(|stage| match stage {
        Validator::Document(reference) => reference.lazy_name(),
        _ => None,
    })
}

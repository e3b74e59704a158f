//! Builds validated documents from raw input.

use std::sync::Arc;

use indexmap::IndexMap;
use stillwater::Validation;

use crate::error::{DocumentError, DocumentErrors, ErrorKind};
use crate::schema::{DocumentRef, Origin};
use crate::validation::ValidationContext;
use crate::value::Value;

use super::{Document, DocumentClass};

/// Constructs a document of `class` from `data`, with `overrides` winning
/// over keys of `data`. `at` locates the document inside its parent.
///
/// Field failures accumulate; a cross-field validator failure stops
/// construction at once.
pub(crate) fn construct(
    class: &Arc<DocumentClass>,
    data: Value,
    overrides: IndexMap<String, Value>,
    at: &ValidationContext,
) -> Validation<Document, DocumentErrors> {
    let path = at.path();
    tracing::trace!(class = class.name(), path = %path, "constructing document");

    let mut input = match data {
        Value::Map(map) => map,
        Value::Null => IndexMap::new(),
        Value::Document(doc) => doc.into_mapping(),
        other => {
            return Validation::Failure(DocumentErrors::at(
                path,
                ErrorKind::TypeMismatch {
                    field: class.name().to_string(),
                    expected: "mapping".to_string(),
                    got: other.describe(),
                },
            ))
        }
    };
    input.extend(overrides);

    let schema = class.schema();
    let policy = schema.policy();
    let ctx = at.enter(class);

    let mut errors: Vec<DocumentError> = Vec::new();
    let mut values: IndexMap<String, Value> = IndexMap::with_capacity(schema.len());

    for field in schema.fields() {
        let raw = input.shift_remove(field.key());
        match field.resolve(raw, &ctx.push_field(field.key()), class.name()) {
            Validation::Success(resolved) => {
                if policy.omit_missing_fields && resolved.origin == Origin::Empty {
                    continue;
                }
                values.insert(field.key().to_string(), resolved.value);
            }
            Validation::Failure(e) => errors.extend(e),
        }
    }

    for (key, value) in input {
        let field_path = path.push_field(&key);
        if schema.field_by_name(&key).is_some() {
            errors.push(DocumentError::new(
                field_path,
                ErrorKind::FieldCollision {
                    field: key,
                    document: class.name().to_string(),
                },
            ));
        } else if policy.allow_extra_fields {
            values.insert(key, value);
        } else {
            errors.push(DocumentError::new(
                field_path,
                ErrorKind::UnknownField {
                    field: key,
                    document: class.name().to_string(),
                },
            ));
        }
    }

    if let Some(errors) = DocumentErrors::from_vec(errors) {
        tracing::trace!(class = class.name(), errors = errors.len(), "document rejected");
        return Validation::Failure(errors);
    }

    let mut document = Document::new(Arc::clone(class), values);

    for (name, validator) in schema.model_validators() {
        let Some(field) = schema.field_by_name(name) else {
            continue;
        };
        let key = field.key();
        // Fields left out by omit_missing_fields are not validated.
        let Some(current) = document.raw(key) else {
            continue;
        };
        match validator(&document, current) {
            Ok(value) => document.store(key, value),
            Err(message) => {
                tracing::trace!(class = class.name(), field = key, "model validator rejected document");
                return Validation::Failure(DocumentErrors::at(
                    &path.push_field(key),
                    ErrorKind::ModelValidation { message },
                ));
            }
        }
    }

    if policy.immutable {
        document.freeze();
    }

    tracing::trace!(class = class.name(), fields = document.len(), "document constructed");
    Validation::Success(document)
}

/// Resolves a value for a document-typed slot.
///
/// Instances of the target class are kept as they are. Subclass instances
/// are narrowed to the keys the target class accepts and constructed again,
/// as are mappings and documents of other classes.
pub(crate) fn embed(
    reference: &DocumentRef,
    value: Value,
    ctx: &ValidationContext,
    field: &str,
) -> Validation<Value, DocumentErrors> {
    let class = match reference.resolve(ctx) {
        Ok(class) => class,
        Err(errors) => return Validation::Failure(errors),
    };

    match value {
        Value::Document(doc) if Arc::ptr_eq(doc.class(), &class) => {
            Validation::Success(Value::Document(doc))
        }
        Value::Document(doc) if doc.class().is_subclass_of(&class) => {
            let schema = class.schema();
            let open = schema.policy().allow_extra_fields;
            let narrowed: IndexMap<String, Value> = doc
                .into_mapping()
                .into_iter()
                .filter(|(key, _)| open || schema.field_by_key(key).is_some())
                .collect();
            construct(&class, Value::Map(narrowed), IndexMap::new(), ctx).map(Value::Document)
        }
        data @ (Value::Map(_) | Value::Document(_)) => {
            construct(&class, data, IndexMap::new(), ctx).map(Value::Document)
        }
        other => Validation::Failure(DocumentErrors::at(
            ctx.path(),
            ErrorKind::TypeMismatch {
                field: field.to_string(),
                expected: class.name().to_string(),
                got: other.describe(),
            },
        )),
    }
}

/// Builds a document for an absent document-typed slot from an empty
/// mapping, so the nested class's defaults apply.
///
/// Returns `None` when the class cannot be resolved, already encloses the
/// slot, or rejects an empty input.
pub(crate) fn embed_empty(reference: &DocumentRef, ctx: &ValidationContext) -> Option<Value> {
    let class = reference.resolve(ctx).ok()?;
    if ctx.encloses(class.name()) {
        return None;
    }
    construct(&class, Value::Map(IndexMap::new()), IndexMap::new(), ctx)
        .into_result()
        .ok()
        .map(Value::Document)
}

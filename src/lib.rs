//! # docmodels
//!
//! Declarative, validated documents built from loosely-typed key/value input.
//!
//! ## Overview
//!
//! A document class is a named, ordered set of typed fields with defaults,
//! required/optional status, validator pipelines, nested documents and
//! collection fields. Constructing a document from input reports *every*
//! offending field at once: field failures accumulate through stillwater's
//! `Validation` type, and each error carries the path of the value that
//! caused it.
//!
//! ## Core Types
//!
//! - [`DocumentClass`]: a declared document type, built with [`DocumentClass::builder`]
//! - [`Field`]: a field declaration with its [`Pipeline`] of [`Validator`] stages
//! - [`Document`]: a validated instance with controlled mutation
//! - [`ClassRegistry`]: the class table lazy references resolve against
//! - [`DocumentError`] / [`DocumentErrors`]: failures with their [`FieldPath`]
//!
//! ## Example
//!
//! ```rust
//! use docmodels::{ClassRegistry, DocumentClass, Field, Meta};
//! use serde_json::json;
//!
//! let registry = ClassRegistry::new();
//! let user = DocumentClass::builder("User")
//!     .field(Field::string("name").required().max_length(20))
//!     .field(Field::integer("age"))
//!     .field(Field::list_of("roles", docmodels::Cast::String).default(vec!["reader"]))
//!     .meta(Meta::new().omit_missing_fields(true))
//!     .build_in(&registry)
//!     .unwrap();
//!
//! let alice = user.create(json!({"name": "Alice"})).unwrap();
//! assert_eq!(alice.to_json(), json!({"name": "Alice", "roles": ["reader"]}));
//!
//! // Every invalid field is reported
//! let errors = user.create(json!({"age": "unknown", "email": "a@b"})).unwrap_err();
//! assert_eq!(errors.len(), 3);
//! ```

pub mod document;
pub mod error;
pub mod path;
pub mod registry;
pub mod schema;
pub mod validation;
pub mod value;

pub use document::{Document, DocumentClass, DocumentClassBuilder};
pub use error::{DocumentError, DocumentErrors, ErrorKind};
pub use path::{FieldPath, PathSegment};
pub use registry::{ClassRegistry, RegistryError};
pub use schema::{
    Cast, DefaultValue, DocumentRef, Field, FieldKind, Meta, MetaPolicy, ModelValidatorFn,
    Pipeline, Schema, Validator,
};
pub use validation::ValidationContext;
pub use value::{Value, ValueKind, DATETIME_FORMAT};

/// Type alias for validation results using DocumentErrors
pub type ValidationResult<T> = stillwater::Validation<T, DocumentErrors>;

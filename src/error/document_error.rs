//! Document error types.
//!
//! This module provides [`DocumentError`] for single failures and
//! [`DocumentErrors`] for accumulating the failures of one operation.

use std::fmt::{self, Display};

use stillwater::prelude::*;

use crate::path::FieldPath;

/// The kind of a document failure.
///
/// Every kind has a stable machine-readable [`code`](ErrorKind::code) so
/// callers can branch on it without matching on messages.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ErrorKind {
    /// A required field is absent (or null) and has no default.
    #[error("field '{field}' is required for {document}")]
    RequiredField { field: String, document: String },

    /// A value cannot be coerced to the field's declared type or class.
    #[error("field '{field}' expected {expected}, got {got}")]
    TypeMismatch {
        field: String,
        expected: String,
        got: String,
    },

    /// A validator stage rejected the value.
    #[error("invalid value for field '{field}': {cause}")]
    Validation { field: String, cause: String },

    /// An input key matches no declared field and extra fields are disallowed.
    #[error("unknown field '{field}' for {document}")]
    UnknownField { field: String, document: String },

    /// An extra key would shadow a declared field stored under another key.
    #[error("key '{field}' collides with a declared field of {document}")]
    FieldCollision { field: String, document: String },

    /// A lazy document reference names a class that was never registered.
    #[error("document class '{name}' is not registered")]
    UnresolvedReference { name: String },

    /// A set was attempted on an immutable field or a frozen document.
    #[error("field '{field}' is immutable")]
    ImmutableField { field: String },

    /// A cross-field validator rejected the constructed document.
    #[error("{message}")]
    ModelValidation { message: String },
}

impl ErrorKind {
    /// Returns the machine-readable code for this kind.
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::RequiredField { .. } => "required",
            ErrorKind::TypeMismatch { .. } => "type_mismatch",
            ErrorKind::Validation { .. } => "validation",
            ErrorKind::UnknownField { .. } => "unknown_field",
            ErrorKind::FieldCollision { .. } => "field_collision",
            ErrorKind::UnresolvedReference { .. } => "unresolved_reference",
            ErrorKind::ImmutableField { .. } => "immutable_field",
            ErrorKind::ModelValidation { .. } => "model_validation",
        }
    }

    /// Returns the field this kind is about, when it names one.
    pub fn field(&self) -> Option<&str> {
        match self {
            ErrorKind::RequiredField { field, .. }
            | ErrorKind::TypeMismatch { field, .. }
            | ErrorKind::Validation { field, .. }
            | ErrorKind::UnknownField { field, .. }
            | ErrorKind::FieldCollision { field, .. }
            | ErrorKind::ImmutableField { field } => Some(field),
            ErrorKind::UnresolvedReference { .. } | ErrorKind::ModelValidation { .. } => None,
        }
    }
}

/// A single document failure with the path of the offending value.
///
/// # Example
///
/// ```rust
/// use docmodels::{DocumentError, ErrorKind, FieldPath};
///
/// let error = DocumentError::new(
///     FieldPath::root().push_field("address").push_field("street"),
///     ErrorKind::RequiredField {
///         field: "street".to_string(),
///         document: "Address".to_string(),
///     },
/// );
///
/// assert_eq!(error.code(), "required");
/// assert_eq!(
///     error.to_string(),
///     "address.street: field 'street' is required for Address"
/// );
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentError {
    /// Where in the document the failure occurred.
    pub path: FieldPath,
    /// What went wrong.
    pub kind: ErrorKind,
}

impl DocumentError {
    /// Creates a new document error.
    pub fn new(path: FieldPath, kind: ErrorKind) -> Self {
        Self { path, kind }
    }

    /// Returns the machine-readable code of the error kind.
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }
}

impl Display for DocumentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_root() {
            write!(f, "(root): {}", self.kind)
        } else {
            write!(f, "{}: {}", self.path, self.kind)
        }
    }
}

impl std::error::Error for DocumentError {}

const _: () = {
    const fn assert_send<T: Send>() {}
    const fn assert_sync<T: Sync>() {}
    assert_send::<DocumentError>();
    assert_sync::<DocumentError>();
};

/// A non-empty collection of document errors.
///
/// Field failures of one construction are accumulated, so a caller sees every
/// offending field at once. `DocumentErrors` implements `Semigroup`, allowing
/// errors from several fields to be combined:
///
/// ```rust
/// use docmodels::{DocumentError, DocumentErrors, ErrorKind, FieldPath};
/// use stillwater::prelude::*;
///
/// let missing = DocumentErrors::single(DocumentError::new(
///     FieldPath::from_field("name"),
///     ErrorKind::RequiredField { field: "name".into(), document: "Person".into() },
/// ));
/// let unknown = DocumentErrors::single(DocumentError::new(
///     FieldPath::from_field("nick"),
///     ErrorKind::UnknownField { field: "nick".into(), document: "Person".into() },
/// ));
///
/// let combined = missing.combine(unknown);
/// assert_eq!(combined.len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentErrors(NonEmptyVec<DocumentError>);

impl DocumentErrors {
    /// Creates a `DocumentErrors` containing a single error.
    pub fn single(error: DocumentError) -> Self {
        Self(NonEmptyVec::singleton(error))
    }

    /// Creates a `DocumentErrors` holding one error of `kind` at `path`.
    pub fn at(path: &FieldPath, kind: ErrorKind) -> Self {
        Self::single(DocumentError::new(path.clone(), kind))
    }

    /// Creates a `DocumentErrors` from a `NonEmptyVec` of errors.
    pub fn from_non_empty(errors: NonEmptyVec<DocumentError>) -> Self {
        Self(errors)
    }

    /// Returns the number of errors in this collection.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false; the collection is guaranteed non-empty.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Returns an iterator over the contained errors.
    pub fn iter(&self) -> impl Iterator<Item = &DocumentError> {
        self.0.iter()
    }

    /// Returns all errors at the specified path.
    pub fn at_path(&self, path: &FieldPath) -> Vec<&DocumentError> {
        self.0.iter().filter(|e| &e.path == path).collect()
    }

    /// Returns all errors with the specified code.
    pub fn with_code(&self, code: &str) -> Vec<&DocumentError> {
        self.0.iter().filter(|e| e.code() == code).collect()
    }

    /// Returns the first error in the collection.
    pub fn first(&self) -> &DocumentError {
        self.0.head()
    }

    /// Returns the kind of the first error.
    pub fn kind(&self) -> &ErrorKind {
        &self.first().kind
    }

    /// Converts this collection into a `Vec<DocumentError>`.
    pub fn into_vec(self) -> Vec<DocumentError> {
        self.0.into_vec()
    }

    /// Creates a `DocumentErrors` from a `Vec<DocumentError>`.
    ///
    /// Returns `None` if the vec is empty.
    pub fn from_vec(errors: Vec<DocumentError>) -> Option<Self> {
        NonEmptyVec::from_vec(errors).map(Self)
    }
}

impl From<DocumentError> for DocumentErrors {
    fn from(error: DocumentError) -> Self {
        Self::single(error)
    }
}

impl Semigroup for DocumentErrors {
    fn combine(self, other: Self) -> Self {
        DocumentErrors(self.0.combine(other.0))
    }
}

impl Display for DocumentErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Document validation failed with {} error(s):", self.len())?;
        for (i, error) in self.iter().enumerate() {
            writeln!(f, "  {}. {}", i + 1, error)?;
        }
        Ok(())
    }
}

impl std::error::Error for DocumentErrors {}

impl IntoIterator for DocumentErrors {
    type Item = DocumentError;
    type IntoIter = std::vec::IntoIter<DocumentError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_vec().into_iter()
    }
}

impl<'a> IntoIterator for &'a DocumentErrors {
    type Item = &'a DocumentError;
    type IntoIter = Box<dyn Iterator<Item = &'a DocumentError> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.0.iter())
    }
}

const _: () = {
    const fn assert_send<T: Send>() {}
    const fn assert_sync<T: Sync>() {}
    assert_send::<DocumentErrors>();
    assert_sync::<DocumentErrors>();
};

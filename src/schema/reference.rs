//! References from document fields to the class they hold.

use std::fmt;
use std::sync::Arc;

use crate::document::DocumentClass;
use crate::error::{DocumentErrors, ErrorKind};
use crate::validation::ValidationContext;

/// The class a document field holds: either a direct handle or a name that is
/// looked up in the class table when a value is validated.
///
/// Lazy names allow self-references and classes that refer to each other
/// regardless of which one is declared first.
///
/// ```rust
/// use docmodels::{ClassRegistry, DocumentClass, Field};
///
/// let registry = ClassRegistry::new();
/// let node = DocumentClass::builder("Node")
///     .field(Field::integer("value").required())
///     .field(Field::document("next", "Node"))
///     .build_in(&registry)
///     .unwrap();
///
/// let list = node
///     .create(serde_json::json!({"value": 1, "next": {"value": 2}}))
///     .unwrap();
/// assert_eq!(list["next"]["value"], docmodels::Value::Int(2));
/// ```
#[derive(Clone)]
pub enum DocumentRef {
    Class(Arc<DocumentClass>),
    Lazy(String),
}

impl DocumentRef {
    /// The referenced class name.
    pub fn name(&self) -> &str {
        match self {
            DocumentRef::Class(class) => class.name(),
            DocumentRef::Lazy(name) => name,
        }
    }

    /// Returns the lazy name, if this reference still needs a lookup.
    pub fn lazy_name(&self) -> Option<&str> {
        match self {
            DocumentRef::Lazy(name) => Some(name),
            DocumentRef::Class(_) => None,
        }
    }

    /// Resolves the reference against the class table of `ctx`.
    pub fn resolve(&self, ctx: &ValidationContext) -> Result<Arc<DocumentClass>, DocumentErrors> {
        match self {
            DocumentRef::Class(class) => Ok(Arc::clone(class)),
            DocumentRef::Lazy(name) => ctx.resolve(name).ok_or_else(|| {
                DocumentErrors::at(
                    ctx.path(),
                    ErrorKind::UnresolvedReference { name: name.clone() },
                )
            }),
        }
    }
}

impl fmt::Debug for DocumentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentRef::Class(class) => write!(f, "Class({})", class.name()),
            DocumentRef::Lazy(name) => write!(f, "Lazy({})", name),
        }
    }
}

impl From<Arc<DocumentClass>> for DocumentRef {
    fn from(class: Arc<DocumentClass>) -> Self {
        DocumentRef::Class(class)
    }
}

impl From<&Arc<DocumentClass>> for DocumentRef {
    fn from(class: &Arc<DocumentClass>) -> Self {
        DocumentRef::Class(Arc::clone(class))
    }
}

impl From<&str> for DocumentRef {
    fn from(name: &str) -> Self {
        DocumentRef::Lazy(name.to_string())
    }
}

impl From<String> for DocumentRef {
    fn from(name: String) -> Self {
        DocumentRef::Lazy(name)
    }
}

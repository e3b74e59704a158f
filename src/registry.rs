//! Class table for named document classes and lazy reference resolution.
//!
//! This module provides [`ClassRegistry`], which stores document classes by
//! name so that fields can refer to classes that are declared later (or to
//! their own class).

use std::fmt;
use std::sync::{Arc, LazyLock, Weak};

use indexmap::IndexMap;
use parking_lot::RwLock;
use serde_json::json;

use crate::document::{Document, DocumentClass};
use crate::error::{DocumentErrors, ErrorKind};
use crate::path::FieldPath;
use crate::value::Value;

/// Type alias for the class storage map.
type ClassMap = IndexMap<String, Arc<DocumentClass>>;

static GLOBAL: LazyLock<ClassRegistry> = LazyLock::new(ClassRegistry::new);

/// A thread-safe, append-only table of document classes.
///
/// [`DocumentClassBuilder::build`](crate::DocumentClassBuilder::build)
/// registers into the process-wide [`ClassRegistry::global`] table;
/// [`build_in`](crate::DocumentClassBuilder::build_in) registers into an
/// isolated table. Lazy references are resolved against the table the
/// owning class was registered in.
///
/// # Thread Safety
///
/// The table lives behind `Arc<RwLock<...>>`: lookups during validation take
/// the read lock, registration takes the write lock.
///
/// # Example
///
/// ```rust
/// use docmodels::{ClassRegistry, DocumentClass, Field};
/// use serde_json::json;
///
/// let registry = ClassRegistry::new();
/// DocumentClass::builder("Post")
///     .field(Field::string("title").required())
///     .field(Field::list_of("comments", docmodels::Validator::document("Comment")))
///     .build_in(&registry)
///     .unwrap();
///
/// assert_eq!(registry.unresolved_refs(), vec!["Comment"]);
///
/// DocumentClass::builder("Comment")
///     .field(Field::string("body"))
///     .build_in(&registry)
///     .unwrap();
///
/// assert!(registry.unresolved_refs().is_empty());
/// let post = registry
///     .create("Post", json!({"title": "Hi", "comments": [{"body": "First"}]}))
///     .unwrap();
/// assert_eq!(post.to_json(), json!({"title": "Hi", "comments": [{"body": "First"}]}));
/// ```
#[derive(Clone, Default)]
pub struct ClassRegistry {
    classes: Arc<RwLock<ClassMap>>,
}

impl ClassRegistry {
    /// Creates a new empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide table.
    pub fn global() -> &'static ClassRegistry {
        &GLOBAL
    }

    /// Registers a class under its name.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::DuplicateName` if the name is already taken.
    pub fn register(&self, class: Arc<DocumentClass>) -> Result<(), RegistryError> {
        let mut classes = self.classes.write();
        if classes.contains_key(class.name()) {
            return Err(RegistryError::DuplicateName(class.name().to_string()));
        }

        tracing::debug!(
            class = class.name(),
            fields = class.declared_fields().len(),
            "registered document class"
        );
        classes.insert(class.name().to_string(), class);
        Ok(())
    }

    /// Retrieves a class by name.
    pub fn get(&self, name: &str) -> Option<Arc<DocumentClass>> {
        self.classes.read().get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.classes.read().contains_key(name)
    }

    /// Registered names in registration order.
    pub fn names(&self) -> Vec<String> {
        self.classes.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.classes.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.read().is_empty()
    }

    /// Lazy class names referenced by registered classes that are not
    /// (yet) registered, sorted and deduplicated.
    pub fn unresolved_refs(&self) -> Vec<String> {
        let classes = self.classes.read();
        let mut unresolved: Vec<String> = classes
            .values()
            .flat_map(|class| class.declared_fields().iter())
            .flat_map(|field| field.lazy_refs())
            .filter(|name| !classes.contains_key(*name))
            .map(str::to_string)
            .collect();

        unresolved.sort();
        unresolved.dedup();
        unresolved
    }

    /// Constructs a document of the class registered under `name`.
    ///
    /// # Errors
    ///
    /// Fails with an `UnresolvedReference` error if no such class exists,
    /// or with the construction errors of the class.
    pub fn create(&self, name: &str, data: impl Into<Value>) -> Result<Document, DocumentErrors> {
        let class = self.get(name).ok_or_else(|| {
            DocumentErrors::at(
                &FieldPath::root(),
                ErrorKind::UnresolvedReference {
                    name: name.to_string(),
                },
            )
        })?;
        class.create(data)
    }

    /// Summary of registered classes and their storage keys.
    pub fn describe(&self) -> serde_json::Value {
        let classes = self.classes.read();
        let mut summary = serde_json::Map::new();
        for (name, class) in classes.iter() {
            let parents: Vec<&str> = class.parents().iter().map(|p| p.name()).collect();
            let keys: Vec<&str> = class.declared_fields().iter().map(|f| f.key()).collect();
            summary.insert(name.clone(), json!({ "extends": parents, "fields": keys }));
        }
        serde_json::Value::Object(summary)
    }

    /// A non-owning handle, held by registered classes.
    pub(crate) fn downgrade(&self) -> RegistryHandle {
        RegistryHandle(Arc::downgrade(&self.classes))
    }
}

impl fmt::Debug for ClassRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassRegistry")
            .field("classes", &self.names())
            .finish()
    }
}

/// Weak reference from a class back to its table.
#[derive(Clone, Debug, Default)]
pub(crate) struct RegistryHandle(Weak<RwLock<ClassMap>>);

impl RegistryHandle {
    pub(crate) fn upgrade(&self) -> Option<ClassRegistry> {
        self.0.upgrade().map(|classes| ClassRegistry { classes })
    }
}

/// Errors that can occur while declaring document classes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// Attempted to register a class with a name that already exists.
    #[error("document class '{0}' already registered")]
    DuplicateName(String),

    /// Two fields of one class are stored under the same key.
    #[error("document class '{document}' stores two fields under key '{key}'")]
    ConflictingKey { document: String, key: String },

    /// A cross-field validator names a field the class does not declare.
    #[error("document class '{document}' has a validator for unknown field '{field}'")]
    UnknownValidatorField { document: String, field: String },
}

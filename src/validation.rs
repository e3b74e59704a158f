//! Validation context for field resolution.
//!
//! [`ValidationContext`] carries the class table that lazy document
//! references resolve against, the path of the value being validated and
//! the classes of the documents that enclose it.

use std::sync::Arc;

use crate::document::DocumentClass;
use crate::path::FieldPath;
use crate::registry::ClassRegistry;

/// Context passed down the validation call chain.
///
/// Each document class resolves lazy references against the table it was
/// registered in, so a nested construction switches to the nested class's
/// context while keeping the path.
#[derive(Clone, Debug, Default)]
pub struct ValidationContext {
    registry: Option<ClassRegistry>,
    path: FieldPath,
    enclosing: Arc<Vec<String>>,
}

impl ValidationContext {
    /// A context with no class table, rooted at the document itself.
    ///
    /// Lazy references fail to resolve in a detached context.
    pub fn detached() -> Self {
        Self::default()
    }

    /// A context rooted at `path` with an explicit class table.
    pub fn new(registry: ClassRegistry, path: FieldPath) -> Self {
        Self {
            registry: Some(registry),
            path,
            enclosing: Arc::default(),
        }
    }

    /// The context for validating fields of `class` at `path`.
    pub fn for_class(class: &DocumentClass, path: FieldPath) -> Self {
        Self {
            registry: class.registry(),
            path,
            enclosing: Arc::new(vec![class.name().to_string()]),
        }
    }

    /// The context for the fields of a `class` document stored at this
    /// context's path.
    pub(crate) fn enter(&self, class: &DocumentClass) -> Self {
        let mut enclosing = Vec::clone(&self.enclosing);
        enclosing.push(class.name().to_string());
        Self {
            registry: class.registry(),
            path: self.path.clone(),
            enclosing: Arc::new(enclosing),
        }
    }

    /// True if a document of class `name` encloses the current value.
    pub fn encloses(&self, name: &str) -> bool {
        self.enclosing.iter().any(|class| class == name)
    }

    pub fn push_field(&self, name: &str) -> Self {
        self.with_path(self.path.push_field(name))
    }

    pub fn push_index(&self, index: usize) -> Self {
        self.with_path(self.path.push_index(index))
    }

    pub fn push_key(&self, key: &str) -> Self {
        self.with_path(self.path.push_key(key))
    }

    fn with_path(&self, path: FieldPath) -> Self {
        Self {
            registry: self.registry.clone(),
            path,
            enclosing: Arc::clone(&self.enclosing),
        }
    }

    /// Path of the value currently being validated.
    pub fn path(&self) -> &FieldPath {
        &self.path
    }

    /// Looks up a class by name in this context's class table.
    pub fn resolve(&self, name: &str) -> Option<Arc<DocumentClass>> {
        self.registry.as_ref()?.get(name)
    }
}

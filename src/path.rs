//! Field paths for locating values inside nested documents.
//!
//! This module provides [`FieldPath`] and [`PathSegment`], used by every
//! [`DocumentError`](crate::DocumentError) to say where a failure happened.

use std::fmt::{self, Display};

/// A segment of a field path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    /// A document field, addressed by its external name (e.g. `address`)
    Field(String),
    /// A list element (e.g. `[0]`)
    Index(usize),
    /// An entry of a mapping field (e.g. `["alice"]`)
    Key(String),
}

impl PathSegment {
    /// Creates a new field segment.
    pub fn field(name: impl Into<String>) -> Self {
        PathSegment::Field(name.into())
    }

    /// Creates a new index segment.
    pub fn index(idx: usize) -> Self {
        PathSegment::Index(idx)
    }

    /// Creates a new mapping-key segment.
    pub fn key(key: impl Into<String>) -> Self {
        PathSegment::Key(key.into())
    }
}

/// A path to a value inside a document.
///
/// External names may contain characters that are not valid identifiers
/// (`"Interest Rate"`); such fields are rendered in bracket form so the
/// path stays unambiguous.
///
/// # Example
///
/// ```rust
/// use docmodels::FieldPath;
///
/// let path = FieldPath::root()
///     .push_field("comments")
///     .push_index(0)
///     .push_field("author")
///     .push_field("Interest Rate");
///
/// assert_eq!(path.to_string(), r#"comments[0].author["Interest Rate"]"#);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct FieldPath {
    segments: Vec<PathSegment>,
}

impl FieldPath {
    /// Creates an empty path representing the document itself.
    pub fn root() -> Self {
        Self::default()
    }

    /// Creates a path from a single field segment.
    pub fn from_field(name: impl Into<String>) -> Self {
        Self {
            segments: vec![PathSegment::field(name)],
        }
    }

    /// Returns a new path with a field segment appended.
    pub fn push_field(&self, name: impl Into<String>) -> Self {
        self.push(PathSegment::field(name))
    }

    /// Returns a new path with a list index appended.
    pub fn push_index(&self, index: usize) -> Self {
        self.push(PathSegment::index(index))
    }

    /// Returns a new path with a mapping key appended.
    pub fn push_key(&self, key: impl Into<String>) -> Self {
        self.push(PathSegment::key(key))
    }

    fn push(&self, segment: PathSegment) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment);
        Self { segments }
    }

    /// Returns true if this is the root path (no segments).
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Returns the number of segments in this path.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Returns true if this path has no segments.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Returns an iterator over the path segments.
    pub fn segments(&self) -> impl Iterator<Item = &PathSegment> {
        self.segments.iter()
    }

    /// Returns the parent path, or None for the root.
    pub fn parent(&self) -> Option<Self> {
        let (_, init) = self.segments.split_last()?;
        Some(Self {
            segments: init.to_vec(),
        })
    }

    /// Returns the last segment, or None if this is root.
    pub fn last(&self) -> Option<&PathSegment> {
        self.segments.last()
    }
}

// Plain identifiers print dotted, anything else in brackets.
fn is_plain(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_alphanumeric() || c == '_' || c == '-')
}

impl Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                PathSegment::Field(name) if is_plain(name) => {
                    if i > 0 {
                        write!(f, ".")?;
                    }
                    write!(f, "{}", name)?;
                }
                PathSegment::Field(name) | PathSegment::Key(name) => {
                    write!(f, "[{:?}]", name)?;
                }
                PathSegment::Index(idx) => write!(f, "[{}]", idx)?,
            }
        }
        Ok(())
    }
}

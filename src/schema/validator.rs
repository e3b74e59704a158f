//! Validator stages and the pipeline that runs them.
//!
//! A [`Pipeline`] is an ordered list of [`Validator`] stages. Each stage
//! receives the output of the previous one; the first failing stage stops
//! the pipeline.

use std::fmt;
use std::sync::Arc;

use regex::Regex;
use stillwater::Validation;

use crate::document::assembler;
use crate::error::{DocumentErrors, ErrorKind};
use crate::validation::ValidationContext;
use crate::value::{Value, ValueKind};

use super::cast::Cast;
use super::reference::DocumentRef;

/// Predicate used by [`Validator::Check`].
pub type CheckFn = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

/// Function used by [`Validator::Transform`].
pub type TransformFn = Arc<dyn Fn(Value) -> Result<Value, String> + Send + Sync>;

/// A single pipeline stage.
#[derive(Clone)]
pub enum Validator {
    /// Coerce the value into a type; failure is a type mismatch.
    Cast(Cast),
    /// Reject values for which the predicate returns false.
    Check { check: CheckFn, message: String },
    /// Replace the value, or reject it with a message.
    Transform(TransformFn),
    /// Build a nested document from a mapping.
    Document(DocumentRef),
}

impl Validator {
    /// A check stage from a predicate and the message reported on rejection.
    pub fn check<F>(check: F, message: impl Into<String>) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        Validator::Check {
            check: Arc::new(check),
            message: message.into(),
        }
    }

    /// A transform stage.
    pub fn transform<F>(transform: F) -> Self
    where
        F: Fn(Value) -> Result<Value, String> + Send + Sync + 'static,
    {
        Validator::Transform(Arc::new(transform))
    }

    /// A nested-document stage.
    pub fn document(reference: impl Into<DocumentRef>) -> Self {
        Validator::Document(reference.into())
    }

    /// Length (characters for strings, items for collections) must be at least `min`.
    pub fn min_length(min: usize) -> Self {
        Self::check(
            move |v| v.length().is_some_and(|len| len >= min),
            format!("length must be at least {}", min),
        )
    }

    /// Length (characters for strings, items for collections) must be at most `max`.
    pub fn max_length(max: usize) -> Self {
        Self::check(
            move |v| v.length().is_some_and(|len| len <= max),
            format!("length must be at most {}", max),
        )
    }

    /// Strings must match the regular expression.
    ///
    /// # Errors
    ///
    /// Returns an error if the pattern is not a valid regex.
    pub fn pattern(pattern: &str) -> Result<Self, regex::Error> {
        let regex = Regex::new(pattern)?;
        let message = format!("must match pattern '{}'", pattern);
        Ok(Self::check(
            move |v| v.as_str().is_some_and(|s| regex.is_match(s)),
            message,
        ))
    }

    /// Value must equal one of the given choices.
    pub fn choices<I, V>(choices: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let choices: Vec<Value> = choices.into_iter().map(Into::into).collect();
        let listed = choices
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        Self::check(
            move |v| choices.contains(v),
            format!("must be one of [{}]", listed),
        )
    }

    /// Numeric value must be at least `min`.
    pub fn min(min: f64) -> Self {
        Self::check(
            move |v| v.as_number().is_some_and(|n| n >= min),
            format!("must be at least {}", min),
        )
    }

    /// Numeric value must be at most `max`.
    pub fn max(max: f64) -> Self {
        Self::check(
            move |v| v.as_number().is_some_and(|n| n <= max),
            format!("must be at most {}", max),
        )
    }

    /// Numeric value must lie within `min..=max`.
    pub fn range(min: f64, max: f64) -> Self {
        Self::check(
            move |v| v.as_number().is_some_and(|n| n >= min && n <= max),
            format!("must be between {} and {}", min, max),
        )
    }

    /// Value must be of one of the given kinds.
    pub fn kinds(kinds: &[ValueKind]) -> Self {
        let kinds = kinds.to_vec();
        let listed = kinds
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" or ");
        Self::check(
            move |v| kinds.contains(&v.kind()),
            format!("must be {}", listed),
        )
    }

    fn apply(
        &self,
        value: Value,
        ctx: &ValidationContext,
        field: &str,
    ) -> Validation<Value, DocumentErrors> {
        match self {
            Validator::Cast(cast) => match cast.apply(value) {
                Ok(value) => Validation::Success(value),
                Err(original) => Validation::Failure(DocumentErrors::at(
                    ctx.path(),
                    ErrorKind::TypeMismatch {
                        field: field.to_string(),
                        expected: cast.expected(),
                        got: original.describe(),
                    },
                )),
            },
            Validator::Check { check, message } => {
                if check(&value) {
                    Validation::Success(value)
                } else {
                    Validation::Failure(DocumentErrors::at(
                        ctx.path(),
                        ErrorKind::Validation {
                            field: field.to_string(),
                            cause: message.clone(),
                        },
                    ))
                }
            }
            Validator::Transform(transform) => match transform(value) {
                Ok(value) => Validation::Success(value),
                Err(cause) => Validation::Failure(DocumentErrors::at(
                    ctx.path(),
                    ErrorKind::Validation {
                        field: field.to_string(),
                        cause,
                    },
                )),
            },
            Validator::Document(reference) => assembler::embed(reference, value, ctx, field),
        }
    }
}

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Validator::Cast(cast) => f.debug_tuple("Cast").field(cast).finish(),
            Validator::Check { message, .. } => {
                f.debug_struct("Check").field("message", message).finish()
            }
            Validator::Transform(_) => f.write_str("Transform"),
            Validator::Document(reference) => f.debug_tuple("Document").field(reference).finish(),
        }
    }
}

impl From<Cast> for Validator {
    fn from(cast: Cast) -> Self {
        Validator::Cast(cast)
    }
}

/// An ordered sequence of validator stages.
///
/// # Example
///
/// ```rust
/// use docmodels::{Cast, Pipeline, ValidationContext, Validator, Value};
///
/// let pipeline = Pipeline::new()
///     .then(Cast::Integer)
///     .then(Validator::range(0.0, 150.0));
///
/// let ctx = ValidationContext::detached();
/// let age = pipeline.run(Value::from("42"), &ctx, "age");
/// assert_eq!(age.into_result().unwrap(), Value::Int(42));
///
/// let too_old = pipeline.run(Value::from("200"), &ctx, "age");
/// assert!(too_old.is_failure());
/// ```
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    stages: Vec<Validator>,
}

impl Pipeline {
    /// An empty pipeline that passes values through.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a stage.
    pub fn then(mut self, stage: impl Into<Validator>) -> Self {
        self.stages.push(stage.into());
        self
    }

    pub(crate) fn push(&mut self, stage: Validator) {
        self.stages.push(stage);
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn stages(&self) -> impl Iterator<Item = &Validator> {
        self.stages.iter()
    }

    /// Runs every stage in order, stopping at the first failure.
    pub fn run(
        &self,
        value: Value,
        ctx: &ValidationContext,
        field: &str,
    ) -> Validation<Value, DocumentErrors> {
        let mut current = value;
        for stage in &self.stages {
            match stage.apply(current, ctx, field) {
                Validation::Success(next) => current = next,
                failure => return failure,
            }
        }
        Validation::Success(current)
    }
}

impl From<Validator> for Pipeline {
    fn from(stage: Validator) -> Self {
        Self {
            stages: vec![stage],
        }
    }
}

impl From<Cast> for Pipeline {
    fn from(cast: Cast) -> Self {
        Validator::Cast(cast).into()
    }
}

impl From<DocumentRef> for Pipeline {
    fn from(reference: DocumentRef) -> Self {
        Validator::Document(reference).into()
    }
}

impl From<Vec<Validator>> for Pipeline {
    fn from(stages: Vec<Validator>) -> Self {
        Self { stages }
    }
}

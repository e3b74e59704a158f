//! Error types for document construction and mutation failures.
//!
//! This module provides [`DocumentError`] (a single failure with the path of
//! the offending value), the [`ErrorKind`] taxonomy, and [`DocumentErrors`],
//! the non-empty collection returned by every fallible document operation.

mod document_error;

pub use document_error::{DocumentError, DocumentErrors, ErrorKind};

//! Error taxonomy.
//!
//! - [`SchemaError`]: raised while deriving a schema, before any value is seen.
//! - [`WriteError`]: raised while writing a value.
//! - [`ParseError`]: raised while parsing, always carrying a path and position.

use std::fmt;

use thiserror::Error;

use crate::path::{Path, Position};

/// Failure reported by a representation's `to`/`from` conversion.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ConversionError {
    pub message: String,
}

impl ConversionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("`{ty}` is not representable: {reason}")]
    Unrepresentable { ty: String, reason: String },
    #[error("`{0}` refers to itself without a base case")]
    CyclicWithoutBase(String),
    #[error("variant `{ty}` is ambiguously configured: {reason}")]
    AmbiguousVariantConfiguration { ty: String, reason: String },
    #[error("unknown type `{0}`")]
    UnknownType(String),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum WriteError {
    #[error("{path}: representation `{name}` failed to convert the value: {cause}")]
    Conversion {
        name: String,
        path: Path,
        cause: ConversionError,
    },
    #[error("{path}: expected {expected} value, found {actual}")]
    ValueMismatch {
        expected: &'static str,
        actual: &'static str,
        path: Path,
    },
    #[error("{path}: missing required field `{name}`")]
    MissingField { name: String, path: Path },
    #[error("{path}: unknown variant `{tag}`")]
    UnknownVariant { tag: String, path: Path },
    #[error("{path}: variant `{tag}` takes {expected} argument(s), found {actual}")]
    ArityMismatch {
        tag: String,
        expected: usize,
        actual: usize,
        path: Path,
    },
    #[error("{path}: {value} cannot be represented as a JSON number")]
    NonFiniteFloat { value: f64, path: Path },
    #[error("{path}: recursive schema `{name}` was never resolved")]
    UnresolvedRecursive { name: String, path: Path },
}

/// Kind of a JSON token, as expected by a schema or found in the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JsonKind {
    Null,
    Bool,
    Int,
    Float,
    String,
    Object,
    Array,
}

impl JsonKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool => "boolean",
            Self::Int => "integer",
            Self::Float => "number",
            Self::String => "string",
            Self::Object => "object",
            Self::Array => "array",
        }
    }
}

impl fmt::Display for JsonKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseErrorKind {
    #[error("expected {expected}, found {actual}")]
    TypeMismatch { expected: JsonKind, actual: JsonKind },
    #[error("missing required field `{0}`")]
    MissingField(String),
    #[error("unknown variant `{0}`")]
    UnknownVariant(String),
    #[error("no variant constructor matches the discriminant fields")]
    NoMatchingVariant,
    #[error("variant object must have exactly one key, found {keys}")]
    MalformedVariant { keys: usize },
    #[error("dictionary entry must be a [key, value] pair, found {arity} element(s)")]
    MalformedPair { arity: usize },
    #[error("representation `{name}` rejected the value: {cause}")]
    MalformedRepresentation {
        name: String,
        cause: ConversionError,
    },
    #[error("nesting exceeds the depth limit of {limit}")]
    DepthExceeded { limit: usize },
    #[error("recursive schema `{0}` was never resolved")]
    UnresolvedRecursive(String),
    #[error("syntax error: {0}")]
    SyntaxError(String),
}

impl ParseErrorKind {
    /// Fatal errors leave the input in a state that cannot be resumed, so they
    /// abort parsing even when errors are being accumulated.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::SyntaxError(_) | Self::DepthExceeded { .. } | Self::UnresolvedRecursive(_)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{path} ({position}): {kind}")]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub path: Path,
    pub position: Position,
}

impl ParseError {
    pub fn new(kind: ParseErrorKind, path: Path, position: Position) -> Self {
        Self {
            kind,
            path,
            position,
        }
    }
}

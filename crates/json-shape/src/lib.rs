//! `json-shape`: schema-driven JSON writer and validating parser.
//!
//! A [`Schema`] describes the shape a JSON document is expected to have. It is
//! derived once from a [`TypeDesc`](derive::TypeDesc) by the [`Deriver`] and
//! then drives two stateless engines:
//!
//! - [`write`] serializes a [`Value`] emitting only the fields the schema
//!   declares, in declaration order.
//! - [`parse`] consumes JSON text and produces a [`Value`] of that shape,
//!   ignoring undeclared keys and reporting everything else that does not fit
//!   as a [`ParseError`].
//!
//! Wire conventions are fixed: dictionaries are `[[key, value], ...]`, dates
//! are floating-point millisecond timestamps, binary blobs are padded base64
//! strings, and variants are either `{"Tag": {...}}` or flat objects selected
//! by literal discriminant fields.

pub mod codec;
pub mod derive;
pub mod error;
pub mod options;
pub mod path;
pub mod representation;
pub mod schema;
pub mod value;
pub mod variant;

pub use codec::parser::{parse, parse_str, parse_with};
pub use codec::writer::{write, write_string};
pub use codec::Codec;
pub use derive::{ConstructorDesc, Deriver, FieldDesc, TypeCatalog, TypeDesc};
pub use error::{ConversionError, JsonKind, ParseError, ParseErrorKind, SchemaError, WriteError};
pub use options::{ErrorMode, ParseOptions};
pub use path::{Path, PathSegment, Position};
pub use representation::{Conversion, Representation};
pub use schema::{
    DictionarySchema, FieldSchema, Primitive, RecordSchema, RecursiveRef, Schema, SchemaBuilder,
};
pub use value::{OpaqueValue, Value};
pub use variant::{ArgSchema, ConstructorSpec, MatchRule, VariantMode, VariantSchema};

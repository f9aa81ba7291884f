//! Writer and parser engines.

mod lexer;
pub mod parser;
pub mod writer;

use crate::error::{ParseError, WriteError};
use crate::options::ParseOptions;
use crate::schema::Schema;
use crate::value::Value;

/// A schema bundled with parse options, for hosts that encode and decode
/// the same shape repeatedly.
#[derive(Debug, Clone)]
pub struct Codec {
    schema: Schema,
    options: ParseOptions,
}

impl Codec {
    pub fn new(schema: Schema) -> Self {
        Self {
            schema,
            options: ParseOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ParseOptions) -> Self {
        self.options = options;
        self
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn options(&self) -> &ParseOptions {
        &self.options
    }

    pub fn write(&self, value: &Value) -> Result<Vec<u8>, WriteError> {
        writer::write(value, &self.schema)
    }

    pub fn write_string(&self, value: &Value) -> Result<String, WriteError> {
        writer::write_string(value, &self.schema)
    }

    pub fn parse(&self, input: &[u8]) -> Result<Value, Vec<ParseError>> {
        parser::parse_with(input, &self.schema, &self.options)
    }

    pub fn parse_str(&self, input: &str) -> Result<Value, Vec<ParseError>> {
        self.parse(input.as_bytes())
    }
}

//! Shorthand constructors for hand-written schemas.
//!
//! Derived schemas come from the [`Deriver`](crate::Deriver); the builder is
//! for hosts that describe a shape directly.

use std::sync::Arc;

use super::schema::{DictionarySchema, FieldSchema, Primitive, RecordSchema, Schema};
use crate::error::{ConversionError, SchemaError};
use crate::representation::Representation;
use crate::value::Value;
use crate::variant::{ConstructorSpec, VariantSchema};

#[derive(Debug, Clone, Copy, Default)]
pub struct SchemaBuilder;

impl SchemaBuilder {
    pub fn new() -> Self {
        Self
    }

    // ------------------------------------------------------------------
    // Primitives

    pub fn bool(&self) -> Schema {
        Schema::Primitive(Primitive::Bool)
    }

    pub fn int(&self) -> Schema {
        Schema::Primitive(Primitive::Int)
    }

    pub fn float(&self) -> Schema {
        Schema::Primitive(Primitive::Float)
    }

    pub fn str(&self) -> Schema {
        Schema::Primitive(Primitive::String)
    }

    // ------------------------------------------------------------------
    // Composites

    pub fn list(&self, element: Schema) -> Schema {
        Schema::List(Arc::new(element))
    }

    pub fn dict(&self, key: Schema, value: Schema) -> Schema {
        Schema::Dictionary(Arc::new(DictionarySchema { key, value }))
    }

    pub fn record(
        &self,
        name: impl Into<String>,
        fields: impl IntoIterator<Item = FieldSchema>,
    ) -> Result<Schema, SchemaError> {
        let record = RecordSchema::new(name, fields.into_iter().collect())?;
        Ok(Schema::Record(Arc::new(record)))
    }

    pub fn field(&self, name: impl Into<String>, schema: Schema) -> FieldSchema {
        FieldSchema::required(name, schema)
    }

    pub fn opt(&self, name: impl Into<String>, schema: Schema) -> FieldSchema {
        FieldSchema::optional(name, schema)
    }

    pub fn variant(
        &self,
        name: impl Into<String>,
        constructors: impl IntoIterator<Item = ConstructorSpec>,
    ) -> Result<Schema, SchemaError> {
        let variant = VariantSchema::new(name, constructors.into_iter().collect())?;
        Ok(Schema::Variant(Arc::new(variant)))
    }

    // ------------------------------------------------------------------
    // Representations

    pub fn date(&self) -> Schema {
        Schema::Representation(Arc::new(Representation::date()))
    }

    pub fn bytes(&self) -> Schema {
        Schema::Representation(Arc::new(Representation::bytes()))
    }

    pub fn representation<T, F>(
        &self,
        name: impl Into<String>,
        proxy: Schema,
        to: T,
        from: F,
    ) -> Schema
    where
        T: Fn(&Value) -> Result<Value, ConversionError> + Send + Sync + 'static,
        F: Fn(Value) -> Result<Value, ConversionError> + Send + Sync + 'static,
    {
        Schema::Representation(Arc::new(Representation::new(name, proxy, to, from)))
    }
}

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use crate::error::SchemaError;
use crate::representation::Representation;
use crate::variant::VariantSchema;

/// Scalar JSON kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    Bool,
    Int,
    Float,
    String,
}

impl Primitive {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Float => "float",
            Self::String => "string",
        }
    }
}

/// A single declared field of a record.
#[derive(Debug, Clone)]
pub struct FieldSchema {
    pub name: String,
    pub schema: Schema,
    pub optional: bool,
}

impl FieldSchema {
    pub fn required(name: impl Into<String>, schema: Schema) -> Self {
        Self {
            name: name.into(),
            schema,
            optional: false,
        }
    }

    pub fn optional(name: impl Into<String>, schema: Schema) -> Self {
        Self {
            name: name.into(),
            schema,
            optional: true,
        }
    }
}

/// Ordered record fields. Declaration order drives writer output; the parser
/// accepts keys in any order.
#[derive(Debug, Clone)]
pub struct RecordSchema {
    name: String,
    fields: Vec<FieldSchema>,
    index: HashMap<String, usize>,
}

impl RecordSchema {
    pub fn new(name: impl Into<String>, fields: Vec<FieldSchema>) -> Result<Self, SchemaError> {
        let name = name.into();
        let mut index = HashMap::with_capacity(fields.len());
        for (i, field) in fields.iter().enumerate() {
            if index.insert(field.name.clone(), i).is_some() {
                return Err(SchemaError::Unrepresentable {
                    ty: name,
                    reason: format!("field `{}` is declared twice", field.name),
                });
            }
        }
        Ok(Self {
            name,
            fields,
            index,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[FieldSchema] {
        &self.fields
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn field(&self, name: &str) -> Option<&FieldSchema> {
        self.position(name).map(|i| &self.fields[i])
    }
}

/// Key/value schemas of a dictionary, written as `[[key, value], ...]`.
#[derive(Debug, Clone)]
pub struct DictionarySchema {
    pub key: Schema,
    pub value: Schema,
}

/// Lazily filled handle breaking construction cycles of self-referential
/// shapes. Handles are created and filled only by the deriver.
#[derive(Clone)]
pub struct RecursiveRef {
    name: String,
    slot: Arc<OnceLock<Schema>>,
}

impl RecursiveRef {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            slot: Arc::new(OnceLock::new()),
        }
    }

    pub(crate) fn fill(&self, schema: Schema) -> bool {
        self.slot.set(schema).is_ok()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self) -> Option<&Schema> {
        self.slot.get()
    }
}

impl fmt::Debug for RecursiveRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecursiveRef")
            .field("name", &self.name)
            .field("resolved", &self.slot.get().is_some())
            .finish()
    }
}

/// The closed set of schema kinds.
///
/// Cloning is cheap: composite nodes are reference counted, so a derived
/// schema can be shared between threads and read without synchronization.
#[derive(Debug, Clone)]
pub enum Schema {
    Primitive(Primitive),
    Record(Arc<RecordSchema>),
    List(Arc<Schema>),
    Dictionary(Arc<DictionarySchema>),
    Variant(Arc<VariantSchema>),
    Representation(Arc<Representation>),
    Recursive(RecursiveRef),
}

impl Schema {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Primitive(p) => p.as_str(),
            Self::Record(_) => "record",
            Self::List(_) => "list",
            Self::Dictionary(_) => "dictionary",
            Self::Variant(_) => "variant",
            Self::Representation(_) => "representation",
            Self::Recursive(_) => "recursive",
        }
    }

    /// Follows recursive handles to the schema they stand for. Returns `None`
    /// for a handle that was never filled.
    pub fn resolve(&self) -> Option<&Schema> {
        let mut current = self;
        while let Self::Recursive(r) = current {
            current = r.get()?;
        }
        Some(current)
    }

    pub fn as_record(&self) -> Option<&RecordSchema> {
        match self {
            Self::Record(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_variant(&self) -> Option<&VariantSchema> {
        match self {
            Self::Variant(v) => Some(v),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_rejects_duplicate_field_names() {
        let err = RecordSchema::new(
            "Point",
            vec![
                FieldSchema::required("x", Schema::Primitive(Primitive::Int)),
                FieldSchema::required("x", Schema::Primitive(Primitive::Float)),
            ],
        )
        .unwrap_err();
        assert!(matches!(err, SchemaError::Unrepresentable { ref ty, .. } if ty == "Point"));
    }

    #[test]
    fn record_field_lookup_by_name() {
        let record = RecordSchema::new(
            "Point",
            vec![
                FieldSchema::required("x", Schema::Primitive(Primitive::Int)),
                FieldSchema::optional("label", Schema::Primitive(Primitive::String)),
            ],
        )
        .unwrap();
        assert_eq!(record.position("label"), Some(1));
        assert!(record.field("label").unwrap().optional);
        assert!(record.field("y").is_none());
    }

    #[test]
    fn resolve_follows_filled_recursive_handles() {
        let handle = RecursiveRef::new("Node");
        let schema = Schema::Recursive(handle.clone());
        assert!(schema.resolve().is_none());
        assert!(handle.fill(Schema::Primitive(Primitive::Bool)));
        assert!(!handle.fill(Schema::Primitive(Primitive::Int)));
        assert_eq!(schema.resolve().map(Schema::kind), Some("bool"));
    }
}

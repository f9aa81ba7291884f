//! Declarative type descriptions consumed by the deriver.

use std::collections::HashMap;

use serde_json::Value as JsonValue;

use crate::representation::Conversion;

/// Structural description of a type.
#[derive(Debug, Clone)]
pub enum TypeDesc {
    Bool,
    Int,
    Float,
    String,
    /// Derives to the built-in date representation.
    Date,
    /// Derives to the built-in base64 representation.
    Bytes,
    /// Reference to a type registered in the [`TypeCatalog`].
    Named(String),
    List(Box<TypeDesc>),
    Map(Box<TypeDesc>, Box<TypeDesc>),
    Record(Vec<FieldDesc>),
    Enum(Vec<ConstructorDesc>),
    /// A type that declares a conversion to and from a proxy type.
    Represented {
        proxy: Box<TypeDesc>,
        conversion: Conversion,
    },
    /// Something with no JSON form (functions, handles, ...).
    Unsupported(String),
}

impl TypeDesc {
    pub fn named(id: impl Into<String>) -> Self {
        Self::Named(id.into())
    }

    pub fn list(element: TypeDesc) -> Self {
        Self::List(Box::new(element))
    }

    pub fn map(key: TypeDesc, value: TypeDesc) -> Self {
        Self::Map(Box::new(key), Box::new(value))
    }

    pub fn record(fields: impl IntoIterator<Item = FieldDesc>) -> Self {
        Self::Record(fields.into_iter().collect())
    }

    pub fn variants(constructors: impl IntoIterator<Item = ConstructorDesc>) -> Self {
        Self::Enum(constructors.into_iter().collect())
    }

    pub fn represented(proxy: TypeDesc, conversion: Conversion) -> Self {
        Self::Represented {
            proxy: Box::new(proxy),
            conversion,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FieldDesc {
    pub name: String,
    pub ty: TypeDesc,
    pub optional: bool,
}

impl FieldDesc {
    pub fn required(name: impl Into<String>, ty: TypeDesc) -> Self {
        Self {
            name: name.into(),
            ty,
            optional: false,
        }
    }

    pub fn optional(name: impl Into<String>, ty: TypeDesc) -> Self {
        Self {
            name: name.into(),
            ty,
            optional: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConstructorDesc {
    pub tag: String,
    pub args: Vec<(String, TypeDesc)>,
    /// Literal field/value pairs identifying the constructor in a flat object.
    pub discriminant: Option<Vec<(String, JsonValue)>>,
}

impl ConstructorDesc {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            args: Vec::new(),
            discriminant: None,
        }
    }

    pub fn arg(mut self, name: impl Into<String>, ty: TypeDesc) -> Self {
        self.args.push((name.into(), ty));
        self
    }

    pub fn discriminant(mut self, field: impl Into<String>, literal: JsonValue) -> Self {
        self.discriminant
            .get_or_insert_with(Vec::new)
            .push((field.into(), literal));
        self
    }
}

/// Named type descriptions, keyed by type identity.
#[derive(Debug, Clone, Default)]
pub struct TypeCatalog {
    types: HashMap<String, TypeDesc>,
}

impl TypeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `desc` under `id`, replacing any earlier registration.
    pub fn register(&mut self, id: impl Into<String>, desc: TypeDesc) -> &mut Self {
        self.types.insert(id.into(), desc);
        self
    }

    pub fn with(mut self, id: impl Into<String>, desc: TypeDesc) -> Self {
        self.register(id, desc);
        self
    }

    pub fn get(&self, id: &str) -> Option<&TypeDesc> {
        self.types.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.types.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

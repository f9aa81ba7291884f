//! Memoizing schema deriver.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, trace};

use super::inhabited::is_inhabited;
use super::type_desc::{ConstructorDesc, FieldDesc, TypeCatalog, TypeDesc};
use crate::error::SchemaError;
use crate::representation::Representation;
use crate::schema::{DictionarySchema, FieldSchema, Primitive, RecordSchema, RecursiveRef, Schema};
use crate::variant::{ConstructorSpec, MatchRule, VariantSchema};

/// Derives schemas from a [`TypeCatalog`], caching named types by identity.
///
/// The cache is guarded by a mutex held for the whole top-level derivation,
/// so each named type is derived at most once even when several threads ask
/// for it concurrently. Entries are committed only when the top-level
/// derivation succeeds.
#[derive(Debug)]
pub struct Deriver {
    catalog: TypeCatalog,
    cache: Mutex<HashMap<String, Schema>>,
}

impl Deriver {
    pub fn new(catalog: TypeCatalog) -> Self {
        Self {
            catalog,
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn catalog(&self) -> &TypeCatalog {
        &self.catalog
    }

    pub fn derive_named(&self, id: &str) -> Result<Schema, SchemaError> {
        self.derive(&TypeDesc::Named(id.to_string()))
    }

    pub fn derive(&self, desc: &TypeDesc) -> Result<Schema, SchemaError> {
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        let mut session = Session {
            catalog: &self.catalog,
            committed: &*cache,
            pending: HashMap::new(),
            deriving: Vec::new(),
            slots: HashMap::new(),
        };
        let schema = session.derive(desc, "$")?;
        session.check_base_cases()?;
        let pending = session.pending;
        if !pending.is_empty() {
            debug!(types = pending.len(), "committing derived schemas");
        }
        cache.extend(pending);
        Ok(schema)
    }

    /// Schema previously derived for `id`, if any.
    pub fn cached(&self, id: &str) -> Option<Schema> {
        let cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        cache.get(id).cloned()
    }
}

/// State of one top-level derivation.
struct Session<'a> {
    catalog: &'a TypeCatalog,
    committed: &'a HashMap<String, Schema>,
    pending: HashMap<String, Schema>,
    /// Named types whose derivation is in progress.
    deriving: Vec<String>,
    /// Placeholders handed out for types referenced while being derived.
    slots: HashMap<String, RecursiveRef>,
}

impl Session<'_> {
    fn derive(&mut self, desc: &TypeDesc, context: &str) -> Result<Schema, SchemaError> {
        let schema = match desc {
            TypeDesc::Bool => Schema::Primitive(Primitive::Bool),
            TypeDesc::Int => Schema::Primitive(Primitive::Int),
            TypeDesc::Float => Schema::Primitive(Primitive::Float),
            TypeDesc::String => Schema::Primitive(Primitive::String),
            TypeDesc::Date => Schema::Representation(Arc::new(Representation::date())),
            TypeDesc::Bytes => Schema::Representation(Arc::new(Representation::bytes())),
            TypeDesc::Named(id) => return self.derive_named(id),
            TypeDesc::List(element) => {
                Schema::List(Arc::new(self.derive(element, &format!("{context}[]"))?))
            }
            TypeDesc::Map(key, value) => Schema::Dictionary(Arc::new(DictionarySchema {
                key: self.derive(key, &format!("{context}<key>"))?,
                value: self.derive(value, &format!("{context}<value>"))?,
            })),
            TypeDesc::Record(fields) => self.derive_record(fields, context)?,
            TypeDesc::Enum(constructors) => self.derive_variant(constructors, context)?,
            TypeDesc::Represented { proxy, conversion } => {
                let proxy = self.derive(proxy, &format!("{context}<{}>", conversion.name()))?;
                Schema::Representation(Arc::new(Representation::resolve(
                    conversion.clone(),
                    proxy,
                )))
            }
            TypeDesc::Unsupported(reason) => {
                return Err(SchemaError::Unrepresentable {
                    ty: context.to_string(),
                    reason: reason.clone(),
                })
            }
        };
        Ok(schema)
    }

    fn derive_named(&mut self, id: &str) -> Result<Schema, SchemaError> {
        if let Some(schema) = self.committed.get(id).or_else(|| self.pending.get(id)) {
            trace!(type_id = id, "schema cache hit");
            return Ok(schema.clone());
        }
        if self.deriving.iter().any(|d| d == id) {
            let handle = self
                .slots
                .entry(id.to_string())
                .or_insert_with(|| {
                    trace!(type_id = id, "deferring self-referential type");
                    RecursiveRef::new(id)
                })
                .clone();
            return Ok(Schema::Recursive(handle));
        }
        let catalog = self.catalog;
        let desc = catalog
            .get(id)
            .ok_or_else(|| SchemaError::UnknownType(id.to_string()))?;

        self.deriving.push(id.to_string());
        let schema = self.derive(desc, id)?;
        self.deriving.pop();

        if let Some(handle) = self.slots.get(id) {
            handle.fill(schema.clone());
        }
        debug!(type_id = id, kind = schema.kind(), "derived schema");
        self.pending.insert(id.to_string(), schema.clone());
        Ok(schema)
    }

    fn derive_record(&mut self, fields: &[FieldDesc], context: &str) -> Result<Schema, SchemaError> {
        let mut derived = Vec::with_capacity(fields.len());
        for field in fields {
            let schema = self.derive(&field.ty, &format!("{context}.{}", field.name))?;
            derived.push(FieldSchema {
                name: field.name.clone(),
                schema,
                optional: field.optional,
            });
        }
        Ok(Schema::Record(Arc::new(RecordSchema::new(context, derived)?)))
    }

    fn derive_variant(
        &mut self,
        constructors: &[ConstructorDesc],
        context: &str,
    ) -> Result<Schema, SchemaError> {
        let mut specs = Vec::with_capacity(constructors.len());
        for ctor in constructors {
            let mut spec = ConstructorSpec::new(ctor.tag.clone());
            for (name, ty) in &ctor.args {
                let schema = self.derive(ty, &format!("{context}::{}.{name}", ctor.tag))?;
                spec = spec.arg(name.clone(), schema);
            }
            spec.match_rule = ctor.discriminant.as_ref().map(|pairs| {
                pairs
                    .iter()
                    .map(|(field, literal)| MatchRule {
                        field: field.clone(),
                        literal: literal.clone(),
                    })
                    .collect()
            });
            specs.push(spec);
        }
        Ok(Schema::Variant(Arc::new(VariantSchema::new(context, specs)?)))
    }

    /// Every type that was referenced while being derived must still admit a
    /// finite value.
    fn check_base_cases(&self) -> Result<(), SchemaError> {
        let mut ids: Vec<&String> = self.slots.keys().collect();
        ids.sort();
        for id in ids {
            let inhabited = self.pending.get(id.as_str()).is_some_and(is_inhabited);
            if !inhabited {
                debug!(type_id = %id, "self-referential type has no base case");
                return Err(SchemaError::CyclicWithoutBase(id.clone()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_derivation_commits_nothing() {
        let catalog = TypeCatalog::new()
            .with(
                "Outer",
                TypeDesc::record([
                    FieldDesc::required("inner", TypeDesc::named("Inner")),
                    FieldDesc::required("callback", TypeDesc::Unsupported("function".into())),
                ]),
            )
            .with(
                "Inner",
                TypeDesc::record([FieldDesc::optional("outer", TypeDesc::named("Outer"))]),
            );
        let deriver = Deriver::new(catalog);
        assert!(deriver.derive_named("Outer").is_err());
        assert!(deriver.cached("Inner").is_none());
        assert!(deriver.cached("Outer").is_none());
    }

    #[test]
    fn recursive_handles_are_filled_after_derivation() {
        let catalog = TypeCatalog::new().with(
            "Node",
            TypeDesc::record([
                FieldDesc::required("value", TypeDesc::Int),
                FieldDesc::optional("next", TypeDesc::named("Node")),
            ]),
        );
        let deriver = Deriver::new(catalog);
        let schema = deriver.derive_named("Node").unwrap();
        let next = &schema.as_record().unwrap().field("next").unwrap().schema;
        match next {
            Schema::Recursive(handle) => {
                assert_eq!(handle.name(), "Node");
                assert_eq!(handle.get().map(Schema::kind), Some("record"));
            }
            other => panic!("expected recursive handle, got {other:?}"),
        }
    }
}

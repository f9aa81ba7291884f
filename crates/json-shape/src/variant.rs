//! Variant schemas and their two tagging conventions.
//!
//! - [`VariantMode::Nested`]: `{"Tag": {...args}}`, looked up by exact tag.
//! - [`VariantMode::TagMatch`]: one flat object holding literal discriminant
//!   fields next to the argument fields. Constructors are tried in declaration
//!   order and the first whose literals all match wins.

use std::collections::{HashMap, HashSet};

use serde_json::Value as JsonValue;

use crate::error::SchemaError;
use crate::schema::{FieldSchema, RecordSchema, Schema};

#[derive(Debug, Clone)]
pub struct ArgSchema {
    pub name: String,
    pub schema: Schema,
}

/// A literal field/value pair identifying a constructor inside a foreign
/// JSON shape.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchRule {
    pub field: String,
    pub literal: JsonValue,
}

#[derive(Debug, Clone)]
pub struct ConstructorSpec {
    pub tag: String,
    pub args: Vec<ArgSchema>,
    pub match_rule: Option<Vec<MatchRule>>,
}

impl ConstructorSpec {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            args: Vec::new(),
            match_rule: None,
        }
    }

    pub fn arg(mut self, name: impl Into<String>, schema: Schema) -> Self {
        self.args.push(ArgSchema {
            name: name.into(),
            schema,
        });
        self
    }

    /// Adds a literal discriminant field, switching the constructor to the
    /// tag-match convention.
    pub fn matching(mut self, field: impl Into<String>, literal: JsonValue) -> Self {
        self.match_rule.get_or_insert_with(Vec::new).push(MatchRule {
            field: field.into(),
            literal,
        });
        self
    }

    /// The single-argument inlining predicate: exactly one argument whose
    /// schema is a record. That record's fields then sit directly beneath the
    /// tag (or in the flat object) instead of inside a second object.
    pub fn inlined_record(&self) -> Option<&RecordSchema> {
        match self.args.as_slice() {
            [only] => only.schema.as_record(),
            _ => None,
        }
    }

    /// Names of the JSON fields that carry this constructor's arguments.
    pub fn arg_fields(&self) -> Vec<&str> {
        match self.inlined_record() {
            Some(record) => record.fields().iter().map(|f| f.name.as_str()).collect(),
            None => self.args.iter().map(|a| a.name.as_str()).collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariantMode {
    Nested,
    TagMatch,
}

#[derive(Debug, Clone)]
pub struct VariantSchema {
    name: String,
    constructors: Vec<ConstructorSpec>,
    /// Arguments of each constructor viewed as a record of required fields.
    arg_records: Vec<RecordSchema>,
    mode: VariantMode,
    by_tag: HashMap<String, usize>,
    /// Tag-match only: every discriminant and argument field across
    /// constructors.
    union_keys: HashSet<String>,
    discriminant_keys: HashSet<String>,
}

impl VariantSchema {
    pub fn new(
        name: impl Into<String>,
        constructors: Vec<ConstructorSpec>,
    ) -> Result<Self, SchemaError> {
        let name = name.into();
        if constructors.is_empty() {
            return Err(SchemaError::Unrepresentable {
                ty: name,
                reason: "variant declares no constructors".into(),
            });
        }
        let ambiguous = |reason: String| SchemaError::AmbiguousVariantConfiguration {
            ty: name.clone(),
            reason,
        };

        let mut by_tag = HashMap::with_capacity(constructors.len());
        for (i, ctor) in constructors.iter().enumerate() {
            if by_tag.insert(ctor.tag.clone(), i).is_some() {
                return Err(ambiguous(format!("constructor `{}` is declared twice", ctor.tag)));
            }
        }

        let tagged = constructors.iter().filter(|c| c.match_rule.is_some()).count();
        let mode = match tagged {
            0 => VariantMode::Nested,
            n if n == constructors.len() => VariantMode::TagMatch,
            _ => {
                return Err(ambiguous(
                    "some constructors declare discriminants and others do not".into(),
                ))
            }
        };

        let mut arg_records = Vec::with_capacity(constructors.len());
        for ctor in &constructors {
            let fields = ctor
                .args
                .iter()
                .map(|arg| FieldSchema::required(arg.name.clone(), arg.schema.clone()))
                .collect();
            let record = RecordSchema::new(format!("{name}::{}", ctor.tag), fields).map_err(|_| {
                ambiguous(format!("constructor `{}` repeats an argument name", ctor.tag))
            })?;
            arg_records.push(record);
        }

        let mut union_keys = HashSet::new();
        let mut discriminant_keys = HashSet::new();
        if mode == VariantMode::TagMatch {
            let mut seen_rules: Vec<&[MatchRule]> = Vec::new();
            for ctor in &constructors {
                let rule = ctor.match_rule.as_deref().unwrap_or_default();
                if rule.is_empty() {
                    return Err(ambiguous(format!(
                        "constructor `{}` has an empty discriminant",
                        ctor.tag
                    )));
                }
                let mut fields = HashSet::new();
                for m in rule {
                    if !fields.insert(m.field.as_str()) {
                        return Err(ambiguous(format!(
                            "constructor `{}` repeats discriminant field `{}`",
                            ctor.tag, m.field
                        )));
                    }
                }
                if let Some(clash) = ctor.arg_fields().into_iter().find(|f| fields.contains(f)) {
                    return Err(ambiguous(format!(
                        "constructor `{}` uses `{clash}` both as discriminant and argument",
                        ctor.tag
                    )));
                }
                if let Some(prev) = seen_rules.iter().find(|prev| same_rule(prev, rule)) {
                    let shadowing = constructors
                        .iter()
                        .find(|c| c.match_rule.as_deref() == Some(*prev))
                        .map(|c| c.tag.as_str())
                        .unwrap_or_default();
                    return Err(ambiguous(format!(
                        "constructor `{}` has the same discriminant as `{shadowing}`",
                        ctor.tag
                    )));
                }
                seen_rules.push(rule);
                discriminant_keys.extend(rule.iter().map(|m| m.field.clone()));
                union_keys.extend(rule.iter().map(|m| m.field.clone()));
                union_keys.extend(ctor.arg_fields().into_iter().map(str::to_string));
            }
        }

        Ok(Self {
            name,
            constructors,
            arg_records,
            mode,
            by_tag,
            union_keys,
            discriminant_keys,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mode(&self) -> VariantMode {
        self.mode
    }

    pub fn constructors(&self) -> &[ConstructorSpec] {
        &self.constructors
    }

    /// Exact tag lookup, used by the nested convention and by the writer.
    pub fn constructor(&self, tag: &str) -> Option<(usize, &ConstructorSpec)> {
        self.by_tag.get(tag).map(|&i| (i, &self.constructors[i]))
    }

    /// Arguments of constructor `index` as a record of required fields.
    pub fn arg_record(&self, index: usize) -> &RecordSchema {
        &self.arg_records[index]
    }

    pub fn is_union_key(&self, key: &str) -> bool {
        self.union_keys.contains(key)
    }

    pub fn is_discriminant_key(&self, key: &str) -> bool {
        self.discriminant_keys.contains(key)
    }

    /// Picks the first constructor, in declaration order, whose literal
    /// fields all satisfy `matches(field, literal)`.
    pub fn select<F>(&self, mut matches: F) -> Option<usize>
    where
        F: FnMut(&str, &JsonValue) -> bool,
    {
        self.constructors.iter().position(|ctor| {
            ctor.match_rule
                .as_deref()
                .is_some_and(|rule| rule.iter().all(|m| matches(&m.field, &m.literal)))
        })
    }
}

fn same_rule(a: &[MatchRule], b: &[MatchRule]) -> bool {
    a.len() == b.len()
        && a.iter().all(|x| {
            b.iter()
                .any(|y| x.field == y.field && literal_equal(&x.literal, &y.literal))
        })
}

/// JSON equality for discriminant literals; numbers compare as `f64`.
pub fn literal_equal(a: &JsonValue, b: &JsonValue) -> bool {
    match (a, b) {
        (JsonValue::Null, JsonValue::Null) => true,
        (JsonValue::Bool(a), JsonValue::Bool(b)) => a == b,
        (JsonValue::Number(a), JsonValue::Number(b)) => a
            .as_f64()
            .zip(b.as_f64())
            .map(|(a, b)| a == b)
            .unwrap_or(false),
        (JsonValue::String(a), JsonValue::String(b)) => a == b,
        (JsonValue::Array(a), JsonValue::Array(b)) => {
            a.len() == b.len() && a.iter().zip(b.iter()).all(|(a, b)| literal_equal(a, b))
        }
        (JsonValue::Object(a), JsonValue::Object(b)) => {
            a.len() == b.len()
                && a.iter()
                    .all(|(k, v)| b.get(k).map(|bv| literal_equal(v, bv)).unwrap_or(false))
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::schema::Primitive;

    fn int() -> Schema {
        Schema::Primitive(Primitive::Int)
    }

    fn weapons() -> VariantSchema {
        VariantSchema::new(
            "Item",
            vec![
                ConstructorSpec::new("Sword")
                    .matching("type", json!("sword"))
                    .arg("damage", int()),
                ConstructorSpec::new("Shield")
                    .matching("type", json!("shield"))
                    .arg("armor", int()),
            ],
        )
        .unwrap()
    }

    #[test]
    fn mode_follows_discriminants() {
        let nested = VariantSchema::new(
            "Shape",
            vec![ConstructorSpec::new("A").arg("x", int()), ConstructorSpec::new("B")],
        )
        .unwrap();
        assert_eq!(nested.mode(), VariantMode::Nested);
        assert_eq!(weapons().mode(), VariantMode::TagMatch);
    }

    #[test]
    fn select_is_first_match_in_declaration_order() {
        let v = weapons();
        let chosen = v.select(|field, literal| field == "type" && *literal == json!("shield"));
        assert_eq!(chosen, Some(1));
        assert_eq!(v.select(|_, _| false), None);
    }

    #[test]
    fn union_keys_cover_discriminants_and_arguments() {
        let v = weapons();
        for key in ["type", "damage", "armor"] {
            assert!(v.is_union_key(key), "{key}");
        }
        assert!(v.is_discriminant_key("type"));
        assert!(!v.is_discriminant_key("armor"));
        assert!(!v.is_union_key("weight"));
    }

    #[test]
    fn inlining_requires_exactly_one_record_argument() {
        let record = Arc::new(
            RecordSchema::new("P", vec![FieldSchema::required("x", int())]).unwrap(),
        );
        let inlined = ConstructorSpec::new("A").arg("p", Schema::Record(record.clone()));
        assert!(inlined.inlined_record().is_some());
        assert_eq!(inlined.arg_fields(), vec!["x"]);

        let two = ConstructorSpec::new("A")
            .arg("p", Schema::Record(record))
            .arg("q", int());
        assert!(two.inlined_record().is_none());
        assert!(ConstructorSpec::new("B").arg("x", int()).inlined_record().is_none());
    }

    fn ambiguity(constructors: Vec<ConstructorSpec>) -> String {
        match VariantSchema::new("T", constructors) {
            Err(SchemaError::AmbiguousVariantConfiguration { reason, .. }) => reason,
            other => panic!("expected ambiguity, got {other:?}"),
        }
    }

    #[test]
    fn rejects_duplicate_tags() {
        let reason = ambiguity(vec![ConstructorSpec::new("A"), ConstructorSpec::new("A")]);
        assert!(reason.contains("declared twice"));
    }

    #[test]
    fn rejects_mixed_conventions() {
        let reason = ambiguity(vec![
            ConstructorSpec::new("A").matching("kind", json!("a")),
            ConstructorSpec::new("B"),
        ]);
        assert!(reason.contains("others do not"));
    }

    #[test]
    fn rejects_identical_discriminants() {
        let reason = ambiguity(vec![
            ConstructorSpec::new("A").matching("kind", json!(1)),
            ConstructorSpec::new("B").matching("kind", json!(1.0)),
        ]);
        assert!(reason.contains("same discriminant as `A`"));
    }

    #[test]
    fn rejects_discriminant_argument_clash() {
        let reason = ambiguity(vec![ConstructorSpec::new("A")
            .matching("kind", json!("a"))
            .arg("kind", int())]);
        assert!(reason.contains("both as discriminant and argument"));
    }

    #[test]
    fn rejects_repeated_argument_names() {
        let reason = ambiguity(vec![ConstructorSpec::new("A").arg("x", int()).arg("x", int())]);
        assert!(reason.contains("repeats an argument name"));
    }

    #[test]
    fn empty_variant_is_unrepresentable() {
        assert!(matches!(
            VariantSchema::new("Never", vec![]),
            Err(SchemaError::Unrepresentable { .. })
        ));
    }

    #[test]
    fn literal_equality_compares_numbers_as_floats() {
        assert!(literal_equal(&json!(1), &json!(1.0)));
        assert!(literal_equal(&json!({"a": [1, "x"]}), &json!({"a": [1.0, "x"]})));
        assert!(!literal_equal(&json!("1"), &json!(1)));
    }
}

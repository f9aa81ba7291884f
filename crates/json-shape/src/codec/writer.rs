//! Schema-driven JSON text writer.
//!
//! Only fields the schema declares are written, in declaration order, and
//! absent optional fields are left out entirely rather than written as
//! `null`.

use std::fmt::Write as _;

use indexmap::IndexMap;
use serde_json::Number;

use crate::error::WriteError;
use crate::path::Path;
use crate::representation::Representation;
use crate::schema::{DictionarySchema, Primitive, RecordSchema, Schema};
use crate::value::Value;
use crate::variant::{ConstructorSpec, VariantMode, VariantSchema};

/// Writes `value` as UTF-8 JSON.
pub fn write(value: &Value, schema: &Schema) -> Result<Vec<u8>, WriteError> {
    write_string(value, schema).map(String::into_bytes)
}

pub fn write_string(value: &Value, schema: &Schema) -> Result<String, WriteError> {
    let mut writer = JsonWriter::default();
    writer.node(value, schema)?;
    Ok(writer.out)
}

#[derive(Default)]
struct JsonWriter {
    out: String,
    path: Path,
}

impl JsonWriter {
    fn node(&mut self, value: &Value, schema: &Schema) -> Result<(), WriteError> {
        match schema {
            Schema::Primitive(primitive) => self.primitive(value, *primitive),
            Schema::Record(record) => match value {
                Value::Record(map) => {
                    self.out.push('{');
                    self.fields(map, record, false)?;
                    self.out.push('}');
                    Ok(())
                }
                other => Err(self.mismatch("record", other)),
            },
            Schema::List(element) => match value {
                Value::List(items) => {
                    self.out.push('[');
                    for (i, item) in items.iter().enumerate() {
                        if i > 0 {
                            self.out.push(',');
                        }
                        self.path.push_index(i);
                        self.node(item, element)?;
                        self.path.pop();
                    }
                    self.out.push(']');
                    Ok(())
                }
                other => Err(self.mismatch("list", other)),
            },
            Schema::Dictionary(dict) => self.dictionary(value, dict),
            Schema::Variant(variant) => self.variant(value, variant),
            Schema::Representation(repr) => self.representation(value, repr),
            Schema::Recursive(handle) => match handle.get() {
                Some(target) => self.node(value, target),
                None => Err(WriteError::UnresolvedRecursive {
                    name: handle.name().to_string(),
                    path: self.path.clone(),
                }),
            },
        }
    }

    fn primitive(&mut self, value: &Value, primitive: Primitive) -> Result<(), WriteError> {
        match (primitive, value) {
            (Primitive::Bool, Value::Bool(b)) => {
                self.out.push_str(if *b { "true" } else { "false" });
            }
            (Primitive::Int, Value::Int(i)) => {
                let _ = write!(self.out, "{i}");
            }
            (Primitive::Float, Value::Float(f)) => self.float(*f)?,
            (Primitive::Float, Value::Int(i)) => self.float(*i as f64)?,
            (Primitive::String, Value::Str(s)) => push_json_string(&mut self.out, s),
            (expected, other) => return Err(self.mismatch(expected.as_str(), other)),
        }
        Ok(())
    }

    fn float(&mut self, f: f64) -> Result<(), WriteError> {
        let number = Number::from_f64(f).ok_or_else(|| WriteError::NonFiniteFloat {
            value: f,
            path: self.path.clone(),
        })?;
        let _ = write!(self.out, "{number}");
        Ok(())
    }

    /// Writes the record's declared fields, without braces. Returns whether
    /// anything was written so callers can keep merging fields at the same
    /// level.
    fn fields(
        &mut self,
        map: &IndexMap<String, Value>,
        record: &RecordSchema,
        mut wrote_any: bool,
    ) -> Result<bool, WriteError> {
        for field in record.fields() {
            let Some(value) = map.get(&field.name) else {
                if field.optional {
                    continue;
                }
                return Err(WriteError::MissingField {
                    name: field.name.clone(),
                    path: self.path.clone(),
                });
            };
            if wrote_any {
                self.out.push(',');
            }
            self.key(&field.name);
            self.path.push_key(field.name.as_str());
            self.node(value, &field.schema)?;
            self.path.pop();
            wrote_any = true;
        }
        Ok(wrote_any)
    }

    fn key(&mut self, key: &str) {
        push_json_string(&mut self.out, key);
        self.out.push(':');
    }

    fn dictionary(&mut self, value: &Value, dict: &DictionarySchema) -> Result<(), WriteError> {
        let Value::Dict(entries) = value else {
            return Err(self.mismatch("dictionary", value));
        };
        self.out.push('[');
        for (i, (key, item)) in entries.iter().enumerate() {
            if i > 0 {
                self.out.push(',');
            }
            self.path.push_index(i);
            self.out.push('[');
            self.path.push_index(0);
            self.node(key, &dict.key)?;
            self.path.pop();
            self.out.push(',');
            self.path.push_index(1);
            self.node(item, &dict.value)?;
            self.path.pop();
            self.out.push(']');
            self.path.pop();
        }
        self.out.push(']');
        Ok(())
    }

    fn variant(&mut self, value: &Value, variant: &VariantSchema) -> Result<(), WriteError> {
        let Value::Variant { tag, args } = value else {
            return Err(self.mismatch("variant", value));
        };
        let Some((_, ctor)) = variant.constructor(tag) else {
            return Err(WriteError::UnknownVariant {
                tag: tag.clone(),
                path: self.path.clone(),
            });
        };
        if args.len() != ctor.args.len() {
            return Err(WriteError::ArityMismatch {
                tag: tag.clone(),
                expected: ctor.args.len(),
                actual: args.len(),
                path: self.path.clone(),
            });
        }

        self.out.push('{');
        match variant.mode() {
            VariantMode::Nested => {
                self.key(tag);
                self.path.push_key(tag.as_str());
                self.out.push('{');
                self.constructor_args(ctor, args, false)?;
                self.out.push('}');
                self.path.pop();
            }
            VariantMode::TagMatch => {
                let mut wrote_any = false;
                for rule in ctor.match_rule.iter().flatten() {
                    if wrote_any {
                        self.out.push(',');
                    }
                    self.key(&rule.field);
                    let _ = write!(self.out, "{}", rule.literal);
                    wrote_any = true;
                }
                self.constructor_args(ctor, args, wrote_any)?;
            }
        }
        self.out.push('}');
        Ok(())
    }

    /// Argument fields at the current object level: either the fields of an
    /// inlined record or one field per named argument.
    fn constructor_args(
        &mut self,
        ctor: &ConstructorSpec,
        args: &[Value],
        mut wrote_any: bool,
    ) -> Result<(), WriteError> {
        if let Some(record) = ctor.inlined_record() {
            return match args {
                [Value::Record(map)] => self.fields(map, record, wrote_any).map(|_| ()),
                [other] => Err(self.mismatch("record", other)),
                _ => Ok(()),
            };
        }
        for (arg, value) in ctor.args.iter().zip(args) {
            if wrote_any {
                self.out.push(',');
            }
            self.key(&arg.name);
            self.path.push_key(arg.name.as_str());
            self.node(value, &arg.schema)?;
            self.path.pop();
            wrote_any = true;
        }
        Ok(())
    }

    fn representation(&mut self, value: &Value, repr: &Representation) -> Result<(), WriteError> {
        let proxy = repr.to_proxy(value).map_err(|cause| WriteError::Conversion {
            name: repr.name().to_string(),
            path: self.path.clone(),
            cause,
        })?;
        self.node(&proxy, repr.proxy())
    }

    fn mismatch(&self, expected: &'static str, actual: &Value) -> WriteError {
        WriteError::ValueMismatch {
            expected,
            actual: actual.kind(),
            path: self.path.clone(),
        }
    }
}

/// Appends `s` as a quoted JSON string, escaping quotes, backslashes and
/// control characters.
pub(crate) fn push_json_string(out: &mut String, s: &str) {
    out.reserve(s.len() + 2);
    out.push('"');
    let mut last = 0;
    for (i, ch) in s.char_indices() {
        let short = match ch {
            '"' => "\\\"",
            '\\' => "\\\\",
            '\n' => "\\n",
            '\r' => "\\r",
            '\t' => "\\t",
            '\u{0008}' => "\\b",
            '\u{000C}' => "\\f",
            c if (c as u32) < 0x20 => "",
            _ => continue,
        };
        out.push_str(&s[last..i]);
        if short.is_empty() {
            let _ = write!(out, "\\u{:04x}", ch as u32);
        } else {
            out.push_str(short);
        }
        last = i + ch.len_utf8();
    }
    out.push_str(&s[last..]);
    out.push('"');
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quoted(s: &str) -> String {
        let mut out = String::new();
        push_json_string(&mut out, s);
        out
    }

    #[test]
    fn escapes_quotes_backslashes_and_controls() {
        assert_eq!(quoted("plain"), "\"plain\"");
        assert_eq!(quoted("say \"hi\""), "\"say \\\"hi\\\"\"");
        assert_eq!(quoted("a\\b"), "\"a\\\\b\"");
        assert_eq!(quoted("l1\nl2\t"), "\"l1\\nl2\\t\"");
        assert_eq!(quoted("\u{0001}\u{001f}"), "\"\\u0001\\u001f\"");
    }

    #[test]
    fn leaves_non_ascii_untouched() {
        assert_eq!(quoted("héllo 🎉"), "\"héllo 🎉\"");
    }

    #[test]
    fn escaped_strings_decode_back_with_serde_json() {
        let original = "tab\there \"quoted\" \u{0007} back\\slash";
        let decoded: String = serde_json::from_str(&quoted(original)).unwrap();
        assert_eq!(decoded, original);
    }
}

//! Schema-driven JSON parser.
//!
//! Input is consumed in one pass. Keys a record does not declare are skipped
//! lexically, so they cost no allocation. In [`ErrorMode::Accumulate`] a value
//! that does not fit its schema is reported, skipped and parsing resumes at
//! the next sibling.

use std::collections::hash_map::RandomState;
use std::collections::HashMap;
use std::hash::BuildHasher;

use indexmap::IndexMap;
use serde_json::Value as JsonValue;
use tracing::{debug, trace};

use super::lexer::{LexError, Lexer, Number};
use crate::error::{JsonKind, ParseError, ParseErrorKind};
use crate::options::{ErrorMode, ParseOptions};
use crate::path::{Path, Position};
use crate::representation::Representation;
use crate::schema::{DictionarySchema, Primitive, RecordSchema, Schema};
use crate::value::Value;
use crate::variant::{literal_equal, VariantMode, VariantSchema};

/// Parses `input` with default options, stopping at the first error.
pub fn parse(input: &[u8], schema: &Schema) -> Result<Value, Vec<ParseError>> {
    parse_with(input, schema, &ParseOptions::default())
}

pub fn parse_str(input: &str, schema: &Schema) -> Result<Value, Vec<ParseError>> {
    parse(input.as_bytes(), schema)
}

/// Parses `input` against `schema`. On failure returns every error recorded:
/// exactly one in fail-fast mode, one or more when accumulating.
pub fn parse_with(
    input: &[u8],
    schema: &Schema,
    options: &ParseOptions,
) -> Result<Value, Vec<ParseError>> {
    let mut parser = Parser::new(input, options);
    let result = parser.document(schema);
    let mut errors = parser.errors;
    match result {
        Ok(value) if errors.is_empty() => Ok(value),
        Ok(_) => {
            debug!(errors = errors.len(), "parse failed");
            Err(errors)
        }
        Err(e) => {
            debug!(error = %e, recorded = errors.len(), "parse aborted");
            errors.push(e);
            Err(errors)
        }
    }
}

/// Where a value started, so a failed value can be skipped after the fact.
#[derive(Clone, Copy)]
struct Checkpoint {
    position: Position,
    depth: usize,
    path_len: usize,
}

/// Raw extent of a field value inside a tag-match object.
struct Span {
    key: String,
    start: Position,
    end: usize,
}

struct Parser<'a, 'o> {
    lexer: Lexer<'a>,
    options: &'o ParseOptions,
    path: Path,
    depth: usize,
    errors: Vec<ParseError>,
}

impl<'a, 'o> Parser<'a, 'o> {
    fn new(input: &'a [u8], options: &'o ParseOptions) -> Self {
        Self {
            lexer: Lexer::new(input),
            options,
            path: Path::root(),
            depth: 0,
            errors: Vec::new(),
        }
    }

    fn document(&mut self, schema: &Schema) -> Result<Value, ParseError> {
        let value = self.value(schema)?;
        if !self.lexer.at_end() {
            let position = self.lexer.position();
            return Err(self.error(
                ParseErrorKind::SyntaxError("trailing characters after the document".into()),
                position,
            ));
        }
        Ok(value)
    }

    fn value(&mut self, schema: &Schema) -> Result<Value, ParseError> {
        match schema {
            Schema::Primitive(primitive) => self.primitive(*primitive),
            Schema::Record(record) => self.record(record).map(Value::Record),
            Schema::List(element) => self.list(element),
            Schema::Dictionary(dict) => self.dictionary(dict),
            Schema::Variant(variant) => match variant.mode() {
                VariantMode::Nested => self.nested_variant(variant),
                VariantMode::TagMatch => self.tag_match_variant(variant),
            },
            Schema::Representation(repr) => self.representation(repr),
            Schema::Recursive(handle) => match handle.get() {
                Some(target) => self.value(target),
                None => {
                    let position = self.lexer.position();
                    Err(self.error(
                        ParseErrorKind::UnresolvedRecursive(handle.name().to_string()),
                        position,
                    ))
                }
            },
        }
    }

    fn primitive(&mut self, primitive: Primitive) -> Result<Value, ParseError> {
        let (kind, position) = self.start()?;
        let value = match (primitive, kind) {
            (Primitive::Bool, JsonKind::Bool) => Value::Bool(self.lex(Lexer::read_bool)?),
            (Primitive::Int, JsonKind::Int) => match self.lex(Lexer::read_number)? {
                Number::Int(i) => Value::Int(i),
                Number::Float(_) => {
                    return Err(self.mismatch(JsonKind::Int, JsonKind::Float, position))
                }
            },
            (Primitive::Float, JsonKind::Int | JsonKind::Float) => {
                match self.lex(Lexer::read_number)? {
                    Number::Int(i) => Value::Float(i as f64),
                    Number::Float(f) => Value::Float(f),
                }
            }
            (Primitive::String, JsonKind::String) => Value::Str(self.lex(Lexer::read_string)?),
            (_, actual) => return Err(self.mismatch(primitive_kind(primitive), actual, position)),
        };
        Ok(value)
    }

    fn record(&mut self, record: &RecordSchema) -> Result<IndexMap<String, Value>, ParseError> {
        let start = self.open(JsonKind::Object)?;
        self.lex(Lexer::begin_object)?;
        let fields = record.fields();
        let mut slots: Vec<Option<Value>> = vec![None; fields.len()];
        let mut failed = vec![false; fields.len()];
        let mut first = true;
        while let Some(key) = self.lex(|lx| lx.next_key(&mut first))? {
            let index = record.position(&key);
            self.path.push_key(key);
            match index {
                Some(i) => {
                    // A repeated key replaces the earlier value.
                    let checkpoint = self.checkpoint();
                    let result = self.value(&fields[i].schema);
                    let parsed = self.recover(result, checkpoint)?;
                    failed[i] = parsed.is_none();
                    slots[i] = parsed;
                }
                None => self.skip()?,
            }
            self.path.pop();
        }
        self.depth -= 1;
        self.collect_fields(record, slots, &failed, start)
    }

    /// Assembles parsed field values in schema order, reporting required
    /// fields that never appeared.
    fn collect_fields(
        &mut self,
        record: &RecordSchema,
        slots: Vec<Option<Value>>,
        failed: &[bool],
        start: Position,
    ) -> Result<IndexMap<String, Value>, ParseError> {
        let mut map = IndexMap::with_capacity(slots.len());
        for ((field, slot), &errored) in record.fields().iter().zip(slots).zip(failed) {
            match slot {
                Some(value) => {
                    map.insert(field.name.clone(), value);
                }
                None if field.optional || errored => {}
                None => {
                    let e = self.error(ParseErrorKind::MissingField(field.name.clone()), start);
                    self.report(e)?;
                }
            }
        }
        Ok(map)
    }

    fn list(&mut self, element: &Schema) -> Result<Value, ParseError> {
        self.open(JsonKind::Array)?;
        self.lex(Lexer::begin_array)?;
        let mut items = Vec::new();
        let mut first = true;
        let mut index = 0;
        while self.lex(|lx| lx.next_element(&mut first))? {
            self.path.push_index(index);
            let checkpoint = self.checkpoint();
            let result = self.value(element);
            if let Some(item) = self.recover(result, checkpoint)? {
                items.push(item);
            }
            self.path.pop();
            index += 1;
        }
        self.depth -= 1;
        Ok(Value::List(items))
    }

    fn dictionary(&mut self, dict: &DictionarySchema) -> Result<Value, ParseError> {
        self.open(JsonKind::Array)?;
        self.lex(Lexer::begin_array)?;
        let mut entries: Vec<(Value, Value)> = Vec::new();
        // Key hash to positions in `entries`.
        let hasher = RandomState::new();
        let mut index_of: HashMap<u64, Vec<usize>> = HashMap::new();
        let mut first = true;
        let mut index = 0;
        while self.lex(|lx| lx.next_element(&mut first))? {
            self.path.push_index(index);
            let checkpoint = self.checkpoint();
            let result = self.pair(dict);
            if let Some((key, value)) = self.recover(result, checkpoint)? {
                // Last write wins; the entry keeps its first position.
                let slots = index_of.entry(hasher.hash_one(&key)).or_default();
                let existing = slots.iter().copied().find(|&i| entries[i].0 == key);
                match existing {
                    Some(i) => entries[i].1 = value,
                    None => {
                        slots.push(entries.len());
                        entries.push((key, value));
                    }
                }
            }
            self.path.pop();
            index += 1;
        }
        self.depth -= 1;
        Ok(Value::Dict(entries))
    }

    /// One `[key, value]` entry of a dictionary.
    fn pair(&mut self, dict: &DictionarySchema) -> Result<(Value, Value), ParseError> {
        let start = self.open(JsonKind::Array)?;
        self.lex(Lexer::begin_array)?;
        let mut key = None;
        let mut value = None;
        let mut arity = 0;
        let mut first = true;
        while self.lex(|lx| lx.next_element(&mut first))? {
            match arity {
                0 => {
                    self.path.push_index(0);
                    key = Some(self.value(&dict.key)?);
                    self.path.pop();
                }
                1 => {
                    self.path.push_index(1);
                    value = Some(self.value(&dict.value)?);
                    self.path.pop();
                }
                _ => self.skip()?,
            }
            arity += 1;
        }
        self.depth -= 1;
        match (key, value) {
            (Some(key), Some(value)) if arity == 2 => Ok((key, value)),
            _ => Err(self.error(ParseErrorKind::MalformedPair { arity }, start)),
        }
    }

    /// `{"Tag": {...}}`.
    fn nested_variant(&mut self, variant: &VariantSchema) -> Result<Value, ParseError> {
        let start = self.open(JsonKind::Object)?;
        self.lex(Lexer::begin_object)?;
        let mut first = true;
        let Some(tag) = self.lex(|lx| lx.next_key(&mut first))? else {
            return Err(self.error(ParseErrorKind::MalformedVariant { keys: 0 }, start));
        };
        let Some((index, ctor)) = variant.constructor(&tag) else {
            return Err(self.error(ParseErrorKind::UnknownVariant(tag), start));
        };
        self.path.push_key(tag.as_str());
        let args = match ctor.inlined_record() {
            Some(record) => vec![Value::Record(self.record(record)?)],
            None => {
                let mut fields = self.record(variant.arg_record(index))?;
                ctor.args
                    .iter()
                    .filter_map(|arg| fields.shift_remove(&arg.name))
                    .collect()
            }
        };
        self.path.pop();

        let mut keys = 1;
        while self.lex(|lx| lx.next_key(&mut first))?.is_some() {
            self.skip()?;
            keys += 1;
        }
        self.depth -= 1;
        if keys != 1 {
            return Err(self.error(ParseErrorKind::MalformedVariant { keys }, start));
        }
        Ok(Value::Variant { tag, args })
    }

    /// A flat object whose literal discriminant fields pick the constructor.
    fn tag_match_variant(&mut self, variant: &VariantSchema) -> Result<Value, ParseError> {
        let start = self.open(JsonKind::Object)?;
        self.lex(Lexer::begin_object)?;
        let mut spans: Vec<Span> = Vec::new();
        let mut first = true;
        while let Some(key) = self.lex(|lx| lx.next_key(&mut first))? {
            self.path.push_key(key.as_str());
            let value_start = self.lexer.position();
            self.skip()?;
            self.path.pop();
            if !variant.is_union_key(&key) {
                continue;
            }
            let span = Span {
                key,
                start: value_start,
                end: self.lexer.position().offset,
            };
            match spans.iter_mut().find(|s| s.key == span.key) {
                Some(existing) => *existing = span,
                None => spans.push(span),
            }
        }
        let end = self.lexer.position();

        let input = self.lexer.input();
        let mut literals: Vec<(&str, JsonValue)> = Vec::new();
        for span in spans.iter().filter(|s| variant.is_discriminant_key(&s.key)) {
            match serde_json::from_slice(&input[span.start.offset..span.end]) {
                Ok(literal) => literals.push((span.key.as_str(), literal)),
                Err(e) => {
                    self.path.push_key(span.key.as_str());
                    let e = self.error(ParseErrorKind::SyntaxError(e.to_string()), span.start);
                    return Err(e);
                }
            }
        }
        let selected = variant.select(|field, literal| {
            literals
                .iter()
                .any(|(key, found)| *key == field && literal_equal(found, literal))
        });
        let Some(index) = selected else {
            return Err(self.error(ParseErrorKind::NoMatchingVariant, start));
        };
        let ctor = &variant.constructors()[index];
        trace!(variant = variant.name(), tag = %ctor.tag, "discriminant matched");

        let args = match ctor.inlined_record() {
            Some(record) => vec![Value::Record(self.fields_from_spans(record, &spans, start)?)],
            None => {
                let mut fields = self.fields_from_spans(variant.arg_record(index), &spans, start)?;
                ctor.args
                    .iter()
                    .filter_map(|arg| fields.shift_remove(&arg.name))
                    .collect()
            }
        };
        self.lexer.seek(end);
        self.depth -= 1;
        Ok(Value::Variant {
            tag: ctor.tag.clone(),
            args,
        })
    }

    /// Parses the declared fields of `record` from spans captured earlier.
    fn fields_from_spans(
        &mut self,
        record: &RecordSchema,
        spans: &[Span],
        start: Position,
    ) -> Result<IndexMap<String, Value>, ParseError> {
        let fields = record.fields();
        let mut slots: Vec<Option<Value>> = vec![None; fields.len()];
        let mut failed = vec![false; fields.len()];
        for (i, field) in fields.iter().enumerate() {
            let Some(span) = spans.iter().find(|s| s.key == field.name) else {
                continue;
            };
            self.lexer.seek(span.start);
            self.path.push_key(field.name.as_str());
            let checkpoint = self.checkpoint();
            let result = self.value(&field.schema);
            let parsed = self.recover(result, checkpoint)?;
            self.path.pop();
            failed[i] = parsed.is_none();
            slots[i] = parsed;
        }
        self.collect_fields(record, slots, &failed, start)
    }

    fn representation(&mut self, repr: &Representation) -> Result<Value, ParseError> {
        self.lexer.skip_whitespace();
        let start = self.lexer.position();
        let recorded = self.errors.len();
        let proxy = self.value(repr.proxy())?;
        if self.errors.len() > recorded {
            // The proxy is incomplete and its errors are already recorded.
            return Ok(proxy);
        }
        repr.from_proxy(proxy).map_err(|cause| {
            self.error(
                ParseErrorKind::MalformedRepresentation {
                    name: repr.name().to_string(),
                    cause,
                },
                start,
            )
        })
    }

    /// Kind and position of the next value.
    fn start(&mut self) -> Result<(JsonKind, Position), ParseError> {
        let kind = self.lex(Lexer::peek_kind)?;
        Ok((kind, self.lexer.position()))
    }

    /// Checks that the next value is a container of `kind` and enters it.
    fn open(&mut self, kind: JsonKind) -> Result<Position, ParseError> {
        let (actual, position) = self.start()?;
        if actual != kind {
            return Err(self.mismatch(kind, actual, position));
        }
        if self.depth >= self.options.max_depth {
            return Err(self.error(
                ParseErrorKind::DepthExceeded {
                    limit: self.options.max_depth,
                },
                position,
            ));
        }
        self.depth += 1;
        Ok(position)
    }

    fn skip(&mut self) -> Result<(), ParseError> {
        let budget = self.options.max_depth.saturating_sub(self.depth);
        self.lex(|lx| lx.skip_value(budget))
    }

    fn checkpoint(&mut self) -> Checkpoint {
        self.lexer.skip_whitespace();
        Checkpoint {
            position: self.lexer.position(),
            depth: self.depth,
            path_len: self.path.len(),
        }
    }

    /// In accumulate mode, records a non-fatal error and skips the value that
    /// caused it. Returns `None` for a skipped value.
    fn recover<T>(
        &mut self,
        result: Result<T, ParseError>,
        checkpoint: Checkpoint,
    ) -> Result<Option<T>, ParseError> {
        match result {
            Ok(value) => Ok(Some(value)),
            Err(e) if self.accumulating() && !e.kind.is_fatal() => {
                trace!(error = %e, "skipping value");
                self.errors.push(e);
                self.lexer.seek(checkpoint.position);
                self.depth = checkpoint.depth;
                self.path.truncate(checkpoint.path_len);
                self.skip()?;
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Records an error that does not invalidate the value being built.
    fn report(&mut self, e: ParseError) -> Result<(), ParseError> {
        if self.accumulating() && !e.kind.is_fatal() {
            self.errors.push(e);
            Ok(())
        } else {
            Err(e)
        }
    }

    fn accumulating(&self) -> bool {
        self.options.errors == ErrorMode::Accumulate
    }

    fn lex<T>(
        &mut self,
        f: impl FnOnce(&mut Lexer<'a>) -> Result<T, LexError>,
    ) -> Result<T, ParseError> {
        let result = f(&mut self.lexer);
        result.map_err(|e| match e {
            LexError::Syntax { message, position } => {
                self.error(ParseErrorKind::SyntaxError(message), position)
            }
            LexError::Depth { position, .. } => self.error(
                ParseErrorKind::DepthExceeded {
                    limit: self.options.max_depth,
                },
                position,
            ),
        })
    }

    fn error(&self, kind: ParseErrorKind, position: Position) -> ParseError {
        ParseError::new(kind, self.path.clone(), position)
    }

    fn mismatch(&self, expected: JsonKind, actual: JsonKind, position: Position) -> ParseError {
        self.error(ParseErrorKind::TypeMismatch { expected, actual }, position)
    }
}

fn primitive_kind(primitive: Primitive) -> JsonKind {
    match primitive {
        Primitive::Bool => JsonKind::Bool,
        Primitive::Int => JsonKind::Int,
        Primitive::Float => JsonKind::Float,
        Primitive::String => JsonKind::String,
    }
}

//! Byte-level JSON tokenizer with line/column tracking.
//!
//! The parser pulls tokens on demand; values it has no schema for are
//! consumed with [`Lexer::skip_value`], which checks syntax and nesting depth
//! without building anything.

use crate::error::JsonKind;
use crate::path::Position;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum LexError {
    Syntax { message: String, position: Position },
    Depth { limit: usize, position: Position },
}

/// A JSON number literal. Literals written with a fraction or exponent, and
/// integers outside `i64`, are floats.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Number {
    Int(i64),
    Float(f64),
}

pub(crate) struct Lexer<'a> {
    data: &'a [u8],
    x: usize,
    line: usize,
    line_start: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            x: 0,
            line: 1,
            line_start: 0,
        }
    }

    pub fn input(&self) -> &'a [u8] {
        self.data
    }

    pub fn position(&self) -> Position {
        Position {
            offset: self.x,
            line: self.line,
            column: self.x - self.line_start + 1,
        }
    }

    /// Moves back (or forward) to a position previously returned by
    /// [`position`](Self::position).
    pub fn seek(&mut self, position: Position) {
        self.x = position.offset;
        self.line = position.line;
        self.line_start = position.offset + 1 - position.column;
    }

    fn syntax<T>(&self, message: impl Into<String>) -> Result<T, LexError> {
        Err(LexError::Syntax {
            message: message.into(),
            position: self.position(),
        })
    }

    pub fn skip_whitespace(&mut self) {
        while let Some(&b) = self.data.get(self.x) {
            match b {
                b' ' | b'\t' | b'\r' => self.x += 1,
                b'\n' => {
                    self.x += 1;
                    self.line += 1;
                    self.line_start = self.x;
                }
                _ => break,
            }
        }
    }

    pub fn at_end(&mut self) -> bool {
        self.skip_whitespace();
        self.x >= self.data.len()
    }

    fn peek_byte(&mut self) -> Option<u8> {
        self.skip_whitespace();
        self.data.get(self.x).copied()
    }

    fn unexpected<T>(&mut self, what: &str) -> Result<T, LexError> {
        match self.peek_byte() {
            None => self.syntax(format!("unexpected end of input, expected {what}")),
            Some(b) if b.is_ascii_graphic() => {
                self.syntax(format!("unexpected character `{}`, expected {what}", b as char))
            }
            Some(b) => self.syntax(format!("unexpected byte 0x{b:02x}, expected {what}")),
        }
    }

    /// Kind of the next value, leaving the cursor at its first byte.
    pub fn peek_kind(&mut self) -> Result<JsonKind, LexError> {
        match self.peek_byte() {
            Some(b'{') => Ok(JsonKind::Object),
            Some(b'[') => Ok(JsonKind::Array),
            Some(b'"') => Ok(JsonKind::String),
            Some(b't' | b'f') => Ok(JsonKind::Bool),
            Some(b'n') => Ok(JsonKind::Null),
            Some(b'-' | b'0'..=b'9') => {
                let (end, is_float) = self.scan_number()?;
                if is_float {
                    return Ok(JsonKind::Float);
                }
                let literal = std::str::from_utf8(&self.data[self.x..end]).unwrap_or_default();
                Ok(if literal.parse::<i64>().is_ok() {
                    JsonKind::Int
                } else {
                    JsonKind::Float
                })
            }
            _ => self.unexpected("a value"),
        }
    }

    fn expect_byte(&mut self, expected: u8, what: &str) -> Result<(), LexError> {
        if self.peek_byte() == Some(expected) {
            self.x += 1;
            Ok(())
        } else {
            self.unexpected(what)
        }
    }

    fn literal(&mut self, word: &[u8]) -> Result<(), LexError> {
        if self.data[self.x..].starts_with(word) {
            self.x += word.len();
            Ok(())
        } else {
            self.syntax("invalid literal")
        }
    }

    pub fn read_bool(&mut self) -> Result<bool, LexError> {
        match self.peek_byte() {
            Some(b't') => self.literal(b"true").map(|_| true),
            Some(b'f') => self.literal(b"false").map(|_| false),
            _ => self.unexpected("a boolean"),
        }
    }

    fn read_null(&mut self) -> Result<(), LexError> {
        self.skip_whitespace();
        self.literal(b"null")
    }

    /// Validates the number literal at the cursor without consuming it.
    /// Returns its end offset and whether it has a fraction or exponent.
    fn scan_number(&self) -> Result<(usize, bool), LexError> {
        let data = self.data;
        let mut x = self.x;
        let digits = |mut x: usize| {
            let start = x;
            while data.get(x).is_some_and(u8::is_ascii_digit) {
                x += 1;
            }
            (x, x - start)
        };
        if data.get(x) == Some(&b'-') {
            x += 1;
        }
        match data.get(x) {
            Some(b'0') => x += 1,
            Some(b'1'..=b'9') => x = digits(x).0,
            _ => return self.syntax("invalid number"),
        }
        let mut is_float = false;
        if data.get(x) == Some(&b'.') {
            let (end, count) = digits(x + 1);
            if count == 0 {
                return self.syntax("invalid number: missing fraction digits");
            }
            x = end;
            is_float = true;
        }
        if matches!(data.get(x), Some(b'e' | b'E')) {
            x += 1;
            if matches!(data.get(x), Some(b'+' | b'-')) {
                x += 1;
            }
            let (end, count) = digits(x);
            if count == 0 {
                return self.syntax("invalid number: missing exponent digits");
            }
            x = end;
            is_float = true;
        }
        Ok((x, is_float))
    }

    pub fn read_number(&mut self) -> Result<Number, LexError> {
        self.skip_whitespace();
        let (end, is_float) = self.scan_number()?;
        let literal = match std::str::from_utf8(&self.data[self.x..end]) {
            Ok(literal) => literal,
            Err(_) => return self.syntax("invalid number"),
        };
        let number = if is_float {
            None
        } else {
            literal.parse::<i64>().ok().map(Number::Int)
        };
        let number = match number {
            Some(number) => number,
            None => match literal.parse::<f64>() {
                Ok(f) if f.is_finite() => Number::Float(f),
                _ => return self.syntax("number out of range"),
            },
        };
        self.x = end;
        Ok(number)
    }

    fn syntax_at<T>(&self, offset: usize, message: &str) -> Result<T, LexError> {
        // Only used inside strings, which never span lines.
        Err(LexError::Syntax {
            message: message.into(),
            position: Position {
                offset,
                line: self.line,
                column: offset - self.line_start + 1,
            },
        })
    }

    /// Offset of the closing quote of the string whose body starts at `x`,
    /// and whether the body holds escapes. Escape sequences are validated.
    fn string_end(&self, mut x: usize) -> Result<(usize, bool), LexError> {
        let mut escaped = false;
        loop {
            match self.data.get(x) {
                None => return self.syntax("unterminated string"),
                Some(b'"') => return Ok((x, escaped)),
                Some(b'\\') => {
                    escaped = true;
                    x = self.escape_end(x)?;
                }
                Some(&b) if b < 0x20 => return self.syntax_at(x, "control character in string"),
                Some(_) => x += 1,
            }
        }
    }

    /// End of the escape sequence whose backslash is at `x`.
    fn escape_end(&self, x: usize) -> Result<usize, LexError> {
        match self.data.get(x + 1) {
            Some(b'"' | b'\\' | b'/' | b'b' | b'f' | b'n' | b'r' | b't') => Ok(x + 2),
            Some(b'u') => match self.hex4(x + 2) {
                None => self.syntax_at(x, "invalid unicode escape"),
                Some(0xD800..=0xDBFF) => {
                    let low = match self.data.get(x + 6..x + 8) {
                        Some(b"\\u") => self.hex4(x + 8),
                        _ => None,
                    };
                    match low {
                        Some(0xDC00..=0xDFFF) => Ok(x + 12),
                        _ => self.syntax_at(x, "lone surrogate in unicode escape"),
                    }
                }
                Some(0xDC00..=0xDFFF) => self.syntax_at(x, "lone surrogate in unicode escape"),
                Some(_) => Ok(x + 6),
            },
            _ => self.syntax_at(x, "invalid escape sequence"),
        }
    }

    fn hex4(&self, x: usize) -> Option<u16> {
        let digits = self.data.get(x..x + 4)?;
        if !digits.iter().all(u8::is_ascii_hexdigit) {
            return None;
        }
        let text = std::str::from_utf8(digits).ok()?;
        u16::from_str_radix(text, 16).ok()
    }

    /// Consumes the string at the cursor without decoding it.
    fn skip_string(&mut self) -> Result<(), LexError> {
        let start = self.x + 1;
        let (end, _) = self.string_end(start)?;
        if let Err(e) = std::str::from_utf8(&self.data[start..end]) {
            return self.syntax_at(start + e.valid_up_to(), "invalid UTF-8 in string");
        }
        self.x = end + 1;
        Ok(())
    }

    pub fn read_string(&mut self) -> Result<String, LexError> {
        self.expect_byte(b'"', "a string")?;
        let start = self.x;
        let (end, escaped) = self.string_end(start)?;
        let body = &self.data[start..end];
        let decoded = if escaped {
            // Re-quote and let serde_json handle escape sequences.
            serde_json::from_slice::<String>(&self.data[start - 1..end + 1]).ok()
        } else {
            std::str::from_utf8(body).ok().map(str::to_string)
        };
        match decoded {
            Some(s) => {
                self.x = end + 1;
                Ok(s)
            }
            None => {
                self.x = start - 1;
                self.syntax("invalid string literal")
            }
        }
    }

    pub fn begin_object(&mut self) -> Result<(), LexError> {
        self.expect_byte(b'{', "`{`")
    }

    /// Reads the next key of an object, consuming the separator before it and
    /// the colon after it. Returns `None` once the closing brace is consumed.
    pub fn next_key(&mut self, first: &mut bool) -> Result<Option<String>, LexError> {
        match self.peek_byte() {
            Some(b'}') => {
                self.x += 1;
                return Ok(None);
            }
            Some(b',') if !*first => self.x += 1,
            _ if *first => {}
            _ => return self.unexpected("`,` or `}`"),
        }
        *first = false;
        if self.peek_byte() != Some(b'"') {
            return self.unexpected("an object key");
        }
        let key = self.read_string()?;
        self.expect_byte(b':', "`:`")?;
        self.skip_whitespace();
        Ok(Some(key))
    }

    pub fn begin_array(&mut self) -> Result<(), LexError> {
        self.expect_byte(b'[', "`[`")
    }

    /// Consumes the separator before the next element. Returns `false` once
    /// the closing bracket is consumed.
    pub fn next_element(&mut self, first: &mut bool) -> Result<bool, LexError> {
        match self.peek_byte() {
            Some(b']') => {
                self.x += 1;
                return Ok(false);
            }
            Some(b',') if !*first => self.x += 1,
            _ if *first => {}
            _ => return self.unexpected("`,` or `]`"),
        }
        *first = false;
        self.skip_whitespace();
        Ok(true)
    }

    /// Consumes one value of any shape, allowing at most `depth_budget`
    /// levels of nesting inside it.
    pub fn skip_value(&mut self, depth_budget: usize) -> Result<(), LexError> {
        // One entry per open container; `true` for objects.
        let mut stack: Vec<bool> = Vec::new();
        'value: loop {
            match self.peek_kind()? {
                JsonKind::Object | JsonKind::Array => {
                    let is_object = self.peek_byte() == Some(b'{');
                    if stack.len() >= depth_budget {
                        return Err(LexError::Depth {
                            limit: depth_budget,
                            position: self.position(),
                        });
                    }
                    self.x += 1;
                    let close = if is_object { b'}' } else { b']' };
                    if self.peek_byte() == Some(close) {
                        self.x += 1;
                    } else {
                        stack.push(is_object);
                        if is_object {
                            self.object_key()?;
                        }
                        continue 'value;
                    }
                }
                JsonKind::String => self.skip_string()?,
                JsonKind::Bool => {
                    self.read_bool()?;
                }
                JsonKind::Null => self.read_null()?,
                JsonKind::Int | JsonKind::Float => {
                    let (end, _) = self.scan_number()?;
                    self.x = end;
                }
            }
            // A value is complete; unwind containers it closes.
            while let Some(&is_object) = stack.last() {
                match self.peek_byte() {
                    Some(b',') => {
                        self.x += 1;
                        if is_object {
                            self.object_key()?;
                        }
                        continue 'value;
                    }
                    Some(b'}') if is_object => {
                        self.x += 1;
                        stack.pop();
                    }
                    Some(b']') if !is_object => {
                        self.x += 1;
                        stack.pop();
                    }
                    _ if is_object => return self.unexpected("`,` or `}`"),
                    _ => return self.unexpected("`,` or `]`"),
                }
            }
            return Ok(());
        }
    }

    /// Skips `"key":` inside an object being skipped.
    fn object_key(&mut self) -> Result<(), LexError> {
        if self.peek_byte() != Some(b'"') {
            return self.unexpected("an object key");
        }
        self.skip_string()?;
        self.expect_byte(b':', "`:`")
    }
}

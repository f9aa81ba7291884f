//! Representations: a domain type paired with a JSON-representable proxy.
//!
//! A [`Representation`] carries the proxy's schema and two fallible
//! conversions. The writer converts a domain value to the proxy and writes
//! that; the parser parses the proxy and converts it back. A proxy that is a
//! plain string is opaque to the engines: only the conversion inspects it.

use std::fmt;
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::{DateTime, Utc};

use crate::error::ConversionError;
use crate::schema::{Primitive, Schema};
use crate::value::Value;

/// Domain value → proxy value.
pub type ToProxyFn = Arc<dyn Fn(&Value) -> Result<Value, ConversionError> + Send + Sync>;

/// Proxy value → domain value.
pub type FromProxyFn = Arc<dyn Fn(Value) -> Result<Value, ConversionError> + Send + Sync>;

/// A named pair of conversions, declared by a type before its proxy schema is
/// known.
#[derive(Clone)]
pub struct Conversion {
    name: String,
    to: ToProxyFn,
    from: FromProxyFn,
}

impl Conversion {
    pub fn new<T, F>(name: impl Into<String>, to: T, from: F) -> Self
    where
        T: Fn(&Value) -> Result<Value, ConversionError> + Send + Sync + 'static,
        F: Fn(Value) -> Result<Value, ConversionError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            to: Arc::new(to),
            from: Arc::new(from),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for Conversion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Conversion").field("name", &self.name).finish()
    }
}

pub struct Representation {
    conversion: Conversion,
    proxy: Schema,
}

impl Representation {
    pub fn new<T, F>(name: impl Into<String>, proxy: Schema, to: T, from: F) -> Self
    where
        T: Fn(&Value) -> Result<Value, ConversionError> + Send + Sync + 'static,
        F: Fn(Value) -> Result<Value, ConversionError> + Send + Sync + 'static,
    {
        Self::resolve(Conversion::new(name, to, from), proxy)
    }

    /// Pairs a declared conversion with the schema derived for its proxy.
    pub fn resolve(conversion: Conversion, proxy: Schema) -> Self {
        Self { conversion, proxy }
    }

    pub fn name(&self) -> &str {
        &self.conversion.name
    }

    pub fn proxy(&self) -> &Schema {
        &self.proxy
    }

    /// Whether the proxy is a bare string the engines never look into.
    pub fn is_opaque(&self) -> bool {
        matches!(self.proxy, Schema::Primitive(Primitive::String))
    }

    pub fn to_proxy(&self, value: &Value) -> Result<Value, ConversionError> {
        (self.conversion.to)(value)
    }

    pub fn from_proxy(&self, proxy: Value) -> Result<Value, ConversionError> {
        (self.conversion.from)(proxy)
    }

    /// Dates travel as floating-point millisecond timestamps. Sub-millisecond
    /// precision is kept down to the microsecond.
    pub fn date() -> Self {
        Self::new(
            "date",
            Schema::Primitive(Primitive::Float),
            |value| match value {
                Value::Date(date) => Ok(Value::Float(date.timestamp_micros() as f64 / 1000.0)),
                other => Err(ConversionError::new(format!(
                    "expected a date, found {}",
                    other.kind()
                ))),
            },
            |proxy| {
                let millis = proxy
                    .as_f64()
                    .ok_or_else(|| ConversionError::new("expected a millisecond timestamp"))?;
                date_from_millis(millis).map(Value::Date)
            },
        )
    }

    /// Binary blobs travel as standard, padded base64 strings.
    pub fn bytes() -> Self {
        Self::new(
            "bytes",
            Schema::Primitive(Primitive::String),
            |value| match value {
                Value::Bytes(bytes) => Ok(Value::Str(STANDARD.encode(bytes))),
                other => Err(ConversionError::new(format!(
                    "expected bytes, found {}",
                    other.kind()
                ))),
            },
            |proxy| match proxy {
                Value::Str(text) => STANDARD
                    .decode(text.as_bytes())
                    .map(Value::Bytes)
                    .map_err(|e| ConversionError::new(format!("invalid base64: {e}"))),
                other => Err(ConversionError::new(format!(
                    "expected a base64 string, found {}",
                    other.kind()
                ))),
            },
        )
    }
}

impl fmt::Debug for Representation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Representation")
            .field("name", &self.conversion.name)
            .field("proxy", &self.proxy)
            .finish()
    }
}

fn date_from_millis(millis: f64) -> Result<DateTime<Utc>, ConversionError> {
    let micros = (millis * 1000.0).round();
    // i64::MAX is not exactly representable; stay strictly inside the range.
    if !micros.is_finite() || micros.abs() >= 9.2e18 {
        return Err(ConversionError::new(format!(
            "timestamp {millis} is out of range"
        )));
    }
    DateTime::<Utc>::from_timestamp_micros(micros as i64)
        .ok_or_else(|| ConversionError::new(format!("timestamp {millis} is out of range")))
}

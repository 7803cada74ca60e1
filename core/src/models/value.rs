//! Cell values and semantic column types
//!
//! `Value` is the closed set of values a cell may hold. `ColumnType` is the
//! semantic type of a column; it owns the conversion rules that turn an
//! arbitrary incoming value into the value stored for that column.

use std::fmt::{Debug, Display, Formatter, Result as FmtResult};
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Serialize, Deserialize};
use thiserror::Error;
use uuid::Uuid;

/// Type of value in a row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueType {
    /// Integer (32-bit)
    Integer,

    /// Big integer (64-bit)
    BigInt,

    /// Floating point (64-bit)
    Float,

    /// Text string
    Text,

    /// Binary data
    Binary,

    /// Boolean
    Boolean,

    /// UUID
    Uuid,

    /// Timestamp
    Timestamp,

    /// JSON data
    Json,

    /// Null value
    Null,
}

/// Value in a row
#[derive(Clone, Serialize, Deserialize)]
pub enum Value {
    /// Integer (32-bit)
    Integer(i32),

    /// Big integer (64-bit)
    BigInt(i64),

    /// Floating point (64-bit)
    Float(f64),

    /// Text string
    Text(String),

    /// Binary data
    Binary(Vec<u8>),

    /// Boolean
    Boolean(bool),

    /// UUID
    Uuid(Uuid),

    /// Timestamp in UTC
    Timestamp(DateTime<Utc>),

    /// JSON document, kept in its textual form
    Json(String),

    /// Null value
    Null,
}

impl Debug for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Value::Integer(v) => write!(f, "Integer({})", v),
            Value::BigInt(v) => write!(f, "BigInt({})", v),
            Value::Float(v) => write!(f, "Float({})", v),
            Value::Text(v) => {
                if v.chars().count() > 20 {
                    let head: String = v.chars().take(20).collect();
                    write!(f, "Text(\"{}...\")", head)
                } else {
                    write!(f, "Text(\"{}\")", v)
                }
            }
            Value::Binary(v) => {
                if v.len() > 10 {
                    write!(f, "Binary({} bytes)", v.len())
                } else {
                    write!(f, "Binary({:?})", v)
                }
            }
            Value::Boolean(v) => write!(f, "Boolean({})", v),
            Value::Uuid(v) => write!(f, "Uuid({})", v),
            Value::Timestamp(v) => write!(f, "Timestamp({})", v.to_rfc3339()),
            Value::Json(v) => {
                if v.chars().count() > 20 {
                    let head: String = v.chars().take(20).collect();
                    write!(f, "Json({}...)", head)
                } else {
                    write!(f, "Json({})", v)
                }
            }
            Value::Null => write!(f, "Null"),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::BigInt(a), Value::BigInt(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => {
                if a.is_nan() && b.is_nan() {
                    true
                } else {
                    a == b
                }
            }
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::Binary(a), Value::Binary(b)) => a == b,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Uuid(a), Value::Uuid(b)) => a == b,
            (Value::Timestamp(a), Value::Timestamp(b)) => a == b,
            (Value::Json(a), Value::Json(b)) => a == b,
            (Value::Null, Value::Null) => true,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.to_display_string())
    }
}

/// Integral value of a float, if it has one that fits i64
fn integral_f64(v: f64) -> Option<i64> {
    if v.is_finite() && v.fract() == 0.0 && v >= i64::MIN as f64 && v < i64::MAX as f64 {
        Some(v as i64)
    } else {
        None
    }
}

impl Value {
    /// Get the type of the value
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Integer(_) => ValueType::Integer,
            Value::BigInt(_) => ValueType::BigInt,
            Value::Float(_) => ValueType::Float,
            Value::Text(_) => ValueType::Text,
            Value::Binary(_) => ValueType::Binary,
            Value::Boolean(_) => ValueType::Boolean,
            Value::Uuid(_) => ValueType::Uuid,
            Value::Timestamp(_) => ValueType::Timestamp,
            Value::Json(_) => ValueType::Json,
            Value::Null => ValueType::Null,
        }
    }

    /// Whether the value is null
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Integer view of integral numeric values
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(v) => Some(*v as i64),
            Value::BigInt(v) => Some(*v),
            Value::Float(v) => integral_f64(*v),
            _ => None,
        }
    }

    /// Floating point view of numeric values
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(v) => Some(*v as f64),
            Value::BigInt(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Text view of text and JSON values
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(v) | Value::Json(v) => Some(v),
            _ => None,
        }
    }

    /// Boolean view
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(v) => Some(*v),
            _ => None,
        }
    }

    fn is_numeric(&self) -> bool {
        matches!(self, Value::Integer(_) | Value::BigInt(_) | Value::Float(_))
    }

    /// Equality under semantic-type rules.
    ///
    /// Numbers compare across widths (an integral float equals the integer),
    /// text compares with trailing whitespace ignored, JSON compares as
    /// parsed documents. Everything else compares structurally.
    pub fn semantic_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Null, _) | (_, Value::Null) => false,
            (Value::Float(a), Value::Float(b)) => (a.is_nan() && b.is_nan()) || a == b,
            (Value::Float(f), n) | (n, Value::Float(f)) if n.is_numeric() => {
                match (integral_f64(*f), n.as_i64()) {
                    (Some(a), Some(b)) => a == b,
                    _ => false,
                }
            }
            (a, b) if a.is_numeric() && b.is_numeric() => a.as_i64() == b.as_i64(),
            (Value::Text(a), Value::Text(b)) => a.trim_end() == b.trim_end(),
            (Value::Json(a), Value::Json(b)) => {
                match (
                    serde_json::from_str::<serde_json::Value>(a),
                    serde_json::from_str::<serde_json::Value>(b),
                ) {
                    (Ok(x), Ok(y)) => x == y,
                    _ => a == b,
                }
            }
            (a, b) => a == b,
        }
    }

    /// Bytes that identify the value for hashing.
    ///
    /// Values equal under [`Value::semantic_eq`] produce equal bytes.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(16);
        match self {
            Value::Integer(_) | Value::BigInt(_) => {
                out.push(b'i');
                out.extend_from_slice(&self.as_i64().unwrap_or_default().to_be_bytes());
            }
            Value::Float(v) => match integral_f64(*v) {
                Some(i) => {
                    out.push(b'i');
                    out.extend_from_slice(&i.to_be_bytes());
                }
                None if v.is_nan() => out.extend_from_slice(b"fNaN"),
                None => {
                    out.push(b'f');
                    out.extend_from_slice(&v.to_bits().to_be_bytes());
                }
            },
            Value::Text(v) => {
                out.push(b's');
                out.extend_from_slice(v.trim_end().as_bytes());
            }
            Value::Binary(v) => {
                out.push(b'b');
                out.extend_from_slice(v);
            }
            Value::Boolean(v) => {
                out.push(b'o');
                out.push(u8::from(*v));
            }
            Value::Uuid(v) => {
                out.push(b'u');
                out.extend_from_slice(v.as_bytes());
            }
            Value::Timestamp(v) => {
                out.push(b't');
                out.extend_from_slice(&v.timestamp().to_be_bytes());
                out.extend_from_slice(&v.timestamp_subsec_nanos().to_be_bytes());
            }
            Value::Json(v) => {
                out.push(b'j');
                // serde_json maps serialize with sorted keys, which canonicalizes objects
                match serde_json::from_str::<serde_json::Value>(v) {
                    Ok(doc) => out.extend_from_slice(doc.to_string().as_bytes()),
                    Err(_) => out.extend_from_slice(v.as_bytes()),
                }
            }
            Value::Null => out.push(b'n'),
        }
        out
    }

    /// Formatted string representation, empty for null
    pub fn to_display_string(&self) -> String {
        match self {
            Value::Integer(v) => v.to_string(),
            Value::BigInt(v) => v.to_string(),
            Value::Float(v) => v.to_string(),
            Value::Text(v) | Value::Json(v) => v.clone(),
            Value::Binary(v) => hex::encode(v),
            Value::Boolean(v) => v.to_string(),
            Value::Uuid(v) => v.to_string(),
            Value::Timestamp(v) => v.to_rfc3339(),
            Value::Null => String::new(),
        }
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::BigInt(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Binary(v)
    }
}

impl From<Uuid> for Value {
    fn from(v: Uuid) -> Self {
        Value::Uuid(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::Timestamp(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

/// Conversion failure between a value and a column type
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoercionError {
    /// The value's type cannot be converted at all
    #[error("cannot convert {from:?} to {to}")]
    Incompatible {
        /// Source value type
        from: ValueType,
        /// Target column type
        to: ColumnType,
    },

    /// Text could not be parsed as the target type
    #[error("cannot parse '{text}' as {to}")]
    Parse {
        /// Offending text
        text: String,
        /// Target column type
        to: ColumnType,
    },

    /// Value does not fit the target type
    #[error("value {value} out of range for {to}")]
    OutOfRange {
        /// Printable value
        value: String,
        /// Target column type
        to: ColumnType,
    },
}

/// Semantic type of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnType {
    /// Integer (32-bit)
    Integer,

    /// Big integer (64-bit)
    BigInt,

    /// Floating point (64-bit)
    Float,

    /// Fixed point number stored as a float rounded to `scale` digits
    Decimal {
        /// Total significant digits
        precision: u8,
        /// Digits after the decimal point
        scale: u8,
    },

    /// Variable-length text string
    VarChar(usize),

    /// Fixed-length text string
    Char(usize),

    /// Text (unlimited length)
    Text,

    /// Binary data
    Binary,

    /// Boolean
    Boolean,

    /// UUID
    Uuid,

    /// Timestamp
    Timestamp,

    /// JSON data
    Json,
}

impl Display for ColumnType {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            ColumnType::Integer => write!(f, "INTEGER"),
            ColumnType::BigInt => write!(f, "BIGINT"),
            ColumnType::Float => write!(f, "FLOAT"),
            ColumnType::Decimal { precision, scale } => write!(f, "DECIMAL({},{})", precision, scale),
            ColumnType::VarChar(n) => write!(f, "VARCHAR({})", n),
            ColumnType::Char(n) => write!(f, "CHAR({})", n),
            ColumnType::Text => write!(f, "TEXT"),
            ColumnType::Binary => write!(f, "BINARY"),
            ColumnType::Boolean => write!(f, "BOOLEAN"),
            ColumnType::Uuid => write!(f, "UUID"),
            ColumnType::Timestamp => write!(f, "TIMESTAMP"),
            ColumnType::Json => write!(f, "JSON"),
        }
    }
}

impl ColumnType {
    /// Value variant stored for this column type
    pub fn value_type(&self) -> ValueType {
        match self {
            ColumnType::Integer => ValueType::Integer,
            ColumnType::BigInt => ValueType::BigInt,
            ColumnType::Float | ColumnType::Decimal { .. } => ValueType::Float,
            ColumnType::VarChar(_) | ColumnType::Char(_) | ColumnType::Text => ValueType::Text,
            ColumnType::Binary => ValueType::Binary,
            ColumnType::Boolean => ValueType::Boolean,
            ColumnType::Uuid => ValueType::Uuid,
            ColumnType::Timestamp => ValueType::Timestamp,
            ColumnType::Json => ValueType::Json,
        }
    }

    /// Maximum text length in characters, if bounded
    pub fn max_length(&self) -> Option<usize> {
        match self {
            ColumnType::VarChar(n) | ColumnType::Char(n) => Some(*n),
            _ => None,
        }
    }

    /// Digits after the decimal point, if the type has a scale
    pub fn scale(&self) -> Option<u8> {
        match self {
            ColumnType::Decimal { scale, .. } => Some(*scale),
            _ => None,
        }
    }

    /// Whether values of this type are numbers
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            ColumnType::Integer | ColumnType::BigInt | ColumnType::Float | ColumnType::Decimal { .. }
        )
    }

    /// Whether two types store values of the same family.
    ///
    /// Used to compare declared columns against store-reported ones, where
    /// widths and lengths are rarely reported faithfully.
    pub fn is_compatible_with(&self, other: &ColumnType) -> bool {
        let family = |t: &ColumnType| match t.value_type() {
            ValueType::Integer | ValueType::BigInt => 0,
            ValueType::Float => 1,
            ValueType::Text | ValueType::Json => 2,
            ValueType::Binary => 3,
            ValueType::Boolean => 4,
            ValueType::Uuid => 5,
            ValueType::Timestamp => 6,
            ValueType::Null => 7,
        };
        family(self) == family(other)
    }

    /// Parse a formatted string; an empty string is null
    pub fn parse_str(&self, text: &str) -> Result<Value, CoercionError> {
        if text.is_empty() {
            return Ok(Value::Null);
        }
        self.coerce(Value::Text(text.to_string()))
    }

    fn incompatible(&self, value: &Value) -> CoercionError {
        CoercionError::Incompatible { from: value.value_type(), to: *self }
    }

    fn parse_error(&self, text: &str) -> CoercionError {
        CoercionError::Parse { text: text.to_string(), to: *self }
    }

    fn out_of_range(&self, value: impl Display) -> CoercionError {
        CoercionError::OutOfRange { value: value.to_string(), to: *self }
    }

    /// Convert a value into the stored form for this type.
    ///
    /// Null passes through unchanged; nullability and length limits are the
    /// column's business, not the type's.
    pub fn coerce(&self, value: Value) -> Result<Value, CoercionError> {
        if value.is_null() {
            return Ok(Value::Null);
        }
        match self {
            ColumnType::Integer => {
                let wide = self.coerce_i64(&value)?;
                i32::try_from(wide)
                    .map(Value::Integer)
                    .map_err(|_| self.out_of_range(wide))
            }
            ColumnType::BigInt => self.coerce_i64(&value).map(Value::BigInt),
            ColumnType::Float => self.coerce_f64(&value).map(Value::Float),
            ColumnType::Decimal { precision, scale } => {
                let v = self.coerce_f64(&value)?;
                let factor = 10f64.powi(*scale as i32);
                let rounded = (v * factor).round() / factor;
                let int_digits = precision.saturating_sub(*scale) as i32;
                if !rounded.is_finite() || rounded.abs() >= 10f64.powi(int_digits) {
                    return Err(self.out_of_range(v));
                }
                Ok(Value::Float(rounded))
            }
            ColumnType::VarChar(_) | ColumnType::Char(_) | ColumnType::Text => match value {
                Value::Text(v) => Ok(Value::Text(v)),
                Value::Binary(_) => Err(self.incompatible(&value)),
                other => Ok(Value::Text(other.to_display_string())),
            },
            ColumnType::Binary => match value {
                Value::Binary(v) => Ok(Value::Binary(v)),
                Value::Text(ref text) => hex::decode(text.trim())
                    .map(Value::Binary)
                    .map_err(|_| self.parse_error(text)),
                Value::Uuid(v) => Ok(Value::Binary(v.as_bytes().to_vec())),
                other => Err(self.incompatible(&other)),
            },
            ColumnType::Boolean => match value {
                Value::Boolean(v) => Ok(Value::Boolean(v)),
                Value::Integer(_) | Value::BigInt(_) => Ok(Value::Boolean(value.as_i64() != Some(0))),
                Value::Text(ref text) => match text.trim().to_ascii_lowercase().as_str() {
                    "true" | "t" | "yes" | "y" | "1" => Ok(Value::Boolean(true)),
                    "false" | "f" | "no" | "n" | "0" => Ok(Value::Boolean(false)),
                    _ => Err(self.parse_error(text)),
                },
                other => Err(self.incompatible(&other)),
            },
            ColumnType::Uuid => match value {
                Value::Uuid(v) => Ok(Value::Uuid(v)),
                Value::Text(ref text) => Uuid::parse_str(text.trim())
                    .map(Value::Uuid)
                    .map_err(|_| self.parse_error(text)),
                Value::Binary(ref bytes) => Uuid::from_slice(bytes)
                    .map(Value::Uuid)
                    .map_err(|_| self.incompatible(&value)),
                other => Err(self.incompatible(&other)),
            },
            ColumnType::Timestamp => match value {
                Value::Timestamp(v) => Ok(Value::Timestamp(v)),
                Value::Integer(_) | Value::BigInt(_) => {
                    let millis = value.as_i64().unwrap_or_default();
                    Utc.timestamp_millis_opt(millis)
                        .single()
                        .map(Value::Timestamp)
                        .ok_or_else(|| self.out_of_range(millis))
                }
                Value::Text(ref text) => parse_timestamp(text.trim())
                    .map(Value::Timestamp)
                    .ok_or_else(|| self.parse_error(text)),
                other => Err(self.incompatible(&other)),
            },
            ColumnType::Json => match value {
                Value::Json(v) | Value::Text(v) => {
                    serde_json::from_str::<serde_json::Value>(&v)
                        .map_err(|_| self.parse_error(&v))?;
                    Ok(Value::Json(v))
                }
                Value::Integer(v) => Ok(Value::Json(v.to_string())),
                Value::BigInt(v) => Ok(Value::Json(v.to_string())),
                Value::Float(v) => serde_json::to_string(&v)
                    .map(Value::Json)
                    .map_err(|_| self.out_of_range(v)),
                Value::Boolean(v) => Ok(Value::Json(v.to_string())),
                Value::Uuid(v) => Ok(Value::Json(format!("\"{}\"", v))),
                Value::Timestamp(v) => Ok(Value::Json(format!("\"{}\"", v.to_rfc3339()))),
                other => Err(self.incompatible(&other)),
            },
        }
    }

    fn coerce_i64(&self, value: &Value) -> Result<i64, CoercionError> {
        match value {
            Value::Integer(_) | Value::BigInt(_) => Ok(value.as_i64().unwrap_or_default()),
            Value::Float(v) => integral_f64(*v).ok_or_else(|| self.out_of_range(v)),
            Value::Boolean(v) => Ok(i64::from(*v)),
            Value::Text(text) => {
                let trimmed = text.trim();
                trimmed
                    .parse::<i64>()
                    .ok()
                    .or_else(|| trimmed.parse::<f64>().ok().and_then(integral_f64))
                    .ok_or_else(|| self.parse_error(text))
            }
            other => Err(self.incompatible(other)),
        }
    }

    fn coerce_f64(&self, value: &Value) -> Result<f64, CoercionError> {
        match value {
            Value::Integer(_) | Value::BigInt(_) | Value::Float(_) => {
                Ok(value.as_f64().unwrap_or_default())
            }
            Value::Text(text) => text.trim().parse::<f64>().map_err(|_| self.parse_error(text)),
            other => Err(self.incompatible(other)),
        }
    }
}

fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
        return Some(ts.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

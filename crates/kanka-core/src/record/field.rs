//! Field declarations and typed field values.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde_json::Value;

use super::schema::Schema;
use super::value::Record;

/// The declared type of a schema field.
#[derive(Debug, Clone, Copy)]
pub enum FieldType {
    /// Integer.
    Int,
    /// Floating point number.
    Float,
    /// Boolean, `0`/`1` on the wire.
    Bool,
    /// String.
    Str,
    /// ISO-8601 timestamp.
    DateTime,
    /// List of integers, comma-joined on the wire.
    IntList,
    /// List of strings.
    StrList,
    /// Arbitrary JSON kept as-is.
    Json,
    /// Nested list of records of another schema.
    Records(&'static Schema),
}

/// The value a field takes when the payload does not carry it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldDefault {
    /// Absent.
    Null,
    /// `false`.
    False,
    /// An empty list.
    EmptyList,
}

/// One declared field of a schema.
#[derive(Debug, Clone, Copy)]
pub struct Field {
    /// Local name.
    pub name: &'static str,
    /// Wire name when it differs from the local name.
    pub alias: Option<&'static str>,
    /// Declared type.
    pub ty: FieldType,
    /// Whether parsing fails when the field is absent.
    pub required: bool,
    /// Value used when the field is absent.
    pub default: FieldDefault,
    /// Server-assigned; never sent on create or diff-based update.
    pub read_only: bool,
}

impl Field {
    /// A required field.
    pub const fn required(name: &'static str, ty: FieldType) -> Self {
        Self {
            name,
            alias: None,
            ty,
            required: true,
            default: FieldDefault::Null,
            read_only: false,
        }
    }

    /// An optional field defaulting to null.
    pub const fn optional(name: &'static str, ty: FieldType) -> Self {
        Self {
            name,
            alias: None,
            ty,
            required: false,
            default: FieldDefault::Null,
            read_only: false,
        }
    }

    /// Sets the default used when the field is absent.
    pub const fn default_to(mut self, default: FieldDefault) -> Self {
        self.default = default;
        self
    }

    /// Reads and writes the field under a different wire name.
    pub const fn wire(mut self, alias: &'static str) -> Self {
        self.alias = Some(alias);
        self
    }

    /// Marks the field as server-assigned.
    pub const fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    /// The key used on the wire.
    pub fn wire_name(&self) -> &'static str {
        self.alias.unwrap_or(self.name)
    }

    pub(crate) fn default_value(&self) -> FieldValue {
        match self.default {
            FieldDefault::Null => FieldValue::Null,
            FieldDefault::False => FieldValue::Bool(false),
            FieldDefault::EmptyList => match self.ty {
                FieldType::StrList => FieldValue::StrList(Vec::new()),
                FieldType::Records(_) => FieldValue::Records(Vec::new()),
                FieldType::Json => FieldValue::Json(Value::Array(Vec::new())),
                _ => FieldValue::IntList(Vec::new()),
            },
        }
    }
}

/// A typed field value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Absent or null.
    Null,
    /// Boolean.
    Bool(bool),
    /// Integer.
    Int(i64),
    /// Floating point number.
    Float(f64),
    /// String.
    Str(String),
    /// Timestamp.
    DateTime(DateTime<Utc>),
    /// List of integers.
    IntList(Vec<i64>),
    /// List of strings.
    StrList(Vec<String>),
    /// Opaque JSON.
    Json(Value),
    /// Nested records.
    Records(Vec<Record>),
}

impl FieldValue {
    /// Returns true for [`FieldValue::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Encodes the value in the API's wire format.
    ///
    /// Booleans become `0`/`1`, integer lists are comma-joined and timestamps
    /// are ISO-8601 strings.
    pub fn to_wire(&self) -> Value {
        match self {
            FieldValue::Null => Value::Null,
            FieldValue::Bool(b) => Value::from(i64::from(*b)),
            FieldValue::Int(i) => Value::from(*i),
            FieldValue::Float(f) => Value::from(*f),
            FieldValue::Str(s) => Value::String(s.clone()),
            FieldValue::DateTime(dt) => {
                Value::String(dt.to_rfc3339_opts(SecondsFormat::AutoSi, true))
            }
            FieldValue::IntList(items) => Value::String(join_ints(items)),
            FieldValue::StrList(items) => {
                Value::Array(items.iter().cloned().map(Value::String).collect())
            }
            FieldValue::Json(v) => v.clone(),
            FieldValue::Records(records) => Value::Array(
                records
                    .iter()
                    .map(|r| Value::Object(r.to_wire(None)))
                    .collect(),
            ),
        }
    }

    /// Encodes the value as a query-string / form value.
    pub(crate) fn to_param(&self) -> Option<String> {
        match self.to_wire() {
            Value::Null => None,
            Value::String(s) => Some(s),
            Value::Array(items) => Some(
                items
                    .iter()
                    .map(|v| match v {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .collect::<Vec<_>>()
                    .join(","),
            ),
            other => Some(other.to_string()),
        }
    }
}

pub(crate) fn join_ints(items: &[i64]) -> String {
    items
        .iter()
        .map(i64::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

/// Coerces a wire value into a declared type.
///
/// Null always maps to [`FieldValue::Null`]; the caller decides whether that
/// is acceptable.
pub(crate) fn coerce(ty: FieldType, value: &Value) -> Result<FieldValue, String> {
    if value.is_null() {
        return Ok(FieldValue::Null);
    }
    match ty {
        FieldType::Int => coerce_int(value).map(FieldValue::Int),
        FieldType::Float => match value {
            Value::Number(n) => n
                .as_f64()
                .map(FieldValue::Float)
                .ok_or_else(|| format!("expected a number, got {}", value)),
            Value::String(s) => s
                .trim()
                .parse::<f64>()
                .map(FieldValue::Float)
                .map_err(|_| format!("expected a number, got {:?}", s)),
            _ => Err(format!("expected a number, got {}", value)),
        },
        FieldType::Bool => coerce_bool(value).map(FieldValue::Bool),
        FieldType::Str => match value {
            Value::String(s) => Ok(FieldValue::Str(s.clone())),
            Value::Number(n) => Ok(FieldValue::Str(n.to_string())),
            _ => Err(format!("expected a string, got {}", value)),
        },
        FieldType::DateTime => match value {
            Value::String(s) => parse_datetime(s)
                .map(FieldValue::DateTime)
                .ok_or_else(|| format!("expected an ISO-8601 timestamp, got {:?}", s)),
            _ => Err(format!("expected an ISO-8601 timestamp, got {}", value)),
        },
        FieldType::IntList => match value {
            Value::Array(items) => items
                .iter()
                .map(coerce_int)
                .collect::<Result<Vec<_>, _>>()
                .map(FieldValue::IntList),
            Value::String(s) => s
                .split(',')
                .map(str::trim)
                .filter(|part| !part.is_empty())
                .map(|part| {
                    part.parse::<i64>()
                        .map_err(|_| format!("expected an integer list, got {:?}", s))
                })
                .collect::<Result<Vec<_>, _>>()
                .map(FieldValue::IntList),
            Value::Number(_) => coerce_int(value).map(|i| FieldValue::IntList(vec![i])),
            _ => Err(format!("expected an integer list, got {}", value)),
        },
        FieldType::StrList => match value {
            Value::Array(items) => items
                .iter()
                .map(|item| match item {
                    Value::String(s) => Ok(s.clone()),
                    Value::Number(n) => Ok(n.to_string()),
                    other => Err(format!("expected a string list, got {}", other)),
                })
                .collect::<Result<Vec<_>, _>>()
                .map(FieldValue::StrList),
            Value::String(s) if s.is_empty() => Ok(FieldValue::StrList(Vec::new())),
            Value::String(s) => Ok(FieldValue::StrList(
                s.split(',').map(|part| part.trim().to_string()).collect(),
            )),
            _ => Err(format!("expected a string list, got {}", value)),
        },
        FieldType::Json => Ok(FieldValue::Json(value.clone())),
        FieldType::Records(schema) => match value {
            Value::Array(items) => items
                .iter()
                .map(|item| Record::parse(schema, item).map_err(|e| e.to_string()))
                .collect::<Result<Vec<_>, _>>()
                .map(FieldValue::Records),
            _ => Err(format!("expected a list of {} records", schema.name)),
        },
    }
}

fn coerce_int(value: &Value) -> Result<i64, String> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
            .ok_or_else(|| format!("expected an integer, got {}", n)),
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| format!("expected an integer, got {:?}", s)),
        Value::Bool(b) => Ok(i64::from(*b)),
        other => Err(format!("expected an integer, got {}", other)),
    }
}

fn coerce_bool(value: &Value) -> Result<bool, String> {
    match value {
        Value::Bool(b) => Ok(*b),
        Value::Number(n) => match n.as_i64() {
            Some(0) => Ok(false),
            Some(1) => Ok(true),
            _ => Err(format!("expected a boolean, got {}", n)),
        },
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "0" | "false" => Ok(false),
            "1" | "true" => Ok(true),
            _ => Err(format!("expected a boolean, got {:?}", s)),
        },
        other => Err(format!("expected a boolean, got {}", other)),
    }
}

/// Parses the timestamp shapes the API emits.
pub(crate) fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Int(value)
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        FieldValue::Int(i64::from(value))
    }
}

impl From<u32> for FieldValue {
    fn from(value: u32) -> Self {
        FieldValue::Int(i64::from(value))
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Float(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Str(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Str(value)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(value: DateTime<Utc>) -> Self {
        FieldValue::DateTime(value)
    }
}

impl From<Vec<i64>> for FieldValue {
    fn from(value: Vec<i64>) -> Self {
        FieldValue::IntList(value)
    }
}

impl From<Vec<String>> for FieldValue {
    fn from(value: Vec<String>) -> Self {
        FieldValue::StrList(value)
    }
}

impl From<Value> for FieldValue {
    fn from(value: Value) -> Self {
        FieldValue::Json(value)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(FieldValue::Null, Into::into)
    }
}

//! Parsed record values.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::SchemaError;

use super::field::FieldValue;
use super::fields::Fields;
use super::schema::Schema;

/// One API object, parsed against its [`Schema`].
///
/// Declared fields are typed; every other key of the payload is kept in
/// [`Record::extra`] and written back by [`Record::to_wire`]. Records are
/// immutable: [`Record::with_fields`] produces a new one.
#[derive(Debug, Clone)]
pub struct Record {
    schema: &'static Schema,
    values: Vec<(&'static str, FieldValue)>,
    extra: Map<String, Value>,
}

impl Record {
    pub(crate) fn from_parts(
        schema: &'static Schema,
        values: Vec<(&'static str, FieldValue)>,
        extra: Map<String, Value>,
    ) -> Self {
        Self {
            schema,
            values,
            extra,
        }
    }

    /// Parses a wire payload against a schema.
    pub fn parse(schema: &'static Schema, payload: &Value) -> Result<Self, SchemaError> {
        schema.parse(payload)
    }

    /// The schema this record was parsed with.
    pub fn schema(&self) -> &'static Schema {
        self.schema
    }

    /// The lowercase type tag, e.g. `character`.
    pub fn entity_type(&self) -> String {
        self.schema.type_tag()
    }

    /// A declared field's value. Absent optional fields hold their default.
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.values
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value)
    }

    /// Keys the schema does not declare, verbatim.
    pub fn extra(&self) -> &Map<String, Value> {
        &self.extra
    }

    /// The type-scoped id.
    pub fn id(&self) -> Option<i64> {
        self.get_i64("id")
    }

    /// The universal id, for schemas that carry one.
    pub fn entity_id(&self) -> Option<i64> {
        self.schema
            .universal_id
            .and_then(|field| self.get_i64(field))
    }

    pub fn name(&self) -> Option<&str> {
        self.get_str("name")
    }

    pub fn entry(&self) -> Option<&str> {
        self.get_str("entry")
    }

    pub fn get_i64(&self, name: &str) -> Option<i64> {
        match self.get(name)? {
            FieldValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn get_f64(&self, name: &str) -> Option<f64> {
        match self.get(name)? {
            FieldValue::Float(f) => Some(*f),
            FieldValue::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        match self.get(name)? {
            FieldValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        match self.get(name)? {
            FieldValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn get_datetime(&self, name: &str) -> Option<DateTime<Utc>> {
        match self.get(name)? {
            FieldValue::DateTime(dt) => Some(*dt),
            _ => None,
        }
    }

    pub fn get_int_list(&self, name: &str) -> Option<&[i64]> {
        match self.get(name)? {
            FieldValue::IntList(items) => Some(items),
            _ => None,
        }
    }

    pub fn get_json(&self, name: &str) -> Option<&Value> {
        match self.get(name)? {
            FieldValue::Json(v) => Some(v),
            _ => None,
        }
    }

    pub fn get_records(&self, name: &str) -> Option<&[Record]> {
        match self.get(name)? {
            FieldValue::Records(records) => Some(records),
            _ => None,
        }
    }

    /// Serializes the record in the API's wire format.
    ///
    /// With `fields`, only those local names (declared or extra) are
    /// emitted. Without, every declared field and every extra key is.
    pub fn to_wire(&self, fields: Option<&BTreeSet<String>>) -> Map<String, Value> {
        let wanted = |key: &str| fields.is_none_or(|set| set.contains(key));

        let mut wire: Map<String, Value> = self
            .extra
            .iter()
            .filter(|(key, _)| wanted(key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        for (name, value) in &self.values {
            if !wanted(*name) {
                continue;
            }
            let wire_name = self
                .schema
                .field(name)
                .map_or(*name, |field| field.wire_name());
            wire.insert(wire_name.to_string(), value.to_wire());
        }
        wire
    }

    /// The entries of `fields` that differ from this record.
    pub fn diff(&self, fields: &Fields) -> Fields {
        self.schema.diff(self, fields)
    }

    /// A new record with `fields` applied on top of this one.
    pub fn with_fields(&self, fields: &Fields) -> Result<Record, SchemaError> {
        let mut wire = self.to_wire(None);
        wire.extend(self.schema.encode(fields));
        self.schema.parse(&Value::Object(wire))
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.schema.name == other.schema.name
            && self.values == other.values
            && self.extra == other.extra
    }
}

impl Serialize for Record {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.to_wire(None).serialize(serializer)
    }
}

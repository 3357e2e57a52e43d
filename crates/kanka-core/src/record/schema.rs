//! Record schemas.
//!
//! A [`Schema`] is plain data: a name, groups of [`Field`] declarations and a
//! couple of flags. Every record type shares the same parsing, encoding and
//! diffing code; only the table differs.

use std::collections::BTreeSet;

use serde_json::{Map, Value};

use crate::error::SchemaError;

use super::field::{Field, FieldValue, coerce};
use super::fields::Fields;
use super::value::Record;

/// The declaration of one record type.
#[derive(Debug)]
pub struct Schema {
    /// Type name, e.g. `Character`.
    pub name: &'static str,
    /// Field groups; shared groups (the entity base fields) are reused across
    /// schemas.
    pub groups: &'static [&'static [Field]],
    /// Field holding the universal id, if records of this type have one.
    pub universal_id: Option<&'static str>,
    /// Fields the API wants on every update; a diff keeps them when the
    /// caller supplies them, even if unchanged.
    pub always_send: &'static [&'static str],
}

impl Schema {
    /// All declared fields in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = &'static Field> + '_ {
        self.groups.iter().flat_map(|group| group.iter())
    }

    /// Looks up a field by its local name.
    pub fn field(&self, name: &str) -> Option<&'static Field> {
        self.fields().find(|f| f.name == name)
    }

    /// Looks up a field by either its wire or its local name.
    pub fn field_by_key(&self, key: &str) -> Option<&'static Field> {
        self.fields()
            .find(|f| f.wire_name() == key)
            .or_else(|| self.field(key))
    }

    /// The lowercase type tag, e.g. `character`.
    pub fn type_tag(&self) -> String {
        self.name.to_lowercase()
    }

    /// Parses a wire payload into a record.
    ///
    /// Aliases are resolved, declared fields are coerced to their types,
    /// absent fields take their defaults and every undeclared key is kept
    /// verbatim.
    pub fn parse(&'static self, payload: &Value) -> Result<Record, SchemaError> {
        let object = payload
            .as_object()
            .ok_or(SchemaError::NotAnObject { schema: self.name })?;

        let mut values = Vec::new();
        let mut consumed = BTreeSet::new();

        for field in self.fields() {
            let found = [field.wire_name(), field.name]
                .into_iter()
                .find(|key| object.contains_key(*key));

            let value = match found {
                Some(key) => {
                    consumed.insert(key);
                    coerce(field.ty, &object[key]).map_err(|reason| {
                        SchemaError::InvalidField {
                            schema: self.name,
                            field: field.name.to_string(),
                            reason,
                        }
                    })?
                }
                None => FieldValue::Null,
            };

            let value = if value.is_null() {
                if field.required {
                    return Err(SchemaError::MissingField {
                        schema: self.name,
                        field: field.name.to_string(),
                    });
                }
                field.default_value()
            } else {
                value
            };

            values.push((field.name, value));
        }

        let extra: Map<String, Value> = object
            .iter()
            .filter(|(key, _)| !consumed.contains(key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        Ok(Record::from_parts(self, values, extra))
    }

    /// Encodes caller-supplied fields for a request body.
    ///
    /// Declared fields go out under their wire name; unknown keys pass
    /// through.
    pub fn encode(&self, fields: &Fields) -> Map<String, Value> {
        fields
            .iter()
            .map(|(key, value)| {
                let wire = self
                    .field(key)
                    .map(|f| f.wire_name().to_string())
                    .unwrap_or_else(|| key.to_string());
                (wire, value.to_wire())
            })
            .collect()
    }

    /// Keeps only the entries of `new_fields` that differ from `old`.
    ///
    /// Values are compared after coercion to the declared type, so `1` and
    /// `true` are the same for a boolean field. Keys listed in
    /// [`Schema::always_send`] are kept whenever supplied.
    pub fn diff(&self, old: &Record, new_fields: &Fields) -> Fields {
        let mut changed = Fields::new();
        for (key, value) in new_fields.iter() {
            if self.always_send.iter().any(|k| *k == key) {
                changed.insert(key, value.clone());
                continue;
            }

            let unchanged = match self.field(key) {
                Some(field) => match coerce(field.ty, &value.to_wire()) {
                    Ok(normalized) => {
                        let normalized = if normalized.is_null() && !field.required {
                            field.default_value()
                        } else {
                            normalized
                        };
                        old.get(key) == Some(&normalized)
                    }
                    Err(_) => false,
                },
                None => old.extra().get(key) == Some(&value.to_wire()),
            };

            if !unchanged {
                changed.insert(key, value.clone());
            }
        }
        changed
    }

    /// Drops server-assigned fields from a payload.
    pub(crate) fn strip_read_only(&self, fields: &mut Fields) {
        for field in self.fields().filter(|f| f.read_only) {
            fields.remove(field.name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::field::{FieldDefault, FieldType};
    use serde_json::json;

    static THING_FIELDS: [Field; 5] = [
        Field::required("id", FieldType::Int).read_only(),
        Field::required("name", FieldType::Str),
        Field::optional("is_private", FieldType::Bool).default_to(FieldDefault::False),
        Field::optional("tags", FieldType::IntList).default_to(FieldDefault::EmptyList),
        Field::optional("url", FieldType::Str).wire("_url"),
    ];

    static THING: Schema = Schema {
        name: "Thing",
        groups: &[&THING_FIELDS],
        universal_id: None,
        always_send: &["name"],
    };

    #[test]
    fn parse_fills_defaults_and_keeps_extra() {
        let record = THING
            .parse(&json!({"id": 1, "name": "A", "_url": "https://cdn/x.png", "shiny": true}))
            .unwrap();

        assert_eq!(record.get("is_private"), Some(&FieldValue::Bool(false)));
        assert_eq!(record.get("tags"), Some(&FieldValue::IntList(vec![])));
        assert_eq!(record.get_str("url"), Some("https://cdn/x.png"));
        assert_eq!(record.extra().get("shiny"), Some(&json!(true)));
        assert!(record.extra().get("_url").is_none());
    }

    #[test]
    fn parse_accepts_local_name_for_aliased_field() {
        let record = THING
            .parse(&json!({"id": 1, "name": "A", "url": "https://cdn/y.png"}))
            .unwrap();
        assert_eq!(record.get_str("url"), Some("https://cdn/y.png"));
    }

    #[test]
    fn parse_fails_on_missing_required() {
        let err = THING.parse(&json!({"id": 1})).unwrap_err();
        assert_eq!(
            err,
            SchemaError::MissingField {
                schema: "Thing",
                field: "name".to_string()
            }
        );
    }

    #[test]
    fn parse_fails_on_bad_type() {
        let err = THING.parse(&json!({"id": "x", "name": "A"})).unwrap_err();
        assert!(matches!(err, SchemaError::InvalidField { ref field, .. } if field == "id"));
    }

    #[test]
    fn parse_rejects_non_objects() {
        assert!(matches!(
            THING.parse(&json!([1, 2])),
            Err(SchemaError::NotAnObject { .. })
        ));
    }

    #[test]
    fn encode_reverses_aliases() {
        let fields = Fields::new()
            .set("url", "https://cdn/z.png")
            .set("is_private", true)
            .set("custom", "kept");
        let wire = THING.encode(&fields);
        assert_eq!(wire.get("_url"), Some(&json!("https://cdn/z.png")));
        assert_eq!(wire.get("is_private"), Some(&json!(1)));
        assert_eq!(wire.get("custom"), Some(&json!("kept")));
    }

    #[test]
    fn diff_keeps_only_changes_and_always_send() {
        let record = THING
            .parse(&json!({"id": 1, "name": "A", "is_private": 1, "tags": [1, 2]}))
            .unwrap();

        let fields = Fields::new()
            .set("name", "A")
            .set("is_private", true)
            .set("tags", vec![1_i64, 2])
            .set("url", "https://cdn/new.png");
        let changed = THING.diff(&record, &fields);

        let keys: Vec<_> = changed.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["name", "url"]);
    }

    #[test]
    fn diff_compares_extra_fields() {
        let record = THING
            .parse(&json!({"id": 1, "name": "A", "colour": "red"}))
            .unwrap();
        let same = THING.diff(&record, &Fields::new().set("colour", "red"));
        assert!(same.is_empty());
        let other = THING.diff(&record, &Fields::new().set("colour", "blue"));
        assert_eq!(other.len(), 1);
    }

    #[test]
    fn strip_read_only_removes_server_fields() {
        let mut fields = Fields::new().set("id", 4).set("name", "B");
        THING.strip_read_only(&mut fields);
        assert!(fields.get("id").is_none());
        assert!(fields.get("name").is_some());
    }
}

//! The record model: schema tables, typed values and wire mapping.

mod field;
mod fields;
pub mod kinds;
mod schema;
mod value;

pub use field::{Field, FieldDefault, FieldType, FieldValue};
pub use fields::Fields;
pub use kinds::RecordKind;
pub use schema::Schema;
pub use value::Record;

pub(crate) use field::parse_datetime;

//! Record addressing.
//!
//! Two id spaces exist. Every record type numbers its own records (the
//! type-scoped id, `id`), and every record also has a universal id
//! (`entity_id`) that is unique across all types. Entity managers address
//! records by the type-scoped id; posts, assets and images hang off the
//! universal id.

use crate::error::{Error, InvalidInputError};
use crate::record::Record;

/// A record or a bare type-scoped id.
///
/// Passing a [`Record`] lets `update` diff against it; passing an id sends
/// the supplied fields as-is.
#[derive(Debug, Clone, Copy)]
pub enum RecordRef<'a> {
    /// A previously fetched record.
    Record(&'a Record),
    /// A bare type-scoped id.
    Id(i64),
}

impl RecordRef<'_> {
    /// The type-scoped id.
    pub fn id(&self) -> Result<i64, Error> {
        match self {
            RecordRef::Record(record) => record.id().ok_or_else(|| {
                InvalidInputError::MissingId {
                    schema: record.schema().name,
                }
                .into()
            }),
            RecordRef::Id(id) => Ok(*id),
        }
    }

    /// The record, when one was passed.
    pub fn record(&self) -> Option<&Record> {
        match self {
            RecordRef::Record(record) => Some(record),
            RecordRef::Id(_) => None,
        }
    }
}

impl<'a> From<&'a Record> for RecordRef<'a> {
    fn from(record: &'a Record) -> Self {
        RecordRef::Record(record)
    }
}

impl From<i64> for RecordRef<'_> {
    fn from(id: i64) -> Self {
        RecordRef::Id(id)
    }
}

impl From<i32> for RecordRef<'_> {
    fn from(id: i32) -> Self {
        RecordRef::Id(i64::from(id))
    }
}

/// A record or a bare universal id, used to address sub-resources.
///
/// A bare integer is trusted to already be the universal id. Passing a
/// type-scoped id here still produces a request, against whatever record
/// owns that number in the universal id space.
#[derive(Debug, Clone, Copy)]
pub enum EntityRef<'a> {
    /// A record; its universal id is used.
    Record(&'a Record),
    /// A bare universal id.
    Id(i64),
}

impl EntityRef<'_> {
    /// The universal id.
    pub fn entity_id(&self) -> Result<i64, Error> {
        match self {
            EntityRef::Record(record) => record.entity_id().ok_or_else(|| {
                InvalidInputError::MissingUniversalId {
                    schema: record.schema().name,
                }
                .into()
            }),
            EntityRef::Id(id) => Ok(*id),
        }
    }
}

impl<'a> From<&'a Record> for EntityRef<'a> {
    fn from(record: &'a Record) -> Self {
        EntityRef::Record(record)
    }
}

impl From<i64> for EntityRef<'_> {
    fn from(id: i64) -> Self {
        EntityRef::Id(id)
    }
}

impl From<i32> for EntityRef<'_> {
    fn from(id: i32) -> Self {
        EntityRef::Id(i64::from(id))
    }
}

//! Pagination metadata of list responses.

use std::sync::RwLock;

use serde::Deserialize;
use serde_json::Value;

/// The `meta`/`links` block and sync cursor of the last list call.
///
/// List responses look like
/// `{"data": [...], "meta": {...}, "links": {...}, "sync": "..."}`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Pagination {
    pub current_page: Option<u64>,
    pub last_page: Option<u64>,
    pub per_page: Option<u64>,
    pub total: Option<u64>,
    pub from: Option<u64>,
    pub to: Option<u64>,
    pub first: Option<String>,
    pub last: Option<String>,
    pub prev: Option<String>,
    pub next: Option<String>,
    /// Server-issued cursor for incremental sync.
    pub sync: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Meta {
    #[serde(default, deserialize_with = "lenient_u64")]
    current_page: Option<u64>,
    #[serde(default, deserialize_with = "lenient_u64")]
    last_page: Option<u64>,
    #[serde(default, deserialize_with = "lenient_u64")]
    per_page: Option<u64>,
    #[serde(default, deserialize_with = "lenient_u64")]
    total: Option<u64>,
    #[serde(default, deserialize_with = "lenient_u64")]
    from: Option<u64>,
    #[serde(default, deserialize_with = "lenient_u64")]
    to: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct Links {
    first: Option<String>,
    last: Option<String>,
    prev: Option<String>,
    next: Option<String>,
}

// Some endpoints send numbers as strings.
fn lenient_u64<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => n.as_u64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

impl Pagination {
    /// Reads pagination from a response envelope. Missing or malformed
    /// blocks leave the fields empty.
    pub fn from_envelope(body: &Value) -> Self {
        let meta: Meta = body
            .get("meta")
            .and_then(|meta| Meta::deserialize(meta).ok())
            .unwrap_or_default();
        let links: Links = body
            .get("links")
            .and_then(|links| Links::deserialize(links).ok())
            .unwrap_or_default();
        let sync = match body.get("sync") {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        };

        Self {
            current_page: meta.current_page,
            last_page: meta.last_page,
            per_page: meta.per_page,
            total: meta.total,
            from: meta.from,
            to: meta.to,
            first: links.first,
            last: links.last,
            prev: links.prev,
            next: links.next,
            sync,
        }
    }

    /// True when the server reports another page.
    pub fn has_next_page(&self) -> bool {
        if self.next.is_some() {
            return true;
        }
        matches!((self.current_page, self.last_page), (Some(current), Some(last)) if current < last)
    }
}

/// Last-write-wins pagination slot owned by one operation.
#[derive(Debug, Default)]
pub(crate) struct PaginationSlot(RwLock<Pagination>);

impl PaginationSlot {
    pub(crate) fn store(&self, pagination: Pagination) {
        match self.0.write() {
            Ok(mut guard) => *guard = pagination,
            Err(poisoned) => *poisoned.into_inner() = pagination,
        }
    }

    pub(crate) fn load(&self) -> Pagination {
        match self.0.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

//! List parameters and filters.

use std::collections::BTreeMap;

use crate::record::{FieldValue, RecordKind};

/// Query filters for list calls.
///
/// Values are encoded the way the API expects them in a query string:
/// booleans as `0`/`1`, lists comma-joined, strings verbatim (so a date
/// filter such as `">=2024-01-01"` keeps its operator prefix).
///
/// ```
/// use kanka_core::Filters;
///
/// let filters = Filters::new()
///     .set("is_private", false)
///     .set("tags", vec![3_i64, 9])
///     .set("created_at", ">=2024-01-01");
/// assert_eq!(
///     filters.to_query(),
///     vec![
///         ("created_at".to_string(), ">=2024-01-01".to_string()),
///         ("is_private".to_string(), "0".to_string()),
///         ("tags".to_string(), "3,9".to_string()),
///     ]
/// );
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filters(BTreeMap<String, FieldValue>);

impl Filters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a filter. A null value removes it.
    pub fn set(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        let key = key.into();
        let value = value.into();
        if value.is_null() {
            self.0.remove(&key);
        } else {
            self.0.insert(key, value);
        }
        self
    }

    /// Restricts the `entities` endpoint to some record kinds.
    pub fn types(self, kinds: &[RecordKind]) -> Self {
        let tags: Vec<String> = kinds.iter().map(|kind| kind.type_tag()).collect();
        self.set("types", tags)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Encodes the filters as query parameters, in key order.
    pub fn to_query(&self) -> Vec<(String, String)> {
        self.0
            .iter()
            .filter_map(|(key, value)| value.to_param().map(|param| (key.clone(), param)))
            .collect()
    }
}

/// Options for a paged list call.
#[derive(Debug, Clone, PartialEq)]
pub struct ListOptions {
    /// 1-based page number.
    pub page: u32,
    /// Records per page.
    pub limit: u32,
    /// Embed posts and attributes in each record.
    pub related: bool,
    /// Only return records changed since this sync cursor.
    pub last_sync: Option<String>,
    pub filters: Filters,
}

impl Default for ListOptions {
    fn default() -> Self {
        Self {
            page: 1,
            limit: 30,
            related: false,
            last_sync: None,
            filters: Filters::default(),
        }
    }
}

impl ListOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn page(mut self, page: u32) -> Self {
        self.page = page;
        self
    }

    #[must_use]
    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    #[must_use]
    pub fn related(mut self, related: bool) -> Self {
        self.related = related;
        self
    }

    /// Sets the incremental sync cursor, usually the value of a previous
    /// call's [`sync_cursor`](crate::EntityManager::sync_cursor).
    #[must_use]
    pub fn last_sync(mut self, cursor: impl Into<String>) -> Self {
        self.last_sync = Some(cursor.into());
        self
    }

    #[must_use]
    pub fn filter(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.filters = self.filters.set(key, value);
        self
    }

    #[must_use]
    pub fn filters(mut self, filters: Filters) -> Self {
        self.filters = filters;
        self
    }

    /// Encodes the options. A filter named like a built-in parameter
    /// replaces it.
    pub(crate) fn to_query(&self) -> Vec<(String, String)> {
        let mut builtin = vec![
            ("page", self.page.to_string()),
            ("limit", self.limit.to_string()),
        ];
        if self.related {
            builtin.push(("related", "1".to_string()));
        }
        if let Some(ref cursor) = self.last_sync {
            builtin.push(("lastSync", cursor.clone()));
        }

        let filters = self.filters.to_query();
        let mut query: Vec<(String, String)> = builtin
            .into_iter()
            .filter(|(key, _)| !filters.iter().any(|(filter, _)| filter == key))
            .map(|(key, value)| (key.to_string(), value))
            .collect();
        query.extend(filters);
        query
    }
}

/// Page and limit for paged sub-resource calls.
pub(crate) fn page_query(page: u32, limit: u32) -> Vec<(String, String)> {
    vec![
        ("page".to_string(), page.to_string()),
        ("limit".to_string(), limit.to_string()),
    ]
}

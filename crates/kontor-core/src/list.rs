//! Generic list-operation contract: sort/range/filter triple and paged result

use serde::{Deserialize, Serialize};

/// Raw list-query parameters as they arrive on the wire.
///
/// `sort` is a JSON-encoded `[field, "ASC" | "DESC"]` pair, `range` a
/// JSON-encoded `[start, end]` pair (inclusive, translated to OFFSET/LIMIT),
/// and `filter` a JSON object whose keys must be known scalar field names or
/// one of the reserved keys `q`, `exclude`, `is_allowed_all`, `id`.
/// Malformed input fails with an InvalidArgument carrying a field-keyed
/// message.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
}

/// A page of records plus the total count matching the filter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListResult<T> {
    pub data: Vec<T>,
    pub total_count: i64,
}

impl<T> ListResult<T> {
    pub fn new(data: Vec<T>, total_count: i64) -> Self {
        Self { data, total_count }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> ListResult<U> {
        ListResult {
            data: self.data.into_iter().map(f).collect(),
            total_count: self.total_count,
        }
    }
}

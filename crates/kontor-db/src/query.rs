//! Generic list-query machinery: sort/range/filter parsing and dynamic SQL
//!
//! List operations accept the triple `sort` (JSON `[field, "ASC"|"DESC"]`),
//! `range` (JSON `[start, end]`, inclusive, translated to OFFSET/LIMIT) and
//! `filter` (JSON object). Filter keys must be known scalar field names or
//! one of the reserved keys:
//! - `q`: case-insensitive contains-match on the entity's name field
//! - `exclude`: excludes root-flagged records (staff listing only)
//! - `is_allowed_all`: false triggers ownership scoping - the result set is
//!   restricted to records the caller created, unioned with any explicitly
//!   requested `id` filter values
//! - `id`: array of record ids, matched with IN
//!
//! Malformed input fails with an InvalidArgument carrying a field-keyed
//! message so the caller can attribute the error to the offending parameter.

use kontor_core::{KontorError, Result};
use serde_json::{Map, Value};
use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

const SORT_MESSAGE: &str = "sort must be an array like [field_name, \"ASC\" | \"DESC\"]";
const RANGE_MESSAGE: &str =
    "range must be an array like [start, end] where start <= end and both are non-negative";
const FILTER_MESSAGE: &str = "filter must be a valid JSON object with field names and values";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedSort {
    pub field: String,
    pub order: SortOrder,
}

/// Parse and validate the JSON-encoded sort pair against a field whitelist.
pub fn parse_sort(raw: Option<&str>, fields: &[&str]) -> Result<Option<ParsedSort>> {
    let Some(raw) = raw else { return Ok(None) };
    if raw.trim().is_empty() {
        return Ok(None);
    }

    let value: Value = serde_json::from_str(raw)
        .map_err(|_| KontorError::invalid_field("sort", SORT_MESSAGE))?;
    let Value::Array(items) = value else {
        return Err(KontorError::invalid_field("sort", SORT_MESSAGE));
    };
    if items.len() != 2 {
        return Err(KontorError::invalid_field("sort", SORT_MESSAGE));
    }

    let (Some(field), Some(order)) = (items[0].as_str(), items[1].as_str()) else {
        return Err(KontorError::invalid_field("sort", SORT_MESSAGE));
    };
    if !fields.contains(&field) {
        return Err(KontorError::invalid_field("sort", SORT_MESSAGE));
    }
    let order = match order {
        "ASC" => SortOrder::Asc,
        "DESC" => SortOrder::Desc,
        _ => return Err(KontorError::invalid_field("sort", SORT_MESSAGE)),
    };

    Ok(Some(ParsedSort {
        field: field.to_string(),
        order,
    }))
}

/// Parse and validate the JSON-encoded inclusive range pair.
pub fn parse_range(raw: Option<&str>) -> Result<Option<(i64, i64)>> {
    let Some(raw) = raw else { return Ok(None) };
    if raw.trim().is_empty() {
        return Ok(None);
    }

    let value: Value = serde_json::from_str(raw)
        .map_err(|_| KontorError::invalid_field("range", RANGE_MESSAGE))?;
    let Value::Array(items) = value else {
        return Err(KontorError::invalid_field("range", RANGE_MESSAGE));
    };
    if items.len() != 2 {
        return Err(KontorError::invalid_field("range", RANGE_MESSAGE));
    }

    let (Some(start), Some(end)) = (items[0].as_i64(), items[1].as_i64()) else {
        return Err(KontorError::invalid_field("range", RANGE_MESSAGE));
    };
    if start < 0 || end < 0 || start > end {
        return Err(KontorError::invalid_field("range", RANGE_MESSAGE));
    }

    Ok(Some((start, end)))
}

/// Reserved filter keys accepted on every entity in addition to its own
/// scalar fields.
const RESERVED_FILTER_KEYS: &[&str] = &["q", "exclude", "is_allowed_all", "id"];

/// Parse and validate the JSON-encoded filter object against a field
/// whitelist.
pub fn parse_filter(raw: Option<&str>, fields: &[&str]) -> Result<Option<Map<String, Value>>> {
    let Some(raw) = raw else { return Ok(None) };
    if raw.trim().is_empty() {
        return Ok(None);
    }

    let value: Value = serde_json::from_str(raw)
        .map_err(|_| KontorError::invalid_field("filter", FILTER_MESSAGE))?;
    let Value::Object(map) = value else {
        return Err(KontorError::invalid_field("filter", FILTER_MESSAGE));
    };

    for key in map.keys() {
        if !fields.contains(&key.as_str()) && !RESERVED_FILTER_KEYS.contains(&key.as_str()) {
            return Err(KontorError::invalid_field(
                "filter",
                format!("invalid field '{}' in filter", key),
            ));
        }
    }

    Ok(Some(map))
}

/// Whether the filter explicitly requests ownership scoping
/// (`is_allowed_all: false`). Absent or true means no restriction.
pub fn ownership_scope_requested(filter: Option<&Map<String, Value>>) -> bool {
    filter
        .and_then(|f| f.get("is_allowed_all"))
        .and_then(Value::as_bool)
        .map(|allowed| !allowed)
        .unwrap_or(false)
}

/// Normalized WHERE conditions extracted from a parsed filter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterConditions {
    /// id IN (...) restriction; under ownership scoping this is the union of
    /// the caller's owned ids and any explicit `id` filter values
    pub id_in: Option<Vec<Uuid>>,
    /// Case-insensitive contains matches: (column, needle)
    pub contains: Vec<(String, String)>,
    /// Exact equality conditions
    pub eq_uuid: Vec<(String, Uuid)>,
    pub eq_bool: Vec<(String, bool)>,
    pub eq_num: Vec<(String, i64)>,
    /// Staff listing: exclude root-flagged records
    pub exclude_root: bool,
}

fn parse_uuid_value(key: &str, value: &Value) -> Result<Uuid> {
    value
        .as_str()
        .and_then(|s| Uuid::parse_str(s).ok())
        .ok_or_else(|| {
            KontorError::invalid_field("filter", format!("invalid id value for '{}' in filter", key))
        })
}

fn parse_id_list(value: &Value) -> Result<Vec<Uuid>> {
    match value {
        Value::Array(items) => items.iter().map(|v| parse_uuid_value("id", v)).collect(),
        single => Ok(vec![parse_uuid_value("id", single)?]),
    }
}

/// Turn a parsed filter into WHERE conditions.
///
/// `owned_ids` must be Some when ownership scoping was requested (the caller
/// fetched the ids of records it created); the explicit `id` filter values
/// are unioned in so a caller can still fetch specific records outside its
/// ownership by id.
pub fn build_filter_conditions(
    filter: Option<&Map<String, Value>>,
    name_field: &str,
    supports_exclude: bool,
    owned_ids: Option<Vec<Uuid>>,
) -> Result<FilterConditions> {
    let mut conditions = FilterConditions::default();

    let explicit_ids = match filter.and_then(|f| f.get("id")) {
        Some(value) => Some(parse_id_list(value)?),
        None => None,
    };

    match owned_ids {
        Some(mut owned) => {
            if let Some(ids) = explicit_ids {
                for id in ids {
                    if !owned.contains(&id) {
                        owned.push(id);
                    }
                }
            }
            conditions.id_in = Some(owned);
        }
        None => conditions.id_in = explicit_ids,
    }

    let Some(filter) = filter else {
        return Ok(conditions);
    };

    for (key, value) in filter {
        match key.as_str() {
            "id" | "is_allowed_all" => {} // handled above
            "q" => {
                if let Some(needle) = value.as_str() {
                    conditions
                        .contains
                        .push((name_field.to_string(), needle.to_string()));
                }
            }
            "exclude" => {
                if supports_exclude && value.as_bool().unwrap_or(false) {
                    conditions.exclude_root = true;
                }
            }
            key if key == "id" || key.ends_with("_id") => {
                conditions
                    .eq_uuid
                    .push((key.to_string(), parse_uuid_value(key, value)?));
            }
            key => match value {
                Value::String(s) => conditions.contains.push((key.to_string(), s.clone())),
                Value::Bool(b) => conditions.eq_bool.push((key.to_string(), *b)),
                Value::Number(n) => {
                    let n = n.as_i64().ok_or_else(|| {
                        KontorError::invalid_field(
                            "filter",
                            format!("invalid numeric value for '{}' in filter", key),
                        )
                    })?;
                    conditions.eq_num.push((key.to_string(), n));
                }
                _ => {
                    return Err(KontorError::invalid_field(
                        "filter",
                        format!("unsupported value for '{}' in filter", key),
                    ));
                }
            },
        }
    }

    Ok(conditions)
}

/// Append the conditions to a query that already carries a WHERE clause.
///
/// `alias` qualifies every column for joined queries (e.g. `Some("g")`).
/// Column names in the conditions come from a validated whitelist, so they
/// are pushed as raw SQL; all values go through bind parameters.
pub fn push_conditions(
    qb: &mut QueryBuilder<'_, Postgres>,
    conditions: &FilterConditions,
    alias: Option<&str>,
) {
    let qualify = |column: &str| match alias {
        Some(alias) => format!("{}.{}", alias, column),
        None => column.to_string(),
    };

    if let Some(ids) = &conditions.id_in {
        qb.push(format!(" AND {} = ANY(", qualify("id")));
        qb.push_bind(ids.clone());
        qb.push(")");
    }
    for (column, needle) in &conditions.contains {
        qb.push(format!(" AND {} ILIKE '%' || ", qualify(column)));
        qb.push_bind(needle.clone());
        qb.push(" || '%'");
    }
    for (column, value) in &conditions.eq_uuid {
        qb.push(format!(" AND {} = ", qualify(column)));
        qb.push_bind(*value);
    }
    for (column, value) in &conditions.eq_bool {
        qb.push(format!(" AND {} = ", qualify(column)));
        qb.push_bind(*value);
    }
    for (column, value) in &conditions.eq_num {
        qb.push(format!(" AND {} = ", qualify(column)));
        qb.push_bind(*value);
    }
    if conditions.exclude_root {
        qb.push(format!(" AND {} = FALSE", qualify("is_root")));
    }
}

/// Append ORDER BY and OFFSET/LIMIT. The inclusive [start, end] range
/// translates to OFFSET start LIMIT (end - start + 1).
pub fn push_order_and_range(
    qb: &mut QueryBuilder<'_, Postgres>,
    sort: Option<&ParsedSort>,
    range: Option<(i64, i64)>,
    default_order: &str,
) {
    match sort {
        Some(sort) => {
            qb.push(format!(" ORDER BY {} {}", sort.field, sort.order.as_sql()));
        }
        None => {
            qb.push(format!(" ORDER BY {}", default_order));
        }
    }
    if let Some((start, end)) = range {
        qb.push(" OFFSET ");
        qb.push_bind(start);
        qb.push(" LIMIT ");
        qb.push_bind(end - start + 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIELDS: &[&str] = &["id", "name", "description", "created_by_id", "is_root"];

    #[test]
    fn test_parse_sort_valid() {
        let sort = parse_sort(Some(r#"["name", "ASC"]"#), FIELDS).unwrap().unwrap();
        assert_eq!(sort.field, "name");
        assert_eq!(sort.order, SortOrder::Asc);

        let sort = parse_sort(Some(r#"["id", "DESC"]"#), FIELDS).unwrap().unwrap();
        assert_eq!(sort.order, SortOrder::Desc);
    }

    #[test]
    fn test_parse_sort_absent() {
        assert!(parse_sort(None, FIELDS).unwrap().is_none());
        assert!(parse_sort(Some(""), FIELDS).unwrap().is_none());
    }

    #[test]
    fn test_parse_sort_rejects_unknown_field_and_bad_order() {
        assert!(parse_sort(Some(r#"["secret", "ASC"]"#), FIELDS).is_err());
        assert!(parse_sort(Some(r#"["name", "UP"]"#), FIELDS).is_err());
        assert!(parse_sort(Some(r#"["name"]"#), FIELDS).is_err());
        assert!(parse_sort(Some("not json"), FIELDS).is_err());
    }

    #[test]
    fn test_parse_sort_error_is_field_keyed() {
        let err = parse_sort(Some("nope"), FIELDS).unwrap_err();
        match err {
            KontorError::InvalidArgument { fields } => {
                assert!(fields.contains_key("sort"));
            }
            other => panic!("expected InvalidArgument, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_range() {
        assert_eq!(parse_range(Some("[0, 24]")).unwrap(), Some((0, 24)));
        assert_eq!(parse_range(Some("[10, 10]")).unwrap(), Some((10, 10)));
        assert!(parse_range(None).unwrap().is_none());
        assert!(parse_range(Some("[5, 2]")).is_err());
        assert!(parse_range(Some("[-1, 2]")).is_err());
        assert!(parse_range(Some(r#"["a", "b"]"#)).is_err());
    }

    #[test]
    fn test_parse_filter_rejects_unknown_keys() {
        let ok = parse_filter(Some(r#"{"name": "ops", "q": "x"}"#), FIELDS).unwrap();
        assert!(ok.is_some());

        let err = parse_filter(Some(r#"{"password_hash": "x"}"#), FIELDS).unwrap_err();
        match err {
            KontorError::InvalidArgument { fields } => {
                assert!(fields["filter"][0].contains("password_hash"));
            }
            other => panic!("expected InvalidArgument, got {:?}", other),
        }

        assert!(parse_filter(Some("[1,2]"), FIELDS).is_err());
    }

    #[test]
    fn test_ownership_scope_requested() {
        let f = parse_filter(Some(r#"{"is_allowed_all": false}"#), FIELDS).unwrap();
        assert!(ownership_scope_requested(f.as_ref()));

        let f = parse_filter(Some(r#"{"is_allowed_all": true}"#), FIELDS).unwrap();
        assert!(!ownership_scope_requested(f.as_ref()));

        assert!(!ownership_scope_requested(None));
    }

    #[test]
    fn test_ownership_union_with_explicit_ids() {
        let owned_a = Uuid::now_v7();
        let owned_b = Uuid::now_v7();
        let other = Uuid::now_v7();

        let raw = format!(r#"{{"is_allowed_all": false, "id": ["{}"]}}"#, other);
        let filter = parse_filter(Some(&raw), FIELDS).unwrap();
        let conditions = build_filter_conditions(
            filter.as_ref(),
            "name",
            false,
            Some(vec![owned_a, owned_b]),
        )
        .unwrap();

        let ids = conditions.id_in.unwrap();
        assert_eq!(ids.len(), 3);
        assert!(ids.contains(&owned_a));
        assert!(ids.contains(&owned_b));
        assert!(ids.contains(&other));
    }

    #[test]
    fn test_ownership_without_explicit_ids() {
        let owned = vec![Uuid::now_v7(), Uuid::now_v7()];
        let filter = parse_filter(Some(r#"{"is_allowed_all": false}"#), FIELDS).unwrap();
        let conditions =
            build_filter_conditions(filter.as_ref(), "name", false, Some(owned.clone())).unwrap();
        assert_eq!(conditions.id_in.unwrap(), owned);
    }

    #[test]
    fn test_no_scoping_keeps_explicit_ids_only() {
        let a = Uuid::now_v7();
        let raw = format!(r#"{{"id": ["{}"]}}"#, a);
        let filter = parse_filter(Some(&raw), FIELDS).unwrap();
        let conditions = build_filter_conditions(filter.as_ref(), "name", false, None).unwrap();
        assert_eq!(conditions.id_in.unwrap(), vec![a]);
    }

    #[test]
    fn test_q_and_string_filters_become_contains() {
        let filter = parse_filter(Some(r#"{"q": "ann", "description": "dev"}"#), FIELDS).unwrap();
        let conditions = build_filter_conditions(filter.as_ref(), "name", false, None).unwrap();
        assert!(conditions
            .contains
            .contains(&("name".to_string(), "ann".to_string())));
        assert!(conditions
            .contains
            .contains(&("description".to_string(), "dev".to_string())));
    }

    #[test]
    fn test_exclude_only_where_supported() {
        let filter = parse_filter(Some(r#"{"exclude": true}"#), FIELDS).unwrap();
        let with = build_filter_conditions(filter.as_ref(), "name", true, None).unwrap();
        assert!(with.exclude_root);
        let without = build_filter_conditions(filter.as_ref(), "name", false, None).unwrap();
        assert!(!without.exclude_root);
    }

    #[test]
    fn test_push_conditions_sql_shape() {
        let filter = parse_filter(Some(r#"{"q": "ops", "is_root": false}"#), FIELDS).unwrap();
        let conditions = build_filter_conditions(filter.as_ref(), "name", true, None).unwrap();

        let mut qb: QueryBuilder<'_, Postgres> =
            QueryBuilder::new("SELECT * FROM staff WHERE deleted_at IS NULL");
        push_conditions(&mut qb, &conditions, None);
        push_order_and_range(&mut qb, None, Some((0, 9)), "created_at DESC");

        let sql = qb.sql();
        assert!(sql.contains("name ILIKE"));
        assert!(sql.contains("is_root ="));
        assert!(sql.contains("ORDER BY created_at DESC"));
        assert!(sql.contains("OFFSET"));
        assert!(sql.contains("LIMIT"));
    }
}

//! Repository implementations for PostgreSQL

pub mod grant;
pub mod group;
pub mod lookup;
pub mod membership;
pub mod permission;
pub mod staff;

pub use grant::*;
pub use group::*;
pub use lookup::*;
pub use membership::*;
pub use permission::*;
pub use staff::*;

use kontor_core::KontorError;

/// Map a sqlx error to the platform error type, surfacing unique-constraint
/// violations on the given column as a field-keyed InvalidArgument.
pub(crate) fn map_sqlx_error(err: sqlx::Error, unique_field: Option<&str>) -> KontorError {
    if let Some(field) = unique_field {
        if let sqlx::Error::Database(ref db_err) = err {
            if matches!(
                db_err.kind(),
                sqlx::error::ErrorKind::UniqueViolation
            ) {
                return KontorError::invalid_field(field, format!("{} must be unique", field));
            }
        }
    }
    KontorError::database_error(err.to_string())
}

/// Shorthand for plain database errors.
pub(crate) fn db_err(err: sqlx::Error) -> KontorError {
    map_sqlx_error(err, None)
}

/// Deduplicated count of requested ids, for all-or-nothing existence checks.
pub(crate) fn distinct_count<T: PartialEq + Copy>(ids: &[T]) -> usize {
    let mut seen: Vec<T> = Vec::with_capacity(ids.len());
    for id in ids {
        if !seen.contains(id) {
            seen.push(*id);
        }
    }
    seen.len()
}

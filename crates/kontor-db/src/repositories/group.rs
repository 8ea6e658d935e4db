//! Group repository implementation
//!
//! Groups share the lookup storage template; the membership edges and the
//! group-level grants live in their own repositories.

use crate::repositories::lookup::lookup_repository;

lookup_repository!(
    PgGroupRepository,
    GroupRepository,
    Group,
    GroupId,
    table = "groups",
    entity = "group",
    entity_plural = "groups"
);

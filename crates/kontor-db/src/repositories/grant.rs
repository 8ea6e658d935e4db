//! Grant store: one table of grants parameterized by subject kind
//!
//! Staff-level and group-level grants are structurally identical, so they
//! share one table tagged with `subject_kind`. The invariant "at most one
//! live grant per (subject, permission)" is enforced by a partial unique
//! index over live rows:
//!
//! ```sql
//! CREATE UNIQUE INDEX uq_grants_subject_permission
//!     ON grants (subject_kind, subject_id, permission_id)
//!     WHERE deleted_at IS NULL;
//! ```
//!
//! Assignment is a single `INSERT ... ON CONFLICT ... DO UPDATE` statement
//! against that index, so two concurrent assigns for the same pair cannot
//! both insert. Revocation tombstones the row; a later re-assign inserts a
//! fresh live row without tripping over the tombstone.

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, QueryBuilder, Row};
use tracing::instrument;
use uuid::Uuid;

use kontor_core::{
    Grant, GrantAssignment, GrantDetail, GrantId, GrantStore, KontorError, ListParams, ListResult,
    PermissionActionId, PermissionDetail, PermissionId, PermissionResourceId, Result, StaffId,
    SubjectKind, SubjectRef,
};

use super::db_err;
use crate::query::{
    build_filter_conditions, parse_filter, parse_range, parse_sort, push_conditions,
};

const GRANT_COLUMNS: &str = "id, subject_kind, subject_id, permission_id, is_allowed_all, \
     allow_ids, created_by_id, updated_by_id, deleted_by_id, created_at, updated_at, deleted_at";

const DETAIL_SELECT: &str = "SELECT g.id, g.subject_kind, g.subject_id, g.is_allowed_all, \
     g.allow_ids, g.created_by_id, g.updated_by_id, g.created_at, g.updated_at, \
     p.id AS permission_id, p.name AS permission_name, \
     r.id AS resource_id, r.name AS resource_name, \
     a.id AS action_id, a.name AS action_name \
     FROM grants g \
     JOIN permissions p ON p.id = g.permission_id \
     JOIN permission_resources r ON r.id = p.resource_id \
     JOIN permission_actions a ON a.id = p.action_id";

const GRANT_FIELDS: &[&str] = &[
    "id",
    "subject_id",
    "permission_id",
    "is_allowed_all",
    "created_by_id",
    "updated_by_id",
    "created_at",
    "updated_at",
];

fn subject_kind_from_str(raw: &str) -> Result<SubjectKind> {
    match raw {
        "staff" => Ok(SubjectKind::Staff),
        "group" => Ok(SubjectKind::Group),
        other => Err(KontorError::database_error(format!(
            "unexpected subject kind '{}'",
            other
        ))),
    }
}

/// PostgreSQL implementation of GrantStore
pub struct PgGrantStore {
    pool: PgPool,
}

impl PgGrantStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_grant(row: &PgRow) -> Result<Grant> {
        let kind: String = row.try_get("subject_kind").map_err(db_err)?;
        Ok(Grant {
            id: GrantId::from_uuid(row.try_get("id").map_err(db_err)?),
            subject: SubjectRef {
                kind: subject_kind_from_str(&kind)?,
                id: row.try_get("subject_id").map_err(db_err)?,
            },
            permission_id: PermissionId::from_uuid(row.try_get("permission_id").map_err(db_err)?),
            is_allowed_all: row.try_get("is_allowed_all").map_err(db_err)?,
            allow_ids: row.try_get("allow_ids").map_err(db_err)?,
            created_by_id: row
                .try_get::<Option<Uuid>, _>("created_by_id")
                .map_err(db_err)?
                .map(StaffId::from_uuid),
            updated_by_id: row
                .try_get::<Option<Uuid>, _>("updated_by_id")
                .map_err(db_err)?
                .map(StaffId::from_uuid),
            deleted_by_id: row
                .try_get::<Option<Uuid>, _>("deleted_by_id")
                .map_err(db_err)?
                .map(StaffId::from_uuid),
            created_at: row.try_get("created_at").map_err(db_err)?,
            updated_at: row.try_get("updated_at").map_err(db_err)?,
            deleted_at: row.try_get("deleted_at").map_err(db_err)?,
        })
    }

    fn row_to_detail(row: &PgRow) -> Result<GrantDetail> {
        let kind: String = row.try_get("subject_kind").map_err(db_err)?;
        Ok(GrantDetail {
            id: GrantId::from_uuid(row.try_get("id").map_err(db_err)?),
            subject: SubjectRef {
                kind: subject_kind_from_str(&kind)?,
                id: row.try_get("subject_id").map_err(db_err)?,
            },
            is_allowed_all: row.try_get("is_allowed_all").map_err(db_err)?,
            allow_ids: row.try_get("allow_ids").map_err(db_err)?,
            permission: PermissionDetail {
                id: PermissionId::from_uuid(row.try_get("permission_id").map_err(db_err)?),
                name: row.try_get("permission_name").map_err(db_err)?,
                resource_id: PermissionResourceId::from_uuid(
                    row.try_get("resource_id").map_err(db_err)?,
                ),
                resource_name: row.try_get("resource_name").map_err(db_err)?,
                action_id: PermissionActionId::from_uuid(
                    row.try_get("action_id").map_err(db_err)?,
                ),
                action_name: row.try_get("action_name").map_err(db_err)?,
            },
            created_by_id: row
                .try_get::<Option<Uuid>, _>("created_by_id")
                .map_err(db_err)?
                .map(StaffId::from_uuid),
            updated_by_id: row
                .try_get::<Option<Uuid>, _>("updated_by_id")
                .map_err(db_err)?
                .map(StaffId::from_uuid),
            created_at: row.try_get("created_at").map_err(db_err)?,
            updated_at: row.try_get("updated_at").map_err(db_err)?,
        })
    }
}

#[async_trait]
impl GrantStore for PgGrantStore {
    #[instrument(skip(self, assignment))]
    async fn upsert(&self, subject: SubjectRef, assignment: &GrantAssignment) -> Result<Grant> {
        let id = GrantId::new();
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO grants (
                id, subject_kind, subject_id, permission_id,
                is_allowed_all, allow_ids,
                created_by_id, updated_by_id, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $7, NOW(), NOW())
            ON CONFLICT (subject_kind, subject_id, permission_id) WHERE deleted_at IS NULL
            DO UPDATE SET
                is_allowed_all = EXCLUDED.is_allowed_all,
                allow_ids = EXCLUDED.allow_ids,
                updated_by_id = EXCLUDED.updated_by_id,
                updated_at = NOW()
            RETURNING {GRANT_COLUMNS}
            "#
        ))
        .bind(id.as_uuid())
        .bind(subject.kind.as_str())
        .bind(subject.id)
        .bind(assignment.permission_id.as_uuid())
        .bind(assignment.is_allowed_all)
        .bind(&assignment.allow_ids)
        .bind(assignment.actor_id.as_uuid())
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;

        Self::row_to_grant(&row)
    }

    #[instrument(skip(self))]
    async fn assigned_permission_ids(
        &self,
        subject: SubjectRef,
        permission_ids: &[PermissionId],
    ) -> Result<Vec<PermissionId>> {
        let uuids: Vec<Uuid> = permission_ids.iter().map(|id| *id.as_uuid()).collect();
        let assigned = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT permission_id FROM grants
            WHERE subject_kind = $1 AND subject_id = $2
              AND permission_id = ANY($3) AND deleted_at IS NULL
            "#,
        )
        .bind(subject.kind.as_str())
        .bind(subject.id)
        .bind(&uuids)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(assigned.into_iter().map(PermissionId::from_uuid).collect())
    }

    #[instrument(skip(self))]
    async fn insert_allow_all(
        &self,
        subject: SubjectRef,
        permission_ids: &[PermissionId],
        actor_id: StaffId,
    ) -> Result<()> {
        if permission_ids.is_empty() {
            return Ok(());
        }

        let mut qb = QueryBuilder::new(
            "INSERT INTO grants (id, subject_kind, subject_id, permission_id, \
             is_allowed_all, allow_ids, created_by_id, updated_by_id, created_at, updated_at) ",
        );
        qb.push_values(permission_ids, |mut b, permission_id| {
            b.push_bind(*GrantId::new().as_uuid())
                .push_bind(subject.kind.as_str())
                .push_bind(subject.id)
                .push_bind(*permission_id.as_uuid())
                .push_bind(true)
                .push_bind(Vec::<Uuid>::new())
                .push_bind(*actor_id.as_uuid())
                .push_bind(*actor_id.as_uuid())
                .push("NOW()")
                .push("NOW()");
        });
        // Concurrent duplicate assigns land on the partial unique index
        qb.push(
            " ON CONFLICT (subject_kind, subject_id, permission_id) WHERE deleted_at IS NULL \
             DO NOTHING",
        );

        qb.build().execute(&self.pool).await.map_err(db_err)?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn validate_exists(&self, kind: SubjectKind, id: GrantId) -> Result<Grant> {
        let row = sqlx::query(&format!(
            "SELECT {GRANT_COLUMNS} FROM grants \
             WHERE id = $1 AND subject_kind = $2 AND deleted_at IS NULL"
        ))
        .bind(id.as_uuid())
        .bind(kind.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        match row {
            Some(row) => Self::row_to_grant(&row),
            None => Err(KontorError::not_found(kind.grant_entity_name())),
        }
    }

    #[instrument(skip(self))]
    async fn list_by_subject(&self, subject: SubjectRef) -> Result<Vec<GrantDetail>> {
        let rows = sqlx::query(&format!(
            "{DETAIL_SELECT} \
             WHERE g.subject_kind = $1 AND g.subject_id = $2 AND g.deleted_at IS NULL \
             ORDER BY g.created_at ASC"
        ))
        .bind(subject.kind.as_str())
        .bind(subject.id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.iter().map(Self::row_to_detail).collect()
    }

    #[instrument(skip(self))]
    async fn list_inherited_by_staff(&self, staff_id: StaffId) -> Result<Vec<GrantDetail>> {
        // Grants of every group the staff belongs to. Tombstoned groups do
        // not contribute grants.
        let rows = sqlx::query(&format!(
            "{DETAIL_SELECT} \
             JOIN group_memberships gm ON gm.group_id = g.subject_id \
             JOIN groups gr ON gr.id = g.subject_id AND gr.deleted_at IS NULL \
             WHERE g.subject_kind = 'group' AND gm.staff_id = $1 AND g.deleted_at IS NULL \
             ORDER BY g.created_at ASC"
        ))
        .bind(staff_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.iter().map(Self::row_to_detail).collect()
    }

    #[instrument(skip(self))]
    async fn soft_delete(&self, id: GrantId, deleted_by: StaffId) -> Result<Grant> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE grants
            SET deleted_at = NOW(), deleted_by_id = $2, updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING {GRANT_COLUMNS}
            "#
        ))
        .bind(id.as_uuid())
        .bind(deleted_by.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        match row {
            Some(row) => Self::row_to_grant(&row),
            None => Err(KontorError::not_found("grant")),
        }
    }

    #[instrument(skip(self))]
    async fn get_list(
        &self,
        kind: SubjectKind,
        params: &ListParams,
    ) -> Result<ListResult<GrantDetail>> {
        let sort = parse_sort(params.sort.as_deref(), GRANT_FIELDS)?;
        let range = parse_range(params.range.as_deref())?;
        let mut filter = parse_filter(params.filter.as_deref(), GRANT_FIELDS)?;

        // On the grant table `is_allowed_all` is a real column, not the
        // ownership-scoping trigger it is elsewhere; `q` has no contains
        // target here.
        let mut allowed_all_eq = None;
        if let Some(f) = filter.as_mut() {
            allowed_all_eq = f.remove("is_allowed_all").and_then(|v| v.as_bool());
            f.remove("q");
        }
        let mut conditions = build_filter_conditions(filter.as_ref(), "id", false, None)?;
        if let Some(value) = allowed_all_eq {
            conditions.eq_bool.push(("is_allowed_all".to_string(), value));
        }

        let mut qb = QueryBuilder::new(format!(
            "{DETAIL_SELECT} WHERE g.subject_kind = "
        ));
        qb.push_bind(kind.as_str());
        qb.push(" AND g.deleted_at IS NULL");
        push_conditions(&mut qb, &conditions, Some("g"));
        match sort.as_ref() {
            Some(sort) => {
                qb.push(format!(" ORDER BY g.{} {}", sort.field, sort.order.as_sql()));
            }
            None => {
                qb.push(" ORDER BY g.created_at DESC");
            }
        }
        if let Some((start, end)) = range {
            qb.push(" OFFSET ");
            qb.push_bind(start);
            qb.push(" LIMIT ");
            qb.push_bind(end - start + 1);
        }
        let rows = qb.build().fetch_all(&self.pool).await.map_err(db_err)?;

        let mut count_qb =
            QueryBuilder::new("SELECT COUNT(*) FROM grants g WHERE g.subject_kind = ");
        count_qb.push_bind(kind.as_str());
        count_qb.push(" AND g.deleted_at IS NULL");
        push_conditions(&mut count_qb, &conditions, Some("g"));
        let total_count: i64 = count_qb
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)?;

        let data = rows
            .iter()
            .map(Self::row_to_detail)
            .collect::<Result<Vec<_>>>()?;
        Ok(ListResult::new(data, total_count))
    }
}

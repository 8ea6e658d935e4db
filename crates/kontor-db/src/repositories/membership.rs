//! Group membership registry: the staff <-> group association edges

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, QueryBuilder, Row};
use tracing::instrument;
use uuid::Uuid;

use kontor_core::{
    GroupId, GroupMembership, GroupMembershipId, KontorError, ListParams, ListResult,
    MembershipRegistry, Result, StaffId,
};

use super::db_err;
use crate::query::{
    build_filter_conditions, parse_filter, parse_range, parse_sort, push_conditions,
    push_order_and_range,
};

const EDGE_COLUMNS: &str =
    "id, staff_id, group_id, created_by_id, updated_by_id, created_at, updated_at";

const EDGE_FIELDS: &[&str] = &[
    "id",
    "staff_id",
    "group_id",
    "created_by_id",
    "updated_by_id",
    "created_at",
    "updated_at",
];

/// PostgreSQL implementation of MembershipRegistry
pub struct PgMembershipRegistry {
    pool: PgPool,
}

impl PgMembershipRegistry {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_edge(row: &PgRow) -> Result<GroupMembership> {
        Ok(GroupMembership {
            id: GroupMembershipId::from_uuid(row.try_get("id").map_err(db_err)?),
            staff_id: StaffId::from_uuid(row.try_get("staff_id").map_err(db_err)?),
            group_id: GroupId::from_uuid(row.try_get("group_id").map_err(db_err)?),
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
impl MembershipRegistry for PgMembershipRegistry {
    #[instrument(skip(self))]
    async fn upsert(
        &self,
        staff_id: StaffId,
        group_id: GroupId,
        actor_id: StaffId,
    ) -> Result<GroupMembership> {
        let id = GroupMembershipId::new();
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO group_memberships (
                id, staff_id, group_id, created_by_id, updated_by_id, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $4, NOW(), NOW())
            ON CONFLICT (staff_id, group_id)
            DO UPDATE SET updated_by_id = EXCLUDED.updated_by_id, updated_at = NOW()
            RETURNING {EDGE_COLUMNS}
            "#
        ))
        .bind(id.as_uuid())
        .bind(staff_id.as_uuid())
        .bind(group_id.as_uuid())
        .bind(actor_id.as_uuid())
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;

        Self::row_to_edge(&row)
    }

    #[instrument(skip(self))]
    async fn validate_exists(&self, id: GroupMembershipId) -> Result<GroupMembership> {
        let row = sqlx::query(&format!(
            "SELECT {EDGE_COLUMNS} FROM group_memberships WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        match row {
            Some(row) => Self::row_to_edge(&row),
            None => Err(KontorError::not_found("staff group")),
        }
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: GroupMembershipId) -> Result<GroupMembership> {
        let row = sqlx::query(&format!(
            "DELETE FROM group_memberships WHERE id = $1 RETURNING {EDGE_COLUMNS}"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        match row {
            Some(row) => Self::row_to_edge(&row),
            None => Err(KontorError::not_found("staff group")),
        }
    }

    #[instrument(skip(self))]
    async fn list_by_staff(&self, staff_id: StaffId) -> Result<Vec<GroupMembership>> {
        let rows = sqlx::query(&format!(
            "SELECT {EDGE_COLUMNS} FROM group_memberships \
             WHERE staff_id = $1 ORDER BY created_at ASC"
        ))
        .bind(staff_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.iter().map(Self::row_to_edge).collect()
    }

    #[instrument(skip(self))]
    async fn list_by_group(&self, group_id: GroupId) -> Result<Vec<GroupMembership>> {
        let rows = sqlx::query(&format!(
            "SELECT {EDGE_COLUMNS} FROM group_memberships \
             WHERE group_id = $1 ORDER BY created_at ASC"
        ))
        .bind(group_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.iter().map(Self::row_to_edge).collect()
    }

    #[instrument(skip(self))]
    async fn get_list(&self, params: &ListParams) -> Result<ListResult<GroupMembership>> {
        let sort = parse_sort(params.sort.as_deref(), EDGE_FIELDS)?;
        let range = parse_range(params.range.as_deref())?;
        let mut filter = parse_filter(params.filter.as_deref(), EDGE_FIELDS)?;
        if let Some(f) = filter.as_mut() {
            f.remove("q"); // no contains target on the edge table
        }
        let conditions = build_filter_conditions(filter.as_ref(), "id", false, None)?;

        let mut qb = QueryBuilder::new(format!(
            "SELECT {EDGE_COLUMNS} FROM group_memberships WHERE TRUE"
        ));
        push_conditions(&mut qb, &conditions, None);
        push_order_and_range(&mut qb, sort.as_ref(), range, "created_at DESC");
        let rows = qb.build().fetch_all(&self.pool).await.map_err(db_err)?;

        let mut count_qb = QueryBuilder::new("SELECT COUNT(*) FROM group_memberships WHERE TRUE");
        push_conditions(&mut count_qb, &conditions, None);
        let total_count: i64 = count_qb
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)?;

        let data = rows
            .iter()
            .map(Self::row_to_edge)
            .collect::<Result<Vec<_>>>()?;
        Ok(ListResult::new(data, total_count))
    }
}

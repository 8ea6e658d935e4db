//! Permission catalog repository
//!
//! The catalog is seeded, read-only at runtime: permissions, resources and
//! action types are reference data.

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, QueryBuilder, Row};
use tracing::instrument;
use uuid::Uuid;

use kontor_core::{
    KontorError, ListParams, ListResult, PermissionActionId, PermissionCatalog, PermissionDetail,
    PermissionId, PermissionResourceId, Result,
};

use super::{db_err, distinct_count};
use crate::query::{
    build_filter_conditions, parse_filter, parse_range, parse_sort, push_conditions,
};

const DETAIL_SELECT: &str = "SELECT p.id, p.name, \
     r.id AS resource_id, r.name AS resource_name, \
     a.id AS action_id, a.name AS action_name \
     FROM permissions p \
     JOIN permission_resources r ON r.id = p.resource_id \
     JOIN permission_actions a ON a.id = p.action_id";

const PERMISSION_FIELDS: &[&str] = &["id", "name", "resource_id", "action_id", "created_at"];

/// PostgreSQL implementation of PermissionCatalog
pub struct PgPermissionCatalog {
    pool: PgPool,
}

impl PgPermissionCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_detail(row: &PgRow) -> Result<PermissionDetail> {
        Ok(PermissionDetail {
            id: PermissionId::from_uuid(row.try_get("id").map_err(db_err)?),
            name: row.try_get("name").map_err(db_err)?,
            resource_id: PermissionResourceId::from_uuid(
                row.try_get("resource_id").map_err(db_err)?,
            ),
            resource_name: row.try_get("resource_name").map_err(db_err)?,
            action_id: PermissionActionId::from_uuid(row.try_get("action_id").map_err(db_err)?),
            action_name: row.try_get("action_name").map_err(db_err)?,
        })
    }
}

#[async_trait]
impl PermissionCatalog for PgPermissionCatalog {
    #[instrument(skip(self))]
    async fn validate_exists(&self, id: PermissionId) -> Result<PermissionDetail> {
        let row = sqlx::query(&format!("{DETAIL_SELECT} WHERE p.id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;

        match row {
            Some(row) => Self::row_to_detail(&row),
            None => Err(KontorError::not_found("permission")),
        }
    }

    #[instrument(skip(self))]
    async fn validate_all_exist(&self, ids: &[PermissionId]) -> Result<Vec<PermissionDetail>> {
        let uuids: Vec<Uuid> = ids.iter().map(|id| *id.as_uuid()).collect();
        let rows = sqlx::query(&format!("{DETAIL_SELECT} WHERE p.id = ANY($1)"))
            .bind(&uuids)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;

        if rows.len() != distinct_count(&uuids) {
            return Err(KontorError::not_found("one or more permissions"));
        }
        rows.iter().map(Self::row_to_detail).collect()
    }

    #[instrument(skip(self))]
    async fn find_by_resource_and_action(
        &self,
        resource_name: &str,
        action_name: &str,
    ) -> Result<Option<PermissionDetail>> {
        let row = sqlx::query(&format!("{DETAIL_SELECT} WHERE r.name = $1 AND a.name = $2"))
            .bind(resource_name)
            .bind(action_name)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;

        row.map(|r| Self::row_to_detail(&r)).transpose()
    }

    #[instrument(skip(self))]
    async fn get_list(&self, params: &ListParams) -> Result<ListResult<PermissionDetail>> {
        let sort = parse_sort(params.sort.as_deref(), PERMISSION_FIELDS)?;
        let range = parse_range(params.range.as_deref())?;
        let filter = parse_filter(params.filter.as_deref(), PERMISSION_FIELDS)?;
        let conditions = build_filter_conditions(filter.as_ref(), "name", false, None)?;

        let mut qb = QueryBuilder::new(format!("{DETAIL_SELECT} WHERE TRUE"));
        push_conditions(&mut qb, &conditions, Some("p"));
        match sort.as_ref() {
            Some(sort) => {
                qb.push(format!(" ORDER BY p.{} {}", sort.field, sort.order.as_sql()));
            }
            None => {
                qb.push(" ORDER BY p.created_at ASC");
            }
        }
        if let Some((start, end)) = range {
            qb.push(" OFFSET ");
            qb.push_bind(start);
            qb.push(" LIMIT ");
            qb.push_bind(end - start + 1);
        }
        let rows = qb.build().fetch_all(&self.pool).await.map_err(db_err)?;

        let mut count_qb = QueryBuilder::new("SELECT COUNT(*) FROM permissions p WHERE TRUE");
        push_conditions(&mut count_qb, &conditions, Some("p"));
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

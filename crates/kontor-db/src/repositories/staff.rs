//! Staff repository implementation

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, QueryBuilder, Row};
use tracing::instrument;
use uuid::Uuid;

use kontor_core::{
    KontorError, ListParams, ListResult, NewStaff, RecordExistence, Result, Staff, StaffId,
    StaffRepository, StaffUpdate,
};

use super::{db_err, distinct_count, map_sqlx_error};
use crate::query::{
    build_filter_conditions, ownership_scope_requested, parse_filter, parse_range, parse_sort,
    push_conditions, push_order_and_range,
};

const STAFF_COLUMNS: &str = "id, email, first_name, last_name, password_hash, bio, \
     position_id, department_id, is_root, created_by_id, updated_by_id, deleted_by_id, \
     created_at, updated_at, deleted_at";

/// Scalar fields accepted in sort/filter payloads.
const STAFF_FIELDS: &[&str] = &[
    "id",
    "email",
    "first_name",
    "last_name",
    "bio",
    "position_id",
    "department_id",
    "is_root",
    "created_by_id",
    "updated_by_id",
    "created_at",
    "updated_at",
];

/// PostgreSQL implementation of StaffRepository
pub struct PgStaffRepository {
    pool: PgPool,
}

impl PgStaffRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_staff(row: &PgRow) -> Result<Staff> {
        Ok(Staff {
            id: StaffId::from_uuid(row.try_get("id").map_err(db_err)?),
            email: row.try_get("email").map_err(db_err)?,
            first_name: row.try_get("first_name").map_err(db_err)?,
            last_name: row.try_get("last_name").map_err(db_err)?,
            password_hash: row.try_get("password_hash").map_err(db_err)?,
            bio: row.try_get("bio").map_err(db_err)?,
            position_id: kontor_core::StaffPositionId::from_uuid(
                row.try_get("position_id").map_err(db_err)?,
            ),
            department_id: kontor_core::StaffDepartmentId::from_uuid(
                row.try_get("department_id").map_err(db_err)?,
            ),
            is_root: row.try_get("is_root").map_err(db_err)?,
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

    /// Ids of staff records the caller created, for ownership scoping.
    async fn owned_ids(&self, caller_id: StaffId) -> Result<Vec<Uuid>> {
        sqlx::query_scalar::<_, Uuid>(
            "SELECT id FROM staff WHERE created_by_id = $1 AND deleted_at IS NULL",
        )
        .bind(caller_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)
    }
}

#[async_trait]
impl StaffRepository for PgStaffRepository {
    #[instrument(skip(self, staff))]
    async fn create(&self, staff: NewStaff) -> Result<Staff> {
        let id = StaffId::new();
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO staff (
                id, email, first_name, last_name, password_hash, bio,
                position_id, department_id, is_root,
                created_by_id, updated_by_id, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, FALSE, $9, $9, NOW(), NOW())
            RETURNING {STAFF_COLUMNS}
            "#
        ))
        .bind(id.as_uuid())
        .bind(&staff.email)
        .bind(&staff.first_name)
        .bind(&staff.last_name)
        .bind(&staff.password_hash)
        .bind(&staff.bio)
        .bind(staff.position_id.as_uuid())
        .bind(staff.department_id.as_uuid())
        .bind(staff.created_by_id.map(|id| *id.as_uuid()))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error(e, Some("email")))?;

        Self::row_to_staff(&row)
    }

    #[instrument(skip(self))]
    async fn validate_exists(&self, id: StaffId) -> Result<Staff> {
        let row = sqlx::query(&format!(
            "SELECT {STAFF_COLUMNS} FROM staff WHERE id = $1 AND deleted_at IS NULL"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        match row {
            Some(row) => Self::row_to_staff(&row),
            None => Err(KontorError::not_found("staff")),
        }
    }

    #[instrument(skip(self))]
    async fn validate_all_exist(&self, ids: &[StaffId]) -> Result<Vec<Staff>> {
        let uuids: Vec<Uuid> = ids.iter().map(|id| *id.as_uuid()).collect();
        let rows = sqlx::query(&format!(
            "SELECT {STAFF_COLUMNS} FROM staff WHERE id = ANY($1) AND deleted_at IS NULL"
        ))
        .bind(&uuids)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        if rows.len() != distinct_count(&uuids) {
            return Err(KontorError::not_found("one or more staff"));
        }
        rows.iter().map(Self::row_to_staff).collect()
    }

    #[instrument(skip(self))]
    async fn find_by_email(&self, email: &str) -> Result<Option<Staff>> {
        let row = sqlx::query(&format!(
            "SELECT {STAFF_COLUMNS} FROM staff WHERE email = $1 AND deleted_at IS NULL"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.map(|r| Self::row_to_staff(&r)).transpose()
    }

    #[instrument(skip(self, update))]
    async fn update(&self, id: StaffId, update: StaffUpdate) -> Result<Staff> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE staff
            SET email = $2, first_name = $3, last_name = $4,
                password_hash = COALESCE($5, password_hash), bio = $6,
                position_id = $7, department_id = $8,
                updated_by_id = $9, updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING {STAFF_COLUMNS}
            "#
        ))
        .bind(id.as_uuid())
        .bind(&update.email)
        .bind(&update.first_name)
        .bind(&update.last_name)
        .bind(&update.password_hash)
        .bind(&update.bio)
        .bind(update.position_id.as_uuid())
        .bind(update.department_id.as_uuid())
        .bind(update.updated_by_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error(e, Some("email")))?;

        match row {
            Some(row) => Self::row_to_staff(&row),
            None => Err(KontorError::not_found("staff")),
        }
    }

    #[instrument(skip(self))]
    async fn soft_delete(&self, id: StaffId, deleted_by: StaffId) -> Result<Staff> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE staff
            SET deleted_at = NOW(), deleted_by_id = $2, updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING {STAFF_COLUMNS}
            "#
        ))
        .bind(id.as_uuid())
        .bind(deleted_by.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        match row {
            Some(row) => Self::row_to_staff(&row),
            None => Err(KontorError::not_found("staff")),
        }
    }

    #[instrument(skip(self))]
    async fn get_list(&self, params: &ListParams, caller_id: StaffId) -> Result<ListResult<Staff>> {
        let sort = parse_sort(params.sort.as_deref(), STAFF_FIELDS)?;
        let range = parse_range(params.range.as_deref())?;
        let filter = parse_filter(params.filter.as_deref(), STAFF_FIELDS)?;

        let owned = if ownership_scope_requested(filter.as_ref()) {
            Some(self.owned_ids(caller_id).await?)
        } else {
            None
        };
        let conditions = build_filter_conditions(filter.as_ref(), "first_name", true, owned)?;

        let mut qb = QueryBuilder::new(format!(
            "SELECT {STAFF_COLUMNS} FROM staff WHERE deleted_at IS NULL"
        ));
        push_conditions(&mut qb, &conditions, None);
        push_order_and_range(&mut qb, sort.as_ref(), range, "created_at DESC");
        let rows = qb.build().fetch_all(&self.pool).await.map_err(db_err)?;

        let mut count_qb =
            QueryBuilder::new("SELECT COUNT(*) FROM staff WHERE deleted_at IS NULL");
        push_conditions(&mut count_qb, &conditions, None);
        let total_count: i64 = count_qb
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)?;

        let data = rows
            .iter()
            .map(Self::row_to_staff)
            .collect::<Result<Vec<_>>>()?;
        Ok(ListResult::new(data, total_count))
    }
}

#[async_trait]
impl RecordExistence for PgStaffRepository {
    #[instrument(skip(self))]
    async fn validate_ids_exist(&self, ids: &[Uuid]) -> Result<()> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM staff WHERE id = ANY($1) AND deleted_at IS NULL",
        )
        .bind(ids)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;

        if count as usize != distinct_count(ids) {
            return Err(KontorError::not_found("one or more staff"));
        }
        Ok(())
    }
}

//! Shared implementation for the name/description lookup repositories
//!
//! Positions, departments, groups and the taxonomy entries all follow the
//! same storage template: UUID id, name, optional description, audit fields,
//! soft-delete tombstone, list with ownership scoping. The macro below
//! stamps out one PostgreSQL repository per entity instead of copy-pasting
//! the template.

/// Columns shared by every lookup table.
pub(crate) const LOOKUP_COLUMNS: &str = "id, name, description, created_by_id, updated_by_id, \
     deleted_by_id, created_at, updated_at, deleted_at";

/// Scalar fields accepted in sort/filter payloads for lookup entities.
pub(crate) const LOOKUP_FIELDS: &[&str] = &[
    "id",
    "name",
    "description",
    "created_by_id",
    "updated_by_id",
    "created_at",
    "updated_at",
];

macro_rules! lookup_repository {
    (
        $repo:ident,
        $trait_name:ident,
        $model:ident,
        $id:ident,
        table = $table:literal,
        entity = $entity:literal,
        entity_plural = $plural:literal
    ) => {
        #[doc = concat!("PostgreSQL implementation of ", stringify!($trait_name))]
        pub struct $repo {
            pool: sqlx::PgPool,
        }

        impl $repo {
            pub fn new(pool: sqlx::PgPool) -> Self {
                Self { pool }
            }

            fn map_row(row: &sqlx::postgres::PgRow) -> kontor_core::Result<kontor_core::$model> {
                use sqlx::Row;
                use $crate::repositories::db_err;
                Ok(kontor_core::$model {
                    id: kontor_core::$id::from_uuid(row.try_get("id").map_err(db_err)?),
                    name: row.try_get("name").map_err(db_err)?,
                    description: row.try_get("description").map_err(db_err)?,
                    created_by_id: row
                        .try_get::<Option<uuid::Uuid>, _>("created_by_id")
                        .map_err(db_err)?
                        .map(kontor_core::StaffId::from_uuid),
                    updated_by_id: row
                        .try_get::<Option<uuid::Uuid>, _>("updated_by_id")
                        .map_err(db_err)?
                        .map(kontor_core::StaffId::from_uuid),
                    deleted_by_id: row
                        .try_get::<Option<uuid::Uuid>, _>("deleted_by_id")
                        .map_err(db_err)?
                        .map(kontor_core::StaffId::from_uuid),
                    created_at: row.try_get("created_at").map_err(db_err)?,
                    updated_at: row.try_get("updated_at").map_err(db_err)?,
                    deleted_at: row.try_get("deleted_at").map_err(db_err)?,
                })
            }

            async fn owned_ids(
                &self,
                caller_id: kontor_core::StaffId,
            ) -> kontor_core::Result<Vec<uuid::Uuid>> {
                sqlx::query_scalar::<_, uuid::Uuid>(concat!(
                    "SELECT id FROM ",
                    $table,
                    " WHERE created_by_id = $1 AND deleted_at IS NULL"
                ))
                .bind(caller_id.as_uuid())
                .fetch_all(&self.pool)
                .await
                .map_err($crate::repositories::db_err)
            }
        }

        #[async_trait::async_trait]
        impl kontor_core::$trait_name for $repo {
            #[tracing::instrument(skip(self, entry))]
            async fn create(
                &self,
                entry: kontor_core::NewLookupEntry,
            ) -> kontor_core::Result<kontor_core::$model> {
                let id = kontor_core::$id::new();
                let row = sqlx::query(&format!(
                    "INSERT INTO {} (id, name, description, created_by_id, updated_by_id, \
                     created_at, updated_at) VALUES ($1, $2, $3, $4, $4, NOW(), NOW()) \
                     RETURNING {}",
                    $table,
                    $crate::repositories::lookup::LOOKUP_COLUMNS
                ))
                .bind(id.as_uuid())
                .bind(&entry.name)
                .bind(&entry.description)
                .bind(entry.created_by_id.map(|id| *id.as_uuid()))
                .fetch_one(&self.pool)
                .await
                .map_err(|e| $crate::repositories::map_sqlx_error(e, Some("name")))?;

                Self::map_row(&row)
            }

            #[tracing::instrument(skip(self))]
            async fn validate_exists(
                &self,
                id: kontor_core::$id,
            ) -> kontor_core::Result<kontor_core::$model> {
                let row = sqlx::query(&format!(
                    "SELECT {} FROM {} WHERE id = $1 AND deleted_at IS NULL",
                    $crate::repositories::lookup::LOOKUP_COLUMNS,
                    $table
                ))
                .bind(id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err($crate::repositories::db_err)?;

                match row {
                    Some(row) => Self::map_row(&row),
                    None => Err(kontor_core::KontorError::not_found($entity)),
                }
            }

            #[tracing::instrument(skip(self))]
            async fn validate_all_exist(
                &self,
                ids: &[kontor_core::$id],
            ) -> kontor_core::Result<Vec<kontor_core::$model>> {
                let uuids: Vec<uuid::Uuid> = ids.iter().map(|id| *id.as_uuid()).collect();
                let rows = sqlx::query(&format!(
                    "SELECT {} FROM {} WHERE id = ANY($1) AND deleted_at IS NULL",
                    $crate::repositories::lookup::LOOKUP_COLUMNS,
                    $table
                ))
                .bind(&uuids)
                .fetch_all(&self.pool)
                .await
                .map_err($crate::repositories::db_err)?;

                if rows.len() != $crate::repositories::distinct_count(&uuids) {
                    return Err(kontor_core::KontorError::not_found(concat!(
                        "one or more ",
                        $plural
                    )));
                }
                rows.iter().map(Self::map_row).collect()
            }

            #[tracing::instrument(skip(self, update))]
            async fn update(
                &self,
                id: kontor_core::$id,
                update: kontor_core::LookupEntryUpdate,
            ) -> kontor_core::Result<kontor_core::$model> {
                let row = sqlx::query(&format!(
                    "UPDATE {} SET name = $2, description = $3, updated_by_id = $4, \
                     updated_at = NOW() WHERE id = $1 AND deleted_at IS NULL RETURNING {}",
                    $table,
                    $crate::repositories::lookup::LOOKUP_COLUMNS
                ))
                .bind(id.as_uuid())
                .bind(&update.name)
                .bind(&update.description)
                .bind(update.updated_by_id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| $crate::repositories::map_sqlx_error(e, Some("name")))?;

                match row {
                    Some(row) => Self::map_row(&row),
                    None => Err(kontor_core::KontorError::not_found($entity)),
                }
            }

            #[tracing::instrument(skip(self))]
            async fn soft_delete(
                &self,
                id: kontor_core::$id,
                deleted_by: kontor_core::StaffId,
            ) -> kontor_core::Result<kontor_core::$model> {
                let row = sqlx::query(&format!(
                    "UPDATE {} SET deleted_at = NOW(), deleted_by_id = $2, updated_at = NOW() \
                     WHERE id = $1 AND deleted_at IS NULL RETURNING {}",
                    $table,
                    $crate::repositories::lookup::LOOKUP_COLUMNS
                ))
                .bind(id.as_uuid())
                .bind(deleted_by.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err($crate::repositories::db_err)?;

                match row {
                    Some(row) => Self::map_row(&row),
                    None => Err(kontor_core::KontorError::not_found($entity)),
                }
            }

            #[tracing::instrument(skip(self))]
            async fn get_list(
                &self,
                params: &kontor_core::ListParams,
                caller_id: kontor_core::StaffId,
            ) -> kontor_core::Result<kontor_core::ListResult<kontor_core::$model>> {
                use $crate::query::{
                    build_filter_conditions, ownership_scope_requested, parse_filter, parse_range,
                    parse_sort, push_conditions, push_order_and_range,
                };
                use $crate::repositories::db_err;

                let fields = $crate::repositories::lookup::LOOKUP_FIELDS;
                let sort = parse_sort(params.sort.as_deref(), fields)?;
                let range = parse_range(params.range.as_deref())?;
                let filter = parse_filter(params.filter.as_deref(), fields)?;

                let owned = if ownership_scope_requested(filter.as_ref()) {
                    Some(self.owned_ids(caller_id).await?)
                } else {
                    None
                };
                let conditions = build_filter_conditions(filter.as_ref(), "name", false, owned)?;

                let mut qb = sqlx::QueryBuilder::new(format!(
                    "SELECT {} FROM {} WHERE deleted_at IS NULL",
                    $crate::repositories::lookup::LOOKUP_COLUMNS,
                    $table
                ));
                push_conditions(&mut qb, &conditions, None);
                push_order_and_range(&mut qb, sort.as_ref(), range, "created_at DESC");
                let rows = qb.build().fetch_all(&self.pool).await.map_err(db_err)?;

                let mut count_qb = sqlx::QueryBuilder::new(concat!(
                    "SELECT COUNT(*) FROM ",
                    $table,
                    " WHERE deleted_at IS NULL"
                ));
                push_conditions(&mut count_qb, &conditions, None);
                let total_count: i64 = count_qb
                    .build_query_scalar()
                    .fetch_one(&self.pool)
                    .await
                    .map_err(db_err)?;

                let data = rows
                    .iter()
                    .map(Self::map_row)
                    .collect::<kontor_core::Result<Vec<_>>>()?;
                Ok(kontor_core::ListResult::new(data, total_count))
            }
        }

        #[async_trait::async_trait]
        impl kontor_core::RecordExistence for $repo {
            #[tracing::instrument(skip(self))]
            async fn validate_ids_exist(&self, ids: &[uuid::Uuid]) -> kontor_core::Result<()> {
                let count: i64 = sqlx::query_scalar(concat!(
                    "SELECT COUNT(*) FROM ",
                    $table,
                    " WHERE id = ANY($1) AND deleted_at IS NULL"
                ))
                .bind(ids)
                .fetch_one(&self.pool)
                .await
                .map_err($crate::repositories::db_err)?;

                if count as usize != $crate::repositories::distinct_count(ids) {
                    return Err(kontor_core::KontorError::not_found(concat!(
                        "one or more ",
                        $plural
                    )));
                }
                Ok(())
            }
        }
    };
}

pub(crate) use lookup_repository;

lookup_repository!(
    PgStaffPositionRepository,
    StaffPositionRepository,
    StaffPosition,
    StaffPositionId,
    table = "staff_positions",
    entity = "staff position",
    entity_plural = "staff positions"
);

lookup_repository!(
    PgStaffDepartmentRepository,
    StaffDepartmentRepository,
    StaffDepartment,
    StaffDepartmentId,
    table = "staff_departments",
    entity = "staff department",
    entity_plural = "staff departments"
);

lookup_repository!(
    PgAdsLanguageRepository,
    AdsLanguageRepository,
    AdsLanguage,
    AdsLanguageId,
    table = "ads_languages",
    entity = "ads language",
    entity_plural = "ads languages"
);

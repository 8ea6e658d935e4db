//! Staff department lookup handlers

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use kontor_core::{
    ListParams, LookupEntryUpdate, NewLookupEntry, StaffDepartment, StaffDepartmentId,
    StaffDepartmentRepository,
};

use crate::dto::{created, error_response, success, ApiResult, ListResponse};
use crate::middleware::{ensure_access, AuthContext};
use crate::state::AppState;
use crate::validation::Validator;

const RESOURCE: &str = "staff-department";

#[derive(Debug, Deserialize)]
pub struct DepartmentRequest {
    pub name: String,
    pub description: Option<String>,
}

pub async fn create_department(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Json(request): Json<DepartmentRequest>,
) -> ApiResult<StaffDepartment> {
    ensure_access(&state, &ctx, RESOURCE, "create").await?;

    let mut v = Validator::new();
    v.name("name", &request.name)
        .description("description", request.description.as_deref());
    v.validate().map_err(error_response)?;

    let department = state
        .department_repo
        .create(NewLookupEntry {
            name: request.name,
            description: request.description,
            created_by_id: Some(ctx.staff_id),
        })
        .await
        .map_err(error_response)?;
    Ok(created(department))
}

pub async fn get_department(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<StaffDepartment> {
    ensure_access(&state, &ctx, RESOURCE, "read").await?;

    let department = state
        .department_repo
        .validate_exists(StaffDepartmentId::from_uuid(id))
        .await
        .map_err(error_response)?;
    Ok(success(department))
}

pub async fn list_departments(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Query(params): Query<ListParams>,
) -> ApiResult<ListResponse<StaffDepartment>> {
    ensure_access(&state, &ctx, RESOURCE, "read").await?;

    let result = state
        .department_repo
        .get_list(&params, ctx.staff_id)
        .await
        .map_err(error_response)?;
    Ok(success(result.into()))
}

pub async fn update_department(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(request): Json<DepartmentRequest>,
) -> ApiResult<StaffDepartment> {
    ensure_access(&state, &ctx, RESOURCE, "edit").await?;

    let mut v = Validator::new();
    v.name("name", &request.name)
        .description("description", request.description.as_deref());
    v.validate().map_err(error_response)?;

    let department = state
        .department_repo
        .update(
            StaffDepartmentId::from_uuid(id),
            LookupEntryUpdate {
                name: request.name,
                description: request.description,
                updated_by_id: ctx.staff_id,
            },
        )
        .await
        .map_err(error_response)?;
    Ok(success(department))
}

pub async fn delete_department(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<StaffDepartment> {
    ensure_access(&state, &ctx, RESOURCE, "delete").await?;

    let department = state
        .department_repo
        .soft_delete(StaffDepartmentId::from_uuid(id), ctx.staff_id)
        .await
        .map_err(error_response)?;
    Ok(success(department))
}

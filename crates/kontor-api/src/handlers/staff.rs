//! Staff account handlers

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use kontor_core::{
    KontorError, ListParams, NewStaff, Staff, StaffDepartmentId, StaffDepartmentRepository,
    StaffId, StaffPositionId, StaffPositionRepository, StaffRepository, StaffUpdate,
};

use crate::dto::{created, error_response, success, ApiResult, ListResponse};
use crate::middleware::{ensure_access, AuthContext};
use crate::password::hash_password_async;
use crate::state::AppState;
use crate::validation::Validator;

const RESOURCE: &str = "staff";

#[derive(Debug, Deserialize)]
pub struct CreateStaffRequest {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
    pub bio: Option<String>,
    pub position_id: Uuid,
    pub department_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStaffRequest {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    /// Absent keeps the current password
    pub password: Option<String>,
    pub bio: Option<String>,
    pub position_id: Uuid,
    pub department_id: Uuid,
}

pub async fn create_staff(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Json(request): Json<CreateStaffRequest>,
) -> ApiResult<Staff> {
    ensure_access(&state, &ctx, RESOURCE, "create").await?;

    let mut v = Validator::new();
    v.email("email", &request.email)
        .name("first_name", &request.first_name)
        .name("last_name", &request.last_name)
        .password("password", &request.password);
    v.validate().map_err(error_response)?;

    if state
        .staff_repo
        .find_by_email(&request.email)
        .await
        .map_err(error_response)?
        .is_some()
    {
        return Err(error_response(KontorError::invalid_field(
            "email",
            "email must be unique",
        )));
    }

    state
        .position_repo
        .validate_exists(StaffPositionId::from_uuid(request.position_id))
        .await
        .map_err(error_response)?;
    state
        .department_repo
        .validate_exists(StaffDepartmentId::from_uuid(request.department_id))
        .await
        .map_err(error_response)?;

    let password_hash = hash_password_async(request.password)
        .await
        .map_err(|e| error_response(KontorError::internal_error(e.to_string())))?;

    let staff = state
        .staff_repo
        .create(NewStaff {
            email: request.email,
            first_name: request.first_name,
            last_name: request.last_name,
            password_hash,
            bio: request.bio,
            position_id: StaffPositionId::from_uuid(request.position_id),
            department_id: StaffDepartmentId::from_uuid(request.department_id),
            created_by_id: Some(ctx.staff_id),
        })
        .await
        .map_err(error_response)?;

    info!(staff_id = %staff.id, "staff created");
    Ok(created(staff))
}

pub async fn get_staff(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Staff> {
    ensure_access(&state, &ctx, RESOURCE, "read").await?;

    let staff = state
        .staff_repo
        .validate_exists(StaffId::from_uuid(id))
        .await
        .map_err(error_response)?;
    Ok(success(staff))
}

pub async fn list_staff(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Query(params): Query<ListParams>,
) -> ApiResult<ListResponse<Staff>> {
    ensure_access(&state, &ctx, RESOURCE, "read").await?;

    let result = state
        .staff_repo
        .get_list(&params, ctx.staff_id)
        .await
        .map_err(error_response)?;
    Ok(success(result.into()))
}

pub async fn update_staff(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateStaffRequest>,
) -> ApiResult<Staff> {
    ensure_access(&state, &ctx, RESOURCE, "edit").await?;

    let mut v = Validator::new();
    v.email("email", &request.email)
        .name("first_name", &request.first_name)
        .name("last_name", &request.last_name);
    if let Some(password) = &request.password {
        v.password("password", password);
    }
    v.validate().map_err(error_response)?;

    let id = StaffId::from_uuid(id);
    let existing = state
        .staff_repo
        .validate_exists(id)
        .await
        .map_err(error_response)?;

    if existing.email != request.email
        && state
            .staff_repo
            .find_by_email(&request.email)
            .await
            .map_err(error_response)?
            .is_some()
    {
        return Err(error_response(KontorError::invalid_field(
            "email",
            "email must be unique",
        )));
    }

    state
        .position_repo
        .validate_exists(StaffPositionId::from_uuid(request.position_id))
        .await
        .map_err(error_response)?;
    state
        .department_repo
        .validate_exists(StaffDepartmentId::from_uuid(request.department_id))
        .await
        .map_err(error_response)?;

    let password_hash = match request.password {
        Some(password) => Some(
            hash_password_async(password)
                .await
                .map_err(|e| error_response(KontorError::internal_error(e.to_string())))?,
        ),
        None => None,
    };

    let staff = state
        .staff_repo
        .update(
            id,
            StaffUpdate {
                email: request.email,
                first_name: request.first_name,
                last_name: request.last_name,
                password_hash,
                bio: request.bio,
                position_id: StaffPositionId::from_uuid(request.position_id),
                department_id: StaffDepartmentId::from_uuid(request.department_id),
                updated_by_id: ctx.staff_id,
            },
        )
        .await
        .map_err(error_response)?;

    Ok(success(staff))
}

pub async fn delete_staff(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Staff> {
    ensure_access(&state, &ctx, RESOURCE, "delete").await?;

    let staff = state
        .staff_repo
        .soft_delete(StaffId::from_uuid(id), ctx.staff_id)
        .await
        .map_err(error_response)?;

    info!(staff_id = %staff.id, deleted_by = %ctx.staff_id, "staff deleted");
    Ok(success(staff))
}

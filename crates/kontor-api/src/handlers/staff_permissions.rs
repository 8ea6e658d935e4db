//! Staff-level grant handlers

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use kontor_core::{
    Grant, GrantAssignment, GrantDetail, GrantId, ListParams, PermissionId, StaffId, SubjectKind,
    SubjectRef,
};

use crate::dto::{created, error_response, success, ApiResult, ListResponse};
use crate::middleware::{ensure_access, AuthContext};
use crate::state::AppState;

// Grant administration rides on the "staff" resource's edit action.
const GUARD_RESOURCE: &str = "staff";

#[derive(Debug, Deserialize)]
pub struct AssignRequest {
    pub staff_id: Uuid,
    pub permission_id: Uuid,
    #[serde(default)]
    pub is_allowed_all: bool,
    #[serde(default)]
    pub allow_ids: Vec<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct AssignManyRequest {
    pub staff_id: Uuid,
    pub permission_ids: Vec<Uuid>,
}

pub async fn assign(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Json(request): Json<AssignRequest>,
) -> ApiResult<GrantDetail> {
    ensure_access(&state, &ctx, GUARD_RESOURCE, "edit").await?;

    let grant = state
        .assignment
        .assign(
            SubjectRef::staff(StaffId::from_uuid(request.staff_id)),
            GrantAssignment {
                permission_id: PermissionId::from_uuid(request.permission_id),
                is_allowed_all: request.is_allowed_all,
                allow_ids: request.allow_ids,
                actor_id: ctx.staff_id,
            },
        )
        .await
        .map_err(error_response)?;

    info!(
        staff_id = %request.staff_id,
        permission_id = %request.permission_id,
        "staff permission assigned"
    );
    Ok(created(grant))
}

pub async fn assign_many(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Json(request): Json<AssignManyRequest>,
) -> ApiResult<Vec<GrantDetail>> {
    ensure_access(&state, &ctx, GUARD_RESOURCE, "edit").await?;

    let permission_ids: Vec<PermissionId> = request
        .permission_ids
        .into_iter()
        .map(PermissionId::from_uuid)
        .collect();

    let grants = state
        .assignment
        .assign_many(
            SubjectRef::staff(StaffId::from_uuid(request.staff_id)),
            &permission_ids,
            ctx.staff_id,
        )
        .await
        .map_err(error_response)?;
    Ok(created(grants))
}

pub async fn get_list_by_staff(
    State(state): State<AppState>,
    Path(staff_id): Path<Uuid>,
) -> ApiResult<Vec<GrantDetail>> {
    let grants = state
        .assignment
        .list_by_staff(StaffId::from_uuid(staff_id))
        .await
        .map_err(error_response)?;
    Ok(success(grants))
}

pub async fn get_list(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Query(params): Query<ListParams>,
) -> ApiResult<ListResponse<GrantDetail>> {
    ensure_access(&state, &ctx, GUARD_RESOURCE, "edit").await?;

    let result = state
        .assignment
        .get_list(SubjectKind::Staff, &params)
        .await
        .map_err(error_response)?;
    Ok(success(result.into()))
}

pub async fn delete(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Grant> {
    ensure_access(&state, &ctx, GUARD_RESOURCE, "edit").await?;

    let grant = state
        .assignment
        .revoke(SubjectKind::Staff, GrantId::from_uuid(id), ctx.staff_id)
        .await
        .map_err(error_response)?;

    info!(grant_id = %grant.id, revoked_by = %ctx.staff_id, "staff permission revoked");
    Ok(success(grant))
}

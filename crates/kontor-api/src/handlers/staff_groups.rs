//! Group membership handlers

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use kontor_core::{
    GroupId, GroupMembership, GroupMembershipId, GroupRepository, ListParams, MembershipRegistry,
    StaffId, StaffRepository,
};

use crate::dto::{created, error_response, success, ApiResult, ListResponse};
use crate::middleware::{ensure_access, AuthContext};
use crate::state::AppState;

const GUARD_RESOURCE: &str = "group";

#[derive(Debug, Deserialize)]
pub struct AssignRequest {
    pub staff_id: Uuid,
    pub group_id: Uuid,
}

pub async fn assign(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Json(request): Json<AssignRequest>,
) -> ApiResult<GroupMembership> {
    ensure_access(&state, &ctx, GUARD_RESOURCE, "edit").await?;

    let staff_id = StaffId::from_uuid(request.staff_id);
    let group_id = GroupId::from_uuid(request.group_id);

    state
        .staff_repo
        .validate_exists(staff_id)
        .await
        .map_err(error_response)?;
    state
        .group_repo
        .validate_exists(group_id)
        .await
        .map_err(error_response)?;

    let edge = state
        .memberships
        .upsert(staff_id, group_id, ctx.staff_id)
        .await
        .map_err(error_response)?;

    info!(%staff_id, %group_id, "staff assigned to group");
    Ok(created(edge))
}

pub async fn get_list(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Query(params): Query<ListParams>,
) -> ApiResult<ListResponse<GroupMembership>> {
    ensure_access(&state, &ctx, GUARD_RESOURCE, "read").await?;

    let result = state
        .memberships
        .get_list(&params)
        .await
        .map_err(error_response)?;
    Ok(success(result.into()))
}

pub async fn get_list_by_staff(
    State(state): State<AppState>,
    Path(staff_id): Path<Uuid>,
) -> ApiResult<Vec<GroupMembership>> {
    let edges = state
        .memberships
        .list_by_staff(StaffId::from_uuid(staff_id))
        .await
        .map_err(error_response)?;
    Ok(success(edges))
}

pub async fn delete(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<GroupMembership> {
    ensure_access(&state, &ctx, GUARD_RESOURCE, "edit").await?;

    let id = GroupMembershipId::from_uuid(id);
    state
        .memberships
        .validate_exists(id)
        .await
        .map_err(error_response)?;
    let edge = state.memberships.delete(id).await.map_err(error_response)?;

    info!(edge_id = %edge.id, revoked_by = %ctx.staff_id, "staff removed from group");
    Ok(success(edge))
}

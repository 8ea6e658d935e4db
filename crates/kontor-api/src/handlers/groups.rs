//! Group handlers
//!
//! Group creation may attach initial members and permissions in one call;
//! each list is validated all-or-nothing before anything is written.

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use kontor_core::{
    GrantDetail, Group, GroupId, GroupMembership, GroupRepository, ListParams, LookupEntryUpdate,
    MembershipRegistry, NewLookupEntry, PermissionId, StaffId, StaffRepository, SubjectRef,
};

use crate::dto::{created, error_response, success, ApiResult, ListResponse};
use crate::middleware::{ensure_access, AuthContext};
use crate::state::AppState;
use crate::validation::Validator;

const RESOURCE: &str = "group";

#[derive(Debug, Deserialize)]
pub struct CreateGroupRequest {
    pub name: String,
    pub description: Option<String>,
    /// Initial members
    pub staff_ids: Option<Vec<Uuid>>,
    /// Initial allow-all permission grants
    pub permission_ids: Option<Vec<Uuid>>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateGroupRequest {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct GroupResponse {
    #[serde(flatten)]
    pub group: Group,
    pub members: Vec<GroupMembership>,
    pub permissions: Vec<GrantDetail>,
}

pub async fn create_group(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Json(request): Json<CreateGroupRequest>,
) -> ApiResult<GroupResponse> {
    ensure_access(&state, &ctx, RESOURCE, "create").await?;

    let mut v = Validator::new();
    v.name("name", &request.name)
        .description("description", request.description.as_deref());
    v.validate().map_err(error_response)?;

    let staff_ids: Vec<StaffId> = request
        .staff_ids
        .unwrap_or_default()
        .into_iter()
        .map(StaffId::from_uuid)
        .collect();
    let permission_ids: Vec<PermissionId> = request
        .permission_ids
        .unwrap_or_default()
        .into_iter()
        .map(PermissionId::from_uuid)
        .collect();

    if !staff_ids.is_empty() {
        state
            .staff_repo
            .validate_all_exist(&staff_ids)
            .await
            .map_err(error_response)?;
    }

    let group = state
        .group_repo
        .create(NewLookupEntry {
            name: request.name,
            description: request.description,
            created_by_id: Some(ctx.staff_id),
        })
        .await
        .map_err(error_response)?;

    let mut members = Vec::with_capacity(staff_ids.len());
    for staff_id in staff_ids {
        let edge = state
            .memberships
            .upsert(staff_id, group.id, ctx.staff_id)
            .await
            .map_err(error_response)?;
        members.push(edge);
    }

    let permissions = if permission_ids.is_empty() {
        vec![]
    } else {
        state
            .assignment
            .assign_many(SubjectRef::group(group.id), &permission_ids, ctx.staff_id)
            .await
            .map_err(error_response)?
    };

    info!(group_id = %group.id, members = members.len(), "group created");
    Ok(created(GroupResponse {
        group,
        members,
        permissions,
    }))
}

pub async fn get_group(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<GroupResponse> {
    ensure_access(&state, &ctx, RESOURCE, "read").await?;

    let id = GroupId::from_uuid(id);
    let group = state
        .group_repo
        .validate_exists(id)
        .await
        .map_err(error_response)?;
    let members = state
        .memberships
        .list_by_group(id)
        .await
        .map_err(error_response)?;
    let permissions = state
        .assignment
        .list_by_group(id)
        .await
        .map_err(error_response)?;

    Ok(success(GroupResponse {
        group,
        members,
        permissions,
    }))
}

pub async fn list_groups(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Query(params): Query<ListParams>,
) -> ApiResult<ListResponse<Group>> {
    ensure_access(&state, &ctx, RESOURCE, "read").await?;

    let result = state
        .group_repo
        .get_list(&params, ctx.staff_id)
        .await
        .map_err(error_response)?;
    Ok(success(result.into()))
}

pub async fn update_group(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateGroupRequest>,
) -> ApiResult<Group> {
    ensure_access(&state, &ctx, RESOURCE, "edit").await?;

    let mut v = Validator::new();
    v.name("name", &request.name)
        .description("description", request.description.as_deref());
    v.validate().map_err(error_response)?;

    let group = state
        .group_repo
        .update(
            GroupId::from_uuid(id),
            LookupEntryUpdate {
                name: request.name,
                description: request.description,
                updated_by_id: ctx.staff_id,
            },
        )
        .await
        .map_err(error_response)?;
    Ok(success(group))
}

pub async fn delete_group(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Group> {
    ensure_access(&state, &ctx, RESOURCE, "delete").await?;

    let group = state
        .group_repo
        .soft_delete(GroupId::from_uuid(id), ctx.staff_id)
        .await
        .map_err(error_response)?;

    info!(group_id = %group.id, deleted_by = %ctx.staff_id, "group deleted");
    Ok(success(group))
}

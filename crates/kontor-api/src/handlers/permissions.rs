//! Permission catalog handlers (read-only)

use axum::extract::{Extension, Path, Query, State};
use uuid::Uuid;

use kontor_core::{ListParams, PermissionCatalog, PermissionDetail, PermissionId};

use crate::dto::{error_response, success, ApiResult, ListResponse};
use crate::middleware::{ensure_access, AuthContext};
use crate::state::AppState;

const RESOURCE: &str = "permission";

pub async fn get_permission(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<PermissionDetail> {
    ensure_access(&state, &ctx, RESOURCE, "read").await?;

    let permission = state
        .catalog
        .validate_exists(PermissionId::from_uuid(id))
        .await
        .map_err(error_response)?;
    Ok(success(permission))
}

pub async fn list_permissions(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Query(params): Query<ListParams>,
) -> ApiResult<ListResponse<PermissionDetail>> {
    ensure_access(&state, &ctx, RESOURCE, "read").await?;

    let result = state
        .catalog
        .get_list(&params)
        .await
        .map_err(error_response)?;
    Ok(success(result.into()))
}

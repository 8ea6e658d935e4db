//! Staff position lookup handlers

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use kontor_core::{
    ListParams, LookupEntryUpdate, NewLookupEntry, StaffPosition, StaffPositionId,
    StaffPositionRepository,
};

use crate::dto::{created, error_response, success, ApiResult, ListResponse};
use crate::middleware::{ensure_access, AuthContext};
use crate::state::AppState;
use crate::validation::Validator;

const RESOURCE: &str = "staff-position";

#[derive(Debug, Deserialize)]
pub struct LookupEntryRequest {
    pub name: String,
    pub description: Option<String>,
}

fn validate_entry(request: &LookupEntryRequest) -> Result<(), crate::dto::ErrorResponse> {
    let mut v = Validator::new();
    v.name("name", &request.name)
        .description("description", request.description.as_deref());
    v.validate().map_err(error_response)
}

pub async fn create_position(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Json(request): Json<LookupEntryRequest>,
) -> ApiResult<StaffPosition> {
    ensure_access(&state, &ctx, RESOURCE, "create").await?;
    validate_entry(&request)?;

    let position = state
        .position_repo
        .create(NewLookupEntry {
            name: request.name,
            description: request.description,
            created_by_id: Some(ctx.staff_id),
        })
        .await
        .map_err(error_response)?;
    Ok(created(position))
}

pub async fn get_position(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<StaffPosition> {
    ensure_access(&state, &ctx, RESOURCE, "read").await?;

    let position = state
        .position_repo
        .validate_exists(StaffPositionId::from_uuid(id))
        .await
        .map_err(error_response)?;
    Ok(success(position))
}

pub async fn list_positions(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Query(params): Query<ListParams>,
) -> ApiResult<ListResponse<StaffPosition>> {
    ensure_access(&state, &ctx, RESOURCE, "read").await?;

    let result = state
        .position_repo
        .get_list(&params, ctx.staff_id)
        .await
        .map_err(error_response)?;
    Ok(success(result.into()))
}

pub async fn update_position(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(request): Json<LookupEntryRequest>,
) -> ApiResult<StaffPosition> {
    ensure_access(&state, &ctx, RESOURCE, "edit").await?;
    validate_entry(&request)?;

    let position = state
        .position_repo
        .update(
            StaffPositionId::from_uuid(id),
            LookupEntryUpdate {
                name: request.name,
                description: request.description,
                updated_by_id: ctx.staff_id,
            },
        )
        .await
        .map_err(error_response)?;
    Ok(success(position))
}

pub async fn delete_position(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<StaffPosition> {
    ensure_access(&state, &ctx, RESOURCE, "delete").await?;

    let position = state
        .position_repo
        .soft_delete(StaffPositionId::from_uuid(id), ctx.staff_id)
        .await
        .map_err(error_response)?;
    Ok(success(position))
}

//! Ads language taxonomy handlers
//!
//! The taxonomy side of the platform reuses the same permission model and
//! list scoping as the identity side; this module is the template the other
//! taxonomy lookups follow.

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use kontor_core::{
    AdsLanguage, AdsLanguageId, AdsLanguageRepository, ListParams, LookupEntryUpdate,
    NewLookupEntry,
};

use crate::dto::{created, error_response, success, ApiResult, ListResponse};
use crate::middleware::{ensure_access, AuthContext};
use crate::state::AppState;
use crate::validation::Validator;

const RESOURCE: &str = "ads-language";

#[derive(Debug, Deserialize)]
pub struct LanguageRequest {
    pub name: String,
    pub description: Option<String>,
}

pub async fn create_language(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Json(request): Json<LanguageRequest>,
) -> ApiResult<AdsLanguage> {
    ensure_access(&state, &ctx, RESOURCE, "create").await?;

    let mut v = Validator::new();
    v.name("name", &request.name)
        .description("description", request.description.as_deref());
    v.validate().map_err(error_response)?;

    let language = state
        .language_repo
        .create(NewLookupEntry {
            name: request.name,
            description: request.description,
            created_by_id: Some(ctx.staff_id),
        })
        .await
        .map_err(error_response)?;
    Ok(created(language))
}

pub async fn get_language(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<AdsLanguage> {
    ensure_access(&state, &ctx, RESOURCE, "read").await?;

    let language = state
        .language_repo
        .validate_exists(AdsLanguageId::from_uuid(id))
        .await
        .map_err(error_response)?;
    Ok(success(language))
}

pub async fn list_languages(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Query(params): Query<ListParams>,
) -> ApiResult<ListResponse<AdsLanguage>> {
    ensure_access(&state, &ctx, RESOURCE, "read").await?;

    let result = state
        .language_repo
        .get_list(&params, ctx.staff_id)
        .await
        .map_err(error_response)?;
    Ok(success(result.into()))
}

pub async fn update_language(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(request): Json<LanguageRequest>,
) -> ApiResult<AdsLanguage> {
    ensure_access(&state, &ctx, RESOURCE, "edit").await?;

    let mut v = Validator::new();
    v.name("name", &request.name)
        .description("description", request.description.as_deref());
    v.validate().map_err(error_response)?;

    let language = state
        .language_repo
        .update(
            AdsLanguageId::from_uuid(id),
            LookupEntryUpdate {
                name: request.name,
                description: request.description,
                updated_by_id: ctx.staff_id,
            },
        )
        .await
        .map_err(error_response)?;
    Ok(success(language))
}

pub async fn delete_language(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<AdsLanguage> {
    ensure_access(&state, &ctx, RESOURCE, "delete").await?;

    let language = state
        .language_repo
        .soft_delete(AdsLanguageId::from_uuid(id), ctx.staff_id)
        .await
        .map_err(error_response)?;
    Ok(success(language))
}

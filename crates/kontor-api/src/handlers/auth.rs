//! Login flow: credentials -> token pair

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use tracing::info;

use kontor_core::{KontorError, Staff, StaffRepository};

use crate::dto::{error_response, success, ApiResult};
use crate::password::verify_password_async;
use crate::state::AppState;
use crate::token::TokenPair;
use crate::validation::Validator;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    #[serde(flatten)]
    pub tokens: TokenPair,
    pub staff: Staff,
}

pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> ApiResult<LoginResponse> {
    let mut v = Validator::new();
    v.email("email", &request.email)
        .required("password", &request.password);
    v.validate().map_err(error_response)?;

    let staff = state
        .staff_repo
        .find_by_email(&request.email)
        .await
        .map_err(error_response)?
        .ok_or_else(|| {
            error_response(KontorError::unauthenticated("invalid email or password"))
        })?;

    let verified = verify_password_async(request.password, staff.password_hash.clone()).await;
    if !verified {
        return Err(error_response(KontorError::unauthenticated(
            "invalid email or password",
        )));
    }

    let tokens = state
        .token_service
        .issue_pair(&staff)
        .map_err(error_response)?;

    info!(staff_id = %staff.id, "staff logged in");
    Ok(success(LoginResponse { tokens, staff }))
}

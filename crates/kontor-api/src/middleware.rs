//! Authentication middleware and the per-route permission guard
//!
//! Every protected route runs `auth_middleware`: bearer token -> verified
//! claims -> live staff record -> `AuthContext` request extension. Handlers
//! that guard a (resource, action) pair call `ensure_access`, which short
//! circuits for root staff and otherwise asks the access resolver.

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::debug;

use kontor_core::{KontorError, StaffId, StaffRepository};

use crate::dto::{error_response, ErrorResponse};
use crate::state::AppState;

/// Authenticated caller context
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub staff_id: StaffId,
    pub email: String,
    pub is_root: bool,
}

fn bearer_token(request: &Request) -> Option<&str> {
    request
        .headers()
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

/// Resolve the caller identity from the bearer token and stash it as a
/// request extension. Rejects with 401 when the token is absent, invalid,
/// or references a missing/deleted staff record.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(token) = bearer_token(&request) else {
        return error_response(KontorError::unauthenticated("missing bearer token"))
            .into_response();
    };

    let claims = match state.token_service.verify_access_token(token) {
        Ok(claims) => claims,
        Err(err) => return error_response(err).into_response(),
    };

    let staff_id: StaffId = match claims.sub.parse() {
        Ok(id) => id,
        Err(_) => {
            return error_response(KontorError::unauthenticated("malformed token subject"))
                .into_response()
        }
    };

    let staff = match state.staff_repo.validate_exists(staff_id).await {
        Ok(staff) => staff,
        Err(KontorError::NotFound { .. }) => {
            return error_response(KontorError::unauthenticated("staff no longer exists"))
                .into_response()
        }
        Err(err) => return error_response(err).into_response(),
    };

    debug!(%staff_id, is_root = staff.is_root, "caller authenticated");
    request.extensions_mut().insert(AuthContext {
        staff_id: staff.id,
        email: staff.email.clone(),
        is_root: staff.is_root,
    });

    next.run(request).await
}

/// Gate a guarded operation on the caller's (resource, action) access.
pub async fn ensure_access(
    state: &AppState,
    ctx: &AuthContext,
    resource: &str,
    action: &str,
) -> Result<(), ErrorResponse> {
    if ctx.is_root {
        return Ok(());
    }

    let allowed = state
        .resolver
        .can_access(ctx.staff_id, resource, action)
        .await
        .map_err(error_response)?;

    if allowed {
        Ok(())
    } else {
        Err(error_response(KontorError::permission_denied(
            resource, action,
        )))
    }
}

//! Response envelope and error mapping for the gateway

use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use kontor_core::{KontorError, ListResult};

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
    /// Field-keyed validation messages, surfaced verbatim for form mapping
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Paged payload mirroring the list-operation contract.
#[derive(Debug, Serialize)]
pub struct ListResponse<T> {
    pub data: Vec<T>,
    pub total_count: i64,
}

impl<T> From<ListResult<T>> for ListResponse<T> {
    fn from(result: ListResult<T>) -> Self {
        Self {
            data: result.data,
            total_count: result.total_count,
        }
    }
}

pub type ErrorResponse = (StatusCode, Json<ApiResponse<()>>);
pub type ApiResult<T> = Result<(StatusCode, Json<ApiResponse<T>>), ErrorResponse>;

pub fn success<T: Serialize>(data: T) -> (StatusCode, Json<ApiResponse<T>>) {
    (
        StatusCode::OK,
        Json(ApiResponse {
            success: true,
            data: Some(data),
            error: None,
        }),
    )
}

pub fn created<T: Serialize>(data: T) -> (StatusCode, Json<ApiResponse<T>>) {
    (
        StatusCode::CREATED,
        Json(ApiResponse {
            success: true,
            data: Some(data),
            error: None,
        }),
    )
}

fn envelope(status: StatusCode, code: &str, message: String, details: Option<serde_json::Value>) -> ErrorResponse {
    (
        status,
        Json(ApiResponse {
            success: false,
            data: None,
            error: Some(ApiError {
                code: code.to_string(),
                message,
                details,
            }),
        }),
    )
}

/// Map a platform error onto the user-visible status taxonomy.
pub fn error_response(err: KontorError) -> ErrorResponse {
    match err {
        KontorError::NotFound { ref entity } => envelope(
            StatusCode::NOT_FOUND,
            "not_found",
            format!("{} not found", entity),
            None,
        ),
        KontorError::InvalidArgument { fields } => {
            let details = serde_json::to_value(&fields).ok();
            envelope(
                StatusCode::BAD_REQUEST,
                "invalid_argument",
                "invalid argument".to_string(),
                details,
            )
        }
        KontorError::Unauthenticated { message } => {
            envelope(StatusCode::UNAUTHORIZED, "unauthenticated", message, None)
        }
        KontorError::PermissionDenied { resource, action } => envelope(
            StatusCode::FORBIDDEN,
            "permission_denied",
            format!("not allowed to {} {}", action, resource),
            None,
        ),
        KontorError::Database { message }
        | KontorError::Config { message }
        | KontorError::Internal { message } => {
            tracing::error!(%message, "internal error");
            envelope(
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "internal error".to_string(),
                None,
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_maps_to_404() {
        let (status, body) = error_response(KontorError::not_found("staff"));
        assert_eq!(status, StatusCode::NOT_FOUND);
        let error = body.0.error.unwrap();
        assert_eq!(error.code, "not_found");
        assert_eq!(error.message, "staff not found");
    }

    #[test]
    fn test_invalid_argument_carries_field_details() {
        let err = KontorError::invalid_field("email", "email must be unique");
        let (status, body) = error_response(err);
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let details = body.0.error.unwrap().details.unwrap();
        assert_eq!(details["email"][0], "email must be unique");
    }

    #[test]
    fn test_permission_denied_maps_to_403() {
        let (status, _) = error_response(KontorError::permission_denied("staff", "edit"));
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_internal_detail_is_not_leaked() {
        let (status, body) =
            error_response(KontorError::database_error("connection refused on 10.0.0.3"));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        let error = body.0.error.unwrap();
        assert!(!error.message.contains("10.0.0.3"));
    }
}

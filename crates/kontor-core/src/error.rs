//! Error types for the Kontor platform

use std::collections::BTreeMap;
use thiserror::Error;

/// Field-keyed validation messages, surfaced verbatim to clients so forms
/// can attribute errors to specific inputs.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

#[derive(Error, Debug)]
pub enum KontorError {
    #[error("{entity} not found")]
    NotFound { entity: String },

    #[error("invalid argument: {fields:?}")]
    InvalidArgument { fields: FieldErrors },

    #[error("unauthenticated: {message}")]
    Unauthenticated { message: String },

    #[error("permission denied: {action} on {resource}")]
    PermissionDenied { resource: String, action: String },

    #[error("database error: {message}")]
    Database { message: String },

    #[error("configuration error: {message}")]
    Config { message: String },

    #[error("internal error: {message}")]
    Internal { message: String },
}

impl KontorError {
    pub fn not_found(entity: impl Into<String>) -> Self {
        Self::NotFound {
            entity: entity.into(),
        }
    }

    /// A single field-keyed validation failure.
    pub fn invalid_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut fields = FieldErrors::new();
        fields.insert(field.into(), vec![message.into()]);
        Self::InvalidArgument { fields }
    }

    pub fn invalid_fields(fields: FieldErrors) -> Self {
        Self::InvalidArgument { fields }
    }

    pub fn unauthenticated(message: impl Into<String>) -> Self {
        Self::Unauthenticated {
            message: message.into(),
        }
    }

    pub fn permission_denied(resource: impl Into<String>, action: impl Into<String>) -> Self {
        Self::PermissionDenied {
            resource: resource.into(),
            action: action.into(),
        }
    }

    pub fn database_error(message: impl Into<String>) -> Self {
        Self::Database {
            message: message.into(),
        }
    }

    pub fn config_error(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, KontorError>;

use crate::db::errors::DbError;
use crate::types::Operation;
use axum::{
    Json,
    extract::{
        Request,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;
use utoipa::ToSchema;

/// Message returned in place of internal error details
pub const INTERNAL_ERROR_MESSAGE: &str = "An unexpected error occurred";

#[derive(ThisError, Debug)]
pub enum Error {
    /// Request body or parameters failed validation, one entry per failing field
    #[error("Validation failed")]
    Validation { details: Vec<FieldError> },

    /// Authentication required but not provided, or the token was rejected
    #[error("Not authenticated")]
    Unauthenticated { message: Option<String> },

    /// Caller is authenticated but not entitled to the resource
    #[error("Insufficient permissions to {action} {resource}")]
    InsufficientPermissions { action: Operation, resource: String },

    /// Invalid request data or business rule violation
    #[error("{message}")]
    BadRequest { message: String },

    /// Requested resource not found
    #[error("{resource} with ID {id} not found")]
    NotFound { resource: String, id: String },

    /// Uniqueness violation detected by a service check
    #[error("Conflict: {message}")]
    Conflict { message: String },

    /// Rate limit window exhausted
    #[error("{message}")]
    TooManyRequests { message: String },

    /// Generic internal service error
    #[error("Failed to {operation}")]
    Internal { operation: String },

    /// Storage operation error
    #[error(transparent)]
    Database(#[from] DbError),

    /// Unexpected error with full context chain
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// A single failing field in a validation error
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// `error` member of the failure envelope
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<FieldError>>,
}

/// Failure envelope: `{success: false, error: {code, message, details?}}`
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorEnvelope {
    pub success: bool,
    pub error: ErrorBody,
}

impl ErrorEnvelope {
    pub fn new(code: &str, message: impl Into<String>, details: Option<Vec<FieldError>>) -> Self {
        Self {
            success: false,
            error: ErrorBody {
                code: code.to_string(),
                message: message.into(),
                details,
            },
        }
    }
}

/// Raw text of an internal error, attached to 500 responses so that non-production deployments
/// can surface it (see [`expose_error_details`]).
#[derive(Debug, Clone)]
pub struct InternalErrorDetail(pub String);

impl Error {
    pub fn not_found(resource: &str, id: impl ToString) -> Self {
        Error::NotFound {
            resource: resource.to_string(),
            id: id.to_string(),
        }
    }

    pub fn validation(field: &str, message: &str) -> Self {
        Error::Validation {
            details: vec![FieldError::new(field, message)],
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Validation { .. } | Error::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Error::Unauthenticated { .. } => StatusCode::UNAUTHORIZED,
            Error::InsufficientPermissions { .. } => StatusCode::FORBIDDEN,
            Error::NotFound { .. } => StatusCode::NOT_FOUND,
            Error::Conflict { .. } => StatusCode::CONFLICT,
            Error::TooManyRequests { .. } => StatusCode::TOO_MANY_REQUESTS,
            Error::Internal { .. } | Error::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::Database(db_err) => match db_err {
                DbError::NotFound => StatusCode::NOT_FOUND,
                DbError::UniqueViolation { .. } => StatusCode::CONFLICT,
                DbError::ForeignKeyViolation { .. } | DbError::CheckViolation { .. } => StatusCode::BAD_REQUEST,
                DbError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    /// Stable machine-readable code for the envelope
    pub fn code(&self) -> &'static str {
        match self.status_code() {
            StatusCode::BAD_REQUEST => "VALIDATION_ERROR",
            StatusCode::UNAUTHORIZED => "UNAUTHORIZED",
            StatusCode::FORBIDDEN => "FORBIDDEN",
            StatusCode::NOT_FOUND => "NOT_FOUND",
            StatusCode::CONFLICT => "CONFLICT",
            StatusCode::TOO_MANY_REQUESTS => "RATE_LIMIT_EXCEEDED",
            _ => "INTERNAL_ERROR",
        }
    }

    /// Returns a user-safe error message, without leaking internal implementation details
    pub fn user_message(&self) -> String {
        match self {
            Error::Validation { .. } => "Validation failed".to_string(),
            Error::Unauthenticated { message } => message.clone().unwrap_or_else(|| "Authentication required".to_string()),
            Error::InsufficientPermissions { action, resource } => {
                format!("Insufficient permissions to {action} {resource}")
            }
            Error::BadRequest { message } => message.clone(),
            Error::NotFound { resource, .. } => format!("{resource} not found"),
            Error::Conflict { message } => message.clone(),
            Error::TooManyRequests { message } => message.clone(),
            Error::Internal { .. } | Error::Other(_) => INTERNAL_ERROR_MESSAGE.to_string(),
            Error::Database(db_err) => match db_err {
                DbError::NotFound => "Resource not found".to_string(),
                DbError::UniqueViolation { table, .. } => match table.as_deref() {
                    Some("users") => "Email already registered".to_string(),
                    Some("restaurants") => "Restaurant with this slug already exists".to_string(),
                    Some("categories") => "Category with this name already exists in this restaurant".to_string(),
                    _ => "Resource already exists".to_string(),
                },
                DbError::ForeignKeyViolation { .. } => "Invalid reference to related resource".to_string(),
                DbError::CheckViolation { .. } => "Invalid data provided".to_string(),
                DbError::Other(_) => INTERNAL_ERROR_MESSAGE.to_string(),
            },
        }
    }

    fn details(&self) -> Option<Vec<FieldError>> {
        match self {
            Error::Validation { details } => Some(details.clone()),
            _ => None,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match &self {
            Error::Database(DbError::Other(_)) | Error::Internal { .. } | Error::Other(_) => {
                tracing::error!("Internal service error: {:#}", self);
            }
            Error::Database(_) => {
                tracing::warn!("Database constraint error: {}", self);
            }
            Error::Unauthenticated { .. } | Error::InsufficientPermissions { .. } => {
                tracing::info!("Authorization error: {}", self);
            }
            Error::Validation { .. } | Error::BadRequest { .. } | Error::NotFound { .. } => {
                tracing::debug!("Client error: {}", self);
            }
            Error::Conflict { .. } | Error::TooManyRequests { .. } => {
                tracing::warn!("Request rejected: {}", self);
            }
        }

        let status = self.status_code();
        let body = ErrorEnvelope::new(self.code(), self.user_message(), self.details());
        let mut response = (status, Json(body)).into_response();

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            response.extensions_mut().insert(InternalErrorDetail(format!("{self:#}")));
        }

        response
    }
}

/// Replace the generic 500 message with the raw error text.
///
/// Only installed outside production.
pub async fn expose_error_details(request: Request, next: Next) -> Response {
    let response = next.run(request).await;

    match response.extensions().get::<InternalErrorDetail>() {
        Some(InternalErrorDetail(detail)) => {
            let body = ErrorEnvelope::new("INTERNAL_ERROR", detail.clone(), None);
            (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
        }
        None => response,
    }
}

impl From<validator::ValidationErrors> for Error {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut details: Vec<FieldError> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| {
                    let message = e.message.as_ref().map(|m| m.to_string()).unwrap_or_else(|| e.code.to_string());
                    FieldError::new(field.to_string(), message)
                })
            })
            .collect();
        details.sort_by(|a, b| a.field.cmp(&b.field));
        Error::Validation { details }
    }
}

impl From<JsonRejection> for Error {
    fn from(rejection: JsonRejection) -> Self {
        Error::validation("body", &rejection.body_text())
    }
}

impl From<PathRejection> for Error {
    fn from(rejection: PathRejection) -> Self {
        Error::validation("path", &rejection.body_text())
    }
}

impl From<QueryRejection> for Error {
    fn from(rejection: QueryRejection) -> Self {
        Error::validation("query", &rejection.body_text())
    }
}

/// Convert from String errors (e.g., from external functions)
impl From<String> for Error {
    fn from(msg: String) -> Self {
        Error::Internal { operation: msg }
    }
}

/// Type alias for service operation results
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Router, middleware::from_fn, routing::get};
    use axum_test::TestServer;

    #[test]
    fn test_status_codes_and_codes() {
        let cases: Vec<(Error, StatusCode, &str)> = vec![
            (Error::validation("name", "required"), StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            (Error::Unauthenticated { message: None }, StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            (
                Error::InsufficientPermissions {
                    action: Operation::Update,
                    resource: "restaurant".to_string(),
                },
                StatusCode::FORBIDDEN,
                "FORBIDDEN",
            ),
            (Error::not_found("Restaurant", "abc"), StatusCode::NOT_FOUND, "NOT_FOUND"),
            (
                Error::Conflict {
                    message: "taken".to_string(),
                },
                StatusCode::CONFLICT,
                "CONFLICT",
            ),
            (
                Error::TooManyRequests {
                    message: "slow down".to_string(),
                },
                StatusCode::TOO_MANY_REQUESTS,
                "RATE_LIMIT_EXCEEDED",
            ),
            (
                Error::Internal {
                    operation: "explode".to_string(),
                },
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
            ),
            (Error::Database(DbError::unique("restaurants", "restaurants_slug_key", "x")), StatusCode::CONFLICT, "CONFLICT"),
        ];

        for (error, status, code) in cases {
            assert_eq!(error.status_code(), status, "{error:?}");
            assert_eq!(error.code(), code, "{error:?}");
        }
    }

    #[test]
    fn test_internal_message_is_generic() {
        let error = Error::Internal {
            operation: "connect to postgres at secret-host".to_string(),
        };
        assert_eq!(error.user_message(), INTERNAL_ERROR_MESSAGE);
    }

    #[test]
    fn test_unique_violation_messages() {
        let error = Error::Database(DbError::unique("restaurants", "restaurants_slug_key", "joes"));
        assert_eq!(error.user_message(), "Restaurant with this slug already exists");
    }

    async fn boom() -> Result<&'static str> {
        Err(Error::Internal {
            operation: "read secret-table".to_string(),
        })
    }

    async fn invalid() -> Result<&'static str> {
        Err(Error::Validation {
            details: vec![FieldError::new("name", "Name is required"), FieldError::new("slug", "Invalid slug")],
        })
    }

    #[tokio::test]
    async fn test_envelope_shape_and_details() {
        let app: Router = Router::new().route("/invalid", get(invalid));
        let server = TestServer::new(app).unwrap();

        let response = server.get("/invalid").await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: ErrorEnvelope = response.json();
        assert!(!body.success);
        assert_eq!(body.error.code, "VALIDATION_ERROR");
        assert_eq!(body.error.message, "Validation failed");
        assert_eq!(body.error.details.map(|d| d.len()), Some(2));
    }

    #[tokio::test]
    async fn test_internal_details_hidden_without_middleware() {
        let app: Router = Router::new().route("/boom", get(boom));
        let server = TestServer::new(app).unwrap();

        let response = server.get("/boom").await;
        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        let body: ErrorEnvelope = response.json();
        assert_eq!(body.error.message, INTERNAL_ERROR_MESSAGE);
        assert!(body.error.details.is_none());
    }

    #[tokio::test]
    async fn test_internal_details_exposed_with_middleware() {
        let app: Router = Router::new().route("/boom", get(boom)).layer(from_fn(expose_error_details));
        let server = TestServer::new(app).unwrap();

        let response = server.get("/boom").await;
        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        let body: ErrorEnvelope = response.json();
        assert_eq!(body.error.code, "INTERNAL_ERROR");
        assert!(body.error.message.contains("secret-table"));
    }

    #[test]
    fn test_from_validation_errors_lists_every_field() {
        use validator::Validate;

        #[derive(Validate)]
        struct Input {
            #[validate(length(min = 1, message = "Name is required"))]
            name: String,
            #[validate(email(message = "Invalid email address"))]
            email: String,
        }

        let input = Input {
            name: String::new(),
            email: "not-an-email".to_string(),
        };
        let error: Error = input.validate().unwrap_err().into();
        match error {
            Error::Validation { details } => {
                assert_eq!(
                    details,
                    vec![
                        FieldError::new("email", "Invalid email address"),
                        FieldError::new("name", "Name is required"),
                    ]
                );
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }
}

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use sqlx::Error as SqlxError;

use crate::app::tenant::TenantDbError;

/// Application error type for unified error handling across the app.
#[derive(Debug)]
pub enum AppError {
    /// Invalid input data (400 Bad Request)
    Validation(String),

    /// Invalid state transition or malformed request (400 Bad Request)
    BadRequest(String),

    /// No or invalid session, or the session's account row is gone (401)
    Unauthorized,

    /// Authenticated but insufficient role/membership (403)
    Forbidden(String),

    /// Entity absent or not visible under the current tenant scope (404)
    NotFound(String),

    /// Duplicate registration or uniqueness violation (409)
    Conflict(String),

    /// Business-rule violation, e.g. deleting a project with active
    /// sessions or exceeding usage limits (412)
    PreconditionFailed(String),

    /// Database errors (500)
    Database(SqlxError),

    /// Downstream failures (report API unreachable/misconfigured) and other
    /// internal errors (500)
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::PreconditionFailed(_) => StatusCode::PRECONDITION_FAILED,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            AppError::Validation(msg)
            | AppError::BadRequest(msg)
            | AppError::Forbidden(msg)
            | AppError::NotFound(msg)
            | AppError::Conflict(msg)
            | AppError::PreconditionFailed(msg) => msg,
            AppError::Unauthorized => "Authentication required".to_string(),
            AppError::Database(err) => {
                tracing::error!(%err, "database error");
                "Internal server error".to_string()
            }
            AppError::Internal(msg) => {
                tracing::error!(%msg, "internal error");
                "Internal server error".to_string()
            }
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

impl From<SqlxError> for AppError {
    fn from(err: SqlxError) -> Self {
        AppError::Database(err)
    }
}

impl From<TenantDbError> for AppError {
    fn from(err: TenantDbError) -> Self {
        match err {
            TenantDbError::Sqlx(e) => AppError::Database(e),
            TenantDbError::SequentialTransaction => AppError::BadRequest(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn taxonomy_maps_to_statuses() {
        assert_eq!(
            AppError::Unauthorized.status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::Forbidden("no".into()).status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AppError::NotFound("gone".into()).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::Conflict("dup".into()).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::PreconditionFailed("busy".into()).status(),
            StatusCode::PRECONDITION_FAILED
        );
        assert_eq!(
            AppError::BadRequest("bad".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Internal("boom".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn sequential_transaction_surfaces_as_bad_request() {
        let err: AppError = TenantDbError::SequentialTransaction.into();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }
}

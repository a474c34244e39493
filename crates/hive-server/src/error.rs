use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use hive_provisioning::Error;
use hive_provisioning::storage::DatabaseError;

/// Unified error type for HTTP responses.
///
/// Rendered as `{"error": message, "kind": snake_case_kind}`.
#[derive(Debug)]
pub struct AppError(pub anyhow::Error);

/// Request body or path that failed to parse.
#[derive(Debug)]
struct BadRequest(String);

impl std::fmt::Display for BadRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for BadRequest {}

impl AppError {
    /// Construct a 400 Bad Request error with the given message.
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self(BadRequest(msg.into()).into())
    }

    fn status_and_kind(&self) -> (StatusCode, &'static str) {
        if self.0.downcast_ref::<BadRequest>().is_some() {
            return (StatusCode::BAD_REQUEST, "invalid_request");
        }
        if let Some(e) = self.0.downcast_ref::<Error>() {
            let status = match e {
                Error::CourseNotFound(_) | Error::AssignmentNotFound(_) => StatusCode::NOT_FOUND,
                Error::InvalidRequest(_) => StatusCode::BAD_REQUEST,
                Error::ProvisioningFailed { .. } | Error::DeprovisioningFailed { .. } => {
                    StatusCode::BAD_GATEWAY
                }
                Error::CompensationFailed { .. } | Error::Repository { .. } => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            };
            return (status, e.kind());
        }
        if let Some(e) = self.0.downcast_ref::<DatabaseError>() {
            return match e {
                DatabaseError::Conflict(_) => (StatusCode::CONFLICT, "conflict"),
                DatabaseError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
                _ => (StatusCode::INTERNAL_SERVER_ERROR, "repository_error"),
            };
        }
        (StatusCode::INTERNAL_SERVER_ERROR, "internal")
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, kind) = self.status_and_kind();
        if status.is_server_error() {
            tracing::error!(error = %self.0, kind, "Request failed");
        }
        let body = serde_json::json!({ "error": self.0.to_string(), "kind": kind });
        (status, axum::Json(body)).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

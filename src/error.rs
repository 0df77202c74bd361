use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::workflow::WorkflowError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Workflow(#[from] WorkflowError),

    #[error("Authentication error: {0}")]
    Authentication(String),
}

impl AppError {
    /// Whether repeating the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::Workflow(err) if err.is_retryable())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Workflow(err) => match err {
                WorkflowError::InvalidInput(_) => StatusCode::BAD_REQUEST,
                WorkflowError::NotAuthorized(_) => StatusCode::FORBIDDEN,
                WorkflowError::AlreadyProcessed(_) => StatusCode::CONFLICT,
                WorkflowError::NoRecipientConfigured(_) => StatusCode::UNPROCESSABLE_ENTITY,
                WorkflowError::RoutingUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
                WorkflowError::NotFound(_) => StatusCode::NOT_FOUND,
                WorkflowError::StorageFailure(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            AppError::Authentication(_) => StatusCode::UNAUTHORIZED,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (code, message, details) = match &self {
            AppError::Workflow(err) => match err {
                // Storage causes stay in the logs.
                WorkflowError::StorageFailure(cause) => {
                    error!(error = %cause, "Request failed on storage");
                    (err.code(), err.user_message(), None)
                }
                _ => (err.code(), err.user_message(), Some(err.to_string())),
            },
            AppError::Authentication(_) => ("authentication_failed", "Authentication failed", Some(self.to_string())),
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message,
                "details": details,
                "retryable": self.is_retryable(),
            }
        }));

        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DatabaseError;
    use axum::body::to_bytes;

    #[test]
    fn workflow_errors_map_to_distinct_statuses() {
        let cases = [
            (WorkflowError::InvalidInput("x".into()), StatusCode::BAD_REQUEST),
            (WorkflowError::NotAuthorized("x".into()), StatusCode::FORBIDDEN),
            (WorkflowError::AlreadyProcessed("x".into()), StatusCode::CONFLICT),
            (WorkflowError::RoutingUnavailable("x".into()), StatusCode::SERVICE_UNAVAILABLE),
            (WorkflowError::NotFound("x".into()), StatusCode::NOT_FOUND),
        ];
        for (err, status) in cases {
            assert_eq!(AppError::from(err).status(), status);
        }
    }

    async fn body_of(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn storage_failure_hides_its_cause_and_invites_retry() {
        let (status, body) = body_of(AppError::from(WorkflowError::StorageFailure(
            DatabaseError::Backend("connection reset by peer".into()),
        )))
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"]["code"], "storage_failure");
        assert_eq!(body["error"]["retryable"], true);
        assert!(body["error"]["details"].is_null());
        assert!(!body.to_string().contains("connection reset"));
    }

    #[tokio::test]
    async fn rejected_actions_are_not_retryable() {
        let (status, body) =
            body_of(AppError::from(WorkflowError::AlreadyProcessed("entry settled".into()))).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"]["retryable"], false);
        assert_eq!(body["error"]["code"], "already_processed");
    }
}

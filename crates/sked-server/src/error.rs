use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use sked_engine::EngineError;
use sked_store::StoreError;

use crate::auth::AuthError;

/// Every failure a JSON route can surface, rendered as `{"error": "..."}`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("{0}")]
    BadRequest(String),

    #[error("method not allowed")]
    MethodNotAllowed,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Engine(EngineError::Store(StoreError::NotFound(_))) => StatusCode::NOT_FOUND,
            Self::Engine(EngineError::Store(StoreError::Unavailable)) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            Self::Engine(e) if e.is_client_error() => StatusCode::BAD_REQUEST,
            Self::Engine(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Auth(AuthError::InvalidCredentials | AuthError::Unauthorized) => {
                StatusCode::UNAUTHORIZED
            }
            Self::Auth(AuthError::TokenSign(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(format!("JSON decoding error: {}", rejection.body_text()))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, status = status.as_u16(), "request failed");
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "request rejected");
        }
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sked_core::RuleError;

    #[test]
    fn status_mapping() {
        let cases = [
            (ApiError::from(EngineError::MissingTitle), StatusCode::BAD_REQUEST),
            (ApiError::from(EngineError::MissingId), StatusCode::BAD_REQUEST),
            (
                ApiError::from(EngineError::from(RuleError::EmptyRule)),
                StatusCode::BAD_REQUEST,
            ),
            (
                ApiError::from(EngineError::from(StoreError::NotFound("task 1".into()))),
                StatusCode::NOT_FOUND,
            ),
            (
                ApiError::from(EngineError::from(StoreError::Unavailable)),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                ApiError::from(EngineError::from(StoreError::Database("disk I/O".into()))),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (ApiError::from(AuthError::InvalidCredentials), StatusCode::UNAUTHORIZED),
            (ApiError::from(AuthError::Unauthorized), StatusCode::UNAUTHORIZED),
            (ApiError::MethodNotAllowed, StatusCode::METHOD_NOT_ALLOWED),
        ];
        for (err, expected) in cases {
            assert_eq!(err.status(), expected, "{err}");
        }
    }

    #[tokio::test]
    async fn body_is_error_object() {
        let resp = ApiError::from(EngineError::MissingTitle).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body, serde_json::json!({"error": "task title not specified"}));
    }
}

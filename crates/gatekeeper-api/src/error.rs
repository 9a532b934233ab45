//! 통합 API 에러 응답 타입.
//!
//! 모든 엔드포인트와 미들웨어는 같은 형식으로 에러를 응답합니다.
//!
//! ```json
//! { "error": "Invalid credentials", "code": "INVALID_CREDENTIALS" }
//! ```

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::AuthError;

/// 클라이언트에 노출되는 내부 에러 메시지.
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

/// API 에러 응답 본문.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ApiErrorResponse {
    /// 사람이 읽을 수 있는 에러 메시지
    pub error: String,
    /// 에러 코드 (예: "VALIDATION_ERROR", "INVALID_TOKEN")
    pub code: String,
}

impl ApiErrorResponse {
    /// 에러 응답 생성.
    ///
    /// # Arguments
    ///
    /// * `code` - 에러 코드
    /// * `message` - 에러 메시지
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
            code: code.into(),
        }
    }

    /// 상태 코드와 함께 응답으로 변환.
    pub fn into_response_with(self, status: StatusCode) -> Response {
        (status, Json(self)).into_response()
    }
}

impl std::fmt::Display for ApiErrorResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.error)
    }
}

/// API 에러 분류.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// 요청 본문 검증 실패 (400)
    #[error("Validation failed: {0}")]
    Validation(String),

    /// 고유성 충돌 (409)
    #[error("{1}")]
    Conflict(&'static str, String),

    /// 인증 실패 (401)
    #[error("{1}")]
    Unauthenticated(&'static str, String),

    /// 리소스 없음 (404)
    #[error("{1}")]
    NotFound(&'static str, String),

    /// 내부 에러 (500). 상세 내용은 로그에만 남깁니다.
    #[error("내부 에러: {0}")]
    Internal(String),
}

impl ApiError {
    /// HTTP 상태 코드.
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(..) => StatusCode::CONFLICT,
            ApiError::Unauthenticated(..) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(..) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// 응답 본문으로 변환.
    pub fn to_body(&self) -> ApiErrorResponse {
        match self {
            ApiError::Validation(_) => ApiErrorResponse::new("VALIDATION_ERROR", self.to_string()),
            ApiError::Conflict(code, message)
            | ApiError::Unauthenticated(code, message)
            | ApiError::NotFound(code, message) => ApiErrorResponse::new(*code, message.clone()),
            ApiError::Internal(_) => ApiErrorResponse::new("INTERNAL_ERROR", INTERNAL_ERROR_MESSAGE),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Internal(detail) = &self {
            tracing::error!(error = %detail, "Request failed with internal error");
        }
        self.to_body().into_response_with(self.status())
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::EmailTaken => {
                ApiError::Conflict("EMAIL_TAKEN", "Email already registered".to_string())
            }
            AuthError::InvalidCredentials => ApiError::Unauthenticated(
                "INVALID_CREDENTIALS",
                "Invalid credentials".to_string(),
            ),
            AuthError::NotFound => ApiError::NotFound("USER_NOT_FOUND", "User not found".to_string()),
            AuthError::WeakPassword(reason) => ApiError::Validation(reason.to_string()),
            AuthError::Store(e) => ApiError::Internal(e.to_string()),
            AuthError::Internal(detail) => ApiError::Internal(detail),
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
        fields.sort_by(|a, b| a.0.cmp(&b.0));

        let message = fields
            .iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |e| {
                    e.message
                        .as_ref()
                        .map(|m| format!("{}: {}", field, m))
                        .unwrap_or_else(|| format!("{}: invalid value", field))
                })
            })
            .collect::<Vec<_>>()
            .join("; ");

        ApiError::Validation(message)
    }
}

impl From<axum::extract::rejection::JsonRejection> for ApiError {
    fn from(rejection: axum::extract::rejection::JsonRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

/// API 핸들러 Result 타입 별칭.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use gatekeeper_core::StoreError;

    async fn body_of(response: Response) -> ApiErrorResponse {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(ApiError::Validation("x".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::Conflict("C", "x".into()).status(), StatusCode::CONFLICT);
        assert_eq!(
            ApiError::Unauthenticated("U", "x".into()).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(ApiError::NotFound("N", "x".into()).status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::Internal("x".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_auth_error_literals() {
        let response = ApiError::from(AuthError::InvalidCredentials).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_of(response).await.error, "Invalid credentials");

        let response = ApiError::from(AuthError::EmailTaken).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert_eq!(body_of(response).await.error, "Email already registered");
    }

    #[tokio::test]
    async fn test_internal_error_hides_detail() {
        let err = ApiError::from(AuthError::Store(StoreError::Database(
            "connection refused to 10.0.0.5".to_string(),
        )));
        let response = err.into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_of(response).await;
        assert_eq!(body.error, INTERNAL_ERROR_MESSAGE);
        assert_eq!(body.code, "INTERNAL_ERROR");
    }

    #[test]
    fn test_validation_message_prefix() {
        let body = ApiError::Validation("email: invalid email".to_string()).to_body();
        assert_eq!(body.error, "Validation failed: email: invalid email");
        assert_eq!(body.code, "VALIDATION_ERROR");
    }

    #[test]
    fn test_json_shape() {
        let json = serde_json::to_string(&ApiErrorResponse::new("INVALID_TOKEN", "Invalid token"))
            .unwrap();
        assert_eq!(json, r#"{"error":"Invalid token","code":"INVALID_TOKEN"}"#);
    }
}

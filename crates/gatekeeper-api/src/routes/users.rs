//! 로그인 사용자 본인 endpoint.
//!
//! 인증 미들웨어 뒤에 마운트되며, 요청 범위의 [`AuthIdentity`]를 사용합니다.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use chrono::{DateTime, Utc};
use gatekeeper_core::{Role, User, UserWithRole};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::auth::AuthIdentity;
use crate::error::{ApiErrorResponse, ApiResult};
use crate::state::AppState;

// ================================================================================================
// DTOs
// ================================================================================================

/// 외부에 노출되는 사용자 정보. 비밀번호 해시는 포함하지 않습니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub id: i64,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            role_id: user.role_id,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// 역할과 권한을 포함한 사용자 정보.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserProfileResponse {
    #[serde(flatten)]
    pub user: UserResponse,
    pub role: Role,
}

impl From<UserWithRole> for UserProfileResponse {
    fn from(value: UserWithRole) -> Self {
        Self {
            user: value.user.into(),
            role: value.role,
        }
    }
}

/// 비밀번호 변경 요청.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1, message = "is required"))]
    pub current_password: String,

    #[validate(length(min = 6, message = "must be at least 6 characters"))]
    pub new_password: String,
}

// ================================================================================================
// Handlers
// ================================================================================================

/// 내 정보 조회.
#[utoipa::path(
    get,
    path = "/api/users/me",
    responses(
        (status = 200, description = "조회 성공", body = UserProfileResponse),
        (status = 401, description = "인증 실패", body = ApiErrorResponse),
        (status = 404, description = "사용자 없음", body = ApiErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "users"
)]
pub async fn me(
    State(state): State<Arc<AppState>>,
    identity: AuthIdentity,
) -> ApiResult<Json<UserProfileResponse>> {
    let user = state.auth.get_user_by_id(identity.user_id).await?;
    Ok(Json(user.into()))
}

/// 비밀번호 변경.
#[utoipa::path(
    put,
    path = "/api/users/me/password",
    request_body = ChangePasswordRequest,
    responses(
        (status = 204, description = "변경 완료"),
        (status = 400, description = "입력 검증 실패", body = ApiErrorResponse),
        (status = 401, description = "현재 비밀번호 불일치", body = ApiErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "users"
)]
pub async fn change_password(
    State(state): State<Arc<AppState>>,
    identity: AuthIdentity,
    payload: Result<Json<ChangePasswordRequest>, JsonRejection>,
) -> ApiResult<StatusCode> {
    let Json(request) = payload?;
    request.validate()?;

    state
        .auth
        .change_password(
            identity.user_id,
            &request.current_password,
            &request.new_password,
        )
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// 사용자 라우터 생성. 인증 미들웨어는 상위 라우터에서 적용합니다.
pub fn users_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/me", get(me))
        .route("/me/password", put(change_password))
}

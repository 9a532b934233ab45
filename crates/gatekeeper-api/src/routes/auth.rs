//! 회원가입 / 로그인 endpoint.
//!
//! # 엔드포인트
//!
//! - `POST /api/auth/register` - 회원가입 (201)
//! - `POST /api/auth/login` - 로그인, Bearer 토큰 발급

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::debug;
use utoipa::ToSchema;
use validator::Validate;

use crate::auth::Registration;
use crate::error::{ApiErrorResponse, ApiResult};
use crate::routes::users::UserResponse;
use crate::state::AppState;

// ================================================================================================
// DTOs
// ================================================================================================

/// 회원가입 요청.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct RegisterRequest {
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,

    #[validate(length(min = 6, message = "must be at least 6 characters"))]
    pub password: String,

    #[validate(length(min = 1, max = 100, message = "must be 1-100 characters"))]
    pub first_name: String,

    #[validate(length(min = 1, max = 100, message = "must be 1-100 characters"))]
    pub last_name: String,
}

/// 로그인 요청.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,

    #[validate(length(min = 1, message = "is required"))]
    pub password: String,
}

/// 로그인 응답.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    /// 서명된 세션 토큰
    pub token: String,
    /// 항상 "Bearer"
    pub token_type: String,
    /// 토큰 유효 기간 (초)
    pub expires_in: i64,
    pub user: UserResponse,
}

// ================================================================================================
// Handlers
// ================================================================================================

/// 회원가입.
#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "회원가입 성공", body = UserResponse),
        (status = 400, description = "입력 검증 실패", body = ApiErrorResponse),
        (status = 409, description = "이미 등록된 이메일", body = ApiErrorResponse)
    ),
    tag = "auth"
)]
pub async fn register(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<UserResponse>)> {
    let Json(request) = payload?;
    request.validate()?;

    debug!(email = %request.email, "POST /auth/register");

    let user = state
        .auth
        .register(Registration {
            email: request.email,
            password: request.password,
            first_name: request.first_name,
            last_name: request.last_name,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(user.into())))
}

/// 로그인.
///
/// 존재하지 않는 이메일과 틀린 비밀번호는 같은 응답을 받습니다.
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "로그인 성공", body = LoginResponse),
        (status = 400, description = "입력 검증 실패", body = ApiErrorResponse),
        (status = 401, description = "자격증명 불일치", body = ApiErrorResponse)
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<Json<LoginResponse>> {
    let Json(request) = payload?;
    request.validate()?;

    let outcome = state.auth.login(&request.email, &request.password).await?;

    Ok(Json(LoginResponse {
        token: outcome.token,
        token_type: "Bearer".to_string(),
        expires_in: outcome.expires_in,
        user: outcome.user.into(),
    }))
}

/// 인증 라우터 생성.
pub fn auth_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
}

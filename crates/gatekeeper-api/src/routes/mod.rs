//! API 라우트.
//!
//! 모든 REST API 엔드포인트를 정의하고 라우터를 구성합니다.
//!
//! # 라우트 구조
//!
//! - `/health` - 헬스 체크 (인증 없음)
//! - `/auth` - 회원가입, 로그인 (인증 없음)
//! - `/users` - 본인 정보 (Bearer 토큰)
//! - `/admin` - 사용자/역할/권한 관리 (Bearer 토큰 + `admin` 권한)
//!
//! 미들웨어는 바깥쪽부터 인증 → 권한 순서로 실행됩니다.

pub mod admin;
pub mod auth;
pub mod health;
pub mod users;

pub use admin::{
    admin_router, AssignRoleRequest, CreatePermissionRequest, CreateRoleRequest, UserListResponse,
};
pub use auth::{auth_router, LoginRequest, LoginResponse, RegisterRequest};
pub use health::{health_router, ComponentHealth, ComponentStatus, HealthResponse};
pub use users::{users_router, ChangePasswordRequest, UserProfileResponse, UserResponse};

use std::sync::Arc;

use axum::{middleware, Router};

use crate::auth::{auth_middleware, permission_middleware};
use crate::state::{AppState, ADMIN_PERMISSION};

/// 전체 API 라우터 생성.
///
/// 보호 라우트의 미들웨어는 `route_layer`로 붙이므로 매칭되지 않은 경로는
/// 인증 없이 404를 받습니다.
pub fn create_api_router(state: &AppState) -> Router<Arc<AppState>> {
    let authenticated = middleware::from_fn_with_state(state.codec.clone(), auth_middleware);

    let users = users_router().route_layer(authenticated.clone());

    // layer는 나중에 추가한 것이 바깥쪽에서 먼저 실행됩니다.
    let admin = admin_router()
        .route_layer(middleware::from_fn_with_state(
            state.permission_gate(ADMIN_PERMISSION),
            permission_middleware,
        ))
        .route_layer(authenticated);

    Router::new()
        .nest("/health", health_router())
        .nest("/auth", auth_router())
        .nest("/users", users)
        .nest("/admin", admin)
}

//! RBAC 인증/인가 REST API 서버.
//!
//! 이 크레이트는 다음을 제공합니다:
//! - Argon2id 비밀번호 해싱과 HMAC JWT 세션 토큰
//! - 회원가입, 로그인, 비밀번호 변경 서비스
//! - Bearer 토큰 인증 미들웨어와 권한 검사 미들웨어
//! - PostgreSQL / 인메모리 자격증명 저장소
//! - 헬스 체크, Prometheus 메트릭, OpenAPI 문서
//!
//! # 모듈 구성
//!
//! - [`auth`]: 비밀번호, 토큰, 인증 서비스, 미들웨어
//! - [`repository`]: 자격증명 저장소 구현체
//! - [`routes`]: REST API 엔드포인트
//! - [`state`]: 애플리케이션 공유 상태 (AppState)
//! - [`server`]: 전체 라우터 조립
//! - [`metrics`]: Prometheus 메트릭 수집
//! - [`middleware`]: HTTP 미들웨어
//! - [`openapi`]: OpenAPI 문서 및 Swagger UI

pub mod auth;
pub mod error;
pub mod metrics;
pub mod middleware;
pub mod openapi;
pub mod repository;
pub mod routes;
pub mod server;
pub mod state;

pub use auth::{
    auth_middleware, hash_password, permission_middleware, verify_password, AuthError,
    AuthIdentity, AuthService, Claims, PermissionGate, TokenCodec, TokenError,
};
pub use error::{ApiError, ApiErrorResponse, ApiResult};
pub use crate::metrics::setup_metrics_recorder;
pub use middleware::metrics_layer;
pub use repository::{InMemoryCredentialStore, PgCredentialStore};
pub use routes::{
    create_api_router, HealthResponse, LoginResponse, UserProfileResponse, UserResponse,
};
pub use server::create_router;
pub use state::AppState;

#[cfg(any(test, feature = "test-utils"))]
pub use state::create_test_state;

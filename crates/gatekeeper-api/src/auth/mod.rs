//! 인증 및 권한 부여.
//!
//! JWT 기반 인증과 역할 기반 접근 제어(RBAC) 파이프라인을 제공합니다.
//!
//! # 구성 요소
//!
//! - [`password`]: Argon2id 비밀번호 해싱
//! - [`TokenCodec`]: 세션 토큰 서명/검증
//! - [`AuthService`]: 회원가입, 로그인, 사용자 조회
//! - [`auth_middleware`]: Bearer 토큰 검증 후 [`AuthIdentity`] 기록
//! - [`permission_middleware`]: 역할의 권한 집합으로 허용/거부 판정
//!
//! # 파이프라인
//!
//! ```rust,ignore
//! let admin = Router::new()
//!     .route("/users", get(list_users))
//!     // 안쪽: 권한 검사
//!     .route_layer(from_fn_with_state(PermissionGate::new(store, "admin"), permission_middleware))
//!     // 바깥쪽: 인증
//!     .route_layer(from_fn_with_state(codec, auth_middleware));
//! ```

mod jwt;
mod middleware;
pub mod password;
mod permission;
mod service;

pub use jwt::{Claims, TokenCodec, TokenError};
pub use middleware::{auth_middleware, bearer_token, AuthIdentity, AuthRejection};
pub use password::{hash_password, verify_password, PasswordError};
pub use permission::{permission_middleware, PermissionGate, PermissionRejection};
pub use service::{normalize_email, AuthError, AuthService, LoginOutcome, Registration};

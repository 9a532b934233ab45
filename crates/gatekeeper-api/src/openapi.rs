//! OpenAPI 문서화 설정.
//!
//! utoipa를 사용하여 REST API의 OpenAPI 3.0 스펙을 생성합니다.
//! Swagger UI는 `/swagger-ui` 경로에서 사용 가능합니다.
//!
//! 새로운 엔드포인트를 추가할 때:
//!
//! 1. 응답/요청 타입에 `#[derive(ToSchema)]` 추가
//! 2. 핸들러에 `#[utoipa::path(...)]` 어노테이션 추가
//! 3. 이 파일의 `components(schemas(...))` 및 `paths(...)` 섹션에 추가

use axum::Router;
use gatekeeper_core::{Permission, Role};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::error::ApiErrorResponse;
use crate::routes::{
    AssignRoleRequest, ChangePasswordRequest, ComponentHealth, ComponentStatus,
    CreatePermissionRequest, CreateRoleRequest, HealthResponse, LoginRequest, LoginResponse,
    RegisterRequest, UserListResponse, UserProfileResponse, UserResponse,
};

/// Bearer 토큰 보안 스킴 등록.
struct BearerSecurityAddon;

impl Modify for BearerSecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.security_schemes.insert(
                "bearer_auth".to_string(),
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

// ==================== OpenAPI 문서 정의 ====================

/// Gatekeeper API 문서.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Gatekeeper API",
        description = r#"
# Gatekeeper 인증/인가 REST API

역할 기반 접근 제어(RBAC) 서비스입니다.

## 인증

`POST /api/auth/login`으로 발급받은 토큰을
`Authorization: Bearer <token>` 헤더에 포함하세요.
관리자 엔드포인트는 `admin` 권한을 가진 역할이 필요합니다.
"#,
        license(name = "MIT", url = "https://opensource.org/licenses/MIT"),
        contact(name = "Gatekeeper Team", url = "https://github.com/user/gatekeeper")
    ),
    servers(
        (url = "http://localhost:8080", description = "로컬 개발 서버"),
    ),
    modifiers(&BearerSecurityAddon),
    tags(
        (name = "health", description = "헬스 체크 - 서버 및 저장소 상태"),
        (name = "auth", description = "인증 - 회원가입, 로그인"),
        (name = "users", description = "사용자 - 본인 정보, 비밀번호 변경"),
        (name = "admin", description = "관리자 - 사용자/역할/권한 관리")
    ),
    // ==================== 스키마 등록 ====================
    components(
        schemas(
            // ===== Common =====
            ApiErrorResponse,

            // ===== Health =====
            HealthResponse,
            ComponentHealth,
            ComponentStatus,

            // ===== Auth =====
            RegisterRequest,
            LoginRequest,
            LoginResponse,

            // ===== Users =====
            UserResponse,
            UserProfileResponse,
            ChangePasswordRequest,

            // ===== Admin =====
            UserListResponse,
            CreateRoleRequest,
            CreatePermissionRequest,
            AssignRoleRequest,
            Role,
            Permission,
        )
    ),
    // ==================== 경로 등록 ====================
    paths(
        crate::routes::health::health_check,

        crate::routes::auth::register,
        crate::routes::auth::login,

        crate::routes::users::me,
        crate::routes::users::change_password,

        crate::routes::admin::list_users,
        crate::routes::admin::create_role,
        crate::routes::admin::create_permission,
        crate::routes::admin::assign_role,
    )
)]
pub struct ApiDoc;

// ==================== Swagger UI 라우터 ====================

/// Swagger UI 라우터 생성.
///
/// 다음 경로에 문서 UI를 마운트합니다:
/// - `/swagger-ui` - Swagger UI 대화형 문서
/// - `/api-docs/openapi.json` - OpenAPI JSON 스펙
pub fn swagger_ui_router<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDoc::openapi())
        .into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_spec_valid() {
        let spec = ApiDoc::openapi();
        let json = serde_json::to_string_pretty(&spec).unwrap();

        assert!(json.contains("Gatekeeper API"));

        assert!(json.contains("/api/health"));
        assert!(json.contains("/api/auth/register"));
        assert!(json.contains("/api/auth/login"));
        assert!(json.contains("/api/users/me"));
        assert!(json.contains("/api/admin/users/{id}/role"));
    }

    #[test]
    fn test_openapi_contains_schemas_and_security() {
        let spec = ApiDoc::openapi();
        let json = serde_json::to_string(&spec).unwrap();

        assert!(json.contains("ApiErrorResponse"));
        assert!(json.contains("LoginResponse"));
        assert!(json.contains("UserProfileResponse"));
        assert!(json.contains("bearer_auth"));
        assert!(!json.contains("password_hash"));
    }

    #[test]
    fn test_swagger_ui_router_creates() {
        let _router: Router<()> = swagger_ui_router();
    }
}

//! 관리자 endpoint.
//!
//! 인증 미들웨어와 `admin` 권한 미들웨어 뒤에 마운트됩니다.
//!
//! # 엔드포인트
//!
//! - `GET /api/admin/users` - 전체 사용자 목록
//! - `POST /api/admin/roles` - 역할 생성
//! - `POST /api/admin/permissions` - 권한 생성
//! - `PUT /api/admin/users/{id}/role` - 사용자 역할 변경

use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use gatekeeper_core::{NewPermission, NewRole, Permission, Role, StoreError};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;
use validator::Validate;

use crate::auth::AuthIdentity;
use crate::error::{ApiError, ApiErrorResponse, ApiResult};
use crate::routes::users::{UserProfileResponse, UserResponse};
use crate::state::AppState;

// ================================================================================================
// DTOs
// ================================================================================================

/// 사용자 목록 응답.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserListResponse {
    pub users: Vec<UserResponse>,
    pub total: usize,
}

/// 역할 생성 요청.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateRoleRequest {
    #[validate(length(min = 1, max = 50, message = "must be 1-50 characters"))]
    pub name: String,

    #[serde(default)]
    #[validate(length(max = 255, message = "must be at most 255 characters"))]
    pub description: String,

    /// 역할에 부여할 권한 ID 목록
    #[serde(default)]
    pub permission_ids: Vec<i64>,
}

/// 권한 생성 요청.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreatePermissionRequest {
    #[validate(length(min = 1, max = 50, message = "must be 1-50 characters"))]
    pub name: String,

    #[serde(default)]
    #[validate(length(max = 255, message = "must be at most 255 characters"))]
    pub description: String,
}

/// 역할 변경 요청.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct AssignRoleRequest {
    pub role_id: i64,
}

// ================================================================================================
// Handlers
// ================================================================================================

/// 전체 사용자 목록.
#[utoipa::path(
    get,
    path = "/api/admin/users",
    responses(
        (status = 200, description = "조회 성공", body = UserListResponse),
        (status = 401, description = "인증 실패", body = ApiErrorResponse),
        (status = 403, description = "권한 없음", body = ApiErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub async fn list_users(State(state): State<Arc<AppState>>) -> ApiResult<Json<UserListResponse>> {
    let users: Vec<UserResponse> = state
        .store
        .list_users()
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .into_iter()
        .map(UserResponse::from)
        .collect();

    Ok(Json(UserListResponse {
        total: users.len(),
        users,
    }))
}

/// 역할 생성.
#[utoipa::path(
    post,
    path = "/api/admin/roles",
    request_body = CreateRoleRequest,
    responses(
        (status = 201, description = "생성 성공", body = Role),
        (status = 400, description = "입력 검증 실패 또는 존재하지 않는 권한 ID", body = ApiErrorResponse),
        (status = 409, description = "이미 존재하는 역할", body = ApiErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub async fn create_role(
    State(state): State<Arc<AppState>>,
    identity: AuthIdentity,
    payload: Result<Json<CreateRoleRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Role>)> {
    let Json(request) = payload?;
    request.validate()?;

    let role = state
        .store
        .create_role(NewRole {
            name: request.name.trim().to_string(),
            description: request.description,
            permission_ids: request.permission_ids,
        })
        .await
        .map_err(|e| match e {
            StoreError::Conflict(_) => {
                ApiError::Conflict("ROLE_EXISTS", "Role already exists".to_string())
            }
            StoreError::InvalidReference(what) => {
                ApiError::Validation(format!("permission_ids: unknown {}", what))
            }
            other => ApiError::Internal(other.to_string()),
        })?;

    info!(
        actor = identity.user_id,
        role_id = role.id,
        role = %role.name,
        permissions = ?role.permission_names(),
        "Role created"
    );

    Ok((StatusCode::CREATED, Json(role)))
}

/// 권한 생성.
#[utoipa::path(
    post,
    path = "/api/admin/permissions",
    request_body = CreatePermissionRequest,
    responses(
        (status = 201, description = "생성 성공", body = Permission),
        (status = 400, description = "입력 검증 실패", body = ApiErrorResponse),
        (status = 409, description = "이미 존재하는 권한", body = ApiErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub async fn create_permission(
    State(state): State<Arc<AppState>>,
    identity: AuthIdentity,
    payload: Result<Json<CreatePermissionRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Permission>)> {
    let Json(request) = payload?;
    request.validate()?;

    let permission = state
        .store
        .create_permission(NewPermission {
            name: request.name.trim().to_string(),
            description: request.description,
        })
        .await
        .map_err(|e| match e {
            StoreError::Conflict(_) => {
                ApiError::Conflict("PERMISSION_EXISTS", "Permission already exists".to_string())
            }
            other => ApiError::Internal(other.to_string()),
        })?;

    info!(
        actor = identity.user_id,
        permission_id = permission.id,
        permission = %permission.name,
        "Permission created"
    );

    Ok((StatusCode::CREATED, Json(permission)))
}

/// 사용자 역할 변경.
///
/// 이미 발급된 토큰의 역할 클레임은 만료 전까지 바뀌지 않습니다.
#[utoipa::path(
    put,
    path = "/api/admin/users/{id}/role",
    params(("id" = i64, Path, description = "사용자 ID")),
    request_body = AssignRoleRequest,
    responses(
        (status = 200, description = "변경 성공", body = UserProfileResponse),
        (status = 404, description = "사용자 또는 역할 없음", body = ApiErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub async fn assign_role(
    State(state): State<Arc<AppState>>,
    identity: AuthIdentity,
    path: Result<Path<i64>, PathRejection>,
    payload: Result<Json<AssignRoleRequest>, JsonRejection>,
) -> ApiResult<Json<UserProfileResponse>> {
    let Path(user_id) = path.map_err(|e| ApiError::Validation(e.body_text()))?;
    let Json(request) = payload?;

    let role = state
        .store
        .find_role_by_id(request.role_id)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .ok_or_else(|| ApiError::NotFound("ROLE_NOT_FOUND", "Role not found".to_string()))?;

    let updated = state
        .store
        .update_role(user_id, role.id)
        .await
        .map_err(|e| match e {
            StoreError::NotFound(_) => {
                ApiError::NotFound("USER_NOT_FOUND", "User not found".to_string())
            }
            StoreError::InvalidReference(_) => {
                ApiError::NotFound("ROLE_NOT_FOUND", "Role not found".to_string())
            }
            other => ApiError::Internal(other.to_string()),
        })?;

    info!(
        actor = identity.user_id,
        user_id,
        role_id = role.id,
        "User role changed"
    );

    Ok(Json(UserProfileResponse {
        user: updated.into(),
        role,
    }))
}

/// 관리자 라우터 생성. 인증과 권한 미들웨어는 상위 라우터에서 적용합니다.
pub fn admin_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/users", get(list_users))
        .route("/users/{id}/role", put(assign_role))
        .route("/roles", post(create_role))
        .route("/permissions", post(create_permission))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        extract::Request,
        http::header,
        middleware::{self, Next},
        response::Response,
    };
    use serde_json::json;
    use tower::ServiceExt;

    use crate::auth::Registration;
    use crate::state::create_test_state;

    fn app(state: Arc<AppState>) -> Router {
        admin_router()
            .layer(middleware::from_fn(
                |mut request: Request, next: Next| async move {
                    request.extensions_mut().insert(AuthIdentity {
                        user_id: 1,
                        role_id: 2,
                    });
                    next.run(request).await
                },
            ))
            .with_state(state)
    }

    fn send(method: &str, uri: &str, body: serde_json::Value) -> axum::http::Request<Body> {
        axum::http::Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json_body<T: serde::de::DeserializeOwned>(response: Response) -> T {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn register(state: &AppState, email: &str) -> i64 {
        state
            .auth
            .register(Registration {
                email: email.to_string(),
                password: "password1".to_string(),
                first_name: "Test".to_string(),
                last_name: "User".to_string(),
            })
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn test_list_users() {
        let state = Arc::new(create_test_state());
        register(&state, "a@example.com").await;
        register(&state, "b@example.com").await;

        let response = app(state)
            .oneshot(
                axum::http::Request::builder()
                    .uri("/users")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body: UserListResponse = json_body(response).await;
        assert_eq!(body.total, 2);
        assert_eq!(body.users[0].email, "a@example.com");
    }

    #[tokio::test]
    async fn test_create_permission_and_role() {
        let state = Arc::new(create_test_state());
        let app = app(state);

        let response = app
            .clone()
            .oneshot(send(
                "POST",
                "/permissions",
                json!({"name": "reports:read", "description": "Read reports"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let permission: Permission = json_body(response).await;

        let response = app
            .clone()
            .oneshot(send(
                "POST",
                "/permissions",
                json!({"name": "reports:read"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        let error: ApiErrorResponse = json_body(response).await;
        assert_eq!(error.error, "Permission already exists");

        let response = app
            .clone()
            .oneshot(send(
                "POST",
                "/roles",
                json!({"name": "analyst", "permission_ids": [permission.id]}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let role: Role = json_body(response).await;
        assert!(role.has_permission("reports:read"));

        let response = app
            .clone()
            .oneshot(send("POST", "/roles", json!({"name": "analyst"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        let error: ApiErrorResponse = json_body(response).await;
        assert_eq!(error.error, "Role already exists");

        let response = app
            .oneshot(send(
                "POST",
                "/roles",
                json!({"name": "ghost", "permission_ids": [404]}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_assign_role() {
        let state = Arc::new(create_test_state());
        let user_id = register(&state, "c@example.com").await;
        let app = app(state.clone());

        let response = app
            .clone()
            .oneshot(send(
                "PUT",
                &format!("/users/{}/role", user_id),
                json!({"role_id": 2}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let profile: UserProfileResponse = json_body(response).await;
        assert_eq!(profile.user.role_id, 2);
        assert!(profile.role.has_permission("admin"));

        let response = app
            .clone()
            .oneshot(send(
                "PUT",
                &format!("/users/{}/role", user_id),
                json!({"role_id": 99}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let error: ApiErrorResponse = json_body(response).await;
        assert_eq!(error.error, "Role not found");

        let response = app
            .oneshot(send("PUT", "/users/999/role", json!({"role_id": 2})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let error: ApiErrorResponse = json_body(response).await;
        assert_eq!(error.error, "User not found");
    }

    #[tokio::test]
    async fn test_assign_role_keeps_password_hash() {
        let state = Arc::new(create_test_state());
        let user_id = register(&state, "d@example.com").await;
        state
            .auth
            .change_password(user_id, "password1", "password2")
            .await
            .unwrap();

        let response = app(state.clone())
            .oneshot(send(
                "PUT",
                &format!("/users/{}/role", user_id),
                json!({"role_id": 2}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        assert!(state.auth.login("d@example.com", "password1").await.is_err());
        let outcome = state.auth.login("d@example.com", "password2").await.unwrap();
        assert_eq!(outcome.user.role_id, 2);
    }
}

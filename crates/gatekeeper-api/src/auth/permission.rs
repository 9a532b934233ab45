//! 권한 검사 미들웨어.
//!
//! 인증 미들웨어 뒤에 장착되어, 호출자의 역할을 저장소에서 조회하고
//! 필요한 권한이 역할에 포함되어 있는지 확인합니다.
//! 요청 간 캐싱은 하지 않습니다.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use gatekeeper_core::CredentialStore;
use tracing::{debug, error, warn};

use super::middleware::AuthIdentity;
use crate::error::ApiErrorResponse;
use crate::metrics::record_authz_decision;

/// 권한 검사 거부 사유.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PermissionRejection {
    /// 인증 미들웨어가 신원을 기록하지 않음
    #[error("Role ID not found in context")]
    MissingIdentity,
    /// 토큰의 역할 ID가 저장소에 없음
    #[error("Role not found")]
    RoleNotFound,
    #[error("Permission denied")]
    PermissionDenied,
    /// 저장소 장애. 허용하지 않고 거부합니다.
    #[error("Internal server error")]
    StoreUnavailable,
}

impl IntoResponse for PermissionRejection {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            PermissionRejection::MissingIdentity => (StatusCode::UNAUTHORIZED, "MISSING_IDENTITY"),
            PermissionRejection::RoleNotFound => (StatusCode::UNAUTHORIZED, "ROLE_NOT_FOUND"),
            PermissionRejection::PermissionDenied => (StatusCode::FORBIDDEN, "PERMISSION_DENIED"),
            PermissionRejection::StoreUnavailable => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
            }
        };

        ApiErrorResponse::new(code, self.to_string()).into_response_with(status)
    }
}

/// 라우트 그룹별 권한 요구 설정.
///
/// 필요한 권한 이름은 라우터 구성 시점에 고정됩니다.
#[derive(Clone)]
pub struct PermissionGate {
    store: Arc<dyn CredentialStore>,
    required: Arc<str>,
}

impl PermissionGate {
    /// 새 권한 게이트 생성.
    ///
    /// # Arguments
    ///
    /// * `store` - 역할 조회에 사용할 저장소
    /// * `required` - 필요한 권한 이름 (대소문자 구분)
    pub fn new(store: Arc<dyn CredentialStore>, required: impl Into<Arc<str>>) -> Self {
        Self {
            store,
            required: required.into(),
        }
    }

    /// 필요한 권한 이름.
    pub fn required(&self) -> &str {
        &self.required
    }

    /// 신원이 필요한 권한을 가지는지 판정합니다.
    pub async fn check(&self, identity: Option<AuthIdentity>) -> Result<(), PermissionRejection> {
        let Some(identity) = identity else {
            return Err(PermissionRejection::MissingIdentity);
        };

        let role = match self.store.find_role_by_id(identity.role_id).await {
            Ok(Some(role)) => role,
            Ok(None) => return Err(PermissionRejection::RoleNotFound),
            Err(e) => {
                error!(role_id = identity.role_id, error = %e, "Role lookup failed");
                return Err(PermissionRejection::StoreUnavailable);
            }
        };

        if role.has_permission(&self.required) {
            Ok(())
        } else {
            Err(PermissionRejection::PermissionDenied)
        }
    }
}

/// 권한 검사 미들웨어.
///
/// `middleware::from_fn_with_state(gate, permission_middleware)`로 장착하며,
/// 인증 미들웨어보다 안쪽에 있어야 합니다.
pub async fn permission_middleware(
    State(gate): State<PermissionGate>,
    request: Request,
    next: Next,
) -> Result<Response, PermissionRejection> {
    let identity = request.extensions().get::<AuthIdentity>().copied();

    match gate.check(identity).await {
        Ok(()) => {
            debug!(
                user_id = ?identity.map(|i| i.user_id),
                permission = gate.required(),
                "Permission granted"
            );
            record_authz_decision(gate.required(), "allow");
            Ok(next.run(request).await)
        }
        Err(rejection) => {
            warn!(
                user_id = ?identity.map(|i| i.user_id),
                role_id = ?identity.map(|i| i.role_id),
                permission = gate.required(),
                path = %request.uri().path(),
                reason = %rejection,
                "Permission denied"
            );
            record_authz_decision(gate.required(), "deny");
            Err(rejection)
        }
    }
}

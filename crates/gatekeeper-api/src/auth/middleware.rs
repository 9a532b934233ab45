//! Axum용 JWT 인증 미들웨어.
//!
//! 요청마다 Bearer 토큰을 검증하고, 성공하면 [`AuthIdentity`]를
//! 요청 extensions에 넣어 다음 단계로 넘깁니다. 첫 실패에서 즉시 응답합니다.
//!
//! # 사용 예시
//!
//! ```rust,ignore
//! let protected = Router::new()
//!     .route("/users/me", get(me))
//!     .route_layer(middleware::from_fn_with_state(codec.clone(), auth_middleware));
//!
//! async fn me(identity: AuthIdentity) -> impl IntoResponse {
//!     format!("user {}", identity.user_id)
//! }
//! ```

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::warn;

use super::jwt::{TokenCodec, TokenError};
use crate::error::{ApiError, ApiErrorResponse};
use crate::metrics::record_token_rejection;

/// 요청 범위의 인증된 신원.
///
/// 인증 미들웨어가 기록하고 권한 미들웨어와 핸들러가 읽습니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthIdentity {
    pub user_id: i64,
    pub role_id: i64,
}

/// 인증 거부 사유.
///
/// 토큰 만료와 무효는 같은 메시지로 응답하고 `code`로만 구분합니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AuthRejection {
    #[error("Authorization header is required")]
    MissingCredentials,
    #[error("Authorization header format must be Bearer {{token}}")]
    MalformedCredentials,
    #[error("Invalid token")]
    InvalidToken,
    #[error("Invalid token")]
    TokenExpired,
}

impl AuthRejection {
    /// 응답 에러 코드.
    pub fn code(&self) -> &'static str {
        match self {
            AuthRejection::MissingCredentials => "MISSING_TOKEN",
            AuthRejection::MalformedCredentials => "INVALID_AUTH_HEADER",
            AuthRejection::InvalidToken => "INVALID_TOKEN",
            AuthRejection::TokenExpired => "TOKEN_EXPIRED",
        }
    }
}

impl From<TokenError> for AuthRejection {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Expired => AuthRejection::TokenExpired,
            _ => AuthRejection::InvalidToken,
        }
    }
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        ApiErrorResponse::new(self.code(), self.to_string())
            .into_response_with(StatusCode::UNAUTHORIZED)
    }
}

/// Authorization 헤더에서 Bearer 토큰을 추출합니다.
///
/// 헤더 값은 공백 하나로 나뉜 정확히 두 부분이어야 하며,
/// 첫 부분은 대소문자를 구분하는 `Bearer`, 둘째 부분은 비어 있지 않아야 합니다.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthRejection> {
    let Some(value) = headers.get(AUTHORIZATION) else {
        return Err(AuthRejection::MissingCredentials);
    };
    if value.is_empty() {
        return Err(AuthRejection::MissingCredentials);
    }

    let value = value
        .to_str()
        .map_err(|_| AuthRejection::MalformedCredentials)?;

    let mut parts = value.split(' ');
    match (parts.next(), parts.next(), parts.next()) {
        (Some("Bearer"), Some(token), None) if !token.is_empty() => Ok(token),
        _ => Err(AuthRejection::MalformedCredentials),
    }
}

/// 인증 미들웨어.
///
/// `middleware::from_fn_with_state(codec, auth_middleware)`로 장착합니다.
pub async fn auth_middleware(
    State(codec): State<TokenCodec>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthRejection> {
    let token = bearer_token(request.headers()).inspect_err(|rejection| {
        warn!(
            path = %request.uri().path(),
            code = rejection.code(),
            "Authentication rejected"
        );
        record_token_rejection(rejection.code());
    })?;

    let claims = match codec.verify(token) {
        Ok(claims) => claims,
        Err(e) => {
            warn!(
                path = %request.uri().path(),
                reason = e.reason(),
                "Token verification failed"
            );
            record_token_rejection(e.reason());
            return Err(e.into());
        }
    };

    request.extensions_mut().insert(AuthIdentity {
        user_id: claims.user_id,
        role_id: claims.role_id,
    });

    Ok(next.run(request).await)
}

impl<S> FromRequestParts<S> for AuthIdentity
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthIdentity>()
            .copied()
            .ok_or_else(|| ApiError::Internal("auth middleware is not mounted on this route".into()))
    }
}

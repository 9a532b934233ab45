//! 인증 서비스.
//!
//! 회원가입, 로그인, 사용자 조회, 비밀번호 변경을 담당합니다.
//! 저장소는 생성자로 주입받으며 전역 상태를 사용하지 않습니다.

use std::sync::Arc;

use gatekeeper_core::{CredentialStore, NewUser, StoreError, User, UserWithRole};
use tracing::{debug, info, warn};

use super::jwt::{TokenCodec, TokenError};
use super::password::{hash_password, validate_password_strength, verify_password};
use crate::metrics::{record_login, record_registration};

/// 인증 서비스 에러.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("이미 등록된 이메일입니다")]
    EmailTaken,
    /// 존재하지 않는 이메일과 틀린 비밀번호를 구분하지 않습니다
    #[error("잘못된 자격증명")]
    InvalidCredentials,
    #[error("사용자를 찾을 수 없습니다")]
    NotFound,
    #[error("비밀번호 정책 위반: {0}")]
    WeakPassword(&'static str),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("내부 에러: {0}")]
    Internal(String),
}

impl From<TokenError> for AuthError {
    fn from(err: TokenError) -> Self {
        AuthError::Internal(err.to_string())
    }
}

/// 회원가입 입력.
#[derive(Debug, Clone)]
pub struct Registration {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

/// 로그인 결과.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    /// 서명된 세션 토큰
    pub token: String,
    /// 토큰 유효 기간 (초)
    pub expires_in: i64,
    /// 로그인한 사용자
    pub user: User,
}

/// 이메일 비교용 정규화 (앞뒤 공백 제거, 소문자).
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// 인증 서비스.
#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn CredentialStore>,
    codec: TokenCodec,
    default_role_id: i64,
}

impl AuthService {
    /// 새 서비스 생성.
    ///
    /// # Arguments
    ///
    /// * `store` - 자격증명 저장소
    /// * `codec` - 토큰 코덱
    /// * `default_role_id` - 회원가입 시 부여할 역할 ID
    pub fn new(store: Arc<dyn CredentialStore>, codec: TokenCodec, default_role_id: i64) -> Self {
        Self {
            store,
            codec,
            default_role_id,
        }
    }

    /// 토큰 코덱 참조.
    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    /// 회원가입.
    ///
    /// 이메일 중복을 먼저 확인하고, 중복이면 해싱이나 저장 없이 실패합니다.
    /// 동시 가입으로 저장소 고유 제약에 걸린 경우도 `EmailTaken`으로 처리합니다.
    pub async fn register(&self, input: Registration) -> Result<User, AuthError> {
        let email = normalize_email(&input.email);

        if self.store.find_user_by_email(&email).await?.is_some() {
            debug!("Registration rejected: email already registered");
            record_registration("email_taken");
            return Err(AuthError::EmailTaken);
        }

        validate_password_strength(&input.password).map_err(AuthError::WeakPassword)?;
        let password_hash =
            hash_password(&input.password).map_err(|e| AuthError::Internal(e.to_string()))?;

        let created = self
            .store
            .create_user(NewUser {
                email,
                password_hash,
                first_name: input.first_name.trim().to_string(),
                last_name: input.last_name.trim().to_string(),
                role_id: self.default_role_id,
            })
            .await;

        match created {
            Ok(user) => {
                info!(user_id = user.id, role_id = user.role_id, "User registered");
                record_registration("success");
                Ok(user)
            }
            Err(StoreError::Conflict(_)) => {
                debug!("Registration lost race on unique email");
                record_registration("email_taken");
                Err(AuthError::EmailTaken)
            }
            Err(e) => {
                record_registration("error");
                Err(e.into())
            }
        }
    }

    /// 로그인.
    ///
    /// 성공 시 저장된 역할 ID로 토큰을 발급합니다.
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginOutcome, AuthError> {
        let email = normalize_email(email);

        let Some(user) = self.store.find_user_by_email(&email).await? else {
            warn!(reason = "unknown_email", "Login failed");
            record_login("invalid_credentials");
            return Err(AuthError::InvalidCredentials);
        };

        if !verify_password(password, &user.password_hash) {
            warn!(user_id = user.id, reason = "password_mismatch", "Login failed");
            record_login("invalid_credentials");
            return Err(AuthError::InvalidCredentials);
        }

        let token = self.codec.issue(user.id, user.role_id)?;
        info!(user_id = user.id, role_id = user.role_id, "User logged in");
        record_login("success");

        Ok(LoginOutcome {
            token,
            expires_in: self.codec.ttl().num_seconds(),
            user,
        })
    }

    /// ID로 사용자 조회 (역할과 권한 포함).
    pub async fn get_user_by_id(&self, user_id: i64) -> Result<UserWithRole, AuthError> {
        self.store
            .find_user_by_id(user_id)
            .await?
            .ok_or(AuthError::NotFound)
    }

    /// 비밀번호 변경.
    ///
    /// 현재 비밀번호가 틀리면 `InvalidCredentials`를 반환합니다.
    pub async fn change_password(
        &self,
        user_id: i64,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        let UserWithRole { user, .. } = self.get_user_by_id(user_id).await?;

        if !verify_password(current_password, &user.password_hash) {
            warn!(user_id, "Password change rejected: current password mismatch");
            return Err(AuthError::InvalidCredentials);
        }

        validate_password_strength(new_password).map_err(AuthError::WeakPassword)?;
        let password_hash =
            hash_password(new_password).map_err(|e| AuthError::Internal(e.to_string()))?;

        // 해시 컬럼만 갱신: 조회 이후의 역할 변경을 덮어쓰지 않음
        match self.store.update_password_hash(user_id, &password_hash).await {
            Ok(_) => {
                info!(user_id, "Password changed");
                Ok(())
            }
            Err(StoreError::NotFound(_)) => Err(AuthError::NotFound),
            Err(e) => Err(e.into()),
        }
    }
}

//! 모든 핸들러에서 공유되는 애플리케이션 상태.
//!
//! AppState는 생성 후 불변이며 Arc로 래핑되어 요청 간에 공유됩니다.
//! 저장소의 동시성 제어는 저장소 구현체가 담당합니다.

use std::sync::Arc;

use gatekeeper_core::CredentialStore;

use crate::auth::{AuthService, PermissionGate, TokenCodec};

/// 관리자 라우트에 필요한 권한 이름.
pub const ADMIN_PERMISSION: &str = "admin";

/// 애플리케이션 공유 상태.
#[derive(Clone)]
pub struct AppState {
    /// 자격증명 저장소 (PostgreSQL 또는 인메모리)
    pub store: Arc<dyn CredentialStore>,

    /// 인증 서비스 - 회원가입, 로그인, 사용자 조회
    pub auth: AuthService,

    /// 토큰 코덱 - 인증 미들웨어에서 사용
    pub codec: TokenCodec,

    /// 서버 시작 시간 (업타임 계산용)
    pub started_at: chrono::DateTime<chrono::Utc>,

    /// API 버전
    pub version: String,
}

impl AppState {
    /// 새로운 AppState 생성.
    ///
    /// # Arguments
    ///
    /// * `store` - 자격증명 저장소
    /// * `codec` - 토큰 코덱
    /// * `default_role_id` - 회원가입 시 부여할 역할 ID
    pub fn new(store: Arc<dyn CredentialStore>, codec: TokenCodec, default_role_id: i64) -> Self {
        let auth = AuthService::new(store.clone(), codec.clone(), default_role_id);

        Self {
            store,
            auth,
            codec,
            started_at: chrono::Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// 주어진 권한을 요구하는 게이트 생성.
    pub fn permission_gate(&self, permission: &str) -> PermissionGate {
        PermissionGate::new(self.store.clone(), permission)
    }

    /// 서버 업타임 (초).
    pub fn uptime_secs(&self) -> i64 {
        (chrono::Utc::now() - self.started_at).num_seconds()
    }

    /// 저장소 연결 상태 확인.
    pub async fn is_store_healthy(&self) -> bool {
        self.store.ping().await.is_ok()
    }
}

/// 테스트용 AppState 생성.
///
/// 기본 역할이 준비된 인메모리 저장소와 고정 비밀 키를 사용합니다.
#[cfg(any(test, feature = "test-utils"))]
pub fn create_test_state() -> AppState {
    use secrecy::SecretString;

    let store = Arc::new(crate::repository::InMemoryCredentialStore::with_default_roles());
    let codec = TokenCodec::new(
        &SecretString::new("test-secret-key-for-gatekeeper".into()),
        chrono::Duration::hours(24),
    );
    AppState::new(store, codec, 1)
}

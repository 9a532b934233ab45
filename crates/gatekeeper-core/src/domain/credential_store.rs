//! 자격증명 저장소 추상화.
//!
//! 사용자, 역할, 권한 레코드의 영속화를 담당하는 외부 협력자 인터페이스입니다.
//! 인증 서비스와 권한 미들웨어는 생성 시점에 이 trait 객체를 주입받습니다.

use async_trait::async_trait;
use thiserror::Error;

use super::{NewPermission, NewRole, NewUser, Permission, Role, User, UserWithRole};

// =============================================================================
// 에러 타입
// =============================================================================

/// 저장소 에러.
#[derive(Debug, Error)]
pub enum StoreError {
    /// 고유 제약 조건 위반 (이메일, 역할 이름, 권한 이름)
    #[error("고유 제약 조건 위반: {0}")]
    Conflict(String),

    /// 존재하지 않는 레코드 참조 (역할 ID, 권한 ID)
    #[error("잘못된 참조: {0}")]
    InvalidReference(String),

    /// 갱신 대상 레코드 없음
    #[error("레코드를 찾을 수 없음: {0}")]
    NotFound(String),

    /// 백엔드 장애
    #[error("데이터베이스 에러: {0}")]
    Database(String),
}

/// 저장소 작업을 위한 Result 타입.
pub type StoreResult<T> = Result<T, StoreError>;

// =============================================================================
// CredentialStore Trait
// =============================================================================

/// 자격증명 저장소 trait.
///
/// 조회 메서드는 레코드를 찾으면 `Some`, 없으면 `None`을 반환하며
/// 부분적으로 채워진 레코드를 반환하지 않습니다.
/// 동시성 제어는 구현체의 책임입니다.
///
/// # 구현 예시
///
/// ```ignore
/// pub struct LdapCredentialStore {
///     client: Arc<LdapClient>,
/// }
///
/// #[async_trait]
/// impl CredentialStore for LdapCredentialStore {
///     async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
///         // ...
///     }
///     // ...
/// }
/// ```
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// 이메일로 사용자 조회.
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    /// ID로 사용자 조회 (역할과 권한 포함).
    async fn find_user_by_id(&self, id: i64) -> StoreResult<Option<UserWithRole>>;

    /// 사용자 생성.
    ///
    /// 이메일이 이미 존재하면 `StoreError::Conflict`,
    /// 역할이 없으면 `StoreError::InvalidReference`를 반환합니다.
    async fn create_user(&self, user: NewUser) -> StoreResult<User>;

    /// 사용자 갱신 (이메일, 이름, 비밀번호 해시, 역할).
    ///
    /// `updated_at`은 저장소가 갱신합니다.
    async fn update_user(&self, user: &User) -> StoreResult<User>;

    /// 비밀번호 해시만 갱신.
    ///
    /// 다른 컬럼은 건드리지 않으므로 동시에 진행된 역할 변경을 덮어쓰지 않습니다.
    /// 사용자가 없으면 `StoreError::NotFound`를 반환합니다.
    async fn update_password_hash(&self, id: i64, password_hash: &str) -> StoreResult<()>;

    /// 역할만 갱신하고 갱신된 사용자를 반환.
    ///
    /// 사용자가 없으면 `StoreError::NotFound`,
    /// 역할이 없으면 `StoreError::InvalidReference`를 반환합니다.
    async fn update_role(&self, id: i64, role_id: i64) -> StoreResult<User>;

    /// 전체 사용자 목록 (ID 오름차순).
    async fn list_users(&self) -> StoreResult<Vec<User>>;

    /// ID로 역할 조회 (권한 포함).
    async fn find_role_by_id(&self, id: i64) -> StoreResult<Option<Role>>;

    /// 역할 생성 및 권한 연결.
    async fn create_role(&self, role: NewRole) -> StoreResult<Role>;

    /// 권한 생성.
    async fn create_permission(&self, permission: NewPermission) -> StoreResult<Permission>;

    /// 저장소 연결 상태 확인.
    async fn ping(&self) -> StoreResult<()>;

    /// 저장소 구현 이름 (헬스 체크 및 로그용).
    fn backend_name(&self) -> &'static str;
}

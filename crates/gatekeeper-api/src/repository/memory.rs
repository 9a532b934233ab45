//! 인메모리 자격증명 저장소.
//!
//! 데이터베이스 없이 실행할 때와 테스트에서 사용합니다.
//! PostgreSQL 스키마와 같은 기본 역할(1 = user, 2 = admin)로 시작합니다.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use gatekeeper_core::{
    CredentialStore, NewPermission, NewRole, NewUser, Permission, Role, StoreError, StoreResult,
    User, UserWithRole,
};
use tokio::sync::RwLock;

/// 권한 ID만 보관하는 역할 레코드
#[derive(Debug, Clone)]
struct RoleRecord {
    id: i64,
    name: String,
    description: String,
    permission_ids: Vec<i64>,
}

#[derive(Debug, Default)]
struct Tables {
    users: BTreeMap<i64, User>,
    roles: BTreeMap<i64, RoleRecord>,
    permissions: BTreeMap<i64, Permission>,
    next_user_id: i64,
    next_role_id: i64,
    next_permission_id: i64,
}

impl Tables {
    fn resolve_role(&self, record: &RoleRecord) -> Role {
        Role {
            id: record.id,
            name: record.name.clone(),
            description: record.description.clone(),
            permissions: record
                .permission_ids
                .iter()
                .filter_map(|id| self.permissions.get(id).cloned())
                .collect(),
        }
    }

    fn email_owner(&self, email: &str) -> Option<i64> {
        self.users
            .values()
            .find(|u| u.email == email)
            .map(|u| u.id)
    }
}

/// 인메모리 자격증명 저장소.
#[derive(Debug)]
pub struct InMemoryCredentialStore {
    tables: RwLock<Tables>,
    unavailable: AtomicBool,
}

impl Default for InMemoryCredentialStore {
    fn default() -> Self {
        Self::with_default_roles()
    }
}

impl InMemoryCredentialStore {
    /// 역할과 권한이 없는 빈 저장소.
    pub fn empty() -> Self {
        Self {
            tables: RwLock::new(Tables {
                next_user_id: 1,
                next_role_id: 1,
                next_permission_id: 1,
                ..Default::default()
            }),
            unavailable: AtomicBool::new(false),
        }
    }

    /// 기본 역할이 준비된 저장소.
    ///
    /// - 권한 1: `admin`
    /// - 역할 1: `user` (권한 없음)
    /// - 역할 2: `admin` (`admin` 권한)
    pub fn with_default_roles() -> Self {
        let mut tables = Tables {
            next_user_id: 1,
            next_role_id: 3,
            next_permission_id: 2,
            ..Default::default()
        };
        tables.permissions.insert(
            1,
            Permission {
                id: 1,
                name: "admin".to_string(),
                description: "Full administrative access".to_string(),
            },
        );
        tables.roles.insert(
            1,
            RoleRecord {
                id: 1,
                name: "user".to_string(),
                description: "Default role for registered users".to_string(),
                permission_ids: vec![],
            },
        );
        tables.roles.insert(
            2,
            RoleRecord {
                id: 2,
                name: "admin".to_string(),
                description: "Administrator".to_string(),
                permission_ids: vec![1],
            },
        );

        Self {
            tables: RwLock::new(tables),
            unavailable: AtomicBool::new(false),
        }
    }

    /// 장애 상태를 흉내냅니다. 설정되면 모든 작업이 `StoreError::Database`를 반환합니다.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn ensure_available(&self) -> StoreResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(StoreError::Database("in-memory store marked unavailable".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        self.ensure_available()?;
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.email == email).cloned())
    }

    async fn find_user_by_id(&self, id: i64) -> StoreResult<Option<UserWithRole>> {
        self.ensure_available()?;
        let tables = self.tables.read().await;

        let Some(user) = tables.users.get(&id) else {
            return Ok(None);
        };
        let record = tables.roles.get(&user.role_id).ok_or_else(|| {
            StoreError::InvalidReference(format!("role {} of user {}", user.role_id, id))
        })?;

        Ok(Some(UserWithRole {
            user: user.clone(),
            role: tables.resolve_role(record),
        }))
    }

    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        self.ensure_available()?;
        let mut tables = self.tables.write().await;

        if tables.email_owner(&user.email).is_some() {
            return Err(StoreError::Conflict("users.email".to_string()));
        }
        if !tables.roles.contains_key(&user.role_id) {
            return Err(StoreError::InvalidReference(format!("role {}", user.role_id)));
        }

        let id = tables.next_user_id;
        tables.next_user_id += 1;

        let now = Utc::now();
        let created = User {
            id,
            email: user.email,
            password_hash: user.password_hash,
            first_name: user.first_name,
            last_name: user.last_name,
            role_id: user.role_id,
            created_at: now,
            updated_at: now,
        };
        tables.users.insert(id, created.clone());

        Ok(created)
    }

    async fn update_user(&self, user: &User) -> StoreResult<User> {
        self.ensure_available()?;
        let mut tables = self.tables.write().await;

        if !tables.users.contains_key(&user.id) {
            return Err(StoreError::NotFound(format!("user {}", user.id)));
        }
        if matches!(tables.email_owner(&user.email), Some(owner) if owner != user.id) {
            return Err(StoreError::Conflict("users.email".to_string()));
        }
        if !tables.roles.contains_key(&user.role_id) {
            return Err(StoreError::InvalidReference(format!("role {}", user.role_id)));
        }

        let mut updated = user.clone();
        updated.updated_at = Utc::now();
        if let Some(existing) = tables.users.get(&user.id) {
            updated.created_at = existing.created_at;
        }
        tables.users.insert(user.id, updated.clone());

        Ok(updated)
    }

    async fn update_password_hash(&self, id: i64, password_hash: &str) -> StoreResult<()> {
        self.ensure_available()?;
        let mut tables = self.tables.write().await;

        let user = tables
            .users
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("user {}", id)))?;
        user.password_hash = password_hash.to_string();
        user.updated_at = Utc::now();

        Ok(())
    }

    async fn update_role(&self, id: i64, role_id: i64) -> StoreResult<User> {
        self.ensure_available()?;
        let mut tables = self.tables.write().await;

        if !tables.users.contains_key(&id) {
            return Err(StoreError::NotFound(format!("user {}", id)));
        }
        if !tables.roles.contains_key(&role_id) {
            return Err(StoreError::InvalidReference(format!("role {}", role_id)));
        }

        let user = tables
            .users
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("user {}", id)))?;
        user.role_id = role_id;
        user.updated_at = Utc::now();

        Ok(user.clone())
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        self.ensure_available()?;
        let tables = self.tables.read().await;
        Ok(tables.users.values().cloned().collect())
    }

    async fn find_role_by_id(&self, id: i64) -> StoreResult<Option<Role>> {
        self.ensure_available()?;
        let tables = self.tables.read().await;
        Ok(tables.roles.get(&id).map(|r| tables.resolve_role(r)))
    }

    async fn create_role(&self, role: NewRole) -> StoreResult<Role> {
        self.ensure_available()?;
        let mut tables = self.tables.write().await;

        if tables.roles.values().any(|r| r.name == role.name) {
            return Err(StoreError::Conflict("roles.name".to_string()));
        }

        let mut permission_ids = role.permission_ids;
        permission_ids.sort_unstable();
        permission_ids.dedup();
        if let Some(missing) = permission_ids
            .iter()
            .find(|id| !tables.permissions.contains_key(*id))
        {
            return Err(StoreError::InvalidReference(format!("permission {}", missing)));
        }

        let id = tables.next_role_id;
        tables.next_role_id += 1;

        let record = RoleRecord {
            id,
            name: role.name,
            description: role.description,
            permission_ids,
        };
        let created = tables.resolve_role(&record);
        tables.roles.insert(id, record);

        Ok(created)
    }

    async fn create_permission(&self, permission: NewPermission) -> StoreResult<Permission> {
        self.ensure_available()?;
        let mut tables = self.tables.write().await;

        if tables.permissions.values().any(|p| p.name == permission.name) {
            return Err(StoreError::Conflict("permissions.name".to_string()));
        }

        let id = tables.next_permission_id;
        tables.next_permission_id += 1;

        let created = Permission {
            id,
            name: permission.name,
            description: permission.description,
        };
        tables.permissions.insert(id, created.clone());

        Ok(created)
    }

    async fn ping(&self) -> StoreResult<()> {
        self.ensure_available()
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

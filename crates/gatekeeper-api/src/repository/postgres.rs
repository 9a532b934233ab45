//! PostgreSQL 자격증명 저장소.
//!
//! users, roles, permissions, role_permissions 테이블을 사용합니다.
//! 스키마는 `migrations/` 디렉토리의 마이그레이션으로 생성됩니다.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gatekeeper_core::{
    CredentialStore, NewPermission, NewRole, NewUser, Permission, Role, StoreError, StoreResult,
    User, UserWithRole,
};
use sqlx::{FromRow, PgExecutor, PgPool};
use tracing::info;

// ================================================================================================
// Records
// ================================================================================================

/// users 테이블 레코드
#[derive(Debug, Clone, FromRow)]
struct UserRecord {
    id: i64,
    email: String,
    password_hash: String,
    first_name: String,
    last_name: String,
    role_id: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<UserRecord> for User {
    fn from(r: UserRecord) -> Self {
        Self {
            id: r.id,
            email: r.email,
            password_hash: r.password_hash,
            first_name: r.first_name,
            last_name: r.last_name,
            role_id: r.role_id,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

/// roles 테이블 레코드
#[derive(Debug, Clone, FromRow)]
struct RoleRecord {
    id: i64,
    name: String,
    description: String,
}

/// permissions 테이블 레코드
#[derive(Debug, Clone, FromRow)]
struct PermissionRecord {
    id: i64,
    name: String,
    description: String,
}

impl From<PermissionRecord> for Permission {
    fn from(r: PermissionRecord) -> Self {
        Self {
            id: r.id,
            name: r.name,
            description: r.description,
        }
    }
}

const USER_COLUMNS: &str =
    "id, email, password_hash, first_name, last_name, role_id, created_at, updated_at";

/// sqlx 에러를 저장소 에러로 변환합니다.
///
/// 고유 제약 위반은 `Conflict`, 외래 키 위반은 `InvalidReference`가 됩니다.
fn map_db_error(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &err {
        let constraint = db.constraint().unwrap_or("unknown").to_string();
        if db.is_unique_violation() {
            return StoreError::Conflict(constraint);
        }
        if db.is_foreign_key_violation() {
            return StoreError::InvalidReference(constraint);
        }
    }
    StoreError::Database(err.to_string())
}

// ================================================================================================
// Repository
// ================================================================================================

/// PostgreSQL 자격증명 저장소.
#[derive(Debug, Clone)]
pub struct PgCredentialStore {
    pool: PgPool,
}

impl PgCredentialStore {
    /// 기존 연결 풀에서 저장소를 생성합니다.
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 내부 연결 풀을 반환합니다.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// 데이터베이스 마이그레이션을 실행합니다.
    pub async fn migrate(&self) -> StoreResult<()> {
        info!("Running database migrations...");

        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;

        info!("Migrations completed successfully");
        Ok(())
    }
}

/// 역할에 연결된 권한 목록을 조회합니다.
///
/// 연결 풀(`&PgPool`)과 트랜잭션(`&mut *tx`) 모두에서 호출할 수 있습니다.
async fn permissions_of<'e, E>(executor: E, role_id: i64) -> StoreResult<Vec<Permission>>
where
    E: PgExecutor<'e>,
{
    let records = sqlx::query_as::<_, PermissionRecord>(
        r#"
        SELECT p.id, p.name, p.description
        FROM permissions p
        JOIN role_permissions rp ON rp.permission_id = p.id
        WHERE rp.role_id = $1
        ORDER BY p.id
        "#,
    )
    .bind(role_id)
    .fetch_all(executor)
    .await
    .map_err(map_db_error)?;

    Ok(records.into_iter().map(Permission::from).collect())
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let record = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {} FROM users WHERE email = $1",
            USER_COLUMNS
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(record.map(User::from))
    }

    async fn find_user_by_id(&self, id: i64) -> StoreResult<Option<UserWithRole>> {
        let Some(record) = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {} FROM users WHERE id = $1",
            USER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?
        else {
            return Ok(None);
        };

        let role = self.find_role_by_id(record.role_id).await?.ok_or_else(|| {
            StoreError::InvalidReference(format!("role {} of user {}", record.role_id, id))
        })?;

        Ok(Some(UserWithRole {
            user: record.into(),
            role,
        }))
    }

    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(&format!(
            r#"
            INSERT INTO users (email, password_hash, first_name, last_name, role_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(user.role_id)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(record.into())
    }

    async fn update_user(&self, user: &User) -> StoreResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(&format!(
            r#"
            UPDATE users
            SET email = $2, password_hash = $3, first_name = $4, last_name = $5,
                role_id = $6, updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(user.role_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        record
            .map(User::from)
            .ok_or_else(|| StoreError::NotFound(format!("user {}", user.id)))
    }

    async fn update_password_hash(&self, id: i64, password_hash: &str) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE users SET password_hash = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(password_hash)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("user {}", id)));
        }
        Ok(())
    }

    async fn update_role(&self, id: i64, role_id: i64) -> StoreResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(&format!(
            "UPDATE users SET role_id = $2, updated_at = NOW() WHERE id = $1 RETURNING {}",
            USER_COLUMNS
        ))
        .bind(id)
        .bind(role_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        record
            .map(User::from)
            .ok_or_else(|| StoreError::NotFound(format!("user {}", id)))
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        let records = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {} FROM users ORDER BY id",
            USER_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(records.into_iter().map(User::from).collect())
    }

    async fn find_role_by_id(&self, id: i64) -> StoreResult<Option<Role>> {
        let Some(record) = sqlx::query_as::<_, RoleRecord>(
            "SELECT id, name, description FROM roles WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?
        else {
            return Ok(None);
        };

        let permissions = permissions_of(&self.pool, record.id).await?;

        Ok(Some(Role {
            id: record.id,
            name: record.name,
            description: record.description,
            permissions,
        }))
    }

    async fn create_role(&self, role: NewRole) -> StoreResult<Role> {
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        let record = sqlx::query_as::<_, RoleRecord>(
            r#"
            INSERT INTO roles (name, description)
            VALUES ($1, $2)
            RETURNING id, name, description
            "#,
        )
        .bind(&role.name)
        .bind(&role.description)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_db_error)?;

        if !role.permission_ids.is_empty() {
            sqlx::query(
                r#"
                INSERT INTO role_permissions (role_id, permission_id)
                SELECT $1, UNNEST($2::BIGINT[])
                ON CONFLICT DO NOTHING
                "#,
            )
            .bind(record.id)
            .bind(&role.permission_ids)
            .execute(&mut *tx)
            .await
            .map_err(map_db_error)?;
        }

        let permissions = permissions_of(&mut *tx, record.id).await?;
        tx.commit().await.map_err(map_db_error)?;

        Ok(Role {
            id: record.id,
            name: record.name,
            description: record.description,
            permissions,
        })
    }

    async fn create_permission(&self, permission: NewPermission) -> StoreResult<Permission> {
        let record = sqlx::query_as::<_, PermissionRecord>(
            r#"
            INSERT INTO permissions (name, description)
            VALUES ($1, $2)
            RETURNING id, name, description
            "#,
        )
        .bind(&permission.name)
        .bind(&permission.description)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(record.into())
    }

    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}

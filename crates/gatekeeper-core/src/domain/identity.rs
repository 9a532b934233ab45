//! 사용자, 역할, 권한 모델.
//!
//! 사용자는 정확히 하나의 역할을 참조하고, 역할은 여러 권한을 가집니다.
//! 권한은 ID가 아닌 이름으로 검사됩니다.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 권한.
///
/// 이름은 전역적으로 고유하며 대소문자를 구분합니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa-support", derive(utoipa::ToSchema))]
pub struct Permission {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// 역할과 그 권한 집합.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa-support", derive(utoipa::ToSchema))]
pub struct Role {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// 순서는 의미가 없습니다
    #[serde(default)]
    pub permissions: Vec<Permission>,
}

impl Role {
    /// 주어진 이름의 권한을 가지는지 확인합니다.
    ///
    /// 정확히 일치하는 이름만 인정합니다 (대소문자 구분, 와일드카드 없음).
    pub fn has_permission(&self, name: &str) -> bool {
        self.permissions.iter().any(|p| p.name == name)
    }

    /// 권한 이름 목록.
    pub fn permission_names(&self) -> Vec<&str> {
        self.permissions.iter().map(|p| p.name.as_str()).collect()
    }
}

/// 사용자 계정.
///
/// `password_hash`는 외부로 직렬화되지 않습니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub role_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 역할과 권한이 함께 로드된 사용자.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserWithRole {
    #[serde(flatten)]
    pub user: User,
    pub role: Role,
}

/// 새 사용자 입력.
///
/// 비밀번호는 이미 해싱된 상태여야 합니다.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub role_id: i64,
}

/// 새 역할 입력.
#[derive(Debug, Clone, Default)]
pub struct NewRole {
    pub name: String,
    pub description: String,
    /// 부여할 기존 권한 ID 목록
    pub permission_ids: Vec<i64>,
}

/// 새 권한 입력.
#[derive(Debug, Clone, Default)]
pub struct NewPermission {
    pub name: String,
    pub description: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn permission(id: i64, name: &str) -> Permission {
        Permission {
            id,
            name: name.to_string(),
            description: String::new(),
        }
    }

    #[test]
    fn test_role_has_permission_exact_match() {
        let role = Role {
            id: 2,
            name: "admin".to_string(),
            description: String::new(),
            permissions: vec![permission(1, "admin"), permission(2, "reports:read")],
        };

        assert!(role.has_permission("admin"));
        assert!(role.has_permission("reports:read"));
        assert!(!role.has_permission("Admin"));
        assert!(!role.has_permission("reports"));
        assert!(!role.has_permission(""));
    }

    #[test]
    fn test_role_without_permissions() {
        let role = Role {
            id: 1,
            name: "user".to_string(),
            description: String::new(),
            permissions: vec![],
        };

        assert!(!role.has_permission("admin"));
        assert!(role.permission_names().is_empty());
    }

    proptest::proptest! {
        #[test]
        fn prop_has_permission_matches_membership(
            names in proptest::collection::vec("[a-z:]{1,12}", 0..8),
            probe in "[a-zA-Z:]{1,12}",
        ) {
            let role = Role {
                id: 1,
                name: "generated".to_string(),
                description: String::new(),
                permissions: names
                    .iter()
                    .enumerate()
                    .map(|(i, n)| permission(i as i64, n))
                    .collect(),
            };

            proptest::prop_assert_eq!(role.has_permission(&probe), names.contains(&probe));
        }
    }

    #[test]
    fn test_user_serialization_hides_password_hash() {
        let now = Utc::now();
        let user = User {
            id: 7,
            email: "jane@example.com".to_string(),
            password_hash: "$argon2id$v=19$secret".to_string(),
            first_name: "Jane".to_string(),
            last_name: "Doe".to_string(),
            role_id: 1,
            created_at: now,
            updated_at: now,
        };

        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("password_hash"));
        assert!(!json.contains("argon2id"));
        assert!(json.contains(r#""email":"jane@example.com""#));
    }

    #[test]
    fn test_user_with_role_flattens_user() {
        let now = Utc::now();
        let value = serde_json::to_value(UserWithRole {
            user: User {
                id: 1,
                email: "a@b.c".to_string(),
                password_hash: "hash".to_string(),
                first_name: "A".to_string(),
                last_name: "B".to_string(),
                role_id: 2,
                created_at: now,
                updated_at: now,
            },
            role: Role {
                id: 2,
                name: "admin".to_string(),
                description: String::new(),
                permissions: vec![permission(1, "admin")],
            },
        })
        .unwrap();

        assert_eq!(value["id"], 1);
        assert_eq!(value["role"]["name"], "admin");
        assert!(value.get("password_hash").is_none());
    }
}

//! 비밀번호 해싱 유틸리티.
//!
//! Argon2id 기반 비밀번호 해싱 및 검증.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

/// 비밀번호 최소 길이.
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// 비밀번호 처리 에러.
#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("비밀번호 해싱 실패")]
    HashingFailed,
}

/// 비밀번호 해싱.
///
/// Argon2id 기본 파라미터(m=19456 KiB, t=2, p=1)와 무작위 솔트를 사용합니다.
///
/// # Arguments
///
/// * `password` - 해싱할 평문 비밀번호
///
/// # Returns
///
/// PHC 형식의 해시 문자열 (솔트 포함)
///
/// # Example
///
/// ```rust,ignore
/// let hash = hash_password("my_secure_password").unwrap();
/// // "$argon2id$v=19$m=19456,t=2,p=1$..."
/// ```
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);

    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|_| PasswordError::HashingFailed)?;

    Ok(hash.to_string())
}

/// 비밀번호 검증.
///
/// 비교는 상수 시간으로 수행됩니다. 해시 형식이 잘못되었으면
/// 에러 대신 `false`를 반환합니다.
///
/// # Arguments
///
/// * `password` - 검증할 평문 비밀번호
/// * `hash` - 저장된 PHC 형식 해시
pub fn verify_password(password: &str, hash: &str) -> bool {
    let Ok(parsed_hash) = PasswordHash::new(hash) else {
        tracing::warn!("Stored password hash is not a valid PHC string");
        return false;
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

/// 비밀번호 강도 검증.
///
/// 문자 수 기준 최소 6자를 요구합니다.
pub fn validate_password_strength(password: &str) -> Result<(), &'static str> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err("password must be at least 6 characters");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify_password() {
        let password = "TestPassword123!";
        let hash = hash_password(password).unwrap();

        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password(password, &hash));
        assert!(!verify_password("WrongPassword123!", &hash));
    }

    #[test]
    fn test_same_password_different_hashes() {
        let hash1 = hash_password("secret1").unwrap();
        let hash2 = hash_password("secret1").unwrap();

        // 솔트가 다르므로 해시가 다름
        assert_ne!(hash1, hash2);
        assert!(verify_password("secret1", &hash1));
        assert!(verify_password("secret1", &hash2));
    }

    #[test]
    fn test_malformed_hash_returns_false() {
        assert!(!verify_password("password", "not-a-valid-hash"));
        assert!(!verify_password("password", ""));
        assert!(!verify_password("", "$argon2id$v=19$broken"));
    }

    #[test]
    fn test_password_strength_validation() {
        assert!(validate_password_strength("abcdef").is_ok());
        assert!(validate_password_strength("한글비밀번호").is_ok());

        assert!(validate_password_strength("abcde").is_err());
        assert!(validate_password_strength("").is_err());
    }

    #[test]
    fn test_unicode_password() {
        let password = "한글패스워드123";
        let hash = hash_password(password).unwrap();
        assert!(verify_password(password, &hash));
    }
}

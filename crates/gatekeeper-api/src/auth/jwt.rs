//! JWT 토큰 처리.
//!
//! 세션 토큰 발급 및 검증. 서명은 HS256으로 하고, 검증은 HMAC-SHA 계열
//! (HS256/HS384/HS512)만 허용합니다. 만료 시각과 같은 순간까지는 유효합니다.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

/// 검증 시 허용하는 서명 알고리즘.
const HMAC_ALGORITHMS: [Algorithm; 3] = [Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];

/// JWT 세션 페이로드.
///
/// 역할 ID는 발급 시점의 스냅샷입니다. 이후 역할이 바뀌어도
/// 이미 발급된 토큰에는 반영되지 않습니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// 사용자 ID
    pub user_id: i64,
    /// 역할 ID
    pub role_id: i64,
    /// Issued At - 토큰 발급 시간 (Unix timestamp)
    pub iat: i64,
    /// Expiration - 토큰 만료 시간 (Unix timestamp)
    pub exp: i64,
    /// JWT ID - 토큰 고유 식별자
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,
}

impl Claims {
    /// 새로운 Claims 생성.
    ///
    /// # Arguments
    ///
    /// * `user_id` - 사용자 ID
    /// * `role_id` - 역할 ID
    /// * `ttl` - 유효 기간
    ///
    /// # Errors
    ///
    /// 만료 시각이 표현 가능한 범위를 넘으면 `TokenError::Encoding`을 반환합니다.
    pub fn new(user_id: i64, role_id: i64, ttl: Duration) -> Result<Self, TokenError> {
        let now = Utc::now();
        let exp = now
            .checked_add_signed(ttl)
            .ok_or_else(|| TokenError::Encoding(format!("ttl out of range: {}s", ttl.num_seconds())))?;

        Ok(Self {
            user_id,
            role_id,
            iat: now.timestamp(),
            exp: exp.timestamp(),
            jti: Some(uuid::Uuid::new_v4().to_string()),
        })
    }

    /// 주어진 시각에 만료되었는지 확인.
    pub fn is_expired_at(&self, now: i64) -> bool {
        now > self.exp
    }
}

/// 토큰 처리 에러.
///
/// 검증 실패는 원인별로 구분되지만 HTTP 응답 메시지는 동일합니다.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("잘못된 토큰 형식")]
    Malformed,
    #[error("토큰 서명이 유효하지 않습니다")]
    SignatureInvalid,
    #[error("토큰이 만료되었습니다")]
    Expired,
    #[error("토큰 인코딩 실패: {0}")]
    Encoding(String),
}

impl TokenError {
    /// 로그 및 메트릭 라벨용 사유 문자열.
    pub fn reason(&self) -> &'static str {
        match self {
            TokenError::Malformed => "malformed",
            TokenError::SignatureInvalid => "signature_invalid",
            TokenError::Expired => "expired",
            TokenError::Encoding(_) => "encoding",
        }
    }
}

/// 토큰 코덱.
///
/// 공유 비밀 키로 서명/검증하며, 생성 후에는 불변이라 요청 간에 공유됩니다.
#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec")
            .field("algorithms", &self.validation.algorithms)
            .field("ttl_secs", &self.ttl.num_seconds())
            .finish_non_exhaustive()
    }
}

impl TokenCodec {
    /// 새 코덱 생성.
    ///
    /// # Arguments
    ///
    /// * `secret` - 서명용 공유 비밀 키
    /// * `ttl` - 기본 토큰 유효 기간
    pub fn new(secret: &SecretString, ttl: Duration) -> Self {
        let key = secret.expose_secret().as_bytes();

        let mut validation = Validation::new(Algorithm::HS256);
        validation.algorithms = HMAC_ALGORITHMS.to_vec();
        validation.leeway = 0;
        validation.validate_aud = false;
        // 만료는 verify_at에서 직접 비교한다
        validation.validate_exp = false;
        validation.set_required_spec_claims(&["exp"]);

        Self {
            encoding_key: EncodingKey::from_secret(key),
            decoding_key: DecodingKey::from_secret(key),
            validation,
            ttl,
        }
    }

    /// 기본 유효 기간.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// 기본 유효 기간으로 토큰 발급.
    pub fn issue(&self, user_id: i64, role_id: i64) -> Result<String, TokenError> {
        self.issue_with_ttl(user_id, role_id, self.ttl)
    }

    /// 지정한 유효 기간으로 토큰 발급.
    ///
    /// # Arguments
    ///
    /// * `user_id` - 사용자 ID
    /// * `role_id` - 역할 ID
    /// * `ttl` - 유효 기간
    pub fn issue_with_ttl(
        &self,
        user_id: i64,
        role_id: i64,
        ttl: Duration,
    ) -> Result<String, TokenError> {
        self.sign(&Claims::new(user_id, role_id, ttl)?)
    }

    /// 미리 구성한 Claims에 서명.
    pub fn sign(&self, claims: &Claims) -> Result<String, TokenError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| TokenError::Encoding(e.to_string()))
    }

    /// 현재 시각 기준으로 토큰 검증.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        self.verify_at(token, Utc::now().timestamp())
    }

    /// 주어진 시각 기준으로 토큰 검증.
    ///
    /// 서명을 먼저 확인하고, 서명이 유효한 경우에만 만료를 판단합니다.
    ///
    /// # Arguments
    ///
    /// * `token` - JWT 문자열
    /// * `now` - 기준 시각 (Unix timestamp)
    pub fn verify_at(&self, token: &str, now: i64) -> Result<Claims, TokenError> {
        ensure_hmac_header(token)?;

        let data = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
            match e.kind() {
                ErrorKind::InvalidSignature
                | ErrorKind::InvalidAlgorithm
                | ErrorKind::InvalidAlgorithmName => TokenError::SignatureInvalid,
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Malformed,
            }
        })?;

        if data.claims.is_expired_at(now) {
            return Err(TokenError::Expired);
        }

        Ok(data.claims)
    }
}

/// 헤더의 `alg`가 HMAC 계열인지 확인.
///
/// 라이브러리가 알지 못하는 알고리즘 이름(`none` 등)도 서명 오류로 분류하기 위해
/// 키를 사용하기 전에 헤더를 직접 읽는다.
fn ensure_hmac_header(token: &str) -> Result<(), TokenError> {
    let segment = token
        .split('.')
        .next()
        .filter(|s| !s.is_empty())
        .ok_or(TokenError::Malformed)?;
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|_| TokenError::Malformed)?;
    let header: serde_json::Value =
        serde_json::from_slice(&bytes).map_err(|_| TokenError::Malformed)?;

    match header.get("alg").and_then(serde_json::Value::as_str) {
        Some("HS256" | "HS384" | "HS512") => Ok(()),
        Some(_) => Err(TokenError::SignatureInvalid),
        None => Err(TokenError::Malformed),
    }
}

//! 설정 관리.
//!
//! 설정은 다음 순서로 병합됩니다 (뒤가 앞을 덮어씀):
//! 1. 코드 기본값
//! 2. `config/default.toml` (있는 경우)
//! 3. `GATEKEEPER__SECTION__KEY` 형식의 환경 변수
//! 4. 관례적인 단일 환경 변수 (`DATABASE_URL`, `JWT_SECRET`, `HOST`, `PORT`, `APP_ENV`)

use std::path::Path;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer};

use crate::error::{CoreError, CoreResult};

/// 개발 환경에서 JWT 비밀 키가 없을 때 사용하는 값.
pub const DEVELOPMENT_JWT_SECRET: &str = "dev-secret-key-change-in-production";

/// 허용되는 최대 토큰 유효 시간 (1년).
pub const MAX_TOKEN_TTL_HOURS: i64 = 24 * 366;

/// 애플리케이션 설정.
#[derive(Debug, Deserialize)]
pub struct AppConfig {
    /// 실행 환경 ("development" | "production")
    pub environment: String,
    /// 서버 설정
    pub server: ServerConfig,
    /// 데이터베이스 설정
    pub database: DatabaseConfig,
    /// 인증 설정
    pub auth: AuthConfig,
    /// 로깅 설정
    pub logging: LoggingConfig,
}

/// 서버 설정.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// 바인딩할 호스트
    pub host: String,
    /// 리스닝할 포트
    pub port: u16,
    /// 요청 타임아웃 (초)
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            request_timeout_secs: 30,
        }
    }
}

/// 데이터베이스 설정.
///
/// `url`이 없으면 서버는 인메모리 저장소로 동작합니다.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL 연결 문자열
    #[serde(default)]
    pub url: Option<String>,
    /// 최대 연결 수
    pub max_connections: u32,
    /// 연결 타임아웃 (초)
    pub connection_timeout_secs: u64,
    /// 시작 시 마이그레이션 실행 여부
    pub run_migrations: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: 10,
            connection_timeout_secs: 10,
            run_migrations: true,
        }
    }
}

/// 인증 설정.
#[derive(Debug, Deserialize)]
pub struct AuthConfig {
    /// 토큰 서명용 공유 비밀 키
    #[serde(default, deserialize_with = "deserialize_secret")]
    pub jwt_secret: Option<SecretString>,
    /// 토큰 유효 시간 (시간)
    pub token_ttl_hours: i64,
    /// 회원가입 시 부여되는 기본 역할 ID
    pub default_role_id: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: None,
            token_ttl_hours: 24,
            default_role_id: 1,
        }
    }
}

/// 로깅 설정.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// 로그 레벨 필터 (예: "info", "gatekeeper_api=debug,tower_http=info")
    pub level: String,
    /// 로그 형식 (pretty, json, compact)
    pub format: String,
    /// 파일명과 줄 번호 포함 여부
    pub with_file: bool,
    /// 대상(모듈 경로) 포함 여부
    pub with_target: bool,
    /// span 진입/종료 이벤트 기록 여부
    pub span_events: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            with_file: false,
            with_target: true,
            span_events: false,
        }
    }
}

fn deserialize_secret<'de, D>(deserializer: D) -> Result<Option<SecretString>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw
        .filter(|s| !s.is_empty())
        .map(|s| SecretString::new(s.into())))
}

/// `DB_HOST` 등 개별 변수에서 연결 문자열을 조립합니다.
fn database_url_from_parts() -> Option<String> {
    let host = std::env::var("DB_HOST").ok()?;
    let port = std::env::var("DB_PORT").unwrap_or_else(|_| "5432".to_string());
    let user = std::env::var("DB_USER").unwrap_or_else(|_| "postgres".to_string());
    let password = std::env::var("DB_PASSWORD").unwrap_or_default();
    let name = std::env::var("DB_NAME").unwrap_or_else(|_| "gatekeeper".to_string());

    Some(format!(
        "postgres://{}:{}@{}:{}/{}",
        user, password, host, port, name
    ))
}

impl AppConfig {
    /// 파일과 환경 변수에서 설정을 로드합니다.
    ///
    /// 파일이 없어도 에러가 아닙니다.
    pub fn load<P: AsRef<Path>>(path: P) -> CoreResult<Self> {
        let database_url = std::env::var("DATABASE_URL")
            .ok()
            .or_else(database_url_from_parts);
        let port = std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse::<i64>().ok());

        let builder = config::Config::builder()
            // 기본값으로 시작
            .set_default("environment", "development")?
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?
            .set_default("server.request_timeout_secs", 30)?
            .set_default("database.max_connections", 10)?
            .set_default("database.connection_timeout_secs", 10)?
            .set_default("database.run_migrations", true)?
            .set_default("auth.token_ttl_hours", 24)?
            .set_default("auth.default_role_id", 1)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?
            .set_default("logging.with_file", false)?
            .set_default("logging.with_target", true)?
            .set_default("logging.span_events", false)?
            // 파일에서 로드
            .add_source(config::File::from(path.as_ref()).required(false))
            // 환경 변수로 오버라이드
            .add_source(
                config::Environment::with_prefix("GATEKEEPER")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option("environment", std::env::var("APP_ENV").ok())?
            .set_override_option("server.host", std::env::var("HOST").ok())?
            .set_override_option("server.port", port)?
            .set_override_option("database.url", database_url)?
            .set_override_option("auth.jwt_secret", std::env::var("JWT_SECRET").ok())?;

        let config: AppConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// 기본 경로에서 설정을 로드합니다.
    pub fn load_default() -> CoreResult<Self> {
        Self::load("config/default.toml")
    }

    /// 운영 환경인지 확인합니다.
    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    /// 설정 값의 일관성을 검증합니다.
    pub fn validate(&self) -> CoreResult<()> {
        if self.auth.token_ttl_hours <= 0 {
            return Err(CoreError::Config(
                "auth.token_ttl_hours must be positive".to_string(),
            ));
        }
        if self.auth.token_ttl_hours > MAX_TOKEN_TTL_HOURS {
            return Err(CoreError::Config(format!(
                "auth.token_ttl_hours must be at most {}",
                MAX_TOKEN_TTL_HOURS
            )));
        }
        if self.database.max_connections == 0 {
            return Err(CoreError::Config(
                "database.max_connections must be at least 1".to_string(),
            ));
        }
        if self.is_production() && self.auth.jwt_secret.is_none() {
            return Err(CoreError::Config(
                "JWT_SECRET is required in production".to_string(),
            ));
        }
        Ok(())
    }

    /// 서명 비밀 키를 반환합니다.
    ///
    /// 설정되지 않았으면 개발용 비밀 키를 반환하고 경고를 남깁니다.
    pub fn jwt_secret(&self) -> SecretString {
        match &self.auth.jwt_secret {
            Some(secret) => SecretString::new(secret.expose_secret().into()),
            None => {
                tracing::warn!("JWT_SECRET not set, using default (INSECURE for development only)");
                SecretString::new(DEVELOPMENT_JWT_SECRET.into())
            }
        }
    }
}

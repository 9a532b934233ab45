//! Gatekeeper API 서버 진입점.
//!
//! 설정 로드 → 로깅 초기화 → 메트릭 레코더 → 자격증명 저장소 연결 →
//! 라우터 조립 → graceful shutdown 순서로 동작합니다.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context};
use gatekeeper_api::metrics::setup_metrics_recorder;
use gatekeeper_api::repository::{InMemoryCredentialStore, PgCredentialStore};
use gatekeeper_api::{create_router, AppState, TokenCodec};
use gatekeeper_core::{init_logging, AppConfig, CredentialStore};
use sqlx::postgres::PgPoolOptions;
use tracing::{error, info, warn};

/// OpenAPI 스펙 내보내기 처리.
///
/// `--export-openapi` 플래그 또는 `EXPORT_OPENAPI` 환경변수가 설정된 경우
/// OpenAPI JSON 스펙을 stdout으로 출력하고 `true`를 반환합니다.
fn handle_export_openapi() -> anyhow::Result<bool> {
    use gatekeeper_api::openapi::ApiDoc;
    use utoipa::OpenApi as _;

    let export_flag = std::env::args().any(|arg| arg == "--export-openapi");
    let export_env = std::env::var("EXPORT_OPENAPI")
        .map(|v| v == "1" || v == "true")
        .unwrap_or(false);

    if export_flag || export_env {
        let json = serde_json::to_string_pretty(&ApiDoc::openapi())?;
        println!("{}", json);
        return Ok(true);
    }

    Ok(false)
}

/// 자격증명 저장소 연결.
///
/// `database.url`이 있으면 PostgreSQL에 연결하고 필요 시 마이그레이션을 실행합니다.
/// 없으면 인메모리 저장소로 실행합니다 (재시작 시 데이터 유실).
async fn connect_store(config: &AppConfig) -> anyhow::Result<Arc<dyn CredentialStore>> {
    let Some(url) = config.database.url.as_deref() else {
        warn!("DATABASE_URL not set, using in-memory credential store (data is not persisted)");
        return Ok(Arc::new(InMemoryCredentialStore::with_default_roles()));
    };

    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .acquire_timeout(Duration::from_secs(config.database.connection_timeout_secs))
        .connect(url)
        .await
        .context("Failed to connect to database")?;
    info!(
        max_connections = config.database.max_connections,
        "Database connected"
    );

    let store = PgCredentialStore::from_pool(pool);
    if config.database.run_migrations {
        store.migrate().await.context("Failed to run migrations")?;
    }

    Ok(Arc::new(store))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env 파일 로드 (있는 경우)
    let _ = dotenvy::dotenv();

    if handle_export_openapi()? {
        return Ok(());
    }

    let config = AppConfig::load_default().context("Failed to load configuration")?;

    init_logging(&config.logging)
        .map_err(|e| anyhow!("Failed to initialize logging: {}", e))?;

    info!(
        environment = %config.environment,
        version = env!("CARGO_PKG_VERSION"),
        "Starting Gatekeeper API server"
    );

    let metrics_handle =
        setup_metrics_recorder().context("Failed to install Prometheus recorder")?;

    let store = match connect_store(&config).await {
        Ok(store) => store,
        Err(e) => {
            error!(error = %e, "Credential store initialization failed");
            return Err(e);
        }
    };
    info!(backend = store.backend_name(), "Credential store ready");

    let codec = TokenCodec::new(
        &config.jwt_secret(),
        chrono::Duration::hours(config.auth.token_ttl_hours),
    );
    let state = Arc::new(AppState::new(store, codec, config.auth.default_role_id));

    let app = create_router(
        state,
        Some(metrics_handle),
        Duration::from_secs(config.server.request_timeout_secs),
    );

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;

    info!(%addr, "API server listening");
    info!("Swagger UI available at http://{}/swagger-ui", addr);
    info!("Metrics available at http://{}/metrics", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped gracefully");

    Ok(())
}

/// Graceful shutdown 시그널 대기.
///
/// Ctrl+C 또는 SIGTERM 시그널을 수신하면 반환하여 서버가 처리 중인 요청을 마치게 합니다.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            warn!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            warn!("Received SIGTERM, initiating graceful shutdown...");
        }
    }
}

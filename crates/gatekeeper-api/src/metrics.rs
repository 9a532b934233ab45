//! Prometheus 메트릭 설정 및 유틸리티.
//!
//! HTTP 요청 메트릭과 인증/인가 결과를 수집하고 `/metrics` 엔드포인트로 노출합니다.
//! 레코더가 설치되지 않은 상태(테스트 등)에서는 기록 호출이 무시됩니다.

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, Matcher, PrometheusBuilder, PrometheusHandle};

/// Prometheus 메트릭 레코더를 설정하고 핸들을 반환합니다.
///
/// # 반환값
///
/// `/metrics` 엔드포인트에서 메트릭을 렌더링하기 위한 `PrometheusHandle`
///
/// # Errors
///
/// 버킷 설정이 잘못되었거나 레코더가 이미 설치되어 있으면 에러를 반환합니다.
pub fn setup_metrics_recorder() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full("http_request_duration_seconds".to_string()),
            &[0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0],
        )?
        .install_recorder()
}

// ============================================================================
// HTTP 메트릭 헬퍼 함수
// ============================================================================

/// HTTP 요청 카운터 증가.
pub fn record_http_request(method: &str, path: &str) {
    counter!("http_requests_total", "method" => method.to_string(), "path" => path.to_string())
        .increment(1);
}

/// HTTP 응답 카운터 증가.
pub fn record_http_response(method: &str, path: &str, status: u16) {
    counter!(
        "http_responses_total",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// HTTP 요청 지속 시간 기록.
pub fn record_http_duration(method: &str, path: &str, duration_secs: f64) {
    histogram!(
        "http_request_duration_seconds",
        "method" => method.to_string(),
        "path" => path.to_string()
    )
    .record(duration_secs);
}

// ============================================================================
// 인증/인가 메트릭 헬퍼 함수
// ============================================================================

/// 로그인 시도 결과 (success, invalid_credentials).
pub fn record_login(result: &'static str) {
    counter!("auth_logins_total", "result" => result).increment(1);
}

/// 회원가입 시도 결과 (success, email_taken, error).
pub fn record_registration(result: &'static str) {
    counter!("auth_registrations_total", "result" => result).increment(1);
}

/// 인증 미들웨어 거부 사유.
pub fn record_token_rejection(reason: &'static str) {
    counter!("auth_token_rejections_total", "reason" => reason).increment(1);
}

/// 권한 미들웨어 판정 (allow, deny).
pub fn record_authz_decision(permission: &str, result: &'static str) {
    counter!(
        "authz_decisions_total",
        "permission" => permission.to_string(),
        "result" => result
    )
    .increment(1);
}

// ============================================================================
// 경로 정규화 유틸리티
// ============================================================================

/// 경로에서 숫자 ID 세그먼트를 정규화합니다.
///
/// 예: `/api/admin/users/42/role` → `/api/admin/users/:id/role`
pub fn normalize_path(path: &str) -> String {
    path.split('/')
        .map(|segment| {
            if !segment.is_empty() && segment.chars().all(|c| c.is_ascii_digit()) {
                ":id"
            } else {
                segment
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

//! 전체 라우터를 통한 인증/인가 흐름 통합 테스트.
//!
//! 인메모리 저장소로 회원가입부터 관리자 권한 부여까지 실제 미들웨어 체인을 거칩니다.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    response::Response,
    Router,
};
use gatekeeper_api::{
    create_router, ApiErrorResponse, AppState, Claims, InMemoryCredentialStore, LoginResponse,
    TokenCodec, UserProfileResponse,
};
use gatekeeper_core::CredentialStore;
use secrecy::SecretString;
use serde_json::{json, Value};
use tower::ServiceExt;

const SECRET: &str = "integration-test-secret";

struct TestApp {
    router: Router,
    store: Arc<InMemoryCredentialStore>,
    codec: TokenCodec,
}

impl TestApp {
    fn new() -> Self {
        let store = Arc::new(InMemoryCredentialStore::with_default_roles());
        let codec = TokenCodec::new(
            &SecretString::new(SECRET.into()),
            chrono::Duration::hours(24),
        );
        let state = Arc::new(AppState::new(store.clone(), codec.clone(), 1));
        let router = create_router(state, None, Duration::from_secs(30));

        Self {
            router,
            store,
            codec,
        }
    }

    async fn send(&self, request: Request<Body>) -> Response {
        self.router.clone().oneshot(request).await.unwrap()
    }

    async fn register(&self, email: &str, password: &str) -> Response {
        self.send(json_request(
            "POST",
            "/api/auth/register",
            None,
            json!({
                "email": email,
                "password": password,
                "first_name": "Test",
                "last_name": "User"
            }),
        ))
        .await
    }

    async fn login(&self, email: &str, password: &str) -> LoginResponse {
        let response = self
            .send(json_request(
                "POST",
                "/api/auth/login",
                None,
                json!({"email": email, "password": password}),
            ))
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        body_json(response).await
    }
}

fn json_request(method: &str, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn get(uri: &str, authorization: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(value) = authorization {
        builder = builder.header(header::AUTHORIZATION, value);
    }
    builder.body(Body::empty()).unwrap()
}

async fn body_json<T: serde::de::DeserializeOwned>(response: Response) -> T {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn error_of(response: Response) -> ApiErrorResponse {
    body_json(response).await
}

#[tokio::test]
async fn test_register_login_and_promote_to_admin() {
    let app = TestApp::new();

    // 일반 사용자 두 명 가입
    assert_eq!(
        app.register("admin@example.com", "secret-1").await.status(),
        StatusCode::CREATED
    );
    let response = app.register("member@example.com", "secret-2").await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let member: Value = body_json(response).await;
    let member_id = member["id"].as_i64().unwrap();

    // 본인 정보 조회
    let session = app.login("admin@example.com", "secret-1").await;
    let bearer = format!("Bearer {}", session.token);
    let response = app.send(get("/api/users/me", Some(&bearer))).await;
    assert_eq!(response.status(), StatusCode::OK);
    let profile: UserProfileResponse = body_json(response).await;
    assert_eq!(profile.user.email, "admin@example.com");
    assert_eq!(profile.role.name, "user");

    // 기본 역할은 admin 권한이 없음
    let response = app.send(get("/api/admin/users", Some(&bearer))).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(error_of(response).await.error, "Permission denied");

    // 저장소에서 직접 관리자 역할로 승격
    let mut admin = app
        .store
        .find_user_by_email("admin@example.com")
        .await
        .unwrap()
        .unwrap();
    admin.role_id = 2;
    app.store.update_user(&admin).await.unwrap();

    // 이전 토큰은 발급 시점의 역할을 유지
    let response = app.send(get("/api/admin/users", Some(&bearer))).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // 재로그인 후 관리자 엔드포인트 사용 가능
    let session = app.login("admin@example.com", "secret-1").await;
    let admin_token = session.token;
    let response = app
        .send(get(
            "/api/admin/users",
            Some(&format!("Bearer {}", admin_token)),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let listing: Value = body_json(response).await;
    assert_eq!(listing["total"], 2);

    // 관리자가 다른 사용자 역할 변경
    let response = app
        .send(json_request(
            "PUT",
            &format!("/api/admin/users/{}/role", member_id),
            Some(&admin_token),
            json!({"role_id": 2}),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let promoted: UserProfileResponse = body_json(response).await;
    assert!(promoted.role.has_permission("admin"));
}

#[tokio::test]
async fn test_admin_creates_permission_and_role() {
    let app = TestApp::new();
    app.register("root@example.com", "secret-1").await;

    let mut root = app
        .store
        .find_user_by_email("root@example.com")
        .await
        .unwrap()
        .unwrap();
    root.role_id = 2;
    app.store.update_user(&root).await.unwrap();
    let token = app.login("root@example.com", "secret-1").await.token;

    let response = app
        .send(json_request(
            "POST",
            "/api/admin/permissions",
            Some(&token),
            json!({"name": "reports:read", "description": "Read reports"}),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let permission: Value = body_json(response).await;

    let response = app
        .send(json_request(
            "POST",
            "/api/admin/roles",
            Some(&token),
            json!({"name": "analyst", "permission_ids": [permission["id"]]}),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .send(json_request(
            "POST",
            "/api/admin/roles",
            Some(&token),
            json!({"name": "analyst"}),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(error_of(response).await.error, "Role already exists");
}

#[tokio::test]
async fn test_authentication_failures() {
    let app = TestApp::new();

    let response = app.send(get("/api/users/me", None)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        error_of(response).await.error,
        "Authorization header is required"
    );

    let response = app.send(get("/api/users/me", Some("Token abc"))).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        error_of(response).await.error,
        "Authorization header format must be Bearer {token}"
    );

    let response = app
        .send(get("/api/users/me", Some("Bearer not.a.token")))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(error_of(response).await.error, "Invalid token");

    // 다른 비밀 키로 서명된 토큰
    let foreign = TokenCodec::new(
        &SecretString::new("another-secret".into()),
        chrono::Duration::hours(1),
    )
    .issue(1, 2)
    .unwrap();
    let response = app
        .send(get("/api/admin/users", Some(&format!("Bearer {}", foreign))))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(error_of(response).await.error, "Invalid token");
}

#[tokio::test]
async fn test_expired_token_rejected() {
    let app = TestApp::new();
    app.register("late@example.com", "secret-1").await;

    let expired = app
        .codec
        .sign(&Claims {
            user_id: 1,
            role_id: 1,
            iat: 1_000,
            exp: 2_000,
            jti: None,
        })
        .unwrap();

    let response = app
        .send(get("/api/users/me", Some(&format!("Bearer {}", expired))))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let error = error_of(response).await;
    assert_eq!(error.error, "Invalid token");
    assert_eq!(error.code, "TOKEN_EXPIRED");
}

#[tokio::test]
async fn test_token_for_unknown_role_is_rejected_by_permission_gate() {
    let app = TestApp::new();
    let token = app.codec.issue(1, 77).unwrap();

    let response = app
        .send(get("/api/admin/users", Some(&format!("Bearer {}", token))))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(error_of(response).await.error, "Role not found");
}

#[tokio::test]
async fn test_health_is_public() {
    let app = TestApp::new();

    let response = app.send(get("/api/health", None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let health: Value = body_json(response).await;
    assert_eq!(health["status"], "ok");

    app.store.set_unavailable(true);
    let response = app.send(get("/api/health", None)).await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_openapi_document_served() {
    let app = TestApp::new();

    let response = app.send(get("/api-docs/openapi.json", None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let spec: Value = body_json(response).await;
    assert!(spec["paths"]["/api/auth/login"].is_object());
}

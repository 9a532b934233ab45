//! # Gatekeeper Core
//!
//! 역할 기반 접근 제어(RBAC) 게이트키퍼의 핵심 도메인 모델 및 타입을 제공합니다.
//!
//! 이 크레이트는 HTTP 계층과 무관한 기본 구성 요소를 제공합니다:
//! - 사용자, 역할, 권한 도메인 모델
//! - 자격증명 저장소 인터페이스 ([`CredentialStore`])
//! - 설정 관리
//! - 로깅 인프라

pub mod config;
pub mod domain;
pub mod error;
pub mod logging;

pub use config::*;
pub use domain::*;
pub use error::*;
pub use logging::*;

//! 인증 및 권한 부여를 위한 도메인 모델.

mod credential_store;
mod identity;

pub use credential_store::*;
pub use identity::*;

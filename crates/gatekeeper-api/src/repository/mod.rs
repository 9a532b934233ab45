//! 자격증명 저장소 구현체.
//!
//! - [`PgCredentialStore`]: PostgreSQL (운영)
//! - [`InMemoryCredentialStore`]: 프로세스 메모리 (로컬 실행, 테스트)

mod memory;
mod postgres;

pub use memory::InMemoryCredentialStore;
pub use postgres::PgCredentialStore;

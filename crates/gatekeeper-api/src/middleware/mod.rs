//! API 서버용 HTTP middleware.
//!
//! 인증/인가와 무관하게 모든 요청에 적용되는 middleware 모듈.

mod metrics;
mod request_logging;

pub use self::metrics::metrics_layer;
pub use request_logging::request_logging;

//! tracing 구독자 초기화.
//!
//! `[logging]` 설정 섹션의 값이 그대로 fmt 레이어에 반영됩니다.
//! 비밀번호, 해시, 토큰 원문은 어떤 형식으로도 로그에 남기지 않습니다.

use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

use crate::config::LoggingConfig;

/// 로그 출력 형식.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// 사람이 읽기 쉬운 여러 줄 형식 (개발용)
    #[default]
    Pretty,
    /// 로그 집계용 JSON
    Json,
    /// 한 줄 형식
    Compact,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            "compact" => Ok(Self::Compact),
            _ => Err(format!("Unknown log format: {}", s)),
        }
    }
}

impl LoggingConfig {
    /// 설정된 출력 형식. 알 수 없는 문자열이면 pretty.
    pub fn log_format(&self) -> LogFormat {
        self.format.parse().unwrap_or_default()
    }

    fn span_events(&self) -> FmtSpan {
        if self.span_events {
            FmtSpan::NEW | FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        }
    }
}

/// 전역 tracing 구독자를 설치합니다.
///
/// `RUST_LOG`가 설정되어 있으면 `settings.level`보다 우선합니다.
/// 이미 구독자가 설치되어 있으면 에러를 반환합니다.
///
/// # Arguments
/// * `settings` - `[logging]` 설정 섹션
pub fn init_logging(settings: &LoggingConfig) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&settings.level))?;

    let format = settings.log_format();
    let base = fmt::layer()
        .with_file(settings.with_file)
        .with_line_number(settings.with_file)
        .with_target(settings.with_target)
        .with_span_events(settings.span_events());
    let fmt_layer = match format {
        LogFormat::Pretty => base.pretty().boxed(),
        LogFormat::Json => base.json().boxed(),
        LogFormat::Compact => base.compact().boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()?;

    tracing::info!(
        format = ?format,
        level = %settings.level,
        "Logging initialized"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_from_str() {
        assert_eq!("pretty".parse::<LogFormat>().unwrap(), LogFormat::Pretty);
        assert_eq!("json".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("COMPACT".parse::<LogFormat>().unwrap(), LogFormat::Compact);
        assert!("xml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn test_unknown_format_falls_back_to_pretty() {
        let settings = LoggingConfig {
            format: "yaml".to_string(),
            ..Default::default()
        };
        assert_eq!(settings.log_format(), LogFormat::Pretty);
    }

    #[test]
    fn test_toggles_read_from_settings_section() {
        let json = r#"{"level": "debug", "format": "json", "with_file": true, "span_events": true}"#;
        let settings: LoggingConfig = serde_json::from_str(json).unwrap();

        assert_eq!(settings.log_format(), LogFormat::Json);
        assert!(settings.with_file);
        // 생략된 항목은 기본값
        assert!(settings.with_target);
        assert_eq!(settings.span_events(), FmtSpan::NEW | FmtSpan::CLOSE);

        assert_eq!(LoggingConfig::default().span_events(), FmtSpan::NONE);
    }
}

//! 에러 타입 — 도메인별 에러 정의

/// Sbomstream 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum SbomStreamError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// SBOM 문서 파싱 에러
    #[error("parse error: {0}")]
    Parse(#[from] ParseFailure),

    /// 파이프라인 처리 에러
    #[error("pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// SBOM 문서 파싱 실패
#[derive(Debug, thiserror::Error)]
pub enum ParseFailure {
    /// 지원하지 않는 문서 형식
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    /// 파싱 실패 (스트림 바이트 오프셋 포함)
    #[error("parse failed at offset {offset}: {reason}")]
    Failed { offset: u64, reason: String },

    /// 입력 데이터 초과
    #[error("input too large: {size} bytes (max: {max})")]
    TooLarge { size: u64, max: u64 },
}

/// 파이프라인 처리 에러
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// 채널 전송 실패
    #[error("channel send failed: {0}")]
    ChannelSend(String),

    /// 채널 수신 실패
    #[error("channel receive failed: {0}")]
    ChannelRecv(String),

    /// 파이프라인 초기화 실패
    #[error("pipeline init failed: {0}")]
    InitFailed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_display() {
        let err = SbomStreamError::Config(ConfigError::InvalidValue {
            field: "parser.buffer_size".to_owned(),
            reason: "must be greater than 0".to_owned(),
        });
        let msg = err.to_string();
        assert!(msg.contains("parser.buffer_size"));
        assert!(msg.contains("must be greater than 0"));
    }

    #[test]
    fn parse_failure_display_includes_offset() {
        let err = SbomStreamError::Parse(ParseFailure::Failed {
            offset: 4096,
            reason: "unexpected token".to_owned(),
        });
        let msg = err.to_string();
        assert!(msg.contains("4096"));
        assert!(msg.contains("unexpected token"));
    }

    #[test]
    fn parse_failure_too_large_display() {
        let err = ParseFailure::TooLarge {
            size: 20_000_000,
            max: 10_000_000,
        };
        let msg = err.to_string();
        assert!(msg.contains("20000000"));
        assert!(msg.contains("10000000"));
    }

    #[test]
    fn pipeline_error_display() {
        let err = SbomStreamError::Pipeline(PipelineError::ChannelSend("receiver dropped".to_owned()));
        assert!(err.to_string().contains("receiver dropped"));
    }

    #[test]
    fn io_error_converts() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let err: SbomStreamError = io_err.into();
        assert!(matches!(err, SbomStreamError::Io(_)));
    }
}

//! 병합 모듈 에러 타입
//!
//! [`MergeError`]는 병합/검증 오케스트레이션에서 발생할 수 있는 모든
//! 에러를 나타냅니다. 파서 에러는 어느 파일의 어느 위치에서 실패했는지
//! 알 수 있도록 경로와 함께 감쌉니다. 형식 탐지 실패는 탐지기 내부에서
//! 조용히 처리되지 않고 `UnsupportedFormat`으로 사용자에게 표면화됩니다.

use sbomstream_core::error::{ConfigError, ParseFailure, PipelineError, SbomStreamError};
use sbomstream_spdx::SpdxError;

/// 병합/검증 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum MergeError {
    /// SBOM 문서 파싱 실패
    #[error("sbom parse error: {path}: {source}")]
    Parse {
        /// 실패한 문서 경로
        path: String,
        /// 원본 파서 에러 (섹션/필드/오프셋 포함)
        source: SpdxError,
    },

    /// 어느 dialect에도 맞지 않는 문서
    #[error("unsupported sbom format: {path}")]
    UnsupportedFormat {
        /// 문서 경로
        path: String,
    },

    /// 채널 통신 에러
    #[error("channel error: {0}")]
    Channel(String),

    /// 설정 에러
    #[error("config error: {field}: {reason}")]
    Config {
        /// 설정 필드명
        field: String,
        /// 에러 사유
        reason: String,
    },

    /// 파일 I/O 에러
    #[error("io error: {path}: {source}")]
    Io {
        /// 관련 파일 경로
        path: String,
        /// 원본 I/O 에러
        source: std::io::Error,
    },

    /// 파일 크기 초과
    #[error("file too large: {path}: {size} bytes (max: {max})")]
    FileTooBig {
        /// 파일 경로
        path: String,
        /// 실제 파일 크기 (바이트)
        size: u64,
        /// 최대 허용 크기 (바이트)
        max: u64,
    },
}

impl From<MergeError> for SbomStreamError {
    fn from(err: MergeError) -> Self {
        match err {
            MergeError::Parse { path, source } => {
                let inner: SbomStreamError = source.into();
                match inner {
                    SbomStreamError::Parse(ParseFailure::Failed { offset, reason }) => {
                        SbomStreamError::Parse(ParseFailure::Failed {
                            offset,
                            reason: format!("{path}: {reason}"),
                        })
                    }
                    other => other,
                }
            }
            MergeError::UnsupportedFormat { path } => {
                SbomStreamError::Parse(ParseFailure::UnsupportedFormat(path))
            }
            MergeError::Channel(msg) => {
                SbomStreamError::Pipeline(PipelineError::ChannelSend(msg))
            }
            MergeError::Config { field, reason } => {
                SbomStreamError::Config(ConfigError::InvalidValue { field, reason })
            }
            MergeError::Io { source, .. } => SbomStreamError::Io(source),
            MergeError::FileTooBig { size, max, .. } => {
                SbomStreamError::Parse(ParseFailure::TooLarge { size, max })
            }
        }
    }
}

//! SPDX 파서 에러 타입
//!
//! [`SpdxError`]는 파서 하나의 수명 안에서 발생할 수 있는 모든 에러를
//! 나타냅니다. 모든 에러는 해당 파서 인스턴스에 치명적이며, 에러 이후
//! 인스턴스는 폐기되어야 합니다 (재시도/부분 복구 없음).
//! `From<SpdxError> for SbomStreamError` 구현을 통해 `?` 연산자로
//! 상위 에러 타입으로 자연스럽게 전파됩니다.
//!
//! # 에러 카테고리
//!
//! - **토큰화**: `MalformedJson`, `Truncated`, `EndOfStream`
//! - **필수 필드**: `MissingRequiredProperty`
//! - **루트 스캐너**: `UnknownMetadataProperty`
//! - **상태 머신**: `WrongState`, `IncompleteSection`, `IncompleteMetadata`
//! - **값 검증**: `InvalidFieldValue`
//! - **설정/입출력**: `Config`, `Io`

use sbomstream_core::error::{ConfigError, ParseFailure, SbomStreamError};

use crate::types::ParserState;

/// SPDX 파서 도메인 에러
///
/// 알려진 경우 스트림 바이트 오프셋을 함께 담습니다.
#[derive(Debug, thiserror::Error)]
pub enum SpdxError {
    /// 토크나이저가 바이트 열을 거부함 (잘못된 JSON 문법)
    #[error("malformed json at offset {offset}: {reason}")]
    MalformedJson {
        /// 거부된 위치의 스트림 바이트 오프셋
        offset: u64,
        /// 거부 사유
        reason: String,
    },

    /// 최상위 문서가 완성되기 전에 스트림이 끝남
    #[error("document truncated at offset {offset}")]
    Truncated {
        /// 스트림이 끝난 바이트 오프셋
        offset: u64,
    },

    /// 비어 있거나 이미 소진된 스트림 위에 파서를 생성함
    #[error("stream is empty or already exhausted")]
    EndOfStream,

    /// 필수 필드 누락 (누락된 이름 전체를 하나의 에러로 집계)
    #[error("required fields missing: {}", fields.join(", "))]
    MissingRequiredProperty {
        /// 누락된 필드/속성 이름 목록
        fields: Vec<String>,
    },

    /// 메타데이터 집합, 배열 섹션 집합, skip 집합 어디에도 없는 루트 속성
    #[error("unknown root property '{name}' at offset {offset}")]
    UnknownMetadataProperty {
        /// 알 수 없는 속성 이름
        name: String,
        /// 속성 이름이 나타난 바이트 오프셋
        offset: u64,
    },

    /// 상태 머신이 해당 섹션에 멈춰 있지 않은데 시퀀스를 요청함
    #[error("wrong parser state: expected {expected}, current {actual}")]
    WrongState {
        /// 요청이 유효한 상태
        expected: ParserState,
        /// 실제 현재 상태
        actual: ParserState,
    },

    /// 존재하는 필드가 의미 검증에 실패함
    #[error("invalid value for '{field}': {reason}")]
    InvalidFieldValue {
        /// 필드 이름
        field: String,
        /// 실패 사유
        reason: String,
    },

    /// 섹션에 진입했으나 끝까지 소비하지 않은 채 종료 상태에 도달함
    #[error("section '{section}' was started but not fully drained")]
    IncompleteSection {
        /// 섹션 이름
        section: String,
    },

    /// 메타데이터를 회수하지 않은 채 종료를 선언함
    #[error("document metadata was never retrieved")]
    IncompleteMetadata,

    /// SBOM 문서 생성 (쓰기 방향) 실패
    #[error("sbom generation error: {0}")]
    Generation(String),

    /// 파서 설정 에러
    #[error("config error: {field}: {reason}")]
    Config {
        /// 설정 필드명
        field: String,
        /// 에러 사유
        reason: String,
    },

    /// 스트림 읽기 I/O 에러
    #[error("io error at offset {offset}: {source}")]
    Io {
        /// 에러 발생 시점의 스트림 바이트 오프셋
        offset: u64,
        /// 원본 I/O 에러
        source: std::io::Error,
    },
}

impl From<SpdxError> for SbomStreamError {
    fn from(err: SpdxError) -> Self {
        match err {
            SpdxError::MalformedJson { offset, reason } => {
                SbomStreamError::Parse(ParseFailure::Failed { offset, reason })
            }
            SpdxError::Truncated { offset } => SbomStreamError::Parse(ParseFailure::Failed {
                offset,
                reason: "document truncated".to_owned(),
            }),
            SpdxError::EndOfStream => SbomStreamError::Parse(ParseFailure::Failed {
                offset: 0,
                reason: "stream is empty or already exhausted".to_owned(),
            }),
            SpdxError::MissingRequiredProperty { fields } => {
                SbomStreamError::Parse(ParseFailure::Failed {
                    offset: 0,
                    reason: format!("required fields missing: {}", fields.join(", ")),
                })
            }
            SpdxError::UnknownMetadataProperty { name, offset } => {
                SbomStreamError::Parse(ParseFailure::Failed {
                    offset,
                    reason: format!("unknown root property '{name}'"),
                })
            }
            SpdxError::WrongState { expected, actual } => {
                SbomStreamError::Parse(ParseFailure::Failed {
                    offset: 0,
                    reason: format!("wrong parser state: expected {expected}, current {actual}"),
                })
            }
            SpdxError::InvalidFieldValue { field, reason } => {
                SbomStreamError::Parse(ParseFailure::Failed {
                    offset: 0,
                    reason: format!("invalid value for '{field}': {reason}"),
                })
            }
            SpdxError::IncompleteSection { section } => {
                SbomStreamError::Parse(ParseFailure::Failed {
                    offset: 0,
                    reason: format!("section '{section}' was started but not fully drained"),
                })
            }
            SpdxError::IncompleteMetadata => SbomStreamError::Parse(ParseFailure::Failed {
                offset: 0,
                reason: "document metadata was never retrieved".to_owned(),
            }),
            SpdxError::Generation(msg) => SbomStreamError::Parse(ParseFailure::Failed {
                offset: 0,
                reason: format!("sbom generation error: {msg}"),
            }),
            SpdxError::Config { field, reason } => {
                SbomStreamError::Config(ConfigError::InvalidValue { field, reason })
            }
            SpdxError::Io { source, .. } => SbomStreamError::Io(source),
        }
    }
}

//! SPDX 파서 설정
//!
//! [`ParserConfig`]는 파서 인스턴스 하나의 동작을 결정하는 불변 설정입니다.
//! skip 집합을 포함한 모든 설정은 파서 생성 시점에 고정되며,
//! 파싱 도중 동작을 바꾸는 것은 표현 자체가 불가능합니다.
//!
//! # 사용 예시
//!
//! ```
//! use sbomstream_spdx::ParserConfig;
//!
//! // 기본값으로 생성
//! let config = ParserConfig::default();
//! config.validate().unwrap();
//!
//! // 빌더로 생성 (형식 탐지용: 값 비싼 섹션 건너뛰기)
//! use sbomstream_spdx::ParserConfigBuilder;
//!
//! let config = ParserConfigBuilder::new()
//!     .buffer_size(8192)
//!     .skip_property("files")
//!     .skip_property("packages")
//!     .build()
//!     .unwrap();
//! ```

use serde::{Deserialize, Serialize};

use crate::error::SpdxError;

/// 읽기 버퍼 초기 크기 상한 (16MB)
const MAX_BUFFER_SIZE: usize = 16 * 1024 * 1024;

/// SPDX 파서 설정
///
/// # 필드
///
/// - **buffer_size**: 읽기 버퍼 초기 크기. 단일 토큰이 버퍼보다 크면
///   버퍼는 기하급수적으로 늘어나지만, 초기 크기는 이 값을 따릅니다.
/// - **skip_properties**: 도메인 타입을 만들지 않고 버릴 최상위 속성
///   이름 목록. skip 집합은 메타데이터/섹션 분류보다 먼저 평가되므로
///   섹션 이름(`files` 등)을 넣으면 해당 섹션 전체가 건너뛰어지며,
///   건너뛴 속성은 완전성 검증 대상에서도 제외됩니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParserConfig {
    /// 읽기 버퍼의 초기 크기 (바이트)
    pub buffer_size: usize,
    /// 파싱 없이 건너뛸 최상위 속성 이름 목록
    pub skip_properties: Vec<String>,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            buffer_size: 4096,
            skip_properties: Vec::new(),
        }
    }
}

impl ParserConfig {
    /// core의 `SpdxConfig` 섹션에서 파서 설정을 생성합니다.
    pub fn from_core(core: &sbomstream_core::config::SpdxConfig) -> Self {
        Self {
            buffer_size: core.buffer_size,
            skip_properties: core.skip_properties.clone(),
        }
    }

    /// 설정 값의 유효성을 검증합니다.
    ///
    /// # 검증 규칙
    ///
    /// - `buffer_size`: 1-16777216 (16MB)
    /// - `skip_properties`: 빈 이름 불가
    pub fn validate(&self) -> Result<(), SpdxError> {
        if self.buffer_size == 0 || self.buffer_size > MAX_BUFFER_SIZE {
            return Err(SpdxError::Config {
                field: "buffer_size".to_owned(),
                reason: format!("must be 1-{MAX_BUFFER_SIZE}"),
            });
        }

        if self.skip_properties.iter().any(|p| p.is_empty()) {
            return Err(SpdxError::Config {
                field: "skip_properties".to_owned(),
                reason: "property names must not be empty".to_owned(),
            });
        }

        Ok(())
    }

    /// 주어진 루트 속성이 skip 집합에 속하는지 확인합니다.
    pub fn skips(&self, property: &str) -> bool {
        self.skip_properties.iter().any(|p| p == property)
    }
}

/// [`ParserConfig`] 빌더
#[derive(Default)]
pub struct ParserConfigBuilder {
    config: ParserConfig,
}

impl ParserConfigBuilder {
    /// 기본값을 가진 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 읽기 버퍼 초기 크기를 설정합니다.
    pub fn buffer_size(mut self, size: usize) -> Self {
        self.config.buffer_size = size;
        self
    }

    /// skip 집합에 속성 이름 하나를 추가합니다.
    pub fn skip_property(mut self, name: impl Into<String>) -> Self {
        self.config.skip_properties.push(name.into());
        self
    }

    /// skip 집합 전체를 설정합니다.
    pub fn skip_properties(mut self, names: Vec<String>) -> Self {
        self.config.skip_properties = names;
        self
    }

    /// 설정을 검증하고 빌드합니다.
    ///
    /// # Errors
    ///
    /// 유효성 검증 실패 시 `SpdxError::Config` 반환
    pub fn build(self) -> Result<ParserConfig, SpdxError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = ParserConfig::default();
        config.validate().unwrap();
        assert_eq!(config.buffer_size, 4096);
        assert!(config.skip_properties.is_empty());
    }

    #[test]
    fn validate_rejects_zero_buffer_size() {
        let config = ParserConfig {
            buffer_size: 0,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(matches!(err, SpdxError::Config { .. }));
        assert!(err.to_string().contains("buffer_size"));
    }

    #[test]
    fn validate_rejects_oversized_buffer() {
        let config = ParserConfig {
            buffer_size: 32 * 1024 * 1024,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_empty_skip_name() {
        let config = ParserConfig {
            skip_properties: vec![String::new()],
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn skips_checks_membership() {
        let config = ParserConfigBuilder::new()
            .skip_property("files")
            .skip_property("packages")
            .build()
            .unwrap();
        assert!(config.skips("files"));
        assert!(config.skips("packages"));
        assert!(!config.skips("relationships"));
        assert!(!config.skips("spdxVersion"));
    }

    #[test]
    fn builder_creates_valid_config() {
        let config = ParserConfigBuilder::new()
            .buffer_size(64)
            .skip_properties(vec!["files".to_owned()])
            .build()
            .unwrap();
        assert_eq!(config.buffer_size, 64);
        assert_eq!(config.skip_properties, vec!["files"]);
    }

    #[test]
    fn builder_rejects_invalid_config() {
        let result = ParserConfigBuilder::new().buffer_size(0).build();
        assert!(result.is_err());
    }

    #[test]
    fn from_core_copies_section_values() {
        let core = sbomstream_core::config::SpdxConfig {
            buffer_size: 8192,
            skip_properties: vec!["externalDocumentRefs".to_owned()],
        };
        let config = ParserConfig::from_core(&core);
        assert_eq!(config.buffer_size, 8192);
        assert!(config.skips("externalDocumentRefs"));
    }
}

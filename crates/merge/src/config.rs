//! 병합 설정
//!
//! [`MergerConfig`]는 core의 [`MergeConfig`](sbomstream_core::config::MergeConfig)
//! 섹션에서 파생되며, 병합 인스턴스 하나의 동작을 결정합니다.

use serde::{Deserialize, Serialize};

use crate::error::MergeError;

/// 채널 용량 상한
const MAX_CHANNEL_CAPACITY: usize = 65_536;

/// 병합 오케스트레이터 설정
///
/// # 필드
///
/// - **channel_capacity**: 엔티티 채널(입력/출력)의 용량
/// - **max_file_size**: 입력 SBOM 파일 하나의 최대 크기 (바이트)
/// - **parser_buffer_size**: 각 파서 인스턴스의 읽기 버퍼 크기
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergerConfig {
    /// 엔티티 채널 용량
    pub channel_capacity: usize,
    /// 입력 SBOM 파일 최대 크기 (바이트)
    pub max_file_size: u64,
    /// 파서 읽기 버퍼 크기 (바이트)
    pub parser_buffer_size: usize,
}

impl Default for MergerConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 256,
            max_file_size: 50 * 1024 * 1024, // 50 MB
            parser_buffer_size: 4096,
        }
    }
}

impl MergerConfig {
    /// core의 `MergeConfig` 섹션에서 병합 설정을 생성합니다.
    ///
    /// core 설정에 없는 확장 필드는 기본값을 사용합니다.
    pub fn from_core(core: &sbomstream_core::config::MergeConfig) -> Self {
        Self {
            channel_capacity: core.channel_capacity,
            max_file_size: core.max_file_size,
            ..Self::default()
        }
    }

    /// 설정 값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), MergeError> {
        if self.channel_capacity == 0 || self.channel_capacity > MAX_CHANNEL_CAPACITY {
            return Err(MergeError::Config {
                field: "channel_capacity".to_owned(),
                reason: format!("must be 1-{MAX_CHANNEL_CAPACITY}"),
            });
        }

        if self.max_file_size == 0 {
            return Err(MergeError::Config {
                field: "max_file_size".to_owned(),
                reason: "must be greater than 0".to_owned(),
            });
        }

        if self.parser_buffer_size == 0 {
            return Err(MergeError::Config {
                field: "parser_buffer_size".to_owned(),
                reason: "must be greater than 0".to_owned(),
            });
        }

        Ok(())
    }
}

/// [`MergerConfig`] 빌더
#[derive(Default)]
pub struct MergerConfigBuilder {
    config: MergerConfig,
}

impl MergerConfigBuilder {
    /// 기본값을 가진 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 엔티티 채널 용량을 설정합니다.
    pub fn channel_capacity(mut self, capacity: usize) -> Self {
        self.config.channel_capacity = capacity;
        self
    }

    /// 입력 파일 최대 크기를 설정합니다.
    pub fn max_file_size(mut self, size: u64) -> Self {
        self.config.max_file_size = size;
        self
    }

    /// 파서 읽기 버퍼 크기를 설정합니다.
    pub fn parser_buffer_size(mut self, size: usize) -> Self {
        self.config.parser_buffer_size = size;
        self
    }

    /// 설정을 검증하고 빌드합니다.
    pub fn build(self) -> Result<MergerConfig, MergeError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        MergerConfig::default().validate().unwrap();
    }

    #[test]
    fn validate_rejects_zero_channel_capacity() {
        let config = MergerConfig {
            channel_capacity: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_oversized_channel_capacity() {
        let config = MergerConfig {
            channel_capacity: 1_000_000,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_max_file_size() {
        let config = MergerConfig {
            max_file_size: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn builder_creates_valid_config() {
        let config = MergerConfigBuilder::new()
            .channel_capacity(64)
            .max_file_size(1024)
            .parser_buffer_size(8192)
            .build()
            .unwrap();
        assert_eq!(config.channel_capacity, 64);
        assert_eq!(config.max_file_size, 1024);
        assert_eq!(config.parser_buffer_size, 8192);
    }

    #[test]
    fn builder_rejects_invalid_config() {
        assert!(MergerConfigBuilder::new().channel_capacity(0).build().is_err());
    }

    #[test]
    fn from_core_copies_section_values() {
        let core = sbomstream_core::config::MergeConfig {
            channel_capacity: 512,
            max_file_size: 1024,
        };
        let config = MergerConfig::from_core(&core);
        assert_eq!(config.channel_capacity, 512);
        assert_eq!(config.max_file_size, 1024);
        // 확장 필드는 기본값 유지
        assert_eq!(config.parser_buffer_size, 4096);
    }
}

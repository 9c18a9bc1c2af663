//! 설정 관리 — sbomstream.toml 파싱 및 런타임 설정
//!
//! [`SbomStreamConfig`]는 모든 모듈의 설정을 담는 최상위 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. 환경변수 (`SBOMSTREAM_PARSER_BUFFER_SIZE=8192` 형식)
//! 2. 설정 파일 (`sbomstream.toml`)
//! 3. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), sbomstream_core::error::SbomStreamError> {
//! use sbomstream_core::config::SbomStreamConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = SbomStreamConfig::load("sbomstream.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = SbomStreamConfig::parse("[general]\nlog_level = \"debug\"")?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, SbomStreamError};

/// Sbomstream 통합 설정
///
/// `sbomstream.toml` 파일의 최상위 구조를 나타냅니다.
/// 각 모듈은 자기 섹션만 읽어 사용합니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SbomStreamConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// SPDX 파서 설정
    #[serde(default)]
    pub parser: SpdxConfig,
    /// 병합/중복 제거 설정
    #[serde(default)]
    pub merge: MergeConfig,
}

impl SbomStreamConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, SbomStreamError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, SbomStreamError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                SbomStreamError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                SbomStreamError::Io(e)
            }
        })?;
        let config = Self::parse(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, SbomStreamError> {
        toml::from_str(toml_str).map_err(|e| {
            SbomStreamError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `SBOMSTREAM_{SECTION}_{FIELD}`
    /// 예: `SBOMSTREAM_PARSER_BUFFER_SIZE=8192`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "SBOMSTREAM_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "SBOMSTREAM_GENERAL_LOG_FORMAT");

        // Parser
        override_usize(&mut self.parser.buffer_size, "SBOMSTREAM_PARSER_BUFFER_SIZE");
        override_csv(
            &mut self.parser.skip_properties,
            "SBOMSTREAM_PARSER_SKIP_PROPERTIES",
        );

        // Merge
        override_usize(
            &mut self.merge.channel_capacity,
            "SBOMSTREAM_MERGE_CHANNEL_CAPACITY",
        );
        override_u64(&mut self.merge.max_file_size, "SBOMSTREAM_MERGE_MAX_FILE_SIZE");
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), SbomStreamError> {
        // log_level 검증
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_level".to_owned(),
                reason: format!("must be one of: {}", valid_levels.join(", ")),
            }
            .into());
        }

        // log_format 검증
        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_format".to_owned(),
                reason: format!("must be one of: {}", valid_formats.join(", ")),
            }
            .into());
        }

        // 파서 버퍼 크기 검증
        if self.parser.buffer_size == 0 || self.parser.buffer_size > MAX_BUFFER_SIZE {
            return Err(ConfigError::InvalidValue {
                field: "parser.buffer_size".to_owned(),
                reason: format!("must be 1-{MAX_BUFFER_SIZE}"),
            }
            .into());
        }

        // 병합 채널 용량 검증
        if self.merge.channel_capacity == 0 {
            return Err(ConfigError::InvalidValue {
                field: "merge.channel_capacity".to_owned(),
                reason: "must be greater than 0".to_owned(),
            }
            .into());
        }

        if self.merge.max_file_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "merge.max_file_size".to_owned(),
                reason: "must be greater than 0".to_owned(),
            }
            .into());
        }

        Ok(())
    }
}

/// 파서 버퍼 크기 상한 (16MB)
const MAX_BUFFER_SIZE: usize = 16 * 1024 * 1024;

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "json".to_owned(),
        }
    }
}

/// SPDX 파서 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpdxConfig {
    /// 읽기 버퍼의 초기 크기 (바이트)
    pub buffer_size: usize,
    /// 파싱 없이 건너뛸 최상위 속성 이름 목록
    pub skip_properties: Vec<String>,
}

impl Default for SpdxConfig {
    fn default() -> Self {
        Self {
            buffer_size: 4096,
            skip_properties: Vec::new(),
        }
    }
}

/// 병합/중복 제거 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeConfig {
    /// 엔티티 채널 용량
    pub channel_capacity: usize,
    /// 입력 SBOM 파일 최대 크기 (바이트)
    pub max_file_size: u64,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 256,
            max_file_size: 50 * 1024 * 1024, // 50 MB
        }
    }
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_usize(target: &mut usize, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<usize>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse usize from env var, ignoring"
            ),
        }
    }
}

fn override_u64(target: &mut u64, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u64>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u64 from env var, ignoring"
            ),
        }
    }
}

fn override_csv(target: &mut Vec<String>, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val.split(',').map(|s| s.trim().to_owned()).collect();
    }
}

//! 전체 문서 검증 패스
//!
//! [`SbomValidator`]는 문서 하나를 탐지하고 모든 섹션을 종료 상태까지
//! 완전히 소비합니다. 검증 호출자는 형식 탐지기와 달리 에러를 삼키지
//! 않습니다: 실패는 섹션/필드 이름과 바이트 오프셋을 담은 채로
//! 사용자에게 표면화됩니다.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::info;

use sbomstream_spdx::types::{DocumentMetadata, ManifestInfo, ParserState, SbomDialect};
use sbomstream_spdx::{
    FormatDetector, GraphElement, ParserConfigBuilder, Spdx22Parser, Spdx30Parser, SpdxError,
};

use crate::error::MergeError;
use crate::fs::{FileOpener, OsFileOpener};

/// 검증에 성공한 문서의 요약
#[derive(Debug, Clone)]
pub struct ValidationReport {
    /// 문서 경로
    pub path: String,
    /// 탐지된 dialect
    pub manifest: ManifestInfo,
    /// 문서 메타데이터
    pub metadata: DocumentMetadata,
    /// 파일 수
    pub files: usize,
    /// 패키지 수
    pub packages: usize,
    /// 관계 수
    pub relationships: usize,
    /// 외부 문서 참조 수
    pub references: usize,
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ValidationReport[{}] dialect={} files={} packages={} relationships={} references={}",
            self.path,
            self.manifest,
            self.files,
            self.packages,
            self.relationships,
            self.references,
        )
    }
}

/// 전체 문서 검증기
pub struct SbomValidator {
    opener: Arc<dyn FileOpener>,
    buffer_size: usize,
}

impl SbomValidator {
    /// 실제 파일 시스템으로 검증기를 생성합니다.
    pub fn new() -> Self {
        Self {
            opener: Arc::new(OsFileOpener),
            buffer_size: 4096,
        }
    }

    /// 파일 시스템 경계를 교체합니다.
    pub fn with_opener(opener: Arc<dyn FileOpener>) -> Self {
        Self {
            opener,
            buffer_size: 4096,
        }
    }

    /// 파서 버퍼 크기를 설정합니다.
    pub fn buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size;
        self
    }

    /// 문서 하나를 완전히 검증합니다 (blocking I/O는 전용 스레드에서).
    pub async fn validate(&self, path: impl Into<PathBuf>) -> Result<ValidationReport, MergeError> {
        let opener = Arc::clone(&self.opener);
        let path = path.into();
        let buffer_size = self.buffer_size;
        tokio::task::spawn_blocking(move || validate_path(opener.as_ref(), &path, buffer_size))
            .await
            .map_err(|e| MergeError::Channel(format!("spawn_blocking failed: {e}")))?
    }

    /// 동기 검증 (테스트 및 blocking 문맥용)
    pub fn validate_blocking(&self, path: &Path) -> Result<ValidationReport, MergeError> {
        validate_path(self.opener.as_ref(), path, self.buffer_size)
    }
}

impl Default for SbomValidator {
    fn default() -> Self {
        Self::new()
    }
}

/// 탐지 후 dialect에 맞는 파서로 문서를 끝까지 소비합니다.
fn validate_path(
    opener: &dyn FileOpener,
    path: &Path,
    buffer_size: usize,
) -> Result<ValidationReport, MergeError> {
    let path_str = path.display().to_string();

    let detector = FormatDetector::with_buffer_size(buffer_size);
    let manifest = detector
        .detect(|| opener.open(path))
        .ok_or_else(|| MergeError::UnsupportedFormat {
            path: path_str.clone(),
        })?;
    let dialect = manifest
        .dialect()
        .ok_or_else(|| MergeError::UnsupportedFormat {
            path: path_str.clone(),
        })?;

    let wrap = |source: SpdxError| MergeError::Parse {
        path: path_str.clone(),
        source,
    };

    let stream = opener.open(path).map_err(|e| MergeError::Io {
        path: path_str.clone(),
        source: e,
    })?;
    let config = ParserConfigBuilder::new()
        .buffer_size(buffer_size)
        .build()
        .map_err(wrap)?;

    let mut report = ValidationReport {
        path: path_str.clone(),
        manifest,
        metadata: DocumentMetadata::default(),
        files: 0,
        packages: 0,
        relationships: 0,
        references: 0,
    };

    match dialect {
        SbomDialect::Spdx22 => {
            let mut parser = Spdx22Parser::new(stream, config).map_err(wrap)?;
            loop {
                match parser.advance().map_err(wrap)? {
                    ParserState::Files => {
                        for file in parser.files().map_err(wrap)? {
                            file.map_err(wrap)?;
                            report.files += 1;
                        }
                    }
                    ParserState::Packages => {
                        for package in parser.packages().map_err(wrap)? {
                            package.map_err(wrap)?;
                            report.packages += 1;
                        }
                    }
                    ParserState::Relationships => {
                        for relationship in parser.relationships().map_err(wrap)? {
                            relationship.map_err(wrap)?;
                            report.relationships += 1;
                        }
                    }
                    ParserState::References => {
                        for reference in parser.references().map_err(wrap)? {
                            reference.map_err(wrap)?;
                            report.references += 1;
                        }
                    }
                    ParserState::Metadata => {
                        report.metadata = parser.metadata().map_err(wrap)?;
                        break;
                    }
                    other => {
                        return Err(wrap(SpdxError::WrongState {
                            expected: ParserState::Metadata,
                            actual: other,
                        }));
                    }
                }
            }
            parser.finish().map_err(wrap)?;
        }
        SbomDialect::Spdx30 => {
            let mut parser = Spdx30Parser::new(stream, config).map_err(wrap)?;
            loop {
                match parser.advance().map_err(wrap)? {
                    ParserState::Graph => {
                        for element in parser.elements().map_err(wrap)? {
                            match element.map_err(wrap)? {
                                GraphElement::File(_) => report.files += 1,
                                GraphElement::Package(_) => report.packages += 1,
                                GraphElement::Relationship(_) => report.relationships += 1,
                            }
                        }
                    }
                    ParserState::Metadata => {
                        report.metadata = parser.metadata().map_err(wrap)?;
                        break;
                    }
                    other => {
                        return Err(wrap(SpdxError::WrongState {
                            expected: ParserState::Metadata,
                            actual: other,
                        }));
                    }
                }
            }
            parser.finish().map_err(wrap)?;
        }
    }

    info!(path = %path_str, dialect = %report.manifest, "document validated");
    Ok(report)
}

//! SBOM 병합 오케스트레이터 -- 탐지, 파싱, 중복 제거의 전체 흐름 관리
//!
//! [`SbomMerger`]는 입력 문서마다 독립 파서 인스턴스를 blocking 태스크로
//! 돌리고, 파싱된 엔티티를 [`EntityDeduplicator`] 입력 채널로 흘려보낸 뒤,
//! 중복이 제거된 출력을 [`MergedSbom`]으로 수집합니다.
//!
//! # 내부 아키텍처
//!
//! ```text
//! paths --> FormatDetector --> Spdx22Parser / Spdx30Parser
//!                                      |
//!                            SbomEntity (blocking_send)
//!                                      |
//!                          mpsc --> EntityDeduplicator --> mpsc
//!                                                           |
//!                                                      MergedSbom
//! ```
//!
//! 파싱 실패는 형식 탐지와 달리 조용히 넘기지 않습니다: 병합 호출자는
//! 어느 파일의 어느 섹션/필드/오프셋에서 실패했는지 보아야 합니다.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use sbomstream_spdx::types::{
    ManifestInfo, ParsedExternalDocumentReference, ParsedFile, ParsedPackage, ParsedRelationship,
    ParserState, SbomDialect,
};
use sbomstream_spdx::{
    FormatDetector, GraphElement, ParserConfig, ParserConfigBuilder, Spdx22Parser, Spdx30Parser,
    SpdxError,
};

use crate::config::MergerConfig;
use crate::dedup::EntityDeduplicator;
use crate::entity::SbomEntity;
use crate::error::MergeError;
use crate::fs::{FileOpener, OsFileOpener};

/// 병합에 기여한 문서 하나의 요약
#[derive(Debug, Clone)]
pub struct MergedSource {
    /// 문서 경로
    pub path: String,
    /// 탐지된 dialect
    pub manifest: ManifestInfo,
    /// 문서에서 읽은 파일 수
    pub files: usize,
    /// 문서에서 읽은 패키지 수
    pub packages: usize,
    /// 문서에서 읽은 관계 수
    pub relationships: usize,
    /// 문서에서 읽은 외부 문서 참조 수
    pub references: usize,
}

/// 중복이 제거된 병합 결과
#[derive(Debug)]
pub struct MergedSbom {
    /// 병합 실행 고유 ID
    pub merge_id: String,
    /// 처음 등장한 파일 목록
    pub files: Vec<ParsedFile>,
    /// 처음 등장한 패키지 목록
    pub packages: Vec<ParsedPackage>,
    /// 처음 등장한 관계 목록
    pub relationships: Vec<ParsedRelationship>,
    /// 처음 등장한 외부 문서 참조 목록
    pub references: Vec<ParsedExternalDocumentReference>,
    /// 입력 문서별 요약
    pub sources: Vec<MergedSource>,
    /// 중복으로 걸러진 엔티티 수
    pub duplicates_suppressed: u64,
}

impl MergedSbom {
    /// 병합 결과의 전체 엔티티 수를 반환합니다.
    pub fn entity_count(&self) -> usize {
        self.files.len() + self.packages.len() + self.relationships.len() + self.references.len()
    }
}

impl fmt::Display for MergedSbom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "MergedSbom[{}] sources={} files={} packages={} relationships={} suppressed={}",
            &self.merge_id[..8.min(self.merge_id.len())],
            self.sources.len(),
            self.files.len(),
            self.packages.len(),
            self.relationships.len(),
            self.duplicates_suppressed,
        )
    }
}

/// SBOM 병합 오케스트레이터
pub struct SbomMerger {
    config: MergerConfig,
    opener: Arc<dyn FileOpener>,
}

impl SbomMerger {
    /// 주어진 경로들의 문서를 하나의 키 공간으로 병합합니다.
    ///
    /// 경로 하나당 파서 인스턴스 하나가 blocking 태스크에서 돌아가며,
    /// 모든 입력이 소진되면 중복 제거 출력이 닫히고 결과가 수집됩니다.
    /// 어느 문서든 파싱에 실패하면 병합 전체가 그 에러로 실패합니다.
    pub async fn merge(&self, paths: &[PathBuf]) -> Result<MergedSbom, MergeError> {
        let merge_id = uuid::Uuid::new_v4().to_string();
        info!(merge_id = %merge_id, inputs = paths.len(), "starting sbom merge");

        let (dedup, mut output_rx) = EntityDeduplicator::new(self.config.channel_capacity);

        // 출력 수집 태스크
        let collector = tokio::spawn(async move {
            let mut files = Vec::new();
            let mut packages = Vec::new();
            let mut relationships = Vec::new();
            let mut references = Vec::new();
            while let Some(entity) = output_rx.recv().await {
                match entity {
                    SbomEntity::File(file) => files.push(file),
                    SbomEntity::Package(package) => packages.push(package),
                    SbomEntity::Relationship(rel) => relationships.push(rel),
                    SbomEntity::Reference(doc_ref) => references.push(doc_ref),
                }
            }
            (files, packages, relationships, references)
        });

        // 문서 하나당 파싱 태스크 (blocking I/O)
        let mut parse_tasks = Vec::new();
        for path in paths {
            self.check_file_size(path)?;

            let opener = Arc::clone(&self.opener);
            let tx = dedup.sender();
            let path = path.clone();
            let buffer_size = self.config.parser_buffer_size;
            parse_tasks.push(tokio::task::spawn_blocking(move || {
                parse_and_feed(opener.as_ref(), &path, buffer_size, &tx)
            }));
        }

        let mut sources = Vec::new();
        let mut first_error = None;
        for task in parse_tasks {
            match task.await {
                Ok(Ok(source)) => {
                    debug!(path = %source.path, dialect = %source.manifest, "document merged");
                    sources.push(source);
                }
                Ok(Err(e)) => {
                    warn!(error = %e, "document failed to merge");
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
                Err(e) => {
                    if first_error.is_none() {
                        first_error = Some(MergeError::Channel(format!(
                            "spawn_blocking failed: {e}"
                        )));
                    }
                }
            }
        }

        let (forwarded, suppressed) = dedup.close().await?;
        let (files, packages, relationships, references) = collector
            .await
            .map_err(|e| MergeError::Channel(format!("collector task failed: {e}")))?;

        if let Some(e) = first_error {
            return Err(e);
        }

        info!(
            merge_id = %merge_id,
            forwarded,
            suppressed,
            "sbom merge completed"
        );

        Ok(MergedSbom {
            merge_id,
            files,
            packages,
            relationships,
            references,
            sources,
            duplicates_suppressed: suppressed,
        })
    }

    /// 설정된 상한으로 파일 크기를 확인합니다.
    fn check_file_size(&self, path: &Path) -> Result<(), MergeError> {
        let size = self
            .opener
            .file_size(path)
            .map_err(|e| MergeError::Io {
                path: path.display().to_string(),
                source: e,
            })?;
        if let Some(size) = size {
            if size > self.config.max_file_size {
                return Err(MergeError::FileTooBig {
                    path: path.display().to_string(),
                    size,
                    max: self.config.max_file_size,
                });
            }
        }
        Ok(())
    }
}

/// SBOM 병합 빌더
pub struct SbomMergerBuilder {
    config: MergerConfig,
    opener: Arc<dyn FileOpener>,
}

impl SbomMergerBuilder {
    /// 기본 설정과 실제 파일 시스템으로 빌더를 생성합니다.
    pub fn new() -> Self {
        Self {
            config: MergerConfig::default(),
            opener: Arc::new(OsFileOpener),
        }
    }

    /// 병합 설정을 지정합니다.
    pub fn config(mut self, config: MergerConfig) -> Self {
        self.config = config;
        self
    }

    /// 파일 시스템 경계를 교체합니다 (테스트용 메모리 스트림 등).
    pub fn opener(mut self, opener: Arc<dyn FileOpener>) -> Self {
        self.opener = opener;
        self
    }

    /// 병합기를 빌드합니다.
    ///
    /// # Errors
    ///
    /// 설정 유효성 검증 실패 시 `MergeError::Config` 반환
    pub fn build(self) -> Result<SbomMerger, MergeError> {
        self.config.validate()?;
        Ok(SbomMerger {
            config: self.config,
            opener: self.opener,
        })
    }
}

impl Default for SbomMergerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// 문서 하나를 탐지-파싱하여 엔티티를 중복 제거 입력으로 흘려보냅니다.
///
/// `tokio::task::spawn_blocking` 내에서 호출되어야 합니다.
fn parse_and_feed(
    opener: &dyn FileOpener,
    path: &Path,
    buffer_size: usize,
    tx: &mpsc::Sender<SbomEntity>,
) -> Result<MergedSource, MergeError> {
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

    let stream = opener.open(path).map_err(|e| MergeError::Io {
        path: path_str.clone(),
        source: e,
    })?;
    let config = ParserConfigBuilder::new()
        .buffer_size(buffer_size)
        .build()
        .map_err(|e| MergeError::Parse {
            path: path_str.clone(),
            source: e,
        })?;

    match dialect {
        SbomDialect::Spdx22 => feed_spdx22(stream, config, &path_str, manifest, tx),
        SbomDialect::Spdx30 => feed_spdx30(stream, config, &path_str, manifest, tx),
    }
}

/// SPDX 2.2 문서를 끝까지 소비하며 엔티티를 전송합니다.
fn feed_spdx22(
    stream: Box<dyn std::io::Read + Send>,
    config: ParserConfig,
    path: &str,
    manifest: ManifestInfo,
    tx: &mpsc::Sender<SbomEntity>,
) -> Result<MergedSource, MergeError> {
    let wrap = |source: SpdxError| MergeError::Parse {
        path: path.to_owned(),
        source,
    };
    let send = |entity: SbomEntity| {
        tx.blocking_send(entity)
            .map_err(|_| MergeError::Channel("dedup input closed".to_owned()))
    };

    let mut parser = Spdx22Parser::new(stream, config).map_err(wrap)?;
    let mut source = MergedSource {
        path: path.to_owned(),
        manifest,
        files: 0,
        packages: 0,
        relationships: 0,
        references: 0,
    };

    loop {
        match parser.advance().map_err(wrap)? {
            ParserState::Files => {
                for file in parser.files().map_err(wrap)? {
                    source.files += 1;
                    send(SbomEntity::File(file.map_err(wrap)?))?;
                }
            }
            ParserState::Packages => {
                for package in parser.packages().map_err(wrap)? {
                    source.packages += 1;
                    send(SbomEntity::Package(package.map_err(wrap)?))?;
                }
            }
            ParserState::Relationships => {
                for relationship in parser.relationships().map_err(wrap)? {
                    source.relationships += 1;
                    send(SbomEntity::Relationship(relationship.map_err(wrap)?))?;
                }
            }
            ParserState::References => {
                for reference in parser.references().map_err(wrap)? {
                    source.references += 1;
                    send(SbomEntity::Reference(reference.map_err(wrap)?))?;
                }
            }
            ParserState::Metadata => {
                parser.metadata().map_err(wrap)?;
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
    Ok(source)
}

/// SPDX 3.0 문서를 끝까지 소비하며 엔티티를 전송합니다.
fn feed_spdx30(
    stream: Box<dyn std::io::Read + Send>,
    config: ParserConfig,
    path: &str,
    manifest: ManifestInfo,
    tx: &mpsc::Sender<SbomEntity>,
) -> Result<MergedSource, MergeError> {
    let wrap = |source: SpdxError| MergeError::Parse {
        path: path.to_owned(),
        source,
    };
    let send = |entity: SbomEntity| {
        tx.blocking_send(entity)
            .map_err(|_| MergeError::Channel("dedup input closed".to_owned()))
    };

    let mut parser = Spdx30Parser::new(stream, config).map_err(wrap)?;
    let mut source = MergedSource {
        path: path.to_owned(),
        manifest,
        files: 0,
        packages: 0,
        relationships: 0,
        references: 0,
    };

    loop {
        match parser.advance().map_err(wrap)? {
            ParserState::Graph => {
                for element in parser.elements().map_err(wrap)? {
                    match element.map_err(wrap)? {
                        GraphElement::File(file) => {
                            source.files += 1;
                            send(SbomEntity::File(file))?;
                        }
                        GraphElement::Package(package) => {
                            source.packages += 1;
                            send(SbomEntity::Package(package))?;
                        }
                        GraphElement::Relationship(rel) => {
                            source.relationships += 1;
                            send(SbomEntity::Relationship(rel))?;
                        }
                    }
                }
            }
            ParserState::Metadata => {
                parser.metadata().map_err(wrap)?;
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
    Ok(source)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_creates_merger() {
        let merger = SbomMergerBuilder::new().build().unwrap();
        assert_eq!(merger.config.channel_capacity, 256);
    }

    #[test]
    fn builder_rejects_invalid_config() {
        let result = SbomMergerBuilder::new()
            .config(MergerConfig {
                channel_capacity: 0,
                ..Default::default()
            })
            .build();
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn merge_of_no_inputs_is_empty() {
        let merger = SbomMergerBuilder::new().build().unwrap();
        let merged = merger.merge(&[]).await.unwrap();
        assert_eq!(merged.entity_count(), 0);
        assert!(merged.sources.is_empty());
        assert_eq!(merged.duplicates_suppressed, 0);
    }

    #[tokio::test]
    async fn merge_rejects_oversized_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.spdx.json");
        std::fs::write(&path, "x".repeat(1024)).unwrap();

        let merger = SbomMergerBuilder::new()
            .config(MergerConfig {
                max_file_size: 16,
                ..Default::default()
            })
            .build()
            .unwrap();

        let err = merger.merge(&[path]).await.unwrap_err();
        assert!(matches!(err, MergeError::FileTooBig { .. }));
    }

    #[tokio::test]
    async fn merge_surfaces_unsupported_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mystery.json");
        std::fs::write(&path, r#"{"hello": "world"}"#).unwrap();

        let merger = SbomMergerBuilder::new().build().unwrap();
        let err = merger.merge(&[path]).await.unwrap_err();
        assert!(matches!(err, MergeError::UnsupportedFormat { .. }));
    }
}

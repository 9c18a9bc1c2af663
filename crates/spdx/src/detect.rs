//! SBOM 형식 탐지기
//!
//! [`FormatDetector`]는 알 수 없는 문서의 dialect를 식별합니다.
//! 각 dialect 파서를 값 비싼 섹션을 전부 건너뛰는 skip 집합으로 생성해
//! 필요한 메타데이터(`spdxVersion` 또는 `@context`)만 읽은 뒤 파서를
//! 버립니다. 의도된 부분 사용이며, `Finished`에 도달하지 않으므로
//! 완전성 검증은 수행되지 않습니다.
//!
//! 탐지 중 발생하는 모든 파서 에러는 "이 형식이 아님"으로 처리됩니다.
//! 사용자에게 노출되지 않습니다.

use std::io::Read;

use tracing::debug;

use crate::config::ParserConfigBuilder;
use crate::parser::spdx22::Spdx22Parser;
use crate::parser::spdx30::Spdx30Parser;
use crate::types::{ManifestInfo, ParserState};

/// SBOM dialect 탐지기
///
/// # 사용 예시
///
/// ```
/// use sbomstream_spdx::FormatDetector;
///
/// let doc = r#"{
///     "spdxVersion": "SPDX-2.2",
///     "dataLicense": "CC0-1.0",
///     "SPDXID": "SPDXRef-DOCUMENT",
///     "name": "doc",
///     "documentNamespace": "https://example.com/doc",
///     "creationInfo": {"created": "2024-06-01T00:00:00Z", "creators": []},
///     "documentDescribes": [],
///     "files": [], "packages": [], "relationships": []
/// }"#;
///
/// let detector = FormatDetector::new();
/// let info = detector.detect(|| Ok(doc.as_bytes())).unwrap();
/// assert_eq!(info.to_string(), "spdx:2.2");
/// ```
pub struct FormatDetector {
    /// 탐지용 파서의 버퍼 크기
    buffer_size: usize,
}

impl FormatDetector {
    /// 기본 버퍼 크기의 탐지기를 생성합니다.
    pub fn new() -> Self {
        Self { buffer_size: 4096 }
    }

    /// 버퍼 크기를 지정한 탐지기를 생성합니다.
    pub fn with_buffer_size(buffer_size: usize) -> Self {
        Self { buffer_size }
    }

    /// 스트림 팩토리로 각 dialect를 차례로 시도합니다.
    ///
    /// dialect 하나당 새 스트림이 필요하므로 팩토리를 받습니다.
    /// 어느 dialect에도 맞지 않으면 `None`입니다.
    pub fn detect<F, R>(&self, mut open: F) -> Option<ManifestInfo>
    where
        F: FnMut() -> std::io::Result<R>,
        R: Read,
    {
        match open() {
            Ok(stream) => {
                if let Some(info) = self.try_spdx22(stream) {
                    return Some(info);
                }
            }
            Err(e) => {
                debug!(error = %e, "failed to open stream for spdx 2.2 detection");
                return None;
            }
        }

        match open() {
            Ok(stream) => self.try_spdx30(stream),
            Err(e) => {
                debug!(error = %e, "failed to open stream for spdx 3.0 detection");
                None
            }
        }
    }

    /// SPDX 2.2로 읽어 봅니다. 모든 에러는 형식 불일치로 간주합니다.
    fn try_spdx22<R: Read>(&self, stream: R) -> Option<ManifestInfo> {
        let config = ParserConfigBuilder::new()
            .buffer_size(self.buffer_size)
            .skip_property("files")
            .skip_property("packages")
            .skip_property("relationships")
            .skip_property("externalDocumentRefs")
            .build()
            .ok()?;

        let mut parser = match Spdx22Parser::new(stream, config) {
            Ok(p) => p,
            Err(e) => {
                debug!(error = %e, "not spdx 2.2");
                return None;
            }
        };

        // 섹션이 모두 skip 집합에 있으므로 advance는 Metadata까지 직행
        match parser.advance() {
            Ok(ParserState::Metadata) => {}
            Ok(other) => {
                debug!(state = %other, "unexpected state during spdx 2.2 detection");
                return None;
            }
            Err(e) => {
                debug!(error = %e, "not spdx 2.2");
                return None;
            }
        }

        let metadata = parser.metadata().ok()?;
        if metadata.spdx_version.as_deref() == Some("SPDX-2.2") {
            debug!("detected spdx 2.2 document");
            Some(ManifestInfo::spdx22())
        } else {
            debug!(version = ?metadata.spdx_version, "spdx version mismatch");
            None
        }
    }

    /// SPDX 3.0으로 읽어 봅니다. 모든 에러는 형식 불일치로 간주합니다.
    fn try_spdx30<R: Read>(&self, stream: R) -> Option<ManifestInfo> {
        let config = ParserConfigBuilder::new()
            .buffer_size(self.buffer_size)
            .skip_property("@graph")
            .build()
            .ok()?;

        let mut parser = match Spdx30Parser::new(stream, config) {
            Ok(p) => p,
            Err(e) => {
                debug!(error = %e, "not spdx 3.0");
                return None;
            }
        };

        match parser.advance() {
            Ok(ParserState::Metadata) => {}
            Ok(other) => {
                debug!(state = %other, "unexpected state during spdx 3.0 detection");
                return None;
            }
            Err(e) => {
                debug!(error = %e, "not spdx 3.0");
                return None;
            }
        }

        let metadata = parser.metadata().ok()?;
        if metadata.spdx_version.as_deref() == Some("SPDX-3.0") {
            debug!("detected spdx 3.0 document");
            Some(ManifestInfo::spdx30())
        } else {
            None
        }
    }
}

impl Default for FormatDetector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SbomDialect;

    const DOC_22: &str = r#"{
        "spdxVersion": "SPDX-2.2",
        "dataLicense": "CC0-1.0",
        "SPDXID": "SPDXRef-DOCUMENT",
        "name": "doc",
        "documentNamespace": "https://example.com/doc",
        "creationInfo": {"created": "2024-06-01T00:00:00Z", "creators": ["Tool: test"]},
        "documentDescribes": [],
        "files": [{"this": "is skipped entirely", "no": ["required", "fields"]}],
        "packages": [],
        "relationships": []
    }"#;

    const DOC_30: &str = r#"{
        "@context": "https://spdx.org/rdf/3.0.1/spdx-context.jsonld",
        "@graph": [{"type": "SpdxDocument", "spdxId": "https://example.com/doc"}]
    }"#;

    #[test]
    fn detects_spdx_22() {
        let detector = FormatDetector::new();
        let info = detector.detect(|| Ok(DOC_22.as_bytes())).unwrap();
        assert_eq!(info.dialect(), Some(SbomDialect::Spdx22));
    }

    #[test]
    fn detects_spdx_30() {
        let detector = FormatDetector::new();
        let info = detector.detect(|| Ok(DOC_30.as_bytes())).unwrap();
        assert_eq!(info.dialect(), Some(SbomDialect::Spdx30));
    }

    #[test]
    fn detection_skips_section_contents() {
        // files 배열 안의 요소는 필수 필드가 하나도 없지만, 탐지는
        // 섹션을 통째로 건너뛰므로 성공해야 함
        let detector = FormatDetector::new();
        assert!(detector.detect(|| Ok(DOC_22.as_bytes())).is_some());
    }

    #[test]
    fn junk_input_matches_nothing() {
        let detector = FormatDetector::new();
        assert!(detector.detect(|| Ok(&b"this is not json at all"[..])).is_none());
    }

    #[test]
    fn version_mismatch_matches_nothing() {
        let doc = DOC_22.replace("SPDX-2.2", "SPDX-9.9");
        let detector = FormatDetector::new();
        assert!(detector.detect(|| Ok(doc.as_bytes())).is_none());
    }

    #[test]
    fn open_failure_matches_nothing() {
        let detector = FormatDetector::new();
        let result = detector.detect(|| -> std::io::Result<&[u8]> {
            Err(std::io::Error::new(std::io::ErrorKind::NotFound, "missing"))
        });
        assert!(result.is_none());
    }

    #[test]
    fn empty_stream_matches_nothing() {
        let detector = FormatDetector::new();
        assert!(detector.detect(|| Ok(&b""[..])).is_none());
    }
}

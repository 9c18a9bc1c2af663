//! 채널로 전달되는 SBOM 엔티티
//!
//! [`SbomEntity`]는 파서가 내놓는 네 종류의 도메인 값을 하나의 채널
//! 메시지 타입으로 묶습니다. `Send + Sync + 'static` 바운드를 만족하여
//! `tokio::mpsc` 전송이 가능합니다.

use std::fmt;

use sbomstream_spdx::types::{
    ParsedExternalDocumentReference, ParsedFile, ParsedPackage, ParsedRelationship,
};

/// 병합 파이프라인을 흐르는 파싱된 엔티티
#[derive(Debug, Clone, PartialEq)]
pub enum SbomEntity {
    /// 파일 엔티티
    File(ParsedFile),
    /// 패키지 엔티티
    Package(ParsedPackage),
    /// 관계 엔티티
    Relationship(ParsedRelationship),
    /// 외부 문서 참조 엔티티
    Reference(ParsedExternalDocumentReference),
}

impl SbomEntity {
    /// 엔티티 종류 이름을 반환합니다 (로깅/집계용).
    pub fn kind(&self) -> &'static str {
        match self {
            Self::File(_) => "file",
            Self::Package(_) => "package",
            Self::Relationship(_) => "relationship",
            Self::Reference(_) => "reference",
        }
    }

    /// 중복 제거에 쓰이는 엔티티 정체성 키를 반환합니다.
    ///
    /// 키는 문서 간에 안정적인 내용 기반 정체성입니다: 파일은 경로,
    /// 패키지는 이름@버전, 관계는 (출발, 타입, 대상) 삼중쌍, 외부 참조는
    /// 문서 ID. 독립 생성된 문서들을 병합할 때 같은 대상을 가리키는
    /// 엔티티가 하나로 합쳐집니다.
    pub fn dedup_key(&self) -> String {
        match self {
            Self::File(file) => format!("file:{}", file.path),
            Self::Package(package) => format!(
                "package:{}@{}",
                package.name,
                package.version_info.as_deref().unwrap_or(""),
            ),
            Self::Relationship(rel) => format!(
                "relationship:{}:{}:{}",
                rel.source_element_id, rel.relationship_type, rel.target_element_id,
            ),
            Self::Reference(doc_ref) => {
                format!("reference:{}", doc_ref.external_document_id)
            }
        }
    }
}

impl fmt::Display for SbomEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(file) => write!(f, "file {file}"),
            Self::Package(package) => write!(f, "package {package}"),
            Self::Relationship(rel) => write!(f, "relationship {rel}"),
            Self::Reference(doc_ref) => write!(f, "reference {doc_ref}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sbomstream_spdx::types::{Checksum, RelationshipType};

    fn sample_file(path: &str) -> SbomEntity {
        SbomEntity::File(ParsedFile {
            spdx_id: format!("SPDXRef-File-{path}"),
            path: path.to_owned(),
            checksums: vec![Checksum {
                algorithm: "SHA256".to_owned(),
                value: "aa".to_owned(),
            }],
            license_concluded: None,
            license_info_in_files: vec!["NOASSERTION".to_owned()],
            copyright_text: None,
            file_types: vec![],
        })
    }

    fn sample_package(name: &str, version: &str) -> SbomEntity {
        SbomEntity::Package(ParsedPackage {
            spdx_id: format!("SPDXRef-Package-{name}"),
            name: name.to_owned(),
            version_info: Some(version.to_owned()),
            download_location: None,
            license_concluded: None,
            license_declared: None,
            license_info_from_files: vec![],
            copyright_text: None,
            files_analyzed: None,
            supplier: None,
            external_references: vec![],
            verification_code: None,
            has_files: vec![],
        })
    }

    #[test]
    fn kind_names() {
        assert_eq!(sample_file("./a").kind(), "file");
        assert_eq!(sample_package("serde", "1.0").kind(), "package");
    }

    #[test]
    fn same_path_files_share_dedup_key() {
        // 다른 문서에서 온 같은 경로의 파일은 ID가 달라도 같은 키
        let a = sample_file("./src/main.rs");
        let b = sample_file("./src/main.rs");
        assert_eq!(a.dedup_key(), b.dedup_key());
    }

    #[test]
    fn different_versions_have_distinct_keys() {
        let a = sample_package("serde", "1.0.203");
        let b = sample_package("serde", "1.0.204");
        assert_ne!(a.dedup_key(), b.dedup_key());
    }

    #[test]
    fn relationship_key_is_triple() {
        let rel = SbomEntity::Relationship(ParsedRelationship {
            source_element_id: "SPDXRef-a".to_owned(),
            relationship_type: RelationshipType::DependsOn,
            target_element_id: "SPDXRef-b".to_owned(),
        });
        assert_eq!(rel.dedup_key(), "relationship:SPDXRef-a:DEPENDS_ON:SPDXRef-b");
    }

    #[test]
    fn entity_display_names_kind() {
        let display = sample_file("./a").to_string();
        assert!(display.starts_with("file "));
        assert!(display.contains("./a"));
    }

    #[test]
    fn entities_are_send_sync() {
        fn assert_send_sync<T: Send + Sync + 'static>() {}
        assert_send_sync::<SbomEntity>();
    }
}

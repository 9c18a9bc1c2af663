//! SPDX 2.2 JSON 문서 생성 (쓰기 방향)
//!
//! [`SpdxWriter`]는 파싱의 역방향입니다. 재개 가능할 필요가 없으므로
//! serde 직렬화로 단순하게 만듭니다. 라이선스류 필드가 비어 있으면
//! `NOASSERTION`을 채웁니다 -- 기본값 채움은 생성기의 몫이고, 파서는
//! 문서를 있는 그대로 반영합니다.

use serde::Serialize;

use crate::error::SpdxError;
use crate::types::{ParsedFile, ParsedPackage, ParsedRelationship};

/// SPDX 2.2 문서 루트 구조 (직렬화용)
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SpdxJsonDocument {
    spdx_version: String,
    data_license: String,
    #[serde(rename = "SPDXID")]
    spdx_id: String,
    name: String,
    document_namespace: String,
    creation_info: SpdxJsonCreationInfo,
    document_describes: Vec<String>,
    files: Vec<SpdxJsonFile>,
    packages: Vec<SpdxJsonPackage>,
    relationships: Vec<SpdxJsonRelationship>,
}

/// 생성 정보 (직렬화용)
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SpdxJsonCreationInfo {
    created: String,
    creators: Vec<String>,
}

/// 파일 요소 (직렬화용)
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SpdxJsonFile {
    #[serde(rename = "SPDXID")]
    spdx_id: String,
    file_name: String,
    checksums: Vec<SpdxJsonChecksum>,
    license_concluded: String,
    license_info_in_files: Vec<String>,
    copyright_text: String,
}

/// 체크섬 (직렬화용)
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SpdxJsonChecksum {
    algorithm: String,
    checksum_value: String,
}

/// 패키지 요소 (직렬화용)
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SpdxJsonPackage {
    #[serde(rename = "SPDXID")]
    spdx_id: String,
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    version_info: Option<String>,
    download_location: String,
    license_concluded: String,
    license_declared: String,
    copyright_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    files_analyzed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    supplier: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    external_refs: Vec<SpdxJsonExternalRef>,
}

/// 패키지 외부 참조 (직렬화용)
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SpdxJsonExternalRef {
    reference_category: String,
    reference_type: String,
    reference_locator: String,
}

/// 관계 요소 (직렬화용)
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SpdxJsonRelationship {
    spdx_element_id: String,
    relationship_type: String,
    related_spdx_element: String,
}

/// SPDX 2.2 JSON 생성기
///
/// # 사용 예시
///
/// ```
/// use sbomstream_spdx::SpdxWriter;
///
/// let writer = SpdxWriter::new("my-build");
/// let json = writer.generate(&[], &[], &[]).unwrap();
/// assert!(json.contains("SPDX-2.2"));
/// ```
pub struct SpdxWriter {
    document_name: String,
    namespace_base: String,
    creators: Vec<String>,
}

impl SpdxWriter {
    /// 문서 이름으로 생성기를 만듭니다.
    pub fn new(document_name: impl Into<String>) -> Self {
        Self {
            document_name: document_name.into(),
            namespace_base: "https://sbomstream.dev/spdx".to_owned(),
            creators: vec!["Tool: sbomstream".to_owned()],
        }
    }

    /// 네임스페이스 URI의 접두부를 설정합니다.
    pub fn namespace_base(mut self, base: impl Into<String>) -> Self {
        self.namespace_base = base.into();
        self
    }

    /// 생성 주체를 추가합니다.
    pub fn creator(mut self, creator: impl Into<String>) -> Self {
        self.creators.push(creator.into());
        self
    }

    /// 파일/패키지/관계 목록에서 SPDX 2.2 JSON 문서를 생성합니다.
    ///
    /// `documentDescribes`는 패키지 ID 목록으로 채워지고, 문서
    /// 네임스페이스는 호출마다 고유한 UUID가 붙습니다.
    pub fn generate(
        &self,
        files: &[ParsedFile],
        packages: &[ParsedPackage],
        relationships: &[ParsedRelationship],
    ) -> Result<String, SpdxError> {
        let json_files: Vec<SpdxJsonFile> = files
            .iter()
            .map(|file| SpdxJsonFile {
                spdx_id: file.spdx_id.clone(),
                file_name: file.path.clone(),
                checksums: file
                    .checksums
                    .iter()
                    .map(|c| SpdxJsonChecksum {
                        algorithm: c.algorithm.clone(),
                        checksum_value: c.value.clone(),
                    })
                    .collect(),
                license_concluded: or_noassertion(file.license_concluded.as_deref()),
                license_info_in_files: if file.license_info_in_files.is_empty() {
                    vec!["NOASSERTION".to_owned()]
                } else {
                    file.license_info_in_files.clone()
                },
                copyright_text: or_noassertion(file.copyright_text.as_deref()),
            })
            .collect();

        let json_packages: Vec<SpdxJsonPackage> = packages
            .iter()
            .map(|package| SpdxJsonPackage {
                spdx_id: package.spdx_id.clone(),
                name: package.name.clone(),
                version_info: package.version_info.clone(),
                download_location: or_noassertion(package.download_location.as_deref()),
                license_concluded: or_noassertion(package.license_concluded.as_deref()),
                license_declared: or_noassertion(package.license_declared.as_deref()),
                copyright_text: or_noassertion(package.copyright_text.as_deref()),
                files_analyzed: package.files_analyzed,
                supplier: package.supplier.clone(),
                external_refs: package
                    .external_references
                    .iter()
                    .map(|r| SpdxJsonExternalRef {
                        reference_category: r.category.clone(),
                        reference_type: r.ref_type.clone(),
                        reference_locator: r.locator.clone(),
                    })
                    .collect(),
            })
            .collect();

        let json_relationships: Vec<SpdxJsonRelationship> = relationships
            .iter()
            .map(|rel| SpdxJsonRelationship {
                spdx_element_id: rel.source_element_id.clone(),
                relationship_type: rel.relationship_type.as_spdx().to_owned(),
                related_spdx_element: rel.target_element_id.clone(),
            })
            .collect();

        let document_describes: Vec<String> =
            packages.iter().map(|p| p.spdx_id.clone()).collect();

        let namespace = format!(
            "{}/{}-{}",
            self.namespace_base,
            self.document_name,
            uuid::Uuid::new_v4(),
        );

        let document = SpdxJsonDocument {
            spdx_version: "SPDX-2.2".to_owned(),
            data_license: "CC0-1.0".to_owned(),
            spdx_id: "SPDXRef-DOCUMENT".to_owned(),
            name: self.document_name.clone(),
            document_namespace: namespace,
            creation_info: SpdxJsonCreationInfo {
                created: current_timestamp(),
                creators: self.creators.clone(),
            },
            document_describes,
            files: json_files,
            packages: json_packages,
            relationships: json_relationships,
        };

        serde_json::to_string_pretty(&document)
            .map_err(|e| SpdxError::Generation(format!("spdx serialization failed: {e}")))
    }
}

/// 없으면 NOASSERTION으로 채웁니다.
fn or_noassertion(value: Option<&str>) -> String {
    value.unwrap_or("NOASSERTION").to_owned()
}

/// 현재 Unix 타임스탬프를 RFC3339 형식으로 반환합니다.
///
/// 시스템 시간을 가져올 수 없는 경우 epoch(1970-01-01T00:00:00Z)를 반환합니다.
fn current_timestamp() -> String {
    match std::time::SystemTime::now().duration_since(std::time::UNIX_EPOCH) {
        Ok(duration) => unix_to_rfc3339(duration.as_secs()),
        Err(_) => "1970-01-01T00:00:00Z".to_owned(),
    }
}

/// Unix timestamp를 RFC3339 형식 (YYYY-MM-DDTHH:MM:SSZ)으로 변환합니다.
fn unix_to_rfc3339(secs: u64) -> String {
    const SECONDS_PER_DAY: u64 = 86_400;

    let mut days = secs / SECONDS_PER_DAY;
    let time = secs % SECONDS_PER_DAY;
    let (hours, minutes, seconds) = (time / 3600, (time % 3600) / 60, time % 60);

    let mut year = 1970u64;
    loop {
        let days_in_year = if is_leap_year(year) { 366 } else { 365 };
        if days < days_in_year {
            break;
        }
        days -= days_in_year;
        year += 1;
    }

    let days_in_months: [u64; 12] = if is_leap_year(year) {
        [31, 29, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31]
    } else {
        [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31]
    };

    let mut month = 1;
    let mut day = days + 1;
    for &days_in_month in &days_in_months {
        if day <= days_in_month {
            break;
        }
        day -= days_in_month;
        month += 1;
    }

    format!("{year:04}-{month:02}-{day:02}T{hours:02}:{minutes:02}:{seconds:02}Z")
}

/// 윤년 판별
fn is_leap_year(year: u64) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

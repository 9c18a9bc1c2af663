//! SPDX 2.2 엔티티 파서 -- 배열 요소 JSON 객체 하나를 도메인 값으로 변환
//!
//! 각 파서는 호출당 정확히 JSON 객체 하나를 소비합니다. 객체 내 속성
//! 순서는 임의이며, 인식하지 못하는 속성은 전방 호환성을 위해 건너뜁니다.
//! 필수 필드 검증은 객체 단위로 수행되어, 누락된 필드 이름을 모두 모아
//! 하나의 에러로 보고합니다.

use std::io::Read;

use crate::error::SpdxError;
use crate::parser::cursor::ByteCursor;
use crate::parser::tokens::{Token, TokenReader};
use crate::types::{
    Checksum, CreationInfo, ExternalPackageRef, FileType, PackageVerificationCode, ParsedFile,
    ParsedPackage, ParsedRelationship, ParsedExternalDocumentReference, RelationshipType,
};

/// 파일 요소 객체 하나를 파싱합니다.
///
/// 필수 필드: `fileName`, `SPDXID`, `checksums` (SHA256과 SHA1 모두),
/// `licenseInfoInFiles`. 누락 시 필드 이름을 담은
/// [`SpdxError::MissingRequiredProperty`]를 반환합니다.
pub(crate) fn parse_file<R: Read>(
    tokens: &mut TokenReader,
    cursor: &mut ByteCursor<R>,
) -> Result<ParsedFile, SpdxError> {
    expect_begin_object(tokens, cursor)?;

    let mut spdx_id = None;
    let mut path = None;
    let mut checksums = None;
    let mut license_concluded = None;
    let mut license_info_in_files = None;
    let mut copyright_text = None;
    let mut file_types = Vec::new();

    loop {
        match tokens.next(cursor)? {
            Token::Key(key) => match key.as_str() {
                "SPDXID" => spdx_id = Some(expect_str(tokens, cursor, "SPDXID")?),
                "fileName" => path = Some(expect_str(tokens, cursor, "fileName")?),
                "checksums" => checksums = Some(parse_checksums(tokens, cursor)?),
                "licenseConcluded" => {
                    license_concluded = Some(expect_str(tokens, cursor, "licenseConcluded")?);
                }
                "licenseInfoInFiles" => {
                    license_info_in_files =
                        Some(parse_string_array(tokens, cursor, "licenseInfoInFiles")?);
                }
                "copyrightText" => {
                    copyright_text = Some(expect_str(tokens, cursor, "copyrightText")?);
                }
                "fileTypes" => file_types = parse_file_types(tokens, cursor)?,
                _ => tokens.skip_value(cursor)?,
            },
            Token::EndObject => break,
            other => return Err(unexpected_in_object(cursor.offset(), &other)),
        }
    }

    let mut missing = Vec::new();
    if path.is_none() {
        missing.push("fileName".to_owned());
    }
    if spdx_id.is_none() {
        missing.push("SPDXID".to_owned());
    }
    match &checksums {
        None => missing.push("checksums".to_owned()),
        Some(list) => {
            for required in ["SHA256", "SHA1"] {
                if !list.iter().any(|c| c.algorithm == required) {
                    missing.push(format!("checksums.{required}"));
                }
            }
        }
    }
    if license_info_in_files.is_none() {
        missing.push("licenseInfoInFiles".to_owned());
    }
    if !missing.is_empty() {
        return Err(SpdxError::MissingRequiredProperty { fields: missing });
    }

    Ok(ParsedFile {
        spdx_id: spdx_id.unwrap_or_default(),
        path: path.unwrap_or_default(),
        checksums: checksums.unwrap_or_default(),
        license_concluded,
        license_info_in_files: license_info_in_files.unwrap_or_default(),
        copyright_text,
        file_types,
    })
}

/// 패키지 요소 객체 하나를 파싱합니다.
///
/// 필수 필드: `name`, `SPDXID`.
pub(crate) fn parse_package<R: Read>(
    tokens: &mut TokenReader,
    cursor: &mut ByteCursor<R>,
) -> Result<ParsedPackage, SpdxError> {
    expect_begin_object(tokens, cursor)?;

    let mut spdx_id = None;
    let mut name = None;
    let mut version_info = None;
    let mut download_location = None;
    let mut license_concluded = None;
    let mut license_declared = None;
    let mut license_info_from_files = Vec::new();
    let mut copyright_text = None;
    let mut files_analyzed = None;
    let mut supplier = None;
    let mut external_references = Vec::new();
    let mut verification_code = None;
    let mut has_files = Vec::new();

    loop {
        match tokens.next(cursor)? {
            Token::Key(key) => match key.as_str() {
                "SPDXID" => spdx_id = Some(expect_str(tokens, cursor, "SPDXID")?),
                "name" => name = Some(expect_str(tokens, cursor, "name")?),
                "versionInfo" => version_info = Some(expect_str(tokens, cursor, "versionInfo")?),
                "downloadLocation" => {
                    download_location = Some(expect_str(tokens, cursor, "downloadLocation")?);
                }
                "licenseConcluded" => {
                    license_concluded = Some(expect_str(tokens, cursor, "licenseConcluded")?);
                }
                "licenseDeclared" => {
                    license_declared = Some(expect_str(tokens, cursor, "licenseDeclared")?);
                }
                "licenseInfoFromFiles" => {
                    license_info_from_files =
                        parse_string_array(tokens, cursor, "licenseInfoFromFiles")?;
                }
                "copyrightText" => {
                    copyright_text = Some(expect_str(tokens, cursor, "copyrightText")?);
                }
                "filesAnalyzed" => {
                    files_analyzed = Some(expect_bool(tokens, cursor, "filesAnalyzed")?);
                }
                "supplier" => supplier = Some(expect_str(tokens, cursor, "supplier")?),
                "externalRefs" => external_references = parse_external_refs(tokens, cursor)?,
                "packageVerificationCode" => {
                    verification_code = Some(parse_verification_code(tokens, cursor)?);
                }
                "hasFiles" => has_files = parse_string_array(tokens, cursor, "hasFiles")?,
                _ => tokens.skip_value(cursor)?,
            },
            Token::EndObject => break,
            other => return Err(unexpected_in_object(cursor.offset(), &other)),
        }
    }

    let mut missing = Vec::new();
    if name.is_none() {
        missing.push("name".to_owned());
    }
    if spdx_id.is_none() {
        missing.push("SPDXID".to_owned());
    }
    if !missing.is_empty() {
        return Err(SpdxError::MissingRequiredProperty { fields: missing });
    }

    Ok(ParsedPackage {
        spdx_id: spdx_id.unwrap_or_default(),
        name: name.unwrap_or_default(),
        version_info,
        download_location,
        license_concluded,
        license_declared,
        license_info_from_files,
        copyright_text,
        files_analyzed,
        supplier,
        external_references,
        verification_code,
        has_files,
    })
}

/// 관계 요소 객체 하나를 파싱합니다.
///
/// 필수 필드: `spdxElementId`, `relationshipType`, `relatedSpdxElement`.
/// 닫힌 enum에 없는 관계 타입은 [`SpdxError::InvalidFieldValue`]입니다.
pub(crate) fn parse_relationship<R: Read>(
    tokens: &mut TokenReader,
    cursor: &mut ByteCursor<R>,
) -> Result<ParsedRelationship, SpdxError> {
    expect_begin_object(tokens, cursor)?;

    let mut source_element_id = None;
    let mut relationship_type = None;
    let mut target_element_id = None;

    loop {
        match tokens.next(cursor)? {
            Token::Key(key) => match key.as_str() {
                "spdxElementId" => {
                    source_element_id = Some(expect_str(tokens, cursor, "spdxElementId")?);
                }
                "relationshipType" => {
                    let raw = expect_str(tokens, cursor, "relationshipType")?;
                    let parsed = RelationshipType::from_spdx(&raw).ok_or_else(|| {
                        SpdxError::InvalidFieldValue {
                            field: "relationshipType".to_owned(),
                            reason: format!("unrecognized relationship type '{raw}'"),
                        }
                    })?;
                    relationship_type = Some(parsed);
                }
                "relatedSpdxElement" => {
                    target_element_id = Some(expect_str(tokens, cursor, "relatedSpdxElement")?);
                }
                _ => tokens.skip_value(cursor)?,
            },
            Token::EndObject => break,
            other => return Err(unexpected_in_object(cursor.offset(), &other)),
        }
    }

    let mut missing = Vec::new();
    if source_element_id.is_none() {
        missing.push("spdxElementId".to_owned());
    }
    if relationship_type.is_none() {
        missing.push("relationshipType".to_owned());
    }
    if target_element_id.is_none() {
        missing.push("relatedSpdxElement".to_owned());
    }
    if !missing.is_empty() {
        return Err(SpdxError::MissingRequiredProperty { fields: missing });
    }

    Ok(ParsedRelationship {
        source_element_id: source_element_id.unwrap_or_default(),
        relationship_type: relationship_type.unwrap_or(RelationshipType::Other),
        target_element_id: target_element_id.unwrap_or_default(),
    })
}

/// 외부 문서 참조 요소 객체 하나를 파싱합니다.
///
/// 필수 필드: `externalDocumentId`, `spdxDocument`, `checksum`.
/// dialect 규칙상 체크섬 알고리즘은 SHA1이어야 합니다.
pub(crate) fn parse_external_document_reference<R: Read>(
    tokens: &mut TokenReader,
    cursor: &mut ByteCursor<R>,
) -> Result<ParsedExternalDocumentReference, SpdxError> {
    expect_begin_object(tokens, cursor)?;

    let mut external_document_id = None;
    let mut spdx_document_namespace = None;
    let mut checksum = None;

    loop {
        match tokens.next(cursor)? {
            Token::Key(key) => match key.as_str() {
                "externalDocumentId" => {
                    external_document_id = Some(expect_str(tokens, cursor, "externalDocumentId")?);
                }
                "spdxDocument" => {
                    spdx_document_namespace = Some(expect_str(tokens, cursor, "spdxDocument")?);
                }
                "checksum" => checksum = Some(parse_checksum_object(tokens, cursor)?),
                _ => tokens.skip_value(cursor)?,
            },
            Token::EndObject => break,
            other => return Err(unexpected_in_object(cursor.offset(), &other)),
        }
    }

    let mut missing = Vec::new();
    if external_document_id.is_none() {
        missing.push("externalDocumentId".to_owned());
    }
    if spdx_document_namespace.is_none() {
        missing.push("spdxDocument".to_owned());
    }
    if checksum.is_none() {
        missing.push("checksum".to_owned());
    }
    if !missing.is_empty() {
        return Err(SpdxError::MissingRequiredProperty { fields: missing });
    }

    let checksum = checksum.unwrap_or_else(|| Checksum {
        algorithm: String::new(),
        value: String::new(),
    });
    if checksum.algorithm != "SHA1" {
        return Err(SpdxError::InvalidFieldValue {
            field: "checksum.algorithm".to_owned(),
            reason: format!("external document checksum must be SHA1, found '{}'", checksum.algorithm),
        });
    }

    Ok(ParsedExternalDocumentReference {
        external_document_id: external_document_id.unwrap_or_default(),
        spdx_document_namespace: spdx_document_namespace.unwrap_or_default(),
        checksum,
    })
}

/// `creationInfo` 객체를 파싱합니다.
///
/// 필수 필드: `created`, `creators`. 그 외 속성(`comment`,
/// `licenseListVersion` 등)은 건너뜁니다.
pub(crate) fn parse_creation_info<R: Read>(
    tokens: &mut TokenReader,
    cursor: &mut ByteCursor<R>,
) -> Result<CreationInfo, SpdxError> {
    expect_begin_object(tokens, cursor)?;

    let mut created = None;
    let mut creators = None;

    loop {
        match tokens.next(cursor)? {
            Token::Key(key) => match key.as_str() {
                "created" => created = Some(expect_str(tokens, cursor, "created")?),
                "creators" => creators = Some(parse_string_array(tokens, cursor, "creators")?),
                _ => tokens.skip_value(cursor)?,
            },
            Token::EndObject => break,
            other => return Err(unexpected_in_object(cursor.offset(), &other)),
        }
    }

    let mut missing = Vec::new();
    if created.is_none() {
        missing.push("creationInfo.created".to_owned());
    }
    if creators.is_none() {
        missing.push("creationInfo.creators".to_owned());
    }
    if !missing.is_empty() {
        return Err(SpdxError::MissingRequiredProperty { fields: missing });
    }

    Ok(CreationInfo {
        created: created.unwrap_or_default(),
        creators: creators.unwrap_or_default(),
    })
}

// --- 공용 헬퍼 ---

fn expect_begin_object<R: Read>(
    tokens: &mut TokenReader,
    cursor: &mut ByteCursor<R>,
) -> Result<(), SpdxError> {
    match tokens.next(cursor)? {
        Token::BeginObject => Ok(()),
        other => Err(SpdxError::MalformedJson {
            offset: cursor.offset(),
            reason: format!("expected '{{', found {}", other.kind()),
        }),
    }
}

pub(crate) fn expect_str<R: Read>(
    tokens: &mut TokenReader,
    cursor: &mut ByteCursor<R>,
    field: &str,
) -> Result<String, SpdxError> {
    match tokens.next(cursor)? {
        Token::Str(s) => Ok(s),
        other => Err(SpdxError::InvalidFieldValue {
            field: field.to_owned(),
            reason: format!("expected string, found {}", other.kind()),
        }),
    }
}

fn expect_bool<R: Read>(
    tokens: &mut TokenReader,
    cursor: &mut ByteCursor<R>,
    field: &str,
) -> Result<bool, SpdxError> {
    match tokens.next(cursor)? {
        Token::Bool(b) => Ok(b),
        other => Err(SpdxError::InvalidFieldValue {
            field: field.to_owned(),
            reason: format!("expected boolean, found {}", other.kind()),
        }),
    }
}

/// 문자열 배열을 파싱합니다.
pub(crate) fn parse_string_array<R: Read>(
    tokens: &mut TokenReader,
    cursor: &mut ByteCursor<R>,
    field: &str,
) -> Result<Vec<String>, SpdxError> {
    match tokens.next(cursor)? {
        Token::BeginArray => {}
        other => {
            return Err(SpdxError::InvalidFieldValue {
                field: field.to_owned(),
                reason: format!("expected array, found {}", other.kind()),
            });
        }
    }

    let mut values = Vec::new();
    while tokens.array_has_next(cursor)? {
        match tokens.next(cursor)? {
            Token::Str(s) => values.push(s),
            other => {
                return Err(SpdxError::InvalidFieldValue {
                    field: field.to_owned(),
                    reason: format!("expected string element, found {}", other.kind()),
                });
            }
        }
    }
    Ok(values)
}

/// `checksums` 배열을 파싱합니다.
fn parse_checksums<R: Read>(
    tokens: &mut TokenReader,
    cursor: &mut ByteCursor<R>,
) -> Result<Vec<Checksum>, SpdxError> {
    match tokens.next(cursor)? {
        Token::BeginArray => {}
        other => {
            return Err(SpdxError::InvalidFieldValue {
                field: "checksums".to_owned(),
                reason: format!("expected array, found {}", other.kind()),
            });
        }
    }

    let mut checksums = Vec::new();
    while tokens.array_has_next(cursor)? {
        checksums.push(parse_checksum_object(tokens, cursor)?);
    }
    Ok(checksums)
}

/// 체크섬 객체 하나 (`{"algorithm": ..., "checksumValue": ...}`)를 파싱합니다.
fn parse_checksum_object<R: Read>(
    tokens: &mut TokenReader,
    cursor: &mut ByteCursor<R>,
) -> Result<Checksum, SpdxError> {
    expect_begin_object(tokens, cursor)?;

    let mut algorithm = None;
    let mut value = None;

    loop {
        match tokens.next(cursor)? {
            Token::Key(key) => match key.as_str() {
                "algorithm" => algorithm = Some(expect_str(tokens, cursor, "algorithm")?),
                "checksumValue" => value = Some(expect_str(tokens, cursor, "checksumValue")?),
                _ => tokens.skip_value(cursor)?,
            },
            Token::EndObject => break,
            other => return Err(unexpected_in_object(cursor.offset(), &other)),
        }
    }

    let mut missing = Vec::new();
    if algorithm.is_none() {
        missing.push("checksum.algorithm".to_owned());
    }
    if value.is_none() {
        missing.push("checksum.checksumValue".to_owned());
    }
    if !missing.is_empty() {
        return Err(SpdxError::MissingRequiredProperty { fields: missing });
    }

    Ok(Checksum {
        algorithm: algorithm.unwrap_or_default(),
        value: value.unwrap_or_default(),
    })
}

/// `fileTypes` 배열을 파싱합니다. 닫힌 enum에 없는 타입은 에러입니다.
fn parse_file_types<R: Read>(
    tokens: &mut TokenReader,
    cursor: &mut ByteCursor<R>,
) -> Result<Vec<FileType>, SpdxError> {
    let raw = parse_string_array(tokens, cursor, "fileTypes")?;
    let mut types = Vec::with_capacity(raw.len());
    for value in raw {
        let parsed = FileType::from_spdx(&value).ok_or_else(|| SpdxError::InvalidFieldValue {
            field: "fileTypes".to_owned(),
            reason: format!("unrecognized file type '{value}'"),
        })?;
        types.push(parsed);
    }
    Ok(types)
}

/// `externalRefs` 배열을 파싱합니다.
fn parse_external_refs<R: Read>(
    tokens: &mut TokenReader,
    cursor: &mut ByteCursor<R>,
) -> Result<Vec<ExternalPackageRef>, SpdxError> {
    match tokens.next(cursor)? {
        Token::BeginArray => {}
        other => {
            return Err(SpdxError::InvalidFieldValue {
                field: "externalRefs".to_owned(),
                reason: format!("expected array, found {}", other.kind()),
            });
        }
    }

    let mut refs = Vec::new();
    while tokens.array_has_next(cursor)? {
        expect_begin_object(tokens, cursor)?;

        let mut category = None;
        let mut ref_type = None;
        let mut locator = None;

        loop {
            match tokens.next(cursor)? {
                Token::Key(key) => match key.as_str() {
                    "referenceCategory" => {
                        category = Some(expect_str(tokens, cursor, "referenceCategory")?);
                    }
                    "referenceType" => {
                        ref_type = Some(expect_str(tokens, cursor, "referenceType")?);
                    }
                    "referenceLocator" => {
                        locator = Some(expect_str(tokens, cursor, "referenceLocator")?);
                    }
                    _ => tokens.skip_value(cursor)?,
                },
                Token::EndObject => break,
                other => return Err(unexpected_in_object(cursor.offset(), &other)),
            }
        }

        let mut missing = Vec::new();
        if category.is_none() {
            missing.push("externalRefs.referenceCategory".to_owned());
        }
        if ref_type.is_none() {
            missing.push("externalRefs.referenceType".to_owned());
        }
        if locator.is_none() {
            missing.push("externalRefs.referenceLocator".to_owned());
        }
        if !missing.is_empty() {
            return Err(SpdxError::MissingRequiredProperty { fields: missing });
        }

        refs.push(ExternalPackageRef {
            category: category.unwrap_or_default(),
            ref_type: ref_type.unwrap_or_default(),
            locator: locator.unwrap_or_default(),
        });
    }
    Ok(refs)
}

/// `packageVerificationCode` 객체를 파싱합니다.
fn parse_verification_code<R: Read>(
    tokens: &mut TokenReader,
    cursor: &mut ByteCursor<R>,
) -> Result<PackageVerificationCode, SpdxError> {
    expect_begin_object(tokens, cursor)?;

    let mut value = None;
    let mut excluded_files = Vec::new();

    loop {
        match tokens.next(cursor)? {
            Token::Key(key) => match key.as_str() {
                "packageVerificationCodeValue" => {
                    value = Some(expect_str(tokens, cursor, "packageVerificationCodeValue")?);
                }
                "packageVerificationCodeExcludedFiles" => {
                    excluded_files = parse_string_array(
                        tokens,
                        cursor,
                        "packageVerificationCodeExcludedFiles",
                    )?;
                }
                _ => tokens.skip_value(cursor)?,
            },
            Token::EndObject => break,
            other => return Err(unexpected_in_object(cursor.offset(), &other)),
        }
    }

    let value = value.ok_or_else(|| SpdxError::MissingRequiredProperty {
        fields: vec!["packageVerificationCode.packageVerificationCodeValue".to_owned()],
    })?;

    Ok(PackageVerificationCode {
        value,
        excluded_files,
    })
}

fn unexpected_in_object(offset: u64, token: &Token) -> SpdxError {
    SpdxError::MalformedJson {
        offset,
        reason: format!("expected object member or '}}', found {}", token.kind()),
    }
}

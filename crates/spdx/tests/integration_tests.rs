//! Integration tests for the incremental SPDX parser
//!
//! Tests the full pull-parsing flow: stream -> cursor -> tokenizer ->
//! state machine -> lazy sequences -> completeness validation.

use sbomstream_spdx::types::ParserState;
use sbomstream_spdx::{
    FormatDetector, ParserConfig, ParserConfigBuilder, RelationshipType, SbomParser,
    Spdx22Parser, SpdxError, SpdxWriter,
};

/// 유효한 메타데이터 머리부 + 주어진 섹션들로 문서를 조립합니다.
fn document_with_sections(sections: &str) -> String {
    format!(
        r#"{{
        "spdxVersion": "SPDX-2.2",
        "dataLicense": "CC0-1.0",
        "SPDXID": "SPDXRef-DOCUMENT",
        "name": "integration-doc",
        "documentNamespace": "https://example.com/integration-doc",
        "creationInfo": {{"created": "2024-06-01T00:00:00Z", "creators": ["Tool: test"]}},
        "documentDescribes": ["SPDXRef-Package-root"],
        {sections}
    }}"#
    )
}

fn file_element(index: usize) -> String {
    format!(
        r#"{{
            "fileName": "./file{index}",
            "SPDXID": "SPDXRef-File-{index}",
            "checksums": [
                {{"algorithm": "SHA256", "checksumValue": "sha256-{index}"}},
                {{"algorithm": "SHA1", "checksumValue": "sha1-{index}"}}
            ],
            "licenseConcluded": "NOASSERTION",
            "licenseInfoInFiles": ["NOASSERTION"],
            "copyrightText": "NOASSERTION"
        }}"#
    )
}

fn document_with_n_files(n: usize) -> String {
    let files: Vec<String> = (0..n).map(file_element).collect();
    document_with_sections(&format!(
        r#""files": [{}], "packages": [], "relationships": []"#,
        files.join(",")
    ))
}

#[test]
fn n_files_yield_exactly_n_in_document_order() {
    for n in [1, 3, 17] {
        let doc = document_with_n_files(n);
        let mut parser = Spdx22Parser::new(doc.as_bytes(), ParserConfig::default()).unwrap();
        assert_eq!(parser.advance().unwrap(), ParserState::Files);

        let files: Vec<_> = parser
            .files()
            .unwrap()
            .map(|f| f.unwrap())
            .collect();
        assert_eq!(files.len(), n);
        for (index, file) in files.iter().enumerate() {
            assert_eq!(file.path, format!("./file{index}"));
            // dialect 필수 체크섬 불변식
            assert!(file.checksums.iter().any(|c| c.algorithm == "SHA256"));
            assert!(file.checksums.iter().any(|c| c.algorithm == "SHA1"));
        }
    }
}

#[test]
fn minimum_valid_document_reaches_finished_without_errors() {
    let doc = document_with_sections(
        r#""files": [], "packages": [], "relationships": [], "externalDocumentRefs": []"#,
    );
    let mut parser = Spdx22Parser::new(doc.as_bytes(), ParserConfig::default()).unwrap();

    let mut counts = (0usize, 0usize, 0usize, 0usize);
    loop {
        match parser.advance().unwrap() {
            ParserState::Files => counts.0 += parser.files().unwrap().count(),
            ParserState::Packages => counts.1 += parser.packages().unwrap().count(),
            ParserState::Relationships => counts.2 += parser.relationships().unwrap().count(),
            ParserState::References => counts.3 += parser.references().unwrap().count(),
            ParserState::Metadata => break,
            other => panic!("unexpected state {other}"),
        }
    }
    assert_eq!(counts, (0, 0, 0, 0));
    parser.metadata().unwrap();
    parser.finish().unwrap();
}

#[test]
fn get_files_fails_with_wrong_state_in_every_other_state() {
    let doc = document_with_sections(r#""files": [], "packages": [], "relationships": []"#);

    // None 상태
    let mut parser = Spdx22Parser::new(doc.as_bytes(), ParserConfig::default()).unwrap();
    assert!(matches!(
        parser.files().unwrap_err(),
        SpdxError::WrongState { .. }
    ));

    // Packages / Relationships / Metadata / Finished 상태
    let mut parser = Spdx22Parser::new(doc.as_bytes(), ParserConfig::default()).unwrap();
    assert_eq!(parser.advance().unwrap(), ParserState::Files);
    assert_eq!(parser.files().unwrap().count(), 0);

    assert_eq!(parser.advance().unwrap(), ParserState::Packages);
    assert!(matches!(
        parser.files().unwrap_err(),
        SpdxError::WrongState { .. }
    ));
    assert_eq!(parser.packages().unwrap().count(), 0);

    assert_eq!(parser.advance().unwrap(), ParserState::Relationships);
    assert!(matches!(
        parser.files().unwrap_err(),
        SpdxError::WrongState { .. }
    ));
    assert_eq!(parser.relationships().unwrap().count(), 0);

    assert_eq!(parser.advance().unwrap(), ParserState::Metadata);
    assert!(matches!(
        parser.files().unwrap_err(),
        SpdxError::WrongState { .. }
    ));

    parser.metadata().unwrap();
    assert!(matches!(
        parser.files().unwrap_err(),
        SpdxError::WrongState { .. }
    ));
}

#[test]
fn corrupted_closing_bracket_is_malformed_not_truncated_sequence() {
    // files 배열의 닫는 대괄호 자리에 관련 없는 바이트가 있는 문서
    let doc = document_with_sections(&format!(
        r#""files": [{} ~~corrupted~~, "packages": [], "relationships": []"#,
        file_element(0)
    ));
    let mut parser = Spdx22Parser::new(doc.as_bytes(), ParserConfig::default()).unwrap();
    assert_eq!(parser.advance().unwrap(), ParserState::Files);

    let results: Vec<_> = parser.files().unwrap().collect();
    assert!(results[0].is_ok());
    // 시퀀스가 조용히 끝나지 않고 명시적 MalformedJson으로 실패
    let err = results[1].as_ref().unwrap_err();
    assert!(matches!(err, SpdxError::MalformedJson { .. }));
}

#[test]
fn missing_relationships_is_reported_specifically() {
    let doc = document_with_sections(r#""files": [], "packages": []"#);
    let mut parser = Spdx22Parser::new(doc.as_bytes(), ParserConfig::default()).unwrap();
    assert_eq!(parser.advance().unwrap(), ParserState::Files);
    assert_eq!(parser.files().unwrap().count(), 0);
    assert_eq!(parser.advance().unwrap(), ParserState::Packages);

    let mut packages = parser.packages().unwrap();
    let err = packages.next().unwrap().unwrap_err();
    match err {
        SpdxError::MissingRequiredProperty { fields } => {
            assert_eq!(fields, vec!["relationships"]);
        }
        other => panic!("expected MissingRequiredProperty, got {other}"),
    }
}

#[test]
fn file_missing_license_info_in_files_names_the_field() {
    // 다른 선택적 필드들도 없지만, 선언된 필수 필드만 에러를 유발함
    let doc = document_with_sections(
        r#""files": [
            {
                "fileName": "./file0",
                "SPDXID": "SPDXRef-File-0",
                "checksums": [
                    {"algorithm": "SHA256", "checksumValue": "aa"},
                    {"algorithm": "SHA1", "checksumValue": "bb"}
                ]
            }
        ], "packages": [], "relationships": []"#,
    );
    let mut parser = Spdx22Parser::new(doc.as_bytes(), ParserConfig::default()).unwrap();
    assert_eq!(parser.advance().unwrap(), ParserState::Files);

    let mut files = parser.files().unwrap();
    let err = files.next().unwrap().unwrap_err();
    match err {
        SpdxError::MissingRequiredProperty { fields } => {
            assert_eq!(fields, vec!["licenseInfoInFiles"]);
        }
        other => panic!("expected MissingRequiredProperty, got {other}"),
    }
}

#[test]
fn relationship_type_none_is_invalid_field_value() {
    let doc = document_with_sections(
        r#""files": [], "packages": [], "relationships": [
            {
                "spdxElementId": "SPDXRef-DOCUMENT",
                "relationshipType": "None",
                "relatedSpdxElement": "SPDXRef-Package-root"
            }
        ]"#,
    );
    let mut parser = Spdx22Parser::new(doc.as_bytes(), ParserConfig::default()).unwrap();
    assert_eq!(parser.advance().unwrap(), ParserState::Files);
    assert_eq!(parser.files().unwrap().count(), 0);
    assert_eq!(parser.advance().unwrap(), ParserState::Packages);
    assert_eq!(parser.packages().unwrap().count(), 0);
    assert_eq!(parser.advance().unwrap(), ParserState::Relationships);

    let mut relationships = parser.relationships().unwrap();
    let err = relationships.next().unwrap().unwrap_err();
    match err {
        SpdxError::InvalidFieldValue { field, .. } => assert_eq!(field, "relationshipType"),
        other => panic!("expected InvalidFieldValue, got {other}"),
    }
}

#[test]
fn external_document_refs_are_streamed() {
    let doc = document_with_sections(
        r#""files": [], "packages": [], "relationships": [],
        "externalDocumentRefs": [
            {
                "externalDocumentId": "DocumentRef-other",
                "spdxDocument": "https://example.com/other",
                "checksum": {"algorithm": "SHA1", "checksumValue": "ff00"}
            }
        ]"#,
    );
    let mut parser = Spdx22Parser::new(doc.as_bytes(), ParserConfig::default()).unwrap();
    let mut references = Vec::new();
    loop {
        match parser.advance().unwrap() {
            ParserState::Files => {
                parser.files().unwrap().for_each(|f| {
                    f.unwrap();
                });
            }
            ParserState::Packages => {
                parser.packages().unwrap().for_each(|p| {
                    p.unwrap();
                });
            }
            ParserState::Relationships => {
                parser.relationships().unwrap().for_each(|r| {
                    r.unwrap();
                });
            }
            ParserState::References => {
                references.extend(parser.references().unwrap().map(|r| r.unwrap()));
            }
            ParserState::Metadata => break,
            other => panic!("unexpected state {other}"),
        }
    }
    assert_eq!(references.len(), 1);
    assert_eq!(references[0].external_document_id, "DocumentRef-other");
    assert_eq!(references[0].checksum.algorithm, "SHA1");
}

#[test]
fn every_buffer_size_produces_identical_results() {
    // 토큰이 버퍼 경계 어디에 걸쳐도 결과가 같아야 함
    let doc = document_with_n_files(5);
    let mut baseline = None;
    for buffer_size in [7, 16, 64, 4096] {
        let config = ParserConfigBuilder::new()
            .buffer_size(buffer_size)
            .build()
            .unwrap();
        let mut parser = Spdx22Parser::new(doc.as_bytes(), config).unwrap();
        assert_eq!(parser.advance().unwrap(), ParserState::Files);
        let files: Vec<_> = parser.files().unwrap().map(|f| f.unwrap()).collect();
        match &baseline {
            None => baseline = Some(files),
            Some(expected) => assert_eq!(&files, expected),
        }
    }
}

#[test]
fn parses_from_real_file_stream() {
    let doc = document_with_n_files(3);
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("manifest.spdx.json");
    std::fs::write(&path, &doc).unwrap();

    let stream = std::fs::File::open(&path).unwrap();
    let mut parser = Spdx22Parser::new(stream, ParserConfig::default()).unwrap();
    assert_eq!(parser.advance().unwrap(), ParserState::Files);
    assert_eq!(parser.files().unwrap().map(|f| f.unwrap()).count(), 3);
}

#[test]
fn round_trip_writer_then_parser_preserves_identity() {
    use sbomstream_spdx::types::{Checksum, ParsedFile, ParsedPackage, ParsedRelationship};

    let files = vec![ParsedFile {
        spdx_id: "SPDXRef-File-0".to_owned(),
        path: "./file0".to_owned(),
        checksums: vec![
            Checksum {
                algorithm: "SHA256".to_owned(),
                value: "sha256-0".to_owned(),
            },
            Checksum {
                algorithm: "SHA1".to_owned(),
                value: "sha1-0".to_owned(),
            },
        ],
        license_concluded: Some("MIT".to_owned()),
        license_info_in_files: vec!["MIT".to_owned()],
        copyright_text: None,
        file_types: Vec::new(),
    }];
    let packages = vec![ParsedPackage {
        spdx_id: "SPDXRef-Package-serde".to_owned(),
        name: "serde".to_owned(),
        version_info: Some("1.0.204".to_owned()),
        download_location: None,
        license_concluded: None,
        license_declared: None,
        license_info_from_files: Vec::new(),
        copyright_text: None,
        files_analyzed: Some(false),
        supplier: None,
        external_references: Vec::new(),
        verification_code: None,
        has_files: Vec::new(),
    }];
    let relationships = vec![ParsedRelationship {
        source_element_id: "SPDXRef-DOCUMENT".to_owned(),
        relationship_type: RelationshipType::Describes,
        target_element_id: "SPDXRef-Package-serde".to_owned(),
    }];

    let json = SpdxWriter::new("round-trip")
        .generate(&files, &packages, &relationships)
        .unwrap();

    let mut parser = Spdx22Parser::new(json.as_bytes(), ParserConfig::default()).unwrap();
    let mut parsed_files = Vec::new();
    let mut parsed_packages = Vec::new();
    let mut parsed_relationships = Vec::new();
    loop {
        match parser.advance().unwrap() {
            ParserState::Files => {
                parsed_files.extend(parser.files().unwrap().map(|f| f.unwrap()));
            }
            ParserState::Packages => {
                parsed_packages.extend(parser.packages().unwrap().map(|p| p.unwrap()));
            }
            ParserState::Relationships => {
                parsed_relationships.extend(parser.relationships().unwrap().map(|r| r.unwrap()));
            }
            ParserState::References => {
                parser.references().unwrap().for_each(|r| {
                    r.unwrap();
                });
            }
            ParserState::Metadata => break,
            other => panic!("unexpected state {other}"),
        }
    }

    assert_eq!(parsed_files[0].spdx_id, files[0].spdx_id);
    assert_eq!(parsed_files[0].path, files[0].path);
    assert_eq!(parsed_files[0].checksums, files[0].checksums);
    assert_eq!(parsed_packages[0].spdx_id, packages[0].spdx_id);
    assert_eq!(parsed_packages[0].version_info, packages[0].version_info);
    assert_eq!(parsed_relationships[0], relationships[0]);

    let metadata = parser.metadata().unwrap();
    assert_eq!(metadata.spdx_version.as_deref(), Some("SPDX-2.2"));
    assert_eq!(metadata.name.as_deref(), Some("round-trip"));
    parser.finish().unwrap();
}

#[test]
fn detector_works_through_the_shared_contract() {
    let doc = document_with_n_files(2);
    let detector = FormatDetector::new();
    let info = detector.detect(|| Ok(doc.as_bytes())).unwrap();
    assert_eq!(info.to_string(), "spdx:2.2");

    // 같은 파서를 공용 계약으로도 구동할 수 있음
    let config = ParserConfigBuilder::new()
        .skip_property("files")
        .skip_property("packages")
        .skip_property("relationships")
        .build()
        .unwrap();
    let mut parser: Box<dyn SbomParser + '_> =
        Box::new(Spdx22Parser::new(doc.as_bytes(), config).unwrap());
    assert_eq!(parser.advance().unwrap(), ParserState::Metadata);
    assert_eq!(parser.manifest_info().to_string(), "spdx:2.2");
}

#[test]
fn truncated_stream_fails_with_truncated_error() {
    let doc = document_with_n_files(1);
    let cut = &doc.as_bytes()[..doc.len() / 2];
    let mut parser = Spdx22Parser::new(cut, ParserConfig::default()).unwrap();

    let result = (|| -> Result<(), SpdxError> {
        loop {
            match parser.advance()? {
                ParserState::Files => {
                    for file in parser.files()? {
                        file?;
                    }
                }
                ParserState::Metadata => return Ok(()),
                _ => {}
            }
        }
    })();

    match result.unwrap_err() {
        SpdxError::Truncated { offset } => assert!(offset > 0),
        other => panic!("expected Truncated, got {other}"),
    }
}

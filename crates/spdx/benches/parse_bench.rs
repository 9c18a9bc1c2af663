//! SPDX 파서 벤치마크
//!
//! 증분 파싱 처리량과 버퍼 크기의 영향을 측정합니다.

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use sbomstream_spdx::types::ParserState;
use sbomstream_spdx::{FormatDetector, ParserConfig, ParserConfigBuilder, Spdx22Parser};

/// count개의 파일 요소를 가진 SPDX 2.2 문서를 생성합니다.
fn generate_document(count: usize) -> String {
    let mut files = Vec::with_capacity(count);
    for i in 0..count {
        files.push(format!(
            r#"{{
                "fileName": "./src/generated/file_{i}.rs",
                "SPDXID": "SPDXRef-File-{i}",
                "checksums": [
                    {{"algorithm": "SHA256", "checksumValue": "{i:064x}"}},
                    {{"algorithm": "SHA1", "checksumValue": "{i:040x}"}}
                ],
                "licenseConcluded": "NOASSERTION",
                "licenseInfoInFiles": ["NOASSERTION"],
                "copyrightText": "NOASSERTION"
            }}"#
        ));
    }

    format!(
        r#"{{
        "spdxVersion": "SPDX-2.2",
        "dataLicense": "CC0-1.0",
        "SPDXID": "SPDXRef-DOCUMENT",
        "name": "bench-doc",
        "documentNamespace": "https://example.com/bench-doc",
        "creationInfo": {{"created": "2024-06-01T00:00:00Z", "creators": ["Tool: bench"]}},
        "documentDescribes": [],
        "files": [{}],
        "packages": [],
        "relationships": []
    }}"#,
        files.join(",")
    )
}

/// 문서를 끝까지 구동하며 파일 수를 셉니다.
fn drain_document(doc: &[u8], config: ParserConfig) -> usize {
    let mut parser = Spdx22Parser::new(doc, config).unwrap();
    let mut count = 0;
    loop {
        match parser.advance().unwrap() {
            ParserState::Files => count += parser.files().unwrap().map(|f| f.unwrap()).count(),
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
                parser.references().unwrap().for_each(|r| {
                    r.unwrap();
                });
            }
            ParserState::Metadata => {
                parser.metadata().unwrap();
                return count;
            }
            other => panic!("unexpected state {other}"),
        }
    }
}

fn bench_full_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("full_parse");

    for count in [10, 100, 1000] {
        let doc = generate_document(count);
        group.throughput(Throughput::Bytes(doc.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &doc, |b, doc| {
            b.iter(|| drain_document(black_box(doc.as_bytes()), ParserConfig::default()))
        });
    }

    group.finish();
}

fn bench_buffer_sizes(c: &mut Criterion) {
    let doc = generate_document(100);
    let mut group = c.benchmark_group("buffer_sizes");
    group.throughput(Throughput::Bytes(doc.len() as u64));

    for buffer_size in [256usize, 4096, 65536] {
        let config = ParserConfigBuilder::new()
            .buffer_size(buffer_size)
            .build()
            .unwrap();
        group.bench_with_input(
            BenchmarkId::from_parameter(buffer_size),
            &config,
            |b, config| {
                b.iter(|| drain_document(black_box(doc.as_bytes()), config.clone()))
            },
        );
    }

    group.finish();
}

fn bench_format_detection(c: &mut Criterion) {
    // 탐지는 섹션을 건너뛰므로 문서 크기에 둔감해야 함
    let doc = generate_document(1000);
    let detector = FormatDetector::new();

    let mut group = c.benchmark_group("format_detection");
    group.throughput(Throughput::Elements(1));
    group.bench_function("skip_sections_1000_files", |b| {
        b.iter(|| detector.detect(|| Ok(black_box(doc.as_bytes()))).unwrap())
    });

    group.finish();
}

criterion_group!(benches, bench_full_parse, bench_buffer_sizes, bench_format_detection);
criterion_main!(benches);

#![doc = include_str!("../README.md")]
//!
//! # Module Structure
//!
//! - [`error`]: 도메인 에러 타입 (`SpdxError`)
//! - [`config`]: 파서 설정 (`ParserConfig`, 빌더)
//! - [`types`]: 도메인 타입 (`ParserState`, `DocumentMetadata`, `ParsedFile` 등)
//! - [`parser`]: 증분 파서 (`SbomParser` trait, `Spdx22Parser`, `Spdx30Parser`)
//! - [`detect`]: 형식 탐지 (`FormatDetector`, `ManifestInfo`)
//! - [`writer`]: SPDX 2.2 JSON 생성 (`SpdxWriter`)
//!
//! # Architecture
//!
//! ```text
//! Stream --> ByteCursor --> TokenReader --> RootPropertyScanner
//!                                               |
//!                        +----------------------+----------------------+
//!                        |                      |                      |
//!                   skip 집합             metadata 필드           배열 섹션
//!                  (값 버림)          (DocumentMetadata)      (지연 시퀀스)
//!                                                                    |
//!                                                          ParsedFile / ParsedPackage
//!                                                          ParsedRelationship / ...
//! ```

pub mod config;
pub mod detect;
pub mod error;
pub mod parser;
pub mod types;
pub mod writer;

// --- Public API Re-exports ---

// 파서
pub use parser::SbomParser;
pub use parser::spdx22::{SectionIter, Spdx22Parser};
pub use parser::spdx30::{GraphElement, GraphIter, Spdx30Parser};

// 설정
pub use config::{ParserConfig, ParserConfigBuilder};

// 에러
pub use error::SpdxError;

// 형식 탐지
pub use detect::FormatDetector;

// 도메인 타입
pub use types::{
    Checksum, CreationInfo, DocumentMetadata, ManifestInfo, ParsedExternalDocumentReference,
    ParsedFile, ParsedPackage, ParsedRelationship, ParserState, RelationshipType, SbomDialect,
};

// 생성기
pub use writer::SpdxWriter;

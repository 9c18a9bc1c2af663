//! SPDX 3.0 파서 -- JSON-LD `@graph` 기반 dialect의 상태 머신
//!
//! [`Spdx30Parser`]는 2.2 파서와 외부 계약([`SbomParser`])만 공유하는
//! 독립 상태 머신입니다. 루트에는 `@context`와 `@graph` 두 속성만
//! 존재하며, `@graph`는 종류가 뒤섞인 엘리먼트 객체의 단일 배열입니다.
//!
//! JSON-LD는 `type` 속성이 객체 어디에나 올 수 있으므로, 엘리먼트
//! 하나를 경계로 하는 `serde_json::Value` 조립이 필요합니다. 문서
//! 전체는 여전히 메모리에 올라가지 않습니다 (한 번에 엘리먼트 하나).

use std::collections::VecDeque;
use std::fmt;
use std::io::Read;

use tracing::debug;

use crate::config::ParserConfig;
use crate::error::SpdxError;
use crate::parser::cursor::ByteCursor;
use crate::parser::tokens::{Token, TokenReader};
use crate::parser::SbomParser;
use crate::types::{
    Checksum, CreationInfo, DocumentMetadata, ManifestInfo, ParsedFile, ParsedPackage,
    ParsedRelationship, ParserState, RelationshipType, SectionState,
};

/// `@graph` 배열에서 나오는 엘리먼트
#[derive(Debug, Clone, PartialEq)]
pub enum GraphElement {
    /// `software_File` 엘리먼트
    File(ParsedFile),
    /// `software_Package` 엘리먼트
    Package(ParsedPackage),
    /// `Relationship` 엘리먼트 (`to` 항목 하나당 하나씩)
    Relationship(ParsedRelationship),
}

/// 분류되었으나 값을 아직 소비하지 않은 루트 속성
#[derive(Debug)]
enum Pending {
    /// skip 집합 소속
    Skip(String),
    /// `@context` 값
    Context,
}

/// SPDX 3.0 증분 파서
///
/// 2.2 파서와 마찬가지로 스트림 하나에 대해 단 한 번만 사용합니다.
pub struct Spdx30Parser<R: Read> {
    cursor: ByteCursor<R>,
    tokens: TokenReader,
    config: ParserConfig,
    state: ParserState,
    metadata: DocumentMetadata,
    /// `@context` 값 (문자열 또는 문자열 배열)
    context: Vec<String>,
    /// `@graph` 섹션 진행 상태
    graph: SectionState,
    /// `@graph`의 `[`를 소비했는지 여부
    graph_open: bool,
    root_entered: bool,
    pending: Option<Pending>,
    /// `to` 배열 전개 등으로 미리 만들어진 엘리먼트 큐
    queued: VecDeque<GraphElement>,
}

impl<R: Read> Spdx30Parser<R> {
    /// 스트림 위에 파서를 생성합니다.
    pub fn new(reader: R, config: ParserConfig) -> Result<Self, SpdxError> {
        config.validate()?;
        let cursor = ByteCursor::new(reader, config.buffer_size)?;
        Ok(Self {
            cursor,
            tokens: TokenReader::new(),
            config,
            state: ParserState::None,
            metadata: DocumentMetadata::default(),
            context: Vec::new(),
            graph: SectionState::NotStarted,
            graph_open: false,
            root_entered: false,
            pending: None,
            queued: VecDeque::new(),
        })
    }

    /// 현재 파서 상태를 반환합니다.
    pub fn state(&self) -> ParserState {
        self.state
    }

    /// 지금까지 관찰된 메타데이터의 스냅샷을 반환합니다.
    pub fn partial_metadata(&self) -> &DocumentMetadata {
        &self.metadata
    }

    /// 행동이 필요한 다음 상태까지 파서를 진행시킵니다.
    pub fn advance(&mut self) -> Result<ParserState, SpdxError> {
        loop {
            match self.state {
                ParserState::None => {
                    if !self.root_entered {
                        self.enter_root()?;
                    }
                    self.scan_root_property()?;
                }
                ParserState::SkippingValue | ParserState::ReadingMetadata => {
                    self.drain_pending()?;
                }
                parked => return Ok(parked),
            }
        }
    }

    /// 문서 메타데이터를 회수하고 `Finished`로 전이합니다.
    pub fn metadata(&mut self) -> Result<DocumentMetadata, SpdxError> {
        if self.state != ParserState::Metadata {
            return Err(SpdxError::WrongState {
                expected: ParserState::Metadata,
                actual: self.state,
            });
        }
        self.state = ParserState::Finished;
        debug!(name = ?self.metadata.name, "spdx 3.0 document finished");
        Ok(self.metadata.clone())
    }

    /// 파서가 완전히 종료되었는지 확인합니다.
    pub fn finish(&self) -> Result<(), SpdxError> {
        match self.state {
            ParserState::Finished => Ok(()),
            ParserState::Metadata => Err(SpdxError::IncompleteMetadata),
            other => {
                if self.graph == SectionState::InProgress {
                    return Err(SpdxError::IncompleteSection {
                        section: "@graph".to_owned(),
                    });
                }
                Err(SpdxError::WrongState {
                    expected: ParserState::Finished,
                    actual: other,
                })
            }
        }
    }

    /// `@graph` 섹션의 지연 시퀀스를 반환합니다.
    ///
    /// `Graph` 상태가 아니면 `WrongState`입니다. `CreationInfo`와
    /// `SpdxDocument` 엘리먼트는 메타데이터로 흡수되고, 알 수 없는
    /// 엘리먼트 타입은 건너뛰므로 시퀀스에 나타나지 않습니다.
    pub fn elements(&mut self) -> Result<GraphIter<'_, R>, SpdxError> {
        if self.state != ParserState::Graph {
            return Err(SpdxError::WrongState {
                expected: ParserState::Graph,
                actual: self.state,
            });
        }
        Ok(GraphIter {
            parser: self,
            done: false,
        })
    }

    // --- 내부 구현 ---

    fn enter_root(&mut self) -> Result<(), SpdxError> {
        match self.tokens.next(&mut self.cursor)? {
            Token::BeginObject => {
                self.root_entered = true;
                Ok(())
            }
            other => Err(SpdxError::MalformedJson {
                offset: self.cursor.offset(),
                reason: format!("expected JSON-LD document object at root, found {}", other.kind()),
            }),
        }
    }

    fn scan_root_property(&mut self) -> Result<(), SpdxError> {
        let offset = self.cursor.offset();
        match self.tokens.next(&mut self.cursor)? {
            Token::Key(name) => {
                if self.config.skips(&name) {
                    self.pending = Some(Pending::Skip(name));
                    self.state = ParserState::SkippingValue;
                    return Ok(());
                }
                match name.as_str() {
                    "@context" => {
                        self.pending = Some(Pending::Context);
                        self.state = ParserState::ReadingMetadata;
                        Ok(())
                    }
                    "@graph" => {
                        if self.graph != SectionState::NotStarted {
                            return Err(SpdxError::MalformedJson {
                                offset,
                                reason: "duplicate section '@graph'".to_owned(),
                            });
                        }
                        self.graph = SectionState::InProgress;
                        self.graph_open = false;
                        self.state = ParserState::Graph;
                        debug!("entering @graph section");
                        Ok(())
                    }
                    _ => Err(SpdxError::UnknownMetadataProperty { name, offset }),
                }
            }
            Token::EndObject => {
                self.check_completeness()?;
                self.state = ParserState::Metadata;
                Ok(())
            }
            other => Err(SpdxError::MalformedJson {
                offset: self.cursor.offset(),
                reason: format!("unexpected {} at document root", other.kind()),
            }),
        }
    }

    fn drain_pending(&mut self) -> Result<(), SpdxError> {
        match self.pending.take() {
            Some(Pending::Skip(name)) => {
                debug!(property = %name, "skipping root property");
                self.tokens.skip_value(&mut self.cursor)?;
            }
            Some(Pending::Context) => self.read_context()?,
            None => {}
        }
        self.state = ParserState::None;
        Ok(())
    }

    /// `@context` 값을 읽습니다 (문자열 또는 문자열 배열).
    fn read_context(&mut self) -> Result<(), SpdxError> {
        match self.tokens.next(&mut self.cursor)? {
            Token::Str(uri) => self.context.push(uri),
            Token::BeginArray => {
                while self.tokens.array_has_next(&mut self.cursor)? {
                    match self.tokens.next(&mut self.cursor)? {
                        Token::Str(uri) => self.context.push(uri),
                        other => {
                            return Err(SpdxError::InvalidFieldValue {
                                field: "@context".to_owned(),
                                reason: format!("expected string element, found {}", other.kind()),
                            });
                        }
                    }
                }
            }
            other => {
                return Err(SpdxError::InvalidFieldValue {
                    field: "@context".to_owned(),
                    reason: format!("expected string or array, found {}", other.kind()),
                });
            }
        }

        if !self.context.iter().any(|uri| uri.contains("spdx")) {
            return Err(SpdxError::InvalidFieldValue {
                field: "@context".to_owned(),
                reason: "not an SPDX JSON-LD context".to_owned(),
            });
        }

        // dialect 식별 결과를 공유 메타데이터 형태로 기록
        self.metadata.spdx_version = Some("SPDX-3.0".to_owned());
        self.metadata.document_namespace = self.context.first().cloned();
        Ok(())
    }

    fn check_completeness(&self) -> Result<(), SpdxError> {
        if self.graph == SectionState::InProgress {
            return Err(SpdxError::IncompleteSection {
                section: "@graph".to_owned(),
            });
        }

        let mut missing = Vec::new();
        if self.context.is_empty() && !self.config.skips("@context") {
            missing.push("@context".to_owned());
        }
        if self.graph == SectionState::NotStarted && !self.config.skips("@graph") {
            missing.push("@graph".to_owned());
        }
        if !missing.is_empty() {
            return Err(SpdxError::MissingRequiredProperty { fields: missing });
        }
        Ok(())
    }

    /// 큐가 빌 때까지 `@graph` 엘리먼트를 파싱해 다음 값을 반환합니다.
    fn next_graph_element(&mut self) -> Result<Option<GraphElement>, SpdxError> {
        loop {
            if let Some(element) = self.queued.pop_front() {
                return Ok(Some(element));
            }

            if !self.graph_open {
                match self.tokens.next(&mut self.cursor)? {
                    Token::BeginArray => self.graph_open = true,
                    other => {
                        return Err(SpdxError::MalformedJson {
                            offset: self.cursor.offset(),
                            reason: format!("expected '[' to open '@graph', found {}", other.kind()),
                        });
                    }
                }
            }

            if self.tokens.array_has_next(&mut self.cursor)? {
                let value = read_value(&mut self.tokens, &mut self.cursor)?;
                self.dispatch_element(value)?;
                continue;
            }

            self.graph = SectionState::Done;
            self.graph_open = false;
            debug!("@graph section drained");
            self.state = ParserState::None;
            self.scan_root_property()?;
            return Ok(None);
        }
    }

    /// 엘리먼트 객체 하나를 타입에 따라 큐잉하거나 메타데이터로 흡수합니다.
    fn dispatch_element(&mut self, value: serde_json::Value) -> Result<(), SpdxError> {
        let Some(obj) = value.as_object() else {
            return Err(SpdxError::MalformedJson {
                offset: self.cursor.offset(),
                reason: "graph element must be an object".to_owned(),
            });
        };

        let Some(type_name) = obj.get("type").and_then(|v| v.as_str()) else {
            return Err(SpdxError::MissingRequiredProperty {
                fields: vec!["@graph[].type".to_owned()],
            });
        };

        match type_name {
            "software_File" => {
                let file = ParsedFile {
                    spdx_id: require_str(obj, "spdxId", "software_File")?,
                    path: require_str(obj, "name", "software_File")?,
                    checksums: parse_verified_using(obj),
                    license_concluded: None,
                    license_info_in_files: Vec::new(),
                    copyright_text: str_field(obj, "copyrightText"),
                    file_types: Vec::new(),
                };
                self.queued.push_back(GraphElement::File(file));
            }
            "software_Package" => {
                let package = ParsedPackage {
                    spdx_id: require_str(obj, "spdxId", "software_Package")?,
                    name: require_str(obj, "name", "software_Package")?,
                    version_info: str_field(obj, "software_packageVersion"),
                    download_location: str_field(obj, "software_downloadLocation"),
                    license_concluded: None,
                    license_declared: None,
                    license_info_from_files: Vec::new(),
                    copyright_text: str_field(obj, "copyrightText"),
                    files_analyzed: None,
                    supplier: str_field(obj, "suppliedBy"),
                    external_references: Vec::new(),
                    verification_code: None,
                    has_files: Vec::new(),
                };
                self.queued.push_back(GraphElement::Package(package));
            }
            "Relationship" => {
                let source = require_str(obj, "from", "Relationship")?;
                let raw_type = require_str(obj, "relationshipType", "Relationship")?;
                let relationship_type =
                    RelationshipType::from_spdx3(&raw_type).ok_or_else(|| {
                        SpdxError::InvalidFieldValue {
                            field: "relationshipType".to_owned(),
                            reason: format!("unrecognized relationship type '{raw_type}'"),
                        }
                    })?;

                // `to`는 대상 목록: 항목 하나당 관계 하나로 전개
                let targets = match obj.get("to") {
                    Some(serde_json::Value::String(s)) => vec![s.clone()],
                    Some(serde_json::Value::Array(items)) => {
                        let mut out = Vec::with_capacity(items.len());
                        for item in items {
                            match item.as_str() {
                                Some(s) => out.push(s.to_owned()),
                                None => {
                                    return Err(SpdxError::InvalidFieldValue {
                                        field: "to".to_owned(),
                                        reason: "expected element id strings".to_owned(),
                                    });
                                }
                            }
                        }
                        out
                    }
                    _ => {
                        return Err(SpdxError::MissingRequiredProperty {
                            fields: vec!["Relationship.to".to_owned()],
                        });
                    }
                };

                for target in targets {
                    self.queued.push_back(GraphElement::Relationship(ParsedRelationship {
                        source_element_id: source.clone(),
                        relationship_type,
                        target_element_id: target,
                    }));
                }
            }
            "CreationInfo" => {
                let created = require_str(obj, "created", "CreationInfo")?;
                let creators = match obj.get("createdBy") {
                    Some(serde_json::Value::Array(items)) => items
                        .iter()
                        .filter_map(|v| v.as_str().map(str::to_owned))
                        .collect(),
                    Some(serde_json::Value::String(s)) => vec![s.clone()],
                    _ => Vec::new(),
                };
                self.metadata.creation_info = Some(CreationInfo { created, creators });
            }
            "SpdxDocument" => {
                self.metadata.name = str_field(obj, "name");
                self.metadata.spdx_id = str_field(obj, "spdxId");
            }
            other => {
                // 전방 호환성: 모르는 엘리먼트 타입은 건너뜀
                debug!(element_type = %other, "skipping unrecognized graph element");
            }
        }
        Ok(())
    }
}

impl<R: Read> SbomParser for Spdx30Parser<R> {
    fn advance(&mut self) -> Result<ParserState, SpdxError> {
        Spdx30Parser::advance(self)
    }

    fn state(&self) -> ParserState {
        Spdx30Parser::state(self)
    }

    fn metadata(&mut self) -> Result<DocumentMetadata, SpdxError> {
        Spdx30Parser::metadata(self)
    }

    fn finish(&self) -> Result<(), SpdxError> {
        Spdx30Parser::finish(self)
    }

    fn manifest_info(&self) -> ManifestInfo {
        ManifestInfo::spdx30()
    }
}

/// `@graph` 배열 위의 지연 시퀀스
pub struct GraphIter<'a, R: Read> {
    parser: &'a mut Spdx30Parser<R>,
    done: bool,
}

impl<R: Read> fmt::Debug for GraphIter<'_, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphIter")
            .field("done", &self.done)
            .finish_non_exhaustive()
    }
}

impl<R: Read> Iterator for GraphIter<'_, R> {
    type Item = Result<GraphElement, SpdxError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.parser.next_graph_element() {
            Ok(Some(element)) => Some(Ok(element)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// 토큰 스트림에서 JSON 값 하나를 조립합니다.
///
/// `@graph` 엘리먼트 하나로 경계가 제한되므로 메모리 사용은 엘리먼트
/// 크기에 비례합니다.
fn read_value<R: Read>(
    tokens: &mut TokenReader,
    cursor: &mut ByteCursor<R>,
) -> Result<serde_json::Value, SpdxError> {
    let token = tokens.next(cursor)?;
    read_value_from(token, tokens, cursor)
}

fn read_value_from<R: Read>(
    token: Token,
    tokens: &mut TokenReader,
    cursor: &mut ByteCursor<R>,
) -> Result<serde_json::Value, SpdxError> {
    match token {
        Token::BeginObject => {
            let mut map = serde_json::Map::new();
            loop {
                match tokens.next(cursor)? {
                    Token::Key(key) => {
                        let value = read_value(tokens, cursor)?;
                        map.insert(key, value);
                    }
                    Token::EndObject => break,
                    other => {
                        return Err(SpdxError::MalformedJson {
                            offset: cursor.offset(),
                            reason: format!(
                                "expected object member or '}}', found {}",
                                other.kind()
                            ),
                        });
                    }
                }
            }
            Ok(serde_json::Value::Object(map))
        }
        Token::BeginArray => {
            let mut items = Vec::new();
            while tokens.array_has_next(cursor)? {
                items.push(read_value(tokens, cursor)?);
            }
            Ok(serde_json::Value::Array(items))
        }
        Token::Str(s) => Ok(serde_json::Value::String(s)),
        Token::Number(n) => serde_json::Number::from_f64(n)
            .map(serde_json::Value::Number)
            .ok_or_else(|| SpdxError::MalformedJson {
                offset: cursor.offset(),
                reason: "number out of range".to_owned(),
            }),
        Token::Bool(b) => Ok(serde_json::Value::Bool(b)),
        Token::Null => Ok(serde_json::Value::Null),
        other => Err(SpdxError::MalformedJson {
            offset: cursor.offset(),
            reason: format!("unexpected {} at value position", other.kind()),
        }),
    }
}

/// 객체에서 문자열 필드를 꺼냅니다.
fn str_field(obj: &serde_json::Map<String, serde_json::Value>, key: &str) -> Option<String> {
    obj.get(key).and_then(|v| v.as_str()).map(str::to_owned)
}

/// 필수 문자열 필드를 꺼내거나 누락 에러를 만듭니다.
fn require_str(
    obj: &serde_json::Map<String, serde_json::Value>,
    key: &str,
    element: &str,
) -> Result<String, SpdxError> {
    str_field(obj, key).ok_or_else(|| SpdxError::MissingRequiredProperty {
        fields: vec![format!("{element}.{key}")],
    })
}

/// `verifiedUsing` 배열을 체크섬 목록으로 변환합니다.
///
/// 3.0의 알고리즘 표기(`sha256`)는 2.2 표기(`SHA256`)로 정규화합니다.
fn parse_verified_using(obj: &serde_json::Map<String, serde_json::Value>) -> Vec<Checksum> {
    let Some(serde_json::Value::Array(items)) = obj.get("verifiedUsing") else {
        return Vec::new();
    };

    let mut checksums = Vec::new();
    for item in items {
        let Some(hash) = item.as_object() else { continue };
        let algorithm = hash.get("algorithm").and_then(|v| v.as_str());
        let value = hash.get("hashValue").and_then(|v| v.as_str());
        if let (Some(algorithm), Some(value)) = (algorithm, value) {
            checksums.push(Checksum {
                algorithm: algorithm.to_uppercase(),
                value: value.to_owned(),
            });
        }
    }
    checksums
}

//! SPDX 2.2 파서 -- 평탄한 배열 기반 JSON dialect의 상태 머신
//!
//! [`Spdx22Parser`]는 루트 속성 스캐너를 중심으로 동작합니다. 루트
//! 속성은 순서와 무관하게 다음 셋 중 하나로 분류됩니다:
//!
//! 1. skip 집합에 속한 속성: 도메인 타입 없이 값을 버림
//! 2. 메타데이터 필드: 인라인으로 소비해 [`DocumentMetadata`]에 기록
//! 3. 배열 섹션 (`files`/`packages`/`relationships`/`externalDocumentRefs`):
//!    해당 섹션 상태에 멈추고 제어를 호출자에게 돌려줌
//!
//! 그 밖의 이름은 `UnknownMetadataProperty` 에러입니다. 루트 객체가
//! 닫히면 완전성 검증이 수행된 뒤 `Metadata` 상태가 되고, 메타데이터
//! 회수와 함께 `Finished`로 전이합니다. 상태는 전방으로만 이동하며,
//! 완료된 섹션은 다시 진입할 수 없습니다.

use std::fmt;
use std::io::Read;
use std::marker::PhantomData;

use tracing::debug;

use crate::config::ParserConfig;
use crate::error::SpdxError;
use crate::parser::cursor::ByteCursor;
use crate::parser::tokens::{Token, TokenReader};
use crate::parser::{SbomParser, elements};
use crate::types::{
    DocumentMetadata, ManifestInfo, ParsedExternalDocumentReference, ParsedFile, ParsedPackage,
    ParsedRelationship, ParserState, SectionKind, SectionMap, SectionState,
};

/// 인식되는 메타데이터 필드
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MetadataField {
    SpdxVersion,
    DataLicense,
    SpdxId,
    Name,
    DocumentNamespace,
    CreationInfo,
    DocumentDescribes,
}

impl MetadataField {
    const ALL: [MetadataField; 7] = [
        MetadataField::SpdxVersion,
        MetadataField::DataLicense,
        MetadataField::SpdxId,
        MetadataField::Name,
        MetadataField::DocumentNamespace,
        MetadataField::CreationInfo,
        MetadataField::DocumentDescribes,
    ];

    fn from_name(name: &str) -> Option<Self> {
        match name {
            "spdxVersion" => Some(Self::SpdxVersion),
            "dataLicense" => Some(Self::DataLicense),
            "SPDXID" => Some(Self::SpdxId),
            "name" => Some(Self::Name),
            "documentNamespace" => Some(Self::DocumentNamespace),
            "creationInfo" => Some(Self::CreationInfo),
            "documentDescribes" => Some(Self::DocumentDescribes),
            _ => None,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::SpdxVersion => "spdxVersion",
            Self::DataLicense => "dataLicense",
            Self::SpdxId => "SPDXID",
            Self::Name => "name",
            Self::DocumentNamespace => "documentNamespace",
            Self::CreationInfo => "creationInfo",
            Self::DocumentDescribes => "documentDescribes",
        }
    }
}

/// 분류되었으나 값을 아직 소비하지 않은 루트 속성
#[derive(Debug)]
enum PendingProperty {
    /// skip 집합 소속: 값을 버려야 함
    Skip(String),
    /// 메타데이터 필드: 값을 읽어 기록해야 함
    Metadata(MetadataField),
}

/// SPDX 2.2 증분 파서
///
/// 스트림 하나에 대해 단 한 번 사용하는 인스턴스입니다. `Finished`
/// 도달 후 또는 에러 발생 후에는 폐기해야 하며, 재설정은 없습니다.
///
/// # 사용 예시
///
/// ```no_run
/// use sbomstream_spdx::{ParserConfig, Spdx22Parser};
/// use sbomstream_spdx::types::ParserState;
///
/// # fn run(stream: std::fs::File) -> Result<(), sbomstream_spdx::SpdxError> {
/// let mut parser = Spdx22Parser::new(stream, ParserConfig::default())?;
/// loop {
///     match parser.advance()? {
///         ParserState::Files => {
///             for file in parser.files()? {
///                 println!("{}", file?);
///             }
///         }
///         ParserState::Packages => {
///             for package in parser.packages()? {
///                 println!("{}", package?);
///             }
///         }
///         ParserState::Relationships => {
///             for relationship in parser.relationships()? {
///                 relationship?;
///             }
///         }
///         ParserState::References => {
///             for reference in parser.references()? {
///                 reference?;
///             }
///         }
///         ParserState::Metadata => {
///             let metadata = parser.metadata()?;
///             println!("{:?}", metadata.name);
///             break;
///         }
///         _ => {}
///     }
/// }
/// # Ok(())
/// # }
/// ```
pub struct Spdx22Parser<R: Read> {
    /// 바이트 커서 (버퍼 + 스트림)
    cursor: ByteCursor<R>,
    /// 재개 가능한 토크나이저 상태
    tokens: TokenReader,
    /// 생성 시점에 고정된 설정
    config: ParserConfig,
    /// 현재 상태
    state: ParserState,
    /// 섹션별 진행 상태
    sections: SectionMap,
    /// 증분으로 채워지는 메타데이터
    metadata: DocumentMetadata,
    /// 관찰된 메타데이터 필드 (MetadataField 판별값으로 인덱싱)
    observed: [bool; 7],
    /// 루트 객체의 `{`를 소비했는지 여부
    root_entered: bool,
    /// 분류 후 값 소비를 기다리는 루트 속성
    pending: Option<PendingProperty>,
    /// 현재 섹션의 `[`를 소비했는지 여부
    array_open: bool,
}

impl<R: Read> Spdx22Parser<R> {
    /// 스트림 위에 파서를 생성합니다.
    ///
    /// # Errors
    ///
    /// - 설정이 유효하지 않으면 `SpdxError::Config`
    /// - 스트림이 비어 있으면 `SpdxError::EndOfStream`
    pub fn new(reader: R, config: ParserConfig) -> Result<Self, SpdxError> {
        config.validate()?;
        let cursor = ByteCursor::new(reader, config.buffer_size)?;
        Ok(Self {
            cursor,
            tokens: TokenReader::new(),
            config,
            state: ParserState::None,
            sections: SectionMap::new(),
            metadata: DocumentMetadata::default(),
            observed: [false; 7],
            root_entered: false,
            pending: None,
            array_open: false,
        })
    }

    /// 현재 파서 상태를 반환합니다.
    pub fn state(&self) -> ParserState {
        self.state
    }

    /// 지금까지 관찰된 메타데이터의 스냅샷을 반환합니다.
    ///
    /// `Metadata` 상태 이전에는 불완전할 수 있습니다. 형식 탐지기가
    /// `spdxVersion`만 확인하고 파서를 버리는 부분 사용을 지원합니다.
    pub fn partial_metadata(&self) -> &DocumentMetadata {
        &self.metadata
    }

    /// 행동이 필요한 다음 상태까지 파서를 진행시킵니다.
    ///
    /// 배열 섹션, `Metadata`, `Finished`에 멈춰 있으면 현재 상태를
    /// 그대로 반환합니다 (멱등). `None`과 내부 하위 상태에서만
    /// 진행합니다.
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
    ///
    /// `Metadata` 상태에서만 유효합니다. 반환된 값은 파서와 독립적인
    /// 복사본이며 이후 변경되지 않습니다.
    pub fn metadata(&mut self) -> Result<DocumentMetadata, SpdxError> {
        if self.state != ParserState::Metadata {
            return Err(SpdxError::WrongState {
                expected: ParserState::Metadata,
                actual: self.state,
            });
        }
        self.state = ParserState::Finished;
        debug!(name = ?self.metadata.name, "spdx 2.2 document finished");
        Ok(self.metadata.clone())
    }

    /// 파서가 완전히 종료되었는지 확인합니다.
    pub fn finish(&self) -> Result<(), SpdxError> {
        match self.state {
            ParserState::Finished => Ok(()),
            ParserState::Metadata => Err(SpdxError::IncompleteMetadata),
            other => {
                for kind in SectionKind::ALL {
                    if self.sections.get(kind) == SectionState::InProgress {
                        return Err(SpdxError::IncompleteSection {
                            section: kind.property_name().to_owned(),
                        });
                    }
                }
                Err(SpdxError::WrongState {
                    expected: ParserState::Finished,
                    actual: other,
                })
            }
        }
    }

    /// `files` 섹션의 지연 시퀀스를 반환합니다.
    ///
    /// `Files` 상태가 아니면 `WrongState`입니다. 시퀀스는 문서 순서대로
    /// 요소를 내며, 전방 전용입니다. 배열을 모두 소비하면 루트 스캐너가
    /// 한 스텝 진행되어 다음 `advance()` 호출이 올바른 위치에 섭니다.
    pub fn files(&mut self) -> Result<SectionIter<'_, R, ParsedFile>, SpdxError> {
        self.section_iter(SectionKind::Files)
    }

    /// `packages` 섹션의 지연 시퀀스를 반환합니다.
    pub fn packages(&mut self) -> Result<SectionIter<'_, R, ParsedPackage>, SpdxError> {
        self.section_iter(SectionKind::Packages)
    }

    /// `relationships` 섹션의 지연 시퀀스를 반환합니다.
    pub fn relationships(&mut self) -> Result<SectionIter<'_, R, ParsedRelationship>, SpdxError> {
        self.section_iter(SectionKind::Relationships)
    }

    /// `externalDocumentRefs` 섹션의 지연 시퀀스를 반환합니다.
    pub fn references(
        &mut self,
    ) -> Result<SectionIter<'_, R, ParsedExternalDocumentReference>, SpdxError> {
        self.section_iter(SectionKind::References)
    }

    // --- 내부 구현 ---

    /// 루트 객체의 여는 중괄호를 소비합니다.
    fn enter_root(&mut self) -> Result<(), SpdxError> {
        match self.tokens.next(&mut self.cursor)? {
            Token::BeginObject => {
                self.root_entered = true;
                Ok(())
            }
            other => Err(SpdxError::MalformedJson {
                offset: self.cursor.offset(),
                reason: format!("expected SPDX document object at root, found {}", other.kind()),
            }),
        }
    }

    /// 루트 속성 하나를 읽어 분류하거나 루트 닫힘을 처리합니다.
    fn scan_root_property(&mut self) -> Result<(), SpdxError> {
        let offset = self.cursor.offset();
        match self.tokens.next(&mut self.cursor)? {
            Token::Key(name) => self.classify_root_property(name, offset),
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

    /// 루트 속성 이름을 분류합니다. skip 집합이 가장 먼저 평가됩니다.
    fn classify_root_property(&mut self, name: String, offset: u64) -> Result<(), SpdxError> {
        if self.config.skips(&name) {
            self.pending = Some(PendingProperty::Skip(name));
            self.state = ParserState::SkippingValue;
            return Ok(());
        }

        if let Some(section) = SectionKind::from_property(&name) {
            if self.sections.get(section) != SectionState::NotStarted {
                return Err(SpdxError::MalformedJson {
                    offset,
                    reason: format!("duplicate section '{name}'"),
                });
            }
            self.sections.set(section, SectionState::InProgress);
            self.array_open = false;
            self.state = section.parser_state();
            debug!(section = %section, "entering array section");
            return Ok(());
        }

        if let Some(field) = MetadataField::from_name(&name) {
            self.pending = Some(PendingProperty::Metadata(field));
            self.state = ParserState::ReadingMetadata;
            return Ok(());
        }

        Err(SpdxError::UnknownMetadataProperty { name, offset })
    }

    /// 분류된 루트 속성의 값을 소비합니다.
    fn drain_pending(&mut self) -> Result<(), SpdxError> {
        match self.pending.take() {
            Some(PendingProperty::Skip(name)) => {
                debug!(property = %name, "skipping root property");
                self.tokens.skip_value(&mut self.cursor)?;
            }
            Some(PendingProperty::Metadata(field)) => {
                self.read_metadata_value(field)?;
            }
            None => {}
        }
        self.state = ParserState::None;
        Ok(())
    }

    /// 메타데이터 필드의 값을 읽어 기록합니다.
    fn read_metadata_value(&mut self, field: MetadataField) -> Result<(), SpdxError> {
        match field {
            MetadataField::SpdxVersion => {
                self.metadata.spdx_version =
                    Some(elements::expect_str(&mut self.tokens, &mut self.cursor, "spdxVersion")?);
            }
            MetadataField::DataLicense => {
                self.metadata.data_license =
                    Some(elements::expect_str(&mut self.tokens, &mut self.cursor, "dataLicense")?);
            }
            MetadataField::SpdxId => {
                self.metadata.spdx_id =
                    Some(elements::expect_str(&mut self.tokens, &mut self.cursor, "SPDXID")?);
            }
            MetadataField::Name => {
                self.metadata.name =
                    Some(elements::expect_str(&mut self.tokens, &mut self.cursor, "name")?);
            }
            MetadataField::DocumentNamespace => {
                let value = elements::expect_str(
                    &mut self.tokens,
                    &mut self.cursor,
                    "documentNamespace",
                )?;
                // 파서는 SBOM 내용을 지어내지 않음: 빈 네임스페이스는 하드 에러
                if value.is_empty() {
                    return Err(SpdxError::InvalidFieldValue {
                        field: "documentNamespace".to_owned(),
                        reason: "must not be empty".to_owned(),
                    });
                }
                self.metadata.document_namespace = Some(value);
            }
            MetadataField::CreationInfo => {
                self.metadata.creation_info = Some(elements::parse_creation_info(
                    &mut self.tokens,
                    &mut self.cursor,
                )?);
            }
            MetadataField::DocumentDescribes => {
                self.metadata.document_describes = elements::parse_string_array(
                    &mut self.tokens,
                    &mut self.cursor,
                    "documentDescribes",
                )?;
            }
        }
        self.observed[field as usize] = true;
        Ok(())
    }

    /// 루트 객체가 닫힐 때 수행되는 완전성 검증
    ///
    /// skip 집합으로 명시적으로 제외한 속성은 검증 대상이 아닙니다.
    fn check_completeness(&self) -> Result<(), SpdxError> {
        for kind in SectionKind::ALL {
            if self.sections.get(kind) == SectionState::InProgress {
                return Err(SpdxError::IncompleteSection {
                    section: kind.property_name().to_owned(),
                });
            }
        }

        let mut missing = Vec::new();
        for kind in SectionKind::ALL {
            if kind.required()
                && self.sections.get(kind) == SectionState::NotStarted
                && !self.config.skips(kind.property_name())
            {
                missing.push(kind.property_name().to_owned());
            }
        }
        for field in MetadataField::ALL {
            if !self.observed[field as usize] && !self.config.skips(field.name()) {
                missing.push(field.name().to_owned());
            }
        }

        if !missing.is_empty() {
            return Err(SpdxError::MissingRequiredProperty { fields: missing });
        }
        Ok(())
    }

    /// 섹션 지연 시퀀스를 만듭니다.
    fn section_iter<T: SectionElement>(
        &mut self,
        kind: SectionKind,
    ) -> Result<SectionIter<'_, R, T>, SpdxError> {
        if self.state != kind.parser_state() {
            return Err(SpdxError::WrongState {
                expected: kind.parser_state(),
                actual: self.state,
            });
        }
        Ok(SectionIter {
            parser: self,
            section: kind,
            done: false,
            _marker: PhantomData,
        })
    }

    /// 섹션의 다음 요소를 파싱하거나, 배열 끝이면 섹션을 닫습니다.
    fn next_section_element<T: SectionElement>(
        &mut self,
        section: SectionKind,
    ) -> Result<Option<T>, SpdxError> {
        if !self.array_open {
            match self.tokens.next(&mut self.cursor)? {
                Token::BeginArray => self.array_open = true,
                other => {
                    return Err(SpdxError::MalformedJson {
                        offset: self.cursor.offset(),
                        reason: format!(
                            "expected '[' to open section '{section}', found {}",
                            other.kind()
                        ),
                    });
                }
            }
        }

        if self.tokens.array_has_next(&mut self.cursor)? {
            let element = T::parse(&mut self.tokens, &mut self.cursor)?;
            return Ok(Some(element));
        }

        // 닫는 대괄호 소비됨: 섹션 완료 후 루트 스캐너를 한 스텝 진행
        self.sections.set(section, SectionState::Done);
        self.array_open = false;
        debug!(section = %section, "array section drained");
        self.state = ParserState::None;
        self.scan_root_property()?;
        Ok(None)
    }
}

impl<R: Read> SbomParser for Spdx22Parser<R> {
    fn advance(&mut self) -> Result<ParserState, SpdxError> {
        Spdx22Parser::advance(self)
    }

    fn state(&self) -> ParserState {
        Spdx22Parser::state(self)
    }

    fn metadata(&mut self) -> Result<DocumentMetadata, SpdxError> {
        Spdx22Parser::metadata(self)
    }

    fn finish(&self) -> Result<(), SpdxError> {
        Spdx22Parser::finish(self)
    }

    fn manifest_info(&self) -> ManifestInfo {
        ManifestInfo::spdx22()
    }
}

/// 배열 섹션 요소 파서를 타입별로 연결하는 내부 trait
trait SectionElement: Sized {
    fn parse<R: Read>(
        tokens: &mut TokenReader,
        cursor: &mut ByteCursor<R>,
    ) -> Result<Self, SpdxError>;
}

impl SectionElement for ParsedFile {
    fn parse<R: Read>(
        tokens: &mut TokenReader,
        cursor: &mut ByteCursor<R>,
    ) -> Result<Self, SpdxError> {
        elements::parse_file(tokens, cursor)
    }
}

impl SectionElement for ParsedPackage {
    fn parse<R: Read>(
        tokens: &mut TokenReader,
        cursor: &mut ByteCursor<R>,
    ) -> Result<Self, SpdxError> {
        elements::parse_package(tokens, cursor)
    }
}

impl SectionElement for ParsedRelationship {
    fn parse<R: Read>(
        tokens: &mut TokenReader,
        cursor: &mut ByteCursor<R>,
    ) -> Result<Self, SpdxError> {
        elements::parse_relationship(tokens, cursor)
    }
}

impl SectionElement for ParsedExternalDocumentReference {
    fn parse<R: Read>(
        tokens: &mut TokenReader,
        cursor: &mut ByteCursor<R>,
    ) -> Result<Self, SpdxError> {
        elements::parse_external_document_reference(tokens, cursor)
    }
}

/// 배열 섹션 위의 지연 시퀀스
///
/// 전방 전용이며 재시작할 수 없습니다. 파서 커서가 배열을 지나가므로
/// 두 번째 열거는 아무것도 내지 않습니다. 에러를 하나 낸 뒤에는
/// 시퀀스가 끝납니다 (파서 인스턴스는 폐기 대상).
pub struct SectionIter<'a, R: Read, T> {
    parser: &'a mut Spdx22Parser<R>,
    section: SectionKind,
    done: bool,
    _marker: PhantomData<T>,
}

impl<R: Read, T> fmt::Debug for SectionIter<'_, R, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SectionIter")
            .field("section", &self.section)
            .field("done", &self.done)
            .finish_non_exhaustive()
    }
}

impl<R: Read, T: SectionElement> Iterator for SectionIter<'_, R, T> {
    type Item = Result<T, SpdxError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.parser.next_section_element::<T>(self.section) {
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

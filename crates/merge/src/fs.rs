//! 파일 시스템 경계 -- 파서에 읽기 스트림을 공급하는 trait
//!
//! 파서는 파일이 아니라 열린 읽기 스트림을 소비합니다. [`FileOpener`]는
//! 그 경계를 나타내는 trait이며, 테스트에서는 메모리 스트림 구현으로
//! 대체할 수 있습니다.

use std::io::Read;
use std::path::Path;

/// 경로에서 읽기 스트림을 여는 trait
pub trait FileOpener: Send + Sync {
    /// 경로를 읽기 전용 스트림으로 엽니다.
    fn open(&self, path: &Path) -> std::io::Result<Box<dyn Read + Send>>;

    /// 파일 크기를 반환합니다 (알 수 없으면 `None`).
    ///
    /// 크기 제한 검사를 읽기 전에 수행할 수 있게 합니다.
    fn file_size(&self, _path: &Path) -> std::io::Result<Option<u64>> {
        Ok(None)
    }
}

/// 실제 파일 시스템을 사용하는 기본 구현
#[derive(Debug, Default, Clone)]
pub struct OsFileOpener;

impl FileOpener for OsFileOpener {
    fn open(&self, path: &Path) -> std::io::Result<Box<dyn Read + Send>> {
        let file = std::fs::File::open(path)?;
        Ok(Box::new(file))
    }

    fn file_size(&self, path: &Path) -> std::io::Result<Option<u64>> {
        Ok(Some(std::fs::metadata(path)?.len()))
    }
}

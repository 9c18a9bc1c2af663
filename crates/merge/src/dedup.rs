//! 엔티티 중복 제거 스테이지
//!
//! [`EntityDeduplicator`]는 입력 채널로 파싱된 엔티티를 받아, 공유 키
//! 집합에 insert-if-absent를 수행하고 처음 보는 엔티티만 출력 채널로
//! 전달하는 백그라운드 태스크입니다. 입력이 모두 소진되면 출력 채널을
//! 닫습니다.
//!
//! 여러 상류 생산자(파서 인스턴스 하나당 하나)가 입력 송신자를 복제해
//! 동시에 보낼 수 있으며, 키 집합을 공유하면 여러 중복 제거 인스턴스가
//! 하나의 키 공간으로 병합됩니다. 키 집합 외에 추가 동기화는 필요
//! 없습니다.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::entity::SbomEntity;
use crate::error::MergeError;

/// 중복 제거 인스턴스 간에 공유 가능한 키 공간
pub type KeySpace = Arc<Mutex<HashSet<String>>>;

/// 채널 기반 엔티티 중복 제거기
///
/// 인스턴스 하나당 백그라운드 태스크 하나가 돌며, `close()`가 입력을
/// 닫고 태스크 종료를 기다립니다. tokio 런타임 안에서 생성해야 합니다.
pub struct EntityDeduplicator {
    input_tx: mpsc::Sender<SbomEntity>,
    task: tokio::task::JoinHandle<()>,
    seen: KeySpace,
    forwarded: Arc<AtomicU64>,
    suppressed: Arc<AtomicU64>,
}

impl EntityDeduplicator {
    /// 새 키 공간으로 중복 제거기를 만듭니다.
    ///
    /// # Returns
    ///
    /// - `EntityDeduplicator`: 스테이지 핸들
    /// - `mpsc::Receiver<SbomEntity>`: 처음 보는 엔티티가 나오는 출력 채널
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<SbomEntity>) {
        Self::with_key_space(capacity, Arc::new(Mutex::new(HashSet::new())))
    }

    /// 기존 키 공간을 공유하는 중복 제거기를 만듭니다.
    ///
    /// 여러 스테이지가 같은 키 공간을 쓰면 서로 본 엔티티를 중복으로
    /// 간주합니다.
    pub fn with_key_space(
        capacity: usize,
        seen: KeySpace,
    ) -> (Self, mpsc::Receiver<SbomEntity>) {
        let (input_tx, mut input_rx) = mpsc::channel::<SbomEntity>(capacity);
        let (output_tx, output_rx) = mpsc::channel::<SbomEntity>(capacity);

        let forwarded = Arc::new(AtomicU64::new(0));
        let suppressed = Arc::new(AtomicU64::new(0));

        let task = {
            let seen = Arc::clone(&seen);
            let forwarded = Arc::clone(&forwarded);
            let suppressed = Arc::clone(&suppressed);
            tokio::spawn(async move {
                while let Some(entity) = input_rx.recv().await {
                    let key = entity.dedup_key();
                    let first_seen = {
                        let mut guard = seen.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
                        guard.insert(key)
                    };

                    if first_seen {
                        if output_tx.send(entity).await.is_err() {
                            warn!("dedup output receiver dropped, stopping");
                            return;
                        }
                        forwarded.fetch_add(1, Ordering::Relaxed);
                    } else {
                        suppressed.fetch_add(1, Ordering::Relaxed);
                    }
                }
                debug!("dedup input drained, closing output");
                // output_tx가 여기서 drop되어 출력 채널이 닫힘
            })
        };

        (
            Self {
                input_tx,
                task,
                seen,
                forwarded,
                suppressed,
            },
            output_rx,
        )
    }

    /// 생산자에게 나눠 줄 입력 송신자를 복제합니다.
    pub fn sender(&self) -> mpsc::Sender<SbomEntity> {
        self.input_tx.clone()
    }

    /// 공유 키 공간 핸들을 반환합니다.
    pub fn key_space(&self) -> KeySpace {
        Arc::clone(&self.seen)
    }

    /// 전달된 엔티티 수를 반환합니다.
    pub fn forwarded(&self) -> u64 {
        self.forwarded.load(Ordering::Relaxed)
    }

    /// 중복으로 걸러진 엔티티 수를 반환합니다.
    pub fn suppressed(&self) -> u64 {
        self.suppressed.load(Ordering::Relaxed)
    }

    /// 입력을 닫고 모든 엔티티가 처리될 때까지 기다립니다.
    ///
    /// 바깥에 복제된 송신자가 전부 drop된 뒤에 태스크가 끝납니다.
    /// 최종 (전달 수, 중복 수) 카운터를 반환합니다.
    pub async fn close(self) -> Result<(u64, u64), MergeError> {
        drop(self.input_tx);
        self.task
            .await
            .map_err(|e| MergeError::Channel(format!("dedup task join failed: {e}")))?;
        Ok((
            self.forwarded.load(Ordering::Relaxed),
            self.suppressed.load(Ordering::Relaxed),
        ))
    }
}

//! append-only 이벤트 저장소.
//!
//! 체결(Fill)과 성과 스냅샷, 감사 기록을 (agent_id, timestamp) 키로
//! 순서대로 보관합니다. 감사/이력 재생 용도이며, 라이브 제어 판단에는
//! 사용되지 않습니다. 저장 실패는 로깅될 뿐 시뮬레이션 흐름을 바꾸지
//! 않습니다.

use async_trait::async_trait;
use sim_core::{SimError, SimEvent, SimResult};
use std::path::PathBuf;
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::sync::Mutex;

/// append-only 이벤트 저장소 trait.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// 이벤트를 로그 끝에 추가합니다.
    async fn append(&self, event: &SimEvent) -> SimResult<()>;

    /// 에이전트의 이벤트 이력을 시간순으로 반환합니다.
    async fn load(&self, agent_id: &str) -> SimResult<Vec<SimEvent>>;
}

/// 한 줄당 JSON 객체 하나를 기록하는 파일 저장소.
pub struct JsonlStore {
    path: PathBuf,
    writer: Mutex<BufWriter<File>>,
}

impl JsonlStore {
    /// 파일을 열거나 생성하여 저장소를 만듭니다. 기존 내용에 이어 씁니다.
    pub async fn open(path: impl Into<PathBuf>) -> SimResult<Self> {
        let path = path.into();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| SimError::Persistence(e.to_string()))?;

        Ok(Self {
            path,
            writer: Mutex::new(BufWriter::new(file)),
        })
    }

    /// 저장소 파일 경로를 반환합니다.
    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

#[async_trait]
impl EventStore for JsonlStore {
    async fn append(&self, event: &SimEvent) -> SimResult<()> {
        let mut line = serde_json::to_string(event)?;
        line.push('\n');

        let mut writer = self.writer.lock().await;
        writer
            .write_all(line.as_bytes())
            .await
            .map_err(|e| SimError::Persistence(e.to_string()))?;
        writer
            .flush()
            .await
            .map_err(|e| SimError::Persistence(e.to_string()))?;
        Ok(())
    }

    async fn load(&self, agent_id: &str) -> SimResult<Vec<SimEvent>> {
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| SimError::Persistence(e.to_string()))?;

        let mut events = Vec::new();
        for line in content.lines() {
            if line.trim().is_empty() {
                continue;
            }
            let event: SimEvent = serde_json::from_str(line)?;
            if event.agent_id() == agent_id {
                events.push(event);
            }
        }
        Ok(events)
    }
}

/// 테스트용 인메모리 저장소.
#[derive(Default)]
pub struct MemoryStore {
    events: Mutex<Vec<SimEvent>>,
}

impl MemoryStore {
    /// 빈 저장소를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 저장된 전체 이벤트 수를 반환합니다.
    pub async fn len(&self) -> usize {
        self.events.lock().await.len()
    }

    /// 저장소가 비었는지 확인합니다.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl EventStore for MemoryStore {
    async fn append(&self, event: &SimEvent) -> SimResult<()> {
        self.events.lock().await.push(event.clone());
        Ok(())
    }

    async fn load(&self, agent_id: &str) -> SimResult<Vec<SimEvent>> {
        Ok(self
            .events
            .lock()
            .await
            .iter()
            .filter(|e| e.agent_id() == agent_id)
            .cloned()
            .collect())
    }
}

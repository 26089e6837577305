//! 감사 이벤트 기록.
//!
//! 모든 거부/장애는 체결과 같은 append-only 로그에 구조화된 기록으로
//! 남습니다. 실패 이력을 거래 이력과 나란히 감사할 수 있습니다.

use crate::domain::{Fill, PerformanceSnapshot};
use crate::types::AgentId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 감사 이벤트 종류.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditKind {
    /// 리스크 한도 위반으로 주문 거부 (정상 결과)
    RiskRejected,
    /// 지표 계산 이력 부족으로 신호 생성 건너뜀
    InsufficientHistory,
    /// 라이브 모드에서 해당 틱의 바 누락/지연
    FeedMissed,
    /// 원장 불변식 위반으로 에이전트 정지
    AgentHalted,
    /// 데이터 피드 재시도 소진으로 엔진 중단
    EngineFaulted,
}

impl std::fmt::Display for AuditKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuditKind::RiskRejected => write!(f, "RISK_REJECTED"),
            AuditKind::InsufficientHistory => write!(f, "INSUFFICIENT_HISTORY"),
            AuditKind::FeedMissed => write!(f, "FEED_MISSED"),
            AuditKind::AgentHalted => write!(f, "AGENT_HALTED"),
            AuditKind::EngineFaulted => write!(f, "ENGINE_FAULTED"),
        }
    }
}

/// 비체결 결과의 구조화된 기록.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    /// 이벤트 종류
    pub kind: AuditKind,
    /// 관련 에이전트
    pub agent_id: AgentId,
    /// 관련 심볼 (엔진 수준 이벤트는 None)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    /// 발생 시각
    pub timestamp: DateTime<Utc>,
    /// 사유
    pub reason: String,
}

impl AuditEvent {
    /// 새 감사 이벤트를 생성합니다.
    pub fn new(
        kind: AuditKind,
        agent_id: impl Into<AgentId>,
        symbol: Option<String>,
        timestamp: DateTime<Utc>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            agent_id: agent_id.into(),
            symbol,
            timestamp,
            reason: reason.into(),
        }
    }
}

/// append-only 이벤트 로그의 단일 항목.
///
/// 체결, 스냅샷, 감사 기록이 하나의 로그에 시간순으로 섞여 저장됩니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SimEvent {
    /// 체결 기록
    Fill(Fill),
    /// 성과 스냅샷
    Snapshot(PerformanceSnapshot),
    /// 감사 기록
    Audit(AuditEvent),
}

impl SimEvent {
    /// 이벤트가 속한 에이전트를 반환합니다.
    pub fn agent_id(&self) -> &str {
        match self {
            SimEvent::Fill(f) => &f.agent_id,
            SimEvent::Snapshot(s) => &s.agent_id,
            SimEvent::Audit(a) => &a.agent_id,
        }
    }

    /// 이벤트 타임스탬프를 반환합니다.
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            SimEvent::Fill(f) => f.timestamp,
            SimEvent::Snapshot(s) => s.timestamp,
            SimEvent::Audit(a) => a.timestamp,
        }
    }
}

//! 표시 계층 경계.
//!
//! 엔진은 체결과 스냅샷을 sink에 통지할 뿐, sink의 실패가 시뮬레이션
//! 결과에 영향을 주지 않습니다. 대시보드/차트 구현은 이 trait 뒤에
//! 놓입니다.

use async_trait::async_trait;
use sim_core::{Fill, PerformanceSnapshot};
use tracing::info;

/// 성과 스냅샷과 체결을 소비하는 표시 계층 trait.
#[async_trait]
pub trait SnapshotSink: Send + Sync {
    /// 틱마다 에이전트별 성과 스냅샷을 통지합니다.
    async fn on_snapshot(&self, snapshot: &PerformanceSnapshot);

    /// 체결 발생 시 통지합니다.
    async fn on_fill(&self, fill: &Fill);
}

/// 구조화 로그로 출력하는 기본 sink.
#[derive(Debug, Default, Clone)]
pub struct LogSink;

impl LogSink {
    /// 새 LogSink를 생성합니다.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SnapshotSink for LogSink {
    async fn on_snapshot(&self, snapshot: &PerformanceSnapshot) {
        info!(
            agent_id = %snapshot.agent_id,
            timestamp = %snapshot.timestamp,
            total_value = %snapshot.total_value,
            drawdown = %snapshot.drawdown,
            realized_pnl = %snapshot.realized_pnl,
            "성과 스냅샷"
        );
    }

    async fn on_fill(&self, fill: &Fill) {
        info!(
            agent_id = %fill.agent_id,
            symbol = %fill.symbol,
            side = %fill.side,
            price = %fill.executed_price,
            quantity = %fill.executed_quantity,
            cost = %fill.transaction_cost,
            "주문 체결"
        );
    }
}

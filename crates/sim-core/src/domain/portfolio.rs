//! 포트폴리오 상태 및 성과 스냅샷.

use crate::domain::Fill;
use crate::types::{AgentId, Quantity, Ratio};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 에이전트별 현금/포지션/거래 이력 상태.
///
/// 검증된 체결(`Fill`)의 적용을 통해서만 변경됩니다. 현금은 음수가 될 수
/// 없고 포지션 수량도 음수가 될 수 없습니다(공매도/마진 미지원).
/// 총 자산 가치의 권위 있는 출처입니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioState {
    /// 소유 에이전트
    pub agent_id: AgentId,
    /// 현금 잔고
    pub cash: Decimal,
    /// 심볼별 보유 수량 (결정적 순회를 위해 BTreeMap 사용)
    pub positions: BTreeMap<String, Quantity>,
    /// 체결 이력 (append-only, 시간순)
    pub trade_history: Vec<Fill>,
}

impl PortfolioState {
    /// 초기 현금으로 빈 상태를 생성합니다.
    pub fn new(agent_id: impl Into<AgentId>, initial_cash: Decimal) -> Self {
        Self {
            agent_id: agent_id.into(),
            cash: initial_cash,
            positions: BTreeMap::new(),
            trade_history: Vec::new(),
        }
    }

    /// 심볼의 보유 수량을 반환합니다 (없으면 0).
    pub fn position(&self, symbol: &str) -> Quantity {
        self.positions.get(symbol).copied().unwrap_or(Decimal::ZERO)
    }

    /// 총 자산 가치(현금 + Σ 포지션 × 현재가)를 계산합니다.
    ///
    /// 가격이 없는 심볼의 포지션은 평가에서 제외됩니다.
    pub fn total_value(&self, current_prices: &BTreeMap<String, Decimal>) -> Decimal {
        let mut value = self.cash;
        for (symbol, quantity) in &self.positions {
            if let Some(price) = current_prices.get(symbol) {
                value += *quantity * *price;
            }
        }
        value
    }
}

/// 틱마다 파생되는 에이전트 성과 스냅샷.
///
/// 생성 후 변경되지 않으며, 이력은 타임스탬프가 단조 증가하는
/// append-only 시퀀스입니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSnapshot {
    /// 에이전트
    pub agent_id: AgentId,
    /// 스냅샷 시각 (시뮬레이션 시계 기준)
    pub timestamp: DateTime<Utc>,
    /// 총 자산 가치
    pub total_value: Decimal,
    /// 고점 대비 낙폭 비율 (0.1 = 10%)
    pub drawdown: Ratio,
    /// 누적 실현 손익
    pub realized_pnl: Decimal,
}

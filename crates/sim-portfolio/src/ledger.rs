//! 에이전트별 포트폴리오 원장.
//!
//! 원장은 리스크 검증을 통과한 체결만 적용합니다. 잔고/포지션 부족
//! 검사는 리스크 계층이 정상 동작하는 한 도달 불가능한 불변식 검사이며,
//! 위반 시 에이전트 정지 사유가 됩니다.
//!
//! 실현 손익은 평균 단가법으로 계산합니다: 매도 시
//! `(체결가 - 평균단가) × 수량 - 수수료`, 매수 수수료는 즉시 차감.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sim_core::{Fill, PerformanceSnapshot, PortfolioState, Side, SimError, SimResult};
use std::collections::BTreeMap;
use tracing::debug;

/// 체결 적용과 스냅샷 생성을 담당하는 원장.
#[derive(Debug, Clone)]
pub struct PortfolioLedger {
    state: PortfolioState,
    /// 심볼별 평균 매수 단가
    avg_costs: BTreeMap<String, Decimal>,
    /// 누적 실현 손익
    realized_pnl: Decimal,
    /// 총자산 고점 (낙폭 계산용)
    peak_value: Decimal,
}

impl PortfolioLedger {
    /// 초기 현금으로 원장을 생성합니다.
    pub fn new(agent_id: impl Into<String>, initial_cash: Decimal) -> Self {
        Self {
            state: PortfolioState::new(agent_id, initial_cash),
            avg_costs: BTreeMap::new(),
            realized_pnl: Decimal::ZERO,
            peak_value: initial_cash,
        }
    }

    /// 현재 포트폴리오 상태를 반환합니다.
    pub fn state(&self) -> &PortfolioState {
        &self.state
    }

    /// 누적 실현 손익을 반환합니다.
    pub fn realized_pnl(&self) -> Decimal {
        self.realized_pnl
    }

    /// 체결을 원장에 적용합니다.
    ///
    /// 현금이나 포지션이 음수가 되는 체결은 불변식 위반으로 거부되며
    /// (`InsufficientFunds`/`InsufficientPosition`), 이는 리스크 계층의
    /// 버그를 뜻하므로 호출자는 에이전트를 정지해야 합니다.
    pub fn apply_fill(&mut self, fill: &Fill) -> SimResult<&PortfolioState> {
        // 0 이하 수량은 평균 단가 계산에서 0으로 나누게 되므로 선행 거부
        if fill.executed_quantity <= Decimal::ZERO {
            return Err(SimError::InvalidFill(format!(
                "체결 수량이 0 이하입니다: {} ({})",
                fill.executed_quantity, fill.symbol
            )));
        }
        let notional = fill.notional();

        match fill.side {
            Side::Buy => {
                let cost = notional + fill.transaction_cost;
                if cost > self.state.cash {
                    return Err(SimError::InsufficientFunds {
                        required: cost,
                        available: self.state.cash,
                    });
                }

                let held = self.state.position(&fill.symbol);
                let new_quantity = held + fill.executed_quantity;

                // 평균 단가 갱신
                let avg = self
                    .avg_costs
                    .get(&fill.symbol)
                    .copied()
                    .unwrap_or(Decimal::ZERO);
                let new_avg = (avg * held + notional) / new_quantity;
                self.avg_costs.insert(fill.symbol.clone(), new_avg);

                self.state.cash -= cost;
                self.state.positions.insert(fill.symbol.clone(), new_quantity);
                // 매수 수수료는 즉시 실현 손실
                self.realized_pnl -= fill.transaction_cost;
            }
            Side::Sell => {
                let held = self.state.position(&fill.symbol);
                if fill.executed_quantity > held {
                    return Err(SimError::InsufficientPosition {
                        symbol: fill.symbol.clone(),
                        required: fill.executed_quantity,
                        available: held,
                    });
                }

                let avg = self
                    .avg_costs
                    .get(&fill.symbol)
                    .copied()
                    .unwrap_or(Decimal::ZERO);
                self.realized_pnl += (fill.executed_price - avg) * fill.executed_quantity
                    - fill.transaction_cost;

                self.state.cash += notional - fill.transaction_cost;
                let remaining = held - fill.executed_quantity;
                if remaining.is_zero() {
                    self.state.positions.remove(&fill.symbol);
                    self.avg_costs.remove(&fill.symbol);
                } else {
                    self.state.positions.insert(fill.symbol.clone(), remaining);
                }
            }
        }

        self.state.trade_history.push(fill.clone());
        debug!(
            agent_id = %self.state.agent_id,
            symbol = %fill.symbol,
            side = %fill.side,
            cash = %self.state.cash,
            realized_pnl = %self.realized_pnl,
            "체결 적용"
        );
        Ok(&self.state)
    }

    /// 총 자산 가치를 계산합니다.
    pub fn total_value(&self, current_prices: &BTreeMap<String, Decimal>) -> Decimal {
        self.state.total_value(current_prices)
    }

    /// 현재 시점의 성과 스냅샷을 생성합니다.
    ///
    /// 고점은 갱신 추적되며, 낙폭은 고점 대비 비율입니다.
    pub fn snapshot(
        &mut self,
        timestamp: DateTime<Utc>,
        current_prices: &BTreeMap<String, Decimal>,
    ) -> PerformanceSnapshot {
        let total_value = self.total_value(current_prices);
        if total_value > self.peak_value {
            self.peak_value = total_value;
        }

        let drawdown = if self.peak_value > Decimal::ZERO {
            (self.peak_value - total_value) / self.peak_value
        } else {
            Decimal::ZERO
        };

        PerformanceSnapshot {
            agent_id: self.state.agent_id.clone(),
            timestamp,
            total_value,
            drawdown,
            realized_pnl: self.realized_pnl,
        }
    }

    /// 체결 시퀀스로부터 상태를 순수하게 재구성합니다.
    ///
    /// 불변식: 유효한 체결 시퀀스에 대해 유지 상태와 재구성 상태는
    /// 동일합니다.
    pub fn replay(
        agent_id: impl Into<String>,
        initial_cash: Decimal,
        fills: &[Fill],
    ) -> SimResult<PortfolioState> {
        let mut ledger = Self::new(agent_id, initial_cash);
        for fill in fills {
            ledger.apply_fill(fill)?;
        }
        Ok(ledger.state)
    }
}

//! 주문 사전 검증 리스크 관리자.
//!
//! 검증 순서: 수량 → 포지션 한도 → 매수 잔고 / 매도 보유량 → 예상 낙폭.
//! 검증은 절대 에러를 반환하지 않으며, 판정 불가능한 입력(총자산 0 등)은
//! 보수적으로 거부합니다. 이 계층이 한도를 지키는 한 원장의 잔고/포지션
//! 불변식 위반은 도달 불가능합니다.

use crate::config::RiskConfig;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sim_core::{Order, PerformanceSnapshot, PortfolioState, Side};
use std::collections::BTreeMap;
use tracing::debug;

/// 주문 검증 판정.
#[derive(Debug, Clone, PartialEq)]
pub enum RiskVerdict {
    /// 모든 한도 통과
    Approved,
    /// 한도 위반, 사유는 감사 로그용
    Rejected { reason: String },
}

impl RiskVerdict {
    /// 승인 여부를 반환합니다.
    pub fn is_approved(&self) -> bool {
        matches!(self, RiskVerdict::Approved)
    }

    fn rejected(reason: impl Into<String>) -> Self {
        RiskVerdict::Rejected {
            reason: reason.into(),
        }
    }
}

/// 포지션/낙폭 한도를 적용하는 리스크 관리자.
#[derive(Debug, Clone)]
pub struct RiskManager {
    config: RiskConfig,
}

impl RiskManager {
    /// 설정으로 리스크 관리자를 생성합니다.
    pub fn new(config: RiskConfig) -> Self {
        Self { config }
    }

    /// 주문을 검증합니다. 에러 없이 항상 판정을 반환합니다.
    pub fn validate(
        &self,
        order: &Order,
        state: &PortfolioState,
        snapshots: &[PerformanceSnapshot],
        current_prices: &BTreeMap<String, Decimal>,
    ) -> RiskVerdict {
        let total_value = state.total_value(current_prices);
        let notional = order.notional();

        if order.quantity <= dec!(0) {
            return RiskVerdict::rejected(format!(
                "주문 수량이 0 이하입니다: {}",
                order.quantity
            ));
        }

        if total_value <= dec!(0) {
            return RiskVerdict::rejected(format!("총자산이 0 이하입니다: {total_value}"));
        }

        // 포지션 한도: 매수/매도 양방향 공통
        let max_notional = self.config.max_position_size * total_value;
        if notional > max_notional {
            return RiskVerdict::rejected(format!(
                "명목 가치 {notional}이 포지션 한도 {max_notional}을 초과합니다"
            ));
        }

        match order.side {
            Side::Buy => {
                // 수수료 포함 총비용이 현금을 넘으면 거부
                let cost = notional * (dec!(1) + self.config.commission_rate);
                if cost > state.cash {
                    return RiskVerdict::rejected(format!(
                        "필요 현금 {cost}이 잔고 {}를 초과합니다",
                        state.cash
                    ));
                }
            }
            Side::Sell => {
                // 공매도 금지: 보유량 초과 매도 거부
                let held = state.position(&order.symbol);
                if order.quantity > held {
                    return RiskVerdict::rejected(format!(
                        "매도 수량 {}이 보유량 {held}을 초과합니다 ({})",
                        order.quantity, order.symbol
                    ));
                }
            }
        }

        // 예상 낙폭: 체결 수수료 차감 후 자산이 한도 이하로 떨어지면 거부
        let projected = total_value - notional * self.config.commission_rate;
        let peak = snapshots
            .iter()
            .map(|s| s.total_value)
            .fold(total_value, Decimal::max);
        if peak > dec!(0) {
            let projected_drawdown = (peak - projected) / peak;
            if projected_drawdown > self.config.max_drawdown {
                return RiskVerdict::rejected(format!(
                    "예상 낙폭 {projected_drawdown}이 한도 {}를 초과합니다",
                    self.config.max_drawdown
                ));
            }
        }

        debug!(
            order_id = %order.id,
            symbol = %order.symbol,
            side = %order.side,
            notional = %notional,
            total_value = %total_value,
            "주문 승인"
        );
        RiskVerdict::Approved
    }
}

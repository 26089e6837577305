//! 주문 및 체결 타입.
//!
//! 이 모듈은 주문 수명주기의 두 단계를 정의합니다:
//! - `Order` - 에이전트가 생성하고 RiskManager가 소비하는 주문 요청
//! - `Fill` - 리스크 검증 통과 후에만 생성되는 체결 기록 (불변)

use crate::domain::Side;
use crate::types::{AgentId, Price, Quantity};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 에이전트가 제출한 주문.
///
/// RiskManager 검증을 거친 뒤에만 체결로 이어집니다.
/// 거부된 주문은 재시도 없이 폐기되고 감사 로그에 기록됩니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    /// 내부 주문 ID
    pub id: Uuid,
    /// 주문을 낸 에이전트
    pub agent_id: AgentId,
    /// 거래 심볼
    pub symbol: String,
    /// 주문 방향
    pub side: Side,
    /// 주문 수량
    pub quantity: Quantity,
    /// 요청 가격
    pub requested_price: Price,
    /// 주문 생성 타임스탬프 (시뮬레이션 시계 기준)
    pub timestamp: DateTime<Utc>,
}

impl Order {
    /// 새 주문을 생성합니다.
    pub fn new(
        agent_id: impl Into<AgentId>,
        symbol: impl Into<String>,
        side: Side,
        quantity: Quantity,
        requested_price: Price,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            agent_id: agent_id.into(),
            symbol: symbol.into(),
            side,
            quantity,
            requested_price,
            timestamp,
        }
    }

    /// 주문의 명목 가치(수량 × 요청 가격)를 반환합니다.
    pub fn notional(&self) -> Decimal {
        self.quantity * self.requested_price
    }
}

/// 승인된 주문의 체결 결과.
///
/// 리스크 검증을 통과한 주문에 대해서만 생성되며, 생성 후 불변입니다.
/// 모든 `Fill`은 정확히 하나의 검증 통과 `Order`로 추적됩니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fill {
    /// 체결 ID
    pub id: Uuid,
    /// 원본 주문 ID
    pub order_id: Uuid,
    /// 주문을 낸 에이전트
    pub agent_id: AgentId,
    /// 거래 심볼
    pub symbol: String,
    /// 체결 방향
    pub side: Side,
    /// 체결 가격
    pub executed_price: Price,
    /// 체결 수량
    pub executed_quantity: Quantity,
    /// 거래 비용 (수수료)
    pub transaction_cost: Decimal,
    /// 체결 타임스탬프
    pub timestamp: DateTime<Utc>,
}

impl Fill {
    /// 승인된 주문으로부터 체결을 생성합니다.
    ///
    /// 체결가는 요청가와 같고(슬리피지 미모델링), 거래 비용은
    /// 명목 가치에 수수료율을 곱해 계산합니다.
    pub fn from_order(order: &Order, commission_rate: Decimal) -> Self {
        let notional = order.notional();
        Self {
            id: Uuid::new_v4(),
            order_id: order.id,
            agent_id: order.agent_id.clone(),
            symbol: order.symbol.clone(),
            side: order.side,
            executed_price: order.requested_price,
            executed_quantity: order.quantity,
            transaction_cost: notional * commission_rate,
            timestamp: order.timestamp,
        }
    }

    /// 체결의 명목 가치를 반환합니다.
    pub fn notional(&self) -> Decimal {
        self.executed_price * self.executed_quantity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_order_notional() {
        let order = Order::new("agent-0", "AAPL", Side::Buy, dec!(10), dec!(150), Utc::now());
        assert_eq!(order.notional(), dec!(1500));
    }

    #[test]
    fn test_fill_from_order() {
        let order = Order::new("agent-0", "AAPL", Side::Buy, dec!(10), dec!(150), Utc::now());
        let fill = Fill::from_order(&order, dec!(0.001));

        assert_eq!(fill.order_id, order.id);
        assert_eq!(fill.executed_price, dec!(150));
        assert_eq!(fill.executed_quantity, dec!(10));
        assert_eq!(fill.transaction_cost, dec!(1.5));
        assert_eq!(fill.timestamp, order.timestamp);
    }
}

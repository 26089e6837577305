//! 리스크 한도 설정.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use sim_core::SimulationConfig;

/// 리스크 관리자 한도.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskConfig {
    /// 단일 주문 명목 가치의 총자산 대비 상한 (비율, 기본: 0.1)
    pub max_position_size: Decimal,
    /// 허용 최대 낙폭 (비율, 기본: 0.2)
    pub max_drawdown: Decimal,
    /// 수수료율 (체결 비용 추정에 사용, 기본: 0.001)
    pub commission_rate: Decimal,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            max_position_size: dec!(0.1),
            max_drawdown: dec!(0.2),
            commission_rate: dec!(0.001),
        }
    }
}

impl From<&SimulationConfig> for RiskConfig {
    fn from(config: &SimulationConfig) -> Self {
        Self {
            max_position_size: config.max_position_size,
            max_drawdown: config.max_drawdown,
            commission_rate: config.commission_rate,
        }
    }
}

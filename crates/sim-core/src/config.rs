//! 설정 관리.
//!
//! 전역 설정 파일이나 모듈 수준 전역 상태 대신, 명시적인
//! `SimulationConfig` 구조체를 엔진 생성 시점에 전달합니다.
//! TOML 파일 + `SIMBOT__` 접두사 환경 변수 오버라이드를 지원합니다.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::{SimError, SimResult};

/// 전략 변형.
///
/// 닫힌 변형 집합입니다. 새 전략은 이 열거형에 변형을 추가하는 방식으로
/// 도입되며, 서브클래싱이 아닌 설정으로 디스패치됩니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// RSI + 볼린저 밴드 평균회귀
    #[default]
    MeanReversion,
    /// 특징 추출 기반 예측 전략
    MlPredictive,
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StrategyKind::MeanReversion => write!(f, "mean_reversion"),
            StrategyKind::MlPredictive => write!(f, "ml_predictive"),
        }
    }
}

/// 시뮬레이션 설정.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// 에이전트당 초기 현금
    #[serde(default = "default_initial_cash")]
    pub initial_cash: Decimal,

    /// 최대 낙폭 비율 (0.2 = 20%)
    #[serde(default = "default_max_drawdown")]
    pub max_drawdown: Decimal,

    /// 총 자산 대비 주문당 최대 포지션 비율 (0.1 = 10%)
    #[serde(default = "default_max_position_size")]
    pub max_position_size: Decimal,

    /// 거래 수수료율 (0.001 = 0.1%)
    #[serde(default = "default_commission_rate")]
    pub commission_rate: Decimal,

    /// 전략 변형
    #[serde(default)]
    pub strategy: StrategyKind,

    /// 전략별 불투명 매개변수
    #[serde(default)]
    pub strategy_params: serde_json::Value,

    /// 거래 심볼 목록
    #[serde(default)]
    pub symbols: Vec<String>,

    /// 라이브 모드 폴링 간격 (초)
    #[serde(default = "default_tick_interval_secs")]
    pub tick_interval_secs: u64,

    /// 확률적 전략의 재현성을 위한 시드
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,

    /// 에이전트 수 (각자 독립 원장 보유)
    #[serde(default = "default_agents")]
    pub agents: usize,
}

fn default_initial_cash() -> Decimal {
    Decimal::new(100_000, 0)
}
fn default_max_drawdown() -> Decimal {
    Decimal::new(2, 1) // 0.2
}
fn default_max_position_size() -> Decimal {
    Decimal::new(1, 1) // 0.1
}
fn default_commission_rate() -> Decimal {
    Decimal::new(1, 3) // 0.1%
}
fn default_tick_interval_secs() -> u64 {
    5
}
fn default_agents() -> usize {
    1
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            initial_cash: default_initial_cash(),
            max_drawdown: default_max_drawdown(),
            max_position_size: default_max_position_size(),
            commission_rate: default_commission_rate(),
            strategy: StrategyKind::default(),
            strategy_params: serde_json::Value::Null,
            symbols: Vec::new(),
            tick_interval_secs: default_tick_interval_secs(),
            seed: None,
            agents: default_agents(),
        }
    }
}

impl SimulationConfig {
    /// 초기 현금과 심볼 목록으로 설정을 생성합니다.
    pub fn new(initial_cash: Decimal, symbols: Vec<String>) -> Self {
        Self {
            initial_cash,
            symbols,
            ..Default::default()
        }
    }

    /// 전략 변형을 설정합니다.
    pub fn with_strategy(mut self, kind: StrategyKind) -> Self {
        self.strategy = kind;
        self
    }

    /// 전략 매개변수를 설정합니다.
    pub fn with_strategy_params(mut self, params: serde_json::Value) -> Self {
        self.strategy_params = params;
        self
    }

    /// 시드를 설정합니다.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// 에이전트 수를 설정합니다.
    pub fn with_agents(mut self, agents: usize) -> Self {
        self.agents = agents;
        self
    }

    /// 라이브 모드 폴링 간격을 반환합니다.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.tick_interval_secs)
    }

    /// 설정을 검증합니다.
    pub fn validate(&self) -> SimResult<()> {
        if self.initial_cash <= Decimal::ZERO {
            return Err(SimError::Config("초기 현금은 0보다 커야 합니다".to_string()));
        }
        if self.max_drawdown <= Decimal::ZERO || self.max_drawdown > Decimal::ONE {
            return Err(SimError::Config(
                "최대 낙폭은 (0, 1] 범위여야 합니다".to_string(),
            ));
        }
        if self.max_position_size <= Decimal::ZERO || self.max_position_size > Decimal::ONE {
            return Err(SimError::Config(
                "최대 포지션 비율은 (0, 1] 범위여야 합니다".to_string(),
            ));
        }
        if self.commission_rate < Decimal::ZERO {
            return Err(SimError::Config(
                "수수료율은 0 이상이어야 합니다".to_string(),
            ));
        }
        if self.symbols.is_empty() {
            return Err(SimError::Config(
                "최소 하나의 심볼이 필요합니다".to_string(),
            ));
        }
        if self.agents == 0 {
            return Err(SimError::Config(
                "최소 하나의 에이전트가 필요합니다".to_string(),
            ));
        }
        Ok(())
    }

    /// 파일과 환경 변수에서 설정을 로드합니다.
    pub fn load<P: AsRef<Path>>(path: P) -> SimResult<Self> {
        let builder = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(
                config::Environment::with_prefix("SIMBOT")
                    .separator("__")
                    .try_parsing(true),
            );

        let loaded: Self = builder
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| SimError::Config(e.to_string()))?;

        loaded.validate()?;
        Ok(loaded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_default_config() {
        let config = SimulationConfig::default();
        assert_eq!(config.initial_cash, dec!(100000));
        assert_eq!(config.max_drawdown, dec!(0.2));
        assert_eq!(config.max_position_size, dec!(0.1));
        assert_eq!(config.agents, 1);
    }

    #[test]
    fn test_validate_rejects_empty_symbols() {
        let config = SimulationConfig::default();
        assert!(config.validate().is_err());

        let config = SimulationConfig::new(dec!(10000), vec!["AAPL".to_string()]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_ratios() {
        let mut config = SimulationConfig::new(dec!(10000), vec!["AAPL".to_string()]);
        config.max_drawdown = dec!(1.5);
        assert!(config.validate().is_err());

        config.max_drawdown = dec!(0.2);
        config.max_position_size = dec!(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_strategy_kind_serde() {
        let kind: StrategyKind = serde_json::from_str("\"ml_predictive\"").unwrap();
        assert_eq!(kind, StrategyKind::MlPredictive);
        assert_eq!(kind.to_string(), "ml_predictive");
    }

    #[test]
    fn test_config_from_toml() {
        let toml_str = r#"
            initial_cash = "50000"
            strategy = "mean_reversion"
            symbols = ["AAPL", "TSLA"]
            seed = 42
        "#;
        let config: SimulationConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.initial_cash, dec!(50000));
        assert_eq!(config.symbols.len(), 2);
        assert_eq!(config.seed, Some(42));
        assert!(config.validate().is_ok());
    }
}

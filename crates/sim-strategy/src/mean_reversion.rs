//! RSI + 볼린저 밴드 평균회귀 전략.
//!
//! 두 지표가 동시에 극단을 가리킬 때만 진입/청산합니다:
//!
//! - 매수: RSI < 과매도 임계값 AND 종가 < 하단 밴드
//! - 매도: RSI > 과매수 임계값 AND 종가 > 상단 밴드
//! - 그 외: 관망 (Hold)

use crate::indicators::{AnnotatedBar, IndicatorEngine};
use crate::traits::Strategy;
use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use sim_core::{PriceBar, Signal, SimError, SimResult, StrategyKind};
use tracing::debug;

fn default_oversold() -> Decimal {
    dec!(30)
}

fn default_overbought() -> Decimal {
    dec!(70)
}

fn default_rsi_period() -> usize {
    14
}

fn default_bb_period() -> usize {
    20
}

fn default_std_multiplier() -> Decimal {
    dec!(2)
}

/// 평균회귀 전략 파라미터.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeanReversionParams {
    /// 과매도 임계값 (기본: 30)
    #[serde(default = "default_oversold")]
    pub oversold: Decimal,
    /// 과매수 임계값 (기본: 70)
    #[serde(default = "default_overbought")]
    pub overbought: Decimal,
    /// RSI 기간 (기본: 14)
    #[serde(default = "default_rsi_period")]
    pub rsi_period: usize,
    /// 볼린저 밴드 기간 (기본: 20)
    #[serde(default = "default_bb_period")]
    pub bb_period: usize,
    /// 표준편차 승수 (기본: 2.0)
    #[serde(default = "default_std_multiplier")]
    pub std_multiplier: Decimal,
}

impl Default for MeanReversionParams {
    fn default() -> Self {
        Self {
            oversold: default_oversold(),
            overbought: default_overbought(),
            rsi_period: default_rsi_period(),
            bb_period: default_bb_period(),
            std_multiplier: default_std_multiplier(),
        }
    }
}

impl MeanReversionParams {
    /// 파라미터 유효성 검증.
    pub fn validate(&self) -> SimResult<()> {
        if self.oversold >= self.overbought {
            return Err(SimError::Strategy(format!(
                "과매도 임계값({})이 과매수 임계값({}) 이상입니다",
                self.oversold, self.overbought
            )));
        }
        if self.rsi_period == 0 || self.bb_period == 0 {
            return Err(SimError::Strategy("지표 기간은 0일 수 없습니다".to_string()));
        }
        Ok(())
    }
}

/// RSI + 볼린저 밴드 복합 평균회귀 전략.
pub struct MeanReversionStrategy {
    params: MeanReversionParams,
    engine: IndicatorEngine,
}

impl MeanReversionStrategy {
    /// 파라미터로 전략을 생성합니다.
    pub fn new(params: MeanReversionParams) -> SimResult<Self> {
        params.validate()?;
        let engine = IndicatorEngine::new(params.rsi_period, params.bb_period, params.std_multiplier);
        Ok(Self { params, engine })
    }
}

#[async_trait]
impl Strategy for MeanReversionStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::MeanReversion
    }

    fn warmup_bars(&self) -> usize {
        self.engine.required_lookback()
    }

    fn annotate(&self, bars: &[PriceBar]) -> SimResult<Vec<AnnotatedBar>> {
        self.engine.annotate(bars)
    }

    async fn generate_signal(&self, annotated: &[AnnotatedBar]) -> SimResult<Signal> {
        let last = annotated
            .last()
            .ok_or(SimError::InsufficientHistory {
                required: self.warmup_bars(),
                available: 0,
            })?;

        let (rsi, bollinger) = match (last.rsi, &last.bollinger) {
            (Some(rsi), Some(bb)) => (rsi, bb),
            _ => {
                return Err(SimError::InsufficientHistory {
                    required: self.warmup_bars(),
                    available: annotated.len(),
                })
            }
        };

        let close = last.bar.close;
        let signal = if rsi < self.params.oversold && close < bollinger.lower {
            Signal::Buy
        } else if rsi > self.params.overbought && close > bollinger.upper {
            Signal::Sell
        } else {
            Signal::Hold
        };

        debug!(
            symbol = %last.bar.symbol,
            rsi = %rsi,
            close = %close,
            lower = %bollinger.lower,
            upper = %bollinger.upper,
            signal = %signal,
            "평균회귀 신호 평가"
        );

        Ok(signal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::BollingerBands;
    use chrono::{TimeZone, Utc};

    fn annotated_bar(close: Decimal, rsi: Decimal, lower: Decimal, upper: Decimal) -> AnnotatedBar {
        let middle = (lower + upper) / dec!(2);
        AnnotatedBar {
            bar: PriceBar {
                symbol: "TEST".to_string(),
                timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
                open: close,
                high: close,
                low: close,
                close,
                volume: dec!(1000),
            },
            rsi: Some(rsi),
            bollinger: Some(BollingerBands {
                upper,
                middle,
                lower,
                width: upper - lower,
            }),
        }
    }

    fn strategy() -> MeanReversionStrategy {
        MeanReversionStrategy::new(MeanReversionParams::default()).unwrap()
    }

    #[tokio::test]
    async fn test_buy_requires_both_triggers() {
        let s = strategy();

        // RSI 25 + 종가 < 하단 밴드 => Buy
        let bar = annotated_bar(dec!(95), dec!(25), dec!(96), dec!(104));
        assert_eq!(s.generate_signal(&[bar]).await.unwrap(), Signal::Buy);

        // RSI만 과매도, 종가는 밴드 안 => Hold
        let bar = annotated_bar(dec!(100), dec!(25), dec!(96), dec!(104));
        assert_eq!(s.generate_signal(&[bar]).await.unwrap(), Signal::Hold);
    }

    #[tokio::test]
    async fn test_sell_requires_both_triggers() {
        let s = strategy();

        // RSI 75 + 종가 > 상단 밴드 => Sell
        let bar = annotated_bar(dec!(105), dec!(75), dec!(96), dec!(104));
        assert_eq!(s.generate_signal(&[bar]).await.unwrap(), Signal::Sell);

        // 종가만 상단 이탈, RSI는 중립 => Hold
        let bar = annotated_bar(dec!(105), dec!(50), dec!(96), dec!(104));
        assert_eq!(s.generate_signal(&[bar]).await.unwrap(), Signal::Hold);
    }

    #[tokio::test]
    async fn test_neutral_rsi_holds_regardless_of_bands() {
        let s = strategy();

        let below = annotated_bar(dec!(90), dec!(50), dec!(96), dec!(104));
        assert_eq!(s.generate_signal(&[below]).await.unwrap(), Signal::Hold);

        let above = annotated_bar(dec!(110), dec!(50), dec!(96), dec!(104));
        assert_eq!(s.generate_signal(&[above]).await.unwrap(), Signal::Hold);
    }

    #[test]
    fn test_invalid_thresholds_rejected() {
        let params = MeanReversionParams {
            oversold: dec!(70),
            overbought: dec!(30),
            ..Default::default()
        };
        assert!(MeanReversionStrategy::new(params).is_err());
    }
}

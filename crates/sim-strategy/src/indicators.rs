//! 공용 기술적 지표 계산.
//!
//! 모든 함수는 순수 함수이며 OHLCV 종가 슬라이스만 입력으로 받습니다.
//! 금액 계산은 전부 `Decimal`로 수행하고, 제곱근만 Newton 근사를
//! 사용합니다.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use sim_core::{decimal_sqrt, PriceBar, SimError, SimResult};

/// RSI (Relative Strength Index) 계산.
///
/// # Arguments
/// * `prices` - 종가 데이터 (최신 데이터가 마지막)
/// * `period` - RSI 기간 (일반적으로 14)
///
/// # Returns
/// RSI 값 (0~100), 데이터 부족 시 None
pub fn calculate_rsi(prices: &[Decimal], period: usize) -> Option<Decimal> {
    if period == 0 || prices.len() < period + 1 {
        return None;
    }

    let mut gains = dec!(0);
    let mut losses = dec!(0);

    // 초기 평균 계산
    for i in 1..=period {
        let change = prices[i] - prices[i - 1];
        if change > dec!(0) {
            gains += change;
        } else {
            losses += change.abs();
        }
    }

    let mut avg_gain = gains / Decimal::from(period);
    let mut avg_loss = losses / Decimal::from(period);

    // EMA 방식으로 나머지 기간 계산
    for i in (period + 1)..prices.len() {
        let change = prices[i] - prices[i - 1];
        if change > dec!(0) {
            avg_gain = (avg_gain * Decimal::from(period - 1) + change) / Decimal::from(period);
            avg_loss = (avg_loss * Decimal::from(period - 1)) / Decimal::from(period);
        } else {
            avg_gain = (avg_gain * Decimal::from(period - 1)) / Decimal::from(period);
            avg_loss =
                (avg_loss * Decimal::from(period - 1) + change.abs()) / Decimal::from(period);
        }
    }

    if avg_loss == dec!(0) {
        return Some(dec!(100));
    }

    let rs = avg_gain / avg_loss;
    let rsi = dec!(100) - (dec!(100) / (dec!(1) + rs));

    Some(rsi)
}

/// SMA (Simple Moving Average) 계산.
///
/// # Returns
/// SMA 값, 데이터 부족 시 None
pub fn calculate_sma(prices: &[Decimal], period: usize) -> Option<Decimal> {
    if period == 0 || prices.len() < period {
        return None;
    }

    let sum: Decimal = prices[prices.len() - period..].iter().sum();
    Some(sum / Decimal::from(period))
}

/// 최근 `period`개 가격의 표준편차 계산.
pub fn calculate_stddev(prices: &[Decimal], period: usize) -> Option<Decimal> {
    if period == 0 || prices.len() < period {
        return None;
    }

    let mean = calculate_sma(prices, period)?;
    let recent = &prices[prices.len() - period..];
    let variance: Decimal = recent
        .iter()
        .map(|&p| {
            let diff = p - mean;
            diff * diff
        })
        .sum::<Decimal>()
        / Decimal::from(period);

    Some(decimal_sqrt(variance))
}

/// 볼린저 밴드 계산 결과.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BollingerBands {
    /// 상단 밴드
    pub upper: Decimal,
    /// 중간선 (SMA)
    pub middle: Decimal,
    /// 하단 밴드
    pub lower: Decimal,
    /// 밴드 폭 (upper - lower)
    pub width: Decimal,
}

/// 볼린저 밴드 계산.
///
/// # Arguments
/// * `prices` - 종가 데이터
/// * `period` - 기간 (일반적으로 20)
/// * `std_dev` - 표준편차 배수 (일반적으로 2.0)
///
/// # Returns
/// 볼린저 밴드, 데이터 부족 시 None
pub fn calculate_bollinger_bands(
    prices: &[Decimal],
    period: usize,
    std_dev: Decimal,
) -> Option<BollingerBands> {
    let middle = calculate_sma(prices, period)?;
    let std = calculate_stddev(prices, period)?;

    let upper = middle + std * std_dev;
    let lower = middle - std * std_dev;

    Some(BollingerBands {
        upper,
        middle,
        lower,
        width: upper - lower,
    })
}

/// 지표가 주석된 바.
///
/// 마지막 바는 lookback 충족 시 모든 지표가 `Some`이며, 시계열 앞부분은
/// 데이터 부족으로 `None`일 수 있습니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotatedBar {
    /// 원본 바
    pub bar: PriceBar,
    /// RSI 값 (0~100)
    pub rsi: Option<Decimal>,
    /// 볼린저 밴드
    pub bollinger: Option<BollingerBands>,
}

/// 심볼별 바 시계열에 지표를 주석하는 엔진.
#[derive(Debug, Clone)]
pub struct IndicatorEngine {
    rsi_period: usize,
    bb_period: usize,
    bb_std_multiplier: Decimal,
}

impl IndicatorEngine {
    /// 새 지표 엔진을 생성합니다.
    pub fn new(rsi_period: usize, bb_period: usize, bb_std_multiplier: Decimal) -> Self {
        Self {
            rsi_period,
            bb_period,
            bb_std_multiplier,
        }
    }

    /// 지표 계산에 필요한 최소 바 수.
    pub fn required_lookback(&self) -> usize {
        (self.rsi_period + 1).max(self.bb_period)
    }

    /// 시간순 정렬된 바 슬라이스에 지표를 주석합니다.
    ///
    /// 바 수가 lookback 미만이면 `SimError::InsufficientHistory`를
    /// 반환합니다. 성공 시 마지막 바의 지표는 항상 `Some`입니다.
    pub fn annotate(&self, bars: &[PriceBar]) -> SimResult<Vec<AnnotatedBar>> {
        let required = self.required_lookback();
        if bars.len() < required {
            return Err(SimError::InsufficientHistory {
                required,
                available: bars.len(),
            });
        }

        let closes: Vec<Decimal> = bars.iter().map(|b| b.close).collect();
        let annotated = bars
            .iter()
            .enumerate()
            .map(|(i, bar)| {
                let window = &closes[..=i];
                AnnotatedBar {
                    bar: bar.clone(),
                    rsi: calculate_rsi(window, self.rsi_period),
                    bollinger: calculate_bollinger_bands(
                        window,
                        self.bb_period,
                        self.bb_std_multiplier,
                    ),
                }
            })
            .collect();

        Ok(annotated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use sim_core::PriceBar;

    fn bars_from_closes(closes: &[Decimal]) -> Vec<PriceBar> {
        closes
            .iter()
            .enumerate()
            .map(|(i, &close)| PriceBar {
                symbol: "TEST".to_string(),
                timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
                    + chrono::Duration::minutes(i as i64),
                open: close,
                high: close + dec!(1),
                low: close - dec!(1),
                close,
                volume: dec!(1000),
            })
            .collect()
    }

    #[test]
    fn test_rsi_insufficient_data() {
        let prices = vec![dec!(100), dec!(101)];
        assert!(calculate_rsi(&prices, 14).is_none());
    }

    #[test]
    fn test_rsi_all_gains_is_100() {
        let prices: Vec<Decimal> = (0..20).map(|i| Decimal::from(100 + i)).collect();
        let rsi = calculate_rsi(&prices, 14).unwrap();
        assert_eq!(rsi, dec!(100));
    }

    #[test]
    fn test_rsi_all_losses_near_zero() {
        let prices: Vec<Decimal> = (0..20).map(|i| Decimal::from(200 - i)).collect();
        let rsi = calculate_rsi(&prices, 14).unwrap();
        assert!(rsi < dec!(1));
    }

    #[test]
    fn test_sma_simple() {
        let prices = vec![dec!(1), dec!(2), dec!(3), dec!(4), dec!(5)];
        assert_eq!(calculate_sma(&prices, 5).unwrap(), dec!(3));
        // 최근 구간만 사용
        assert_eq!(calculate_sma(&prices, 2).unwrap(), dec!(4.5));
    }

    #[test]
    fn test_stddev_constant_series_is_zero() {
        let prices = vec![dec!(50); 10];
        assert_eq!(calculate_stddev(&prices, 10).unwrap(), dec!(0));
    }

    #[test]
    fn test_bollinger_bands_symmetric() {
        let prices: Vec<Decimal> = (0..20).map(|i| Decimal::from(100 + (i % 3))).collect();
        let bb = calculate_bollinger_bands(&prices, 20, dec!(2)).unwrap();
        assert!(bb.upper > bb.middle);
        assert!(bb.lower < bb.middle);
        assert_eq!(bb.upper - bb.middle, bb.middle - bb.lower);
        assert_eq!(bb.width, bb.upper - bb.lower);
    }

    #[test]
    fn test_annotate_requires_lookback() {
        let engine = IndicatorEngine::new(14, 20, dec!(2));
        assert_eq!(engine.required_lookback(), 20);

        let bars = bars_from_closes(&[dec!(100); 10]);
        let err = engine.annotate(&bars).unwrap_err();
        assert!(matches!(
            err,
            SimError::InsufficientHistory {
                required: 20,
                available: 10
            }
        ));
    }

    #[test]
    fn test_annotate_last_bar_has_indicators() {
        let engine = IndicatorEngine::new(14, 20, dec!(2));
        let closes: Vec<Decimal> = (0..25).map(|i| Decimal::from(100 + (i % 5))).collect();
        let bars = bars_from_closes(&closes);

        let annotated = engine.annotate(&bars).unwrap();
        assert_eq!(annotated.len(), 25);

        let last = annotated.last().unwrap();
        assert!(last.rsi.is_some());
        assert!(last.bollinger.is_some());

        // 앞부분은 이력 부족으로 None
        assert!(annotated[0].rsi.is_none());
        assert!(annotated[0].bollinger.is_none());
    }
}

//! 선형 점수 기반 ML 예측 전략.
//!
//! 학습된 모델 서빙이 아니라, 고정 가중치 선형 결합으로 방향 점수를
//! 산출하는 경량 예측기입니다. 피처는 모두 [-1, 1] 범위로 정규화됩니다:
//!
//! - 직전 바 수익률 (클램핑)
//! - RSI를 [-1, 1]로 스케일링 ((rsi - 50) / 50)
//! - 볼린저 %b를 [-1, 1]로 스케일링 (2 * %b - 1)
//! - 뉴스 감성 점수 (없으면 0)
//!
//! `seed`가 주어지면 결정적 지터가 점수에 더해져, 같은 시드로는 항상
//! 같은 신호가 재현됩니다.

use crate::indicators::{AnnotatedBar, IndicatorEngine};
use crate::traits::Strategy;
use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use sim_core::{PriceBar, Signal, SimError, SimResult, StrategyKind};
use sim_data::NewsSentiment;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

fn default_buy_threshold() -> f64 {
    0.2
}

fn default_sell_threshold() -> f64 {
    -0.2
}

fn default_rsi_period() -> usize {
    14
}

fn default_bb_period() -> usize {
    20
}

fn default_jitter_scale() -> f64 {
    0.05
}

/// ML 예측 전략 파라미터.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MlPredictiveParams {
    /// 매수 임계 점수 (기본: 0.2)
    #[serde(default = "default_buy_threshold")]
    pub buy_threshold: f64,
    /// 매도 임계 점수 (기본: -0.2)
    #[serde(default = "default_sell_threshold")]
    pub sell_threshold: f64,
    /// RSI 기간 (기본: 14)
    #[serde(default = "default_rsi_period")]
    pub rsi_period: usize,
    /// 볼린저 밴드 기간 (기본: 20)
    #[serde(default = "default_bb_period")]
    pub bb_period: usize,
    /// 지터 크기 (기본: 0.05)
    #[serde(default = "default_jitter_scale")]
    pub jitter_scale: f64,
}

impl Default for MlPredictiveParams {
    fn default() -> Self {
        Self {
            buy_threshold: default_buy_threshold(),
            sell_threshold: default_sell_threshold(),
            rsi_period: default_rsi_period(),
            bb_period: default_bb_period(),
            jitter_scale: default_jitter_scale(),
        }
    }
}

impl MlPredictiveParams {
    /// 파라미터 유효성 검증.
    pub fn validate(&self) -> SimResult<()> {
        if self.sell_threshold >= self.buy_threshold {
            return Err(SimError::Strategy(format!(
                "매도 임계값({})이 매수 임계값({}) 이상입니다",
                self.sell_threshold, self.buy_threshold
            )));
        }
        if self.rsi_period == 0 || self.bb_period == 0 {
            return Err(SimError::Strategy("지표 기간은 0일 수 없습니다".to_string()));
        }
        Ok(())
    }
}

/// 피처별 고정 가중치: [직전 수익률, RSI, 볼린저 %b, 감성].
const FEATURE_WEIGHTS: [f64; 4] = [0.3, -0.35, -0.25, 0.1];

/// 선형 점수 기반 예측 전략.
pub struct MlPredictiveStrategy {
    params: MlPredictiveParams,
    engine: IndicatorEngine,
    sentiment: Option<Arc<dyn NewsSentiment>>,
    rng: Option<Mutex<StdRng>>,
}

impl MlPredictiveStrategy {
    /// 파라미터와 선택적 감성 소스, 시드로 전략을 생성합니다.
    pub fn new(
        params: MlPredictiveParams,
        sentiment: Option<Arc<dyn NewsSentiment>>,
        seed: Option<u64>,
    ) -> SimResult<Self> {
        params.validate()?;
        let engine = IndicatorEngine::new(params.rsi_period, params.bb_period, dec!(2));
        let rng = seed.map(|s| Mutex::new(StdRng::seed_from_u64(s)));
        Ok(Self {
            params,
            engine,
            sentiment,
            rng,
        })
    }

    /// 주석 바 시계열에서 피처 벡터를 추출합니다.
    fn extract_features(&self, annotated: &[AnnotatedBar], sentiment: f64) -> SimResult<[f64; 4]> {
        let required = self.engine.required_lookback();
        if annotated.len() < 2 {
            return Err(SimError::InsufficientHistory {
                required,
                available: annotated.len(),
            });
        }

        let last = &annotated[annotated.len() - 1];
        let prev = &annotated[annotated.len() - 2];

        let (rsi, bollinger) = match (last.rsi, &last.bollinger) {
            (Some(rsi), Some(bb)) => (rsi, bb),
            _ => {
                return Err(SimError::InsufficientHistory {
                    required,
                    available: annotated.len(),
                })
            }
        };

        // 직전 바 수익률, [-1, 1] 클램핑
        let last_return = if prev.bar.close.is_zero() {
            0.0
        } else {
            ((last.bar.close - prev.bar.close) / prev.bar.close)
                .to_f64()
                .unwrap_or(0.0)
                .clamp(-1.0, 1.0)
        };

        // RSI (0~100) -> [-1, 1]
        let rsi_scaled = ((rsi - dec!(50)) / dec!(50)).to_f64().unwrap_or(0.0);

        // 볼린저 %b -> [-1, 1]
        let percent_b = if bollinger.width.is_zero() {
            0.5
        } else {
            ((last.bar.close - bollinger.lower) / bollinger.width)
                .to_f64()
                .unwrap_or(0.5)
        };
        let band_scaled = (2.0 * percent_b - 1.0).clamp(-1.0, 1.0);

        Ok([last_return, rsi_scaled, band_scaled, sentiment])
    }
}

#[async_trait]
impl Strategy for MlPredictiveStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::MlPredictive
    }

    fn warmup_bars(&self) -> usize {
        self.engine.required_lookback()
    }

    fn annotate(&self, bars: &[PriceBar]) -> SimResult<Vec<AnnotatedBar>> {
        self.engine.annotate(bars)
    }

    async fn generate_signal(&self, annotated: &[AnnotatedBar]) -> SimResult<Signal> {
        let symbol = annotated
            .last()
            .map(|a| a.bar.symbol.clone())
            .ok_or(SimError::InsufficientHistory {
                required: self.warmup_bars(),
                available: 0,
            })?;

        let sentiment = match &self.sentiment {
            Some(source) => source
                .get_sentiment(&symbol)
                .await
                .ok()
                .flatten()
                .unwrap_or(0.0),
            None => 0.0,
        };

        let features = self.extract_features(annotated, sentiment)?;
        let mut score: f64 = features
            .iter()
            .zip(FEATURE_WEIGHTS.iter())
            .map(|(f, w)| f * w)
            .sum();

        if let Some(rng) = &self.rng {
            let jitter = rng.lock().await.gen_range(-1.0..1.0) * self.params.jitter_scale;
            score += jitter;
        }

        let signal = if score > self.params.buy_threshold {
            Signal::Buy
        } else if score < self.params.sell_threshold {
            Signal::Sell
        } else {
            Signal::Hold
        };

        debug!(
            symbol = %symbol,
            score = score,
            sentiment = sentiment,
            signal = %signal,
            "ML 예측 신호 평가"
        );

        Ok(signal)
    }
}

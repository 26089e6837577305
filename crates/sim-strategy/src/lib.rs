//! 트레이딩 전략 크레이트.
//!
//! 기술적 지표 계산(`IndicatorEngine`), 전략 trait, 그리고 닫힌 전략
//! 집합(평균회귀, ML 예측)을 제공합니다. 전략은 가장 최근 바에 대해서만
//! 신호를 평가하며, 주문 생성과 리스크 판단은 상위 계층의 몫입니다.

pub mod indicators;
pub mod mean_reversion;
pub mod ml_predictive;
pub mod registry;
pub mod traits;

pub use indicators::{
    calculate_bollinger_bands, calculate_rsi, calculate_sma, calculate_stddev, AnnotatedBar,
    BollingerBands, IndicatorEngine,
};
pub use mean_reversion::{MeanReversionParams, MeanReversionStrategy};
pub use ml_predictive::{MlPredictiveParams, MlPredictiveStrategy};
pub use registry::build_strategy;
pub use traits::Strategy;

//! 전략 레지스트리.
//!
//! 닫힌 변형 집합(`StrategyKind`)에서 전략 인스턴스를 생성합니다.
//! 새 전략 추가는 enum 변형과 이 factory의 분기 추가로 이루어집니다.

use crate::mean_reversion::{MeanReversionParams, MeanReversionStrategy};
use crate::ml_predictive::{MlPredictiveParams, MlPredictiveStrategy};
use crate::traits::Strategy;
use sim_core::{SimError, SimResult, StrategyKind};
use sim_data::NewsSentiment;
use std::sync::Arc;

/// 전략 종류와 파라미터로 전략을 생성합니다.
///
/// `params`는 각 전략의 파라미터 구조로 역직렬화되며, 생략된 필드는
/// 기본값이 적용됩니다. `seed`와 `sentiment`는 ML 예측 전략에서만
/// 사용됩니다.
pub fn build_strategy(
    kind: StrategyKind,
    params: &serde_json::Value,
    seed: Option<u64>,
    sentiment: Option<Arc<dyn NewsSentiment>>,
) -> SimResult<Box<dyn Strategy>> {
    // 매개변수 미설정(null)은 빈 객체로 취급하여 기본값 적용
    let params = if params.is_null() {
        serde_json::Value::Object(serde_json::Map::new())
    } else {
        params.clone()
    };

    match kind {
        StrategyKind::MeanReversion => {
            let params: MeanReversionParams = serde_json::from_value(params)
                .map_err(|e| SimError::Strategy(format!("평균회귀 파라미터 파싱 실패: {e}")))?;
            Ok(Box::new(MeanReversionStrategy::new(params)?))
        }
        StrategyKind::MlPredictive => {
            let params: MlPredictiveParams = serde_json::from_value(params)
                .map_err(|e| SimError::Strategy(format!("ML 예측 파라미터 파싱 실패: {e}")))?;
            Ok(Box::new(MlPredictiveStrategy::new(params, sentiment, seed)?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_build_mean_reversion_with_defaults() {
        let strategy = build_strategy(StrategyKind::MeanReversion, &json!({}), None, None).unwrap();
        assert_eq!(strategy.kind(), StrategyKind::MeanReversion);
        assert_eq!(strategy.warmup_bars(), 20);
    }

    #[test]
    fn test_build_ml_predictive_with_overrides() {
        let params = json!({ "rsi_period": 7, "bb_period": 10 });
        let strategy =
            build_strategy(StrategyKind::MlPredictive, &params, Some(1), None).unwrap();
        assert_eq!(strategy.kind(), StrategyKind::MlPredictive);
        assert_eq!(strategy.warmup_bars(), 10);
    }

    #[test]
    fn test_build_treats_null_params_as_defaults() {
        let strategy =
            build_strategy(StrategyKind::MeanReversion, &serde_json::Value::Null, None, None)
                .unwrap();
        assert_eq!(strategy.warmup_bars(), 20);
    }

    #[test]
    fn test_build_rejects_invalid_params() {
        let params = json!({ "oversold": "80", "overbought": "20" });
        assert!(build_strategy(StrategyKind::MeanReversion, &params, None, None).is_err());
    }
}

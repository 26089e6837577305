//! 뉴스 감성 협력자 (선택적).
//!
//! 감성 점수는 전략의 선택적 입력일 뿐이며, 점수 부재가 신호 생성을
//! 막아서는 안 됩니다. 호출자는 `Err`/`None`을 모두 "점수 없음"으로
//! 취급합니다.

use crate::feed::FeedError;
use async_trait::async_trait;
use std::collections::HashMap;

/// 심볼별 뉴스 감성 점수를 공급하는 trait.
#[async_trait]
pub trait NewsSentiment: Send + Sync {
    /// [-1, 1] 범위의 감성 점수를 반환합니다. 점수가 없으면 `None`.
    async fn get_sentiment(&self, symbol: &str) -> Result<Option<f64>, FeedError>;
}

/// 고정된 점수 맵을 반환하는 감성 공급자.
///
/// 백테스트와 테스트에서 사용합니다. 결정적입니다.
#[derive(Debug, Default)]
pub struct StaticSentiment {
    scores: HashMap<String, f64>,
}

impl StaticSentiment {
    /// 빈 공급자를 생성합니다 (모든 심볼에 대해 None).
    pub fn empty() -> Self {
        Self::default()
    }

    /// 점수 맵으로 공급자를 생성합니다. 점수는 [-1, 1]로 클램프됩니다.
    pub fn new(scores: HashMap<String, f64>) -> Self {
        let scores = scores
            .into_iter()
            .map(|(k, v)| (k, v.clamp(-1.0, 1.0)))
            .collect();
        Self { scores }
    }

    /// 심볼 점수를 설정합니다.
    pub fn with_score(mut self, symbol: impl Into<String>, score: f64) -> Self {
        self.scores.insert(symbol.into(), score.clamp(-1.0, 1.0));
        self
    }
}

#[async_trait]
impl NewsSentiment for StaticSentiment {
    async fn get_sentiment(&self, symbol: &str) -> Result<Option<f64>, FeedError> {
        Ok(self.scores.get(symbol).copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_sentiment() {
        let provider = StaticSentiment::empty().with_score("AAPL", 0.6);

        assert_eq!(provider.get_sentiment("AAPL").await.unwrap(), Some(0.6));
        assert_eq!(provider.get_sentiment("TSLA").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_sentiment_clamped() {
        let provider = StaticSentiment::empty().with_score("AAPL", 3.5);
        assert_eq!(provider.get_sentiment("AAPL").await.unwrap(), Some(1.0));
    }
}

//! 시장 데이터 피드 경계.
//!
//! 엔진은 이 trait을 통해서만 시장 데이터에 접근합니다. 일시적 장애에
//! 대한 재시도/백오프는 피드 경계가 소유하며, 재시도가 소진된 뒤에야
//! 엔진이 `Faulted`로 전이합니다.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sim_core::PriceBar;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

/// 피드 에러.
#[derive(Debug, Error)]
pub enum FeedError {
    /// 일시적 장애 (재시도 대상)
    #[error("일시적 피드 장애: {0}")]
    Transient(String),

    /// 알 수 없는 심볼
    #[error("알 수 없는 심볼: {0}")]
    UnknownSymbol(String),

    /// 재시도 소진 (엔진 Faulted 전이 트리거)
    #[error("피드 재시도 소진: {0}")]
    Exhausted(String),
}

impl FeedError {
    /// 재시도 가능한 에러인지 확인합니다.
    pub fn is_retryable(&self) -> bool {
        matches!(self, FeedError::Transient(_))
    }
}

/// 시장 데이터 공급자 trait.
#[async_trait]
pub trait MarketDataFeed: Send + Sync {
    /// 기간 내 과거 바를 시간순으로 반환합니다.
    async fn get_historical_bars(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<PriceBar>, FeedError>;

    /// 심볼의 최신 바를 반환합니다. 바가 아직 없으면 `None`.
    async fn get_latest_bar(&self, symbol: &str) -> Result<Option<PriceBar>, FeedError>;
}

/// 피드 재시도 정책.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// 최대 시도 횟수 (첫 시도 포함)
    pub max_attempts: u32,
    /// 백오프 기본 간격 (시도마다 2배씩 증가)
    pub backoff_base: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_base: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    /// n번째 시도 후 대기 시간을 반환합니다.
    fn backoff(&self, attempt: u32) -> Duration {
        self.backoff_base * 2u32.saturating_pow(attempt)
    }
}

/// 재시도 정책을 적용하는 피드 래퍼.
///
/// 일시적 에러만 재시도하며, 시도가 소진되면 `FeedError::Exhausted`를
/// 반환합니다. 그 외 에러는 즉시 전파됩니다.
pub struct RetryingFeed<F: MarketDataFeed> {
    inner: F,
    policy: RetryPolicy,
}

impl<F: MarketDataFeed> RetryingFeed<F> {
    /// 피드와 정책으로 래퍼를 생성합니다.
    pub fn new(inner: F, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    /// 기본 정책으로 래퍼를 생성합니다.
    pub fn with_default_policy(inner: F) -> Self {
        Self::new(inner, RetryPolicy::default())
    }
}

#[async_trait]
impl<F: MarketDataFeed> MarketDataFeed for RetryingFeed<F> {
    async fn get_historical_bars(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<PriceBar>, FeedError> {
        let mut last_err = String::new();
        for attempt in 0..self.policy.max_attempts {
            match self.inner.get_historical_bars(symbol, start, end).await {
                Ok(bars) => return Ok(bars),
                Err(e) if e.is_retryable() => {
                    last_err = e.to_string();
                    // 마지막 시도 실패 후에는 대기 없이 바로 소진 처리
                    if attempt + 1 == self.policy.max_attempts {
                        break;
                    }
                    warn!(symbol, attempt, error = %last_err, "historical fetch failed, retrying");
                    tokio::time::sleep(self.policy.backoff(attempt)).await;
                }
                Err(e) => return Err(e),
            }
        }
        Err(FeedError::Exhausted(last_err))
    }

    async fn get_latest_bar(&self, symbol: &str) -> Result<Option<PriceBar>, FeedError> {
        let mut last_err = String::new();
        for attempt in 0..self.policy.max_attempts {
            match self.inner.get_latest_bar(symbol).await {
                Ok(bar) => return Ok(bar),
                Err(e) if e.is_retryable() => {
                    last_err = e.to_string();
                    if attempt + 1 == self.policy.max_attempts {
                        break;
                    }
                    warn!(symbol, attempt, error = %last_err, "latest fetch failed, retrying");
                    tokio::time::sleep(self.policy.backoff(attempt)).await;
                }
                Err(e) => return Err(e),
            }
        }
        Err(FeedError::Exhausted(last_err))
    }
}

/// 미리 적재한 바를 순서대로 재생하는 인메모리 피드.
///
/// 백테스트 준비와 라이브 모드 테스트에 사용합니다.
/// `get_latest_bar`는 심볼별 커서를 한 칸씩 전진시키며, 바가 소진되면
/// `None`을 반환합니다. 결정적입니다.
pub struct ReplayFeed {
    bars: HashMap<String, Vec<PriceBar>>,
    cursors: HashMap<String, AtomicUsize>,
}

impl ReplayFeed {
    /// 바 목록으로 피드를 생성합니다. 심볼별로 시간순 정렬합니다.
    pub fn new(all_bars: Vec<PriceBar>) -> Self {
        let mut bars: HashMap<String, Vec<PriceBar>> = HashMap::new();
        for bar in all_bars {
            bars.entry(bar.symbol.clone()).or_default().push(bar);
        }
        for series in bars.values_mut() {
            series.sort_by_key(|b| b.timestamp);
        }
        let cursors = bars
            .keys()
            .map(|s| (s.clone(), AtomicUsize::new(0)))
            .collect();
        Self { bars, cursors }
    }

    /// 심볼의 전체 바 수를 반환합니다.
    pub fn len(&self, symbol: &str) -> usize {
        self.bars.get(symbol).map(|b| b.len()).unwrap_or(0)
    }

    /// 심볼에 바가 없는지 확인합니다.
    pub fn is_empty(&self, symbol: &str) -> bool {
        self.len(symbol) == 0
    }
}

#[async_trait]
impl MarketDataFeed for ReplayFeed {
    async fn get_historical_bars(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<PriceBar>, FeedError> {
        let series = self
            .bars
            .get(symbol)
            .ok_or_else(|| FeedError::UnknownSymbol(symbol.to_string()))?;

        Ok(series
            .iter()
            .filter(|b| b.timestamp >= start && b.timestamp <= end)
            .cloned()
            .collect())
    }

    async fn get_latest_bar(&self, symbol: &str) -> Result<Option<PriceBar>, FeedError> {
        let series = self
            .bars
            .get(symbol)
            .ok_or_else(|| FeedError::UnknownSymbol(symbol.to_string()))?;
        let cursor = &self.cursors[symbol];

        let idx = cursor.fetch_add(1, Ordering::SeqCst);
        Ok(series.get(idx).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;
    use std::sync::atomic::AtomicU32;

    fn bar(symbol: &str, minute: u32, close: rust_decimal::Decimal) -> PriceBar {
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 9, minute, 0).unwrap();
        PriceBar::new(symbol, ts, close, close, close, close, dec!(1000))
    }

    #[tokio::test]
    async fn test_replay_feed_cursor() {
        let feed = ReplayFeed::new(vec![bar("AAPL", 0, dec!(100)), bar("AAPL", 1, dec!(101))]);

        let first = feed.get_latest_bar("AAPL").await.unwrap().unwrap();
        assert_eq!(first.close, dec!(100));
        let second = feed.get_latest_bar("AAPL").await.unwrap().unwrap();
        assert_eq!(second.close, dec!(101));
        // 바 소진 후에는 None
        assert!(feed.get_latest_bar("AAPL").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_replay_feed_historical_range() {
        let feed = ReplayFeed::new(vec![
            bar("AAPL", 0, dec!(100)),
            bar("AAPL", 1, dec!(101)),
            bar("AAPL", 2, dec!(102)),
        ]);

        let start = Utc.with_ymd_and_hms(2024, 1, 1, 9, 1, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 1, 1, 9, 2, 0).unwrap();
        let bars = feed.get_historical_bars("AAPL", start, end).await.unwrap();
        assert_eq!(bars.len(), 2);
    }

    #[tokio::test]
    async fn test_replay_feed_unknown_symbol() {
        let feed = ReplayFeed::new(vec![]);
        let result = feed.get_latest_bar("MISSING").await;
        assert!(matches!(result, Err(FeedError::UnknownSymbol(_))));
    }

    /// 항상 일시적 에러를 반환하는 피드.
    struct FlakyFeed {
        calls: AtomicU32,
        succeed_after: u32,
    }

    #[async_trait]
    impl MarketDataFeed for FlakyFeed {
        async fn get_historical_bars(
            &self,
            _symbol: &str,
            _start: DateTime<Utc>,
            _end: DateTime<Utc>,
        ) -> Result<Vec<PriceBar>, FeedError> {
            Err(FeedError::Transient("connection reset".to_string()))
        }

        async fn get_latest_bar(&self, symbol: &str) -> Result<Option<PriceBar>, FeedError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.succeed_after {
                Err(FeedError::Transient("timeout".to_string()))
            } else {
                Ok(Some(bar(symbol, 0, dec!(100))))
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_retrying_feed_recovers() {
        let flaky = FlakyFeed {
            calls: AtomicU32::new(0),
            succeed_after: 2,
        };
        let feed = RetryingFeed::new(
            flaky,
            RetryPolicy {
                max_attempts: 3,
                backoff_base: Duration::from_millis(10),
            },
        );

        let result = feed.get_latest_bar("AAPL").await.unwrap();
        assert!(result.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_retrying_feed_exhausts() {
        let flaky = FlakyFeed {
            calls: AtomicU32::new(0),
            succeed_after: u32::MAX,
        };
        let feed = RetryingFeed::new(
            flaky,
            RetryPolicy {
                max_attempts: 2,
                backoff_base: Duration::from_millis(10),
            },
        );

        let result = feed.get_latest_bar("AAPL").await;
        assert!(matches!(result, Err(FeedError::Exhausted(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_skips_final_backoff() {
        let flaky = FlakyFeed {
            calls: AtomicU32::new(0),
            succeed_after: u32::MAX,
        };
        let feed = RetryingFeed::new(
            flaky,
            RetryPolicy {
                max_attempts: 3,
                backoff_base: Duration::from_millis(500),
            },
        );

        // 대기는 1, 2번째 시도 뒤에만: 500ms + 1000ms. 마지막 시도 뒤 2000ms 대기 없음
        let started = tokio::time::Instant::now();
        let result = feed.get_latest_bar("AAPL").await;
        assert!(matches!(result, Err(FeedError::Exhausted(_))));
        assert_eq!(started.elapsed(), Duration::from_millis(1500));
    }
}

//! 라이브 폴링 루프.
//!
//! 엔진은 전용 태스크에서 설정된 주기로 피드를 폴링합니다. 틱마다
//! 심볼별 최신 바를 가져와 백테스트와 같은 에이전트 평가를 수행합니다.
//!
//! - 바 누락/지연: 해당 심볼만 이번 틱에서 건너뛰고 감사 기록 (치명 아님)
//! - 피드 재시도 소진: 엔진 Faulted 전이 후 루프 종료
//! - 협조적 정지: `stop()`은 watch 플래그를 올리고, 진행 중인 틱은
//!   완료되며 새 틱은 시작되지 않습니다. `join()`으로 종료를 대기합니다.

use crate::engine::{EngineState, SimulationEngine};
use chrono::{DateTime, Utc};
use sim_core::{AuditEvent, AuditKind, PriceBar, SimError, SimEvent, SimResult};
use sim_data::{FeedError, MarketDataFeed};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// 라이브 루프 핸들.
///
/// fire-and-forget이 아니라 명시적 핸들로 정지와 종료 대기를 제공합니다.
pub struct LiveHandle {
    stop_tx: watch::Sender<bool>,
    handle: JoinHandle<SimResult<EngineState>>,
}

impl LiveHandle {
    /// 협조적 정지를 요청합니다. 진행 중인 틱은 완료됩니다.
    pub fn stop(&self) {
        let _ = self.stop_tx.send(true);
    }

    /// 정지 신호 송신기를 복제합니다. 시그널 핸들러 등 다른 태스크에서
    /// 정지를 트리거할 때 사용합니다.
    pub fn stop_handle(&self) -> watch::Sender<bool> {
        self.stop_tx.clone()
    }

    /// 루프 종료를 대기하고 최종 엔진 상태를 반환합니다.
    pub async fn join(self) -> SimResult<EngineState> {
        self.handle
            .await
            .map_err(|e| SimError::Engine(format!("라이브 루프 join 실패: {e}")))?
    }
}

impl SimulationEngine {
    /// 라이브 폴링 루프를 전용 태스크로 시작합니다.
    pub fn start_live(mut self, feed: Arc<dyn MarketDataFeed>) -> SimResult<LiveHandle> {
        self.transition(EngineState::Running)?;

        let (stop_tx, stop_rx) = watch::channel(false);
        let interval = self.config().tick_interval();
        let symbols = self.config().symbols.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            info!(interval_secs = interval.as_secs(), "라이브 루프 시작");

            loop {
                ticker.tick().await;

                // 틱 경계에서만 정지 플래그 확인
                if *stop_rx.borrow() {
                    self.transition(EngineState::Stopped)?;
                    info!("라이브 루프 정지");
                    return Ok(self.state());
                }

                match poll_bars(feed.as_ref(), &symbols).await {
                    Ok((tick_bars, missed)) => {
                        if missed > 0 {
                            self.record_engine_audit(AuditKind::FeedMissed, missed);
                        }
                        let Some(timestamp) = tick_timestamp(&tick_bars) else {
                            continue;
                        };
                        if let Err(err) = self.run_tick(Arc::new(tick_bars), timestamp).await {
                            error!(error = %err, "틱 실행 실패, 엔진 중단");
                            let audit = AuditEvent::new(
                                AuditKind::EngineFaulted,
                                "engine",
                                None,
                                timestamp,
                                err.to_string(),
                            );
                            self.emit(&SimEvent::Audit(audit)).await;
                            self.transition(EngineState::Faulted)?;
                            return Err(err);
                        }
                    }
                    Err(err) => {
                        error!(error = %err, "피드 사용 불가, 엔진 중단");
                        let audit = AuditEvent::new(
                            AuditKind::EngineFaulted,
                            "engine",
                            None,
                            Utc::now(),
                            err.to_string(),
                        );
                        self.emit(&SimEvent::Audit(audit)).await;
                        self.transition(EngineState::Faulted)?;
                        return Err(SimError::DataFeedUnavailable(err.to_string()));
                    }
                }
            }
        });

        Ok(LiveHandle { stop_tx, handle })
    }
}

/// 심볼별 최신 바를 수집합니다. 누락 바 수를 함께 반환합니다.
async fn poll_bars(
    feed: &dyn MarketDataFeed,
    symbols: &[String],
) -> Result<(BTreeMap<String, PriceBar>, usize), FeedError> {
    let mut tick_bars = BTreeMap::new();
    let mut missed = 0;

    for symbol in symbols {
        match feed.get_latest_bar(symbol).await {
            Ok(Some(bar)) => {
                tick_bars.insert(symbol.clone(), bar);
            }
            Ok(None) => {
                warn!(symbol = %symbol, "이번 틱 바 누락");
                missed += 1;
            }
            Err(err) if err.is_retryable() => {
                // 일시 장애는 해당 심볼만 건너뜀
                warn!(symbol = %symbol, error = %err, "피드 일시 장애, 심볼 건너뜀");
                missed += 1;
            }
            Err(err) => return Err(err),
        }
    }

    Ok((tick_bars, missed))
}

/// 틱 타임스탬프는 수집된 바들의 최대 타임스탬프입니다.
fn tick_timestamp(tick_bars: &BTreeMap<String, PriceBar>) -> Option<DateTime<Utc>> {
    tick_bars.values().map(|b| b.timestamp).max()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use sim_core::SimulationConfig;
    use sim_data::{EventStore, LogSink, MemoryStore, ReplayFeed};

    fn bar(minute: i64, close: rust_decimal::Decimal) -> PriceBar {
        use chrono::TimeZone;
        PriceBar {
            symbol: "AAPL".to_string(),
            timestamp: chrono::Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap()
                + chrono::Duration::minutes(minute),
            open: close,
            high: close,
            low: close,
            close,
            volume: dec!(1000),
        }
    }

    fn engine(config: SimulationConfig) -> SimulationEngine {
        SimulationEngine::new(config, Arc::new(MemoryStore::new()), Arc::new(LogSink::new()))
            .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_is_cooperative() {
        let mut config = SimulationConfig::new(dec!(100000), vec!["AAPL".to_string()]);
        config.tick_interval_secs = 1;

        let bars: Vec<PriceBar> = (0..100).map(|i| bar(i, dec!(100))).collect();
        let feed = Arc::new(ReplayFeed::new(bars));

        let handle = engine(config).start_live(feed).unwrap();

        // 몇 틱 진행 후 정지
        tokio::time::sleep(std::time::Duration::from_secs(3)).await;
        handle.stop();

        let state = handle.join().await.unwrap();
        assert_eq!(state, EngineState::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drained_feed_audits_missed_bars() {
        let mut config = SimulationConfig::new(dec!(100000), vec!["AAPL".to_string()]);
        config.tick_interval_secs = 1;

        // 바 2개짜리 피드: 소진 후에는 None이 이어져 누락 감사만 쌓임
        let feed = Arc::new(ReplayFeed::new(vec![bar(0, dec!(100)), bar(1, dec!(100))]));

        let handle = engine(config).start_live(feed).unwrap();
        tokio::time::sleep(std::time::Duration::from_secs(5)).await;
        handle.stop();

        let state = handle.join().await.unwrap();
        assert_eq!(state, EngineState::Stopped);
    }

    struct FailingFeed;

    #[async_trait::async_trait]
    impl MarketDataFeed for FailingFeed {
        async fn get_historical_bars(
            &self,
            _symbol: &str,
            _start: DateTime<Utc>,
            _end: DateTime<Utc>,
        ) -> Result<Vec<PriceBar>, FeedError> {
            Err(FeedError::Exhausted("down".to_string()))
        }

        async fn get_latest_bar(&self, _symbol: &str) -> Result<Option<PriceBar>, FeedError> {
            Err(FeedError::Exhausted("down".to_string()))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_feed_faults_engine() {
        let mut config = SimulationConfig::new(dec!(100000), vec!["AAPL".to_string()]);
        config.tick_interval_secs = 1;

        let handle = engine(config).start_live(Arc::new(FailingFeed)).unwrap();

        let result = handle.join().await;
        assert!(matches!(result, Err(SimError::DataFeedUnavailable(_))));
    }

    /// 평가 도중 태스크를 중단시키는 전략.
    struct CrashingStrategy;

    #[async_trait::async_trait]
    impl sim_strategy::Strategy for CrashingStrategy {
        fn kind(&self) -> sim_core::StrategyKind {
            sim_core::StrategyKind::MeanReversion
        }

        fn warmup_bars(&self) -> usize {
            1
        }

        fn annotate(
            &self,
            _bars: &[PriceBar],
        ) -> SimResult<Vec<sim_strategy::indicators::AnnotatedBar>> {
            panic!("전략 내부 결함");
        }

        async fn generate_signal(
            &self,
            _annotated: &[sim_strategy::indicators::AnnotatedBar],
        ) -> SimResult<sim_core::Signal> {
            Ok(sim_core::Signal::Hold)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_tick_failure_faults_engine() {
        let mut config = SimulationConfig::new(dec!(100000), vec!["AAPL".to_string()]);
        config.tick_interval_secs = 1;

        let store = Arc::new(MemoryStore::new());
        let mut eng =
            SimulationEngine::new(config, store.clone(), Arc::new(LogSink::new())).unwrap();

        // 틱 평가가 태스크 패닉으로 실패하는 에이전트로 교체
        let agent = crate::agent::TradingAgent::new(
            "agent-0",
            Box::new(CrashingStrategy),
            sim_risk::RiskManager::new(sim_risk::RiskConfig::default()),
            dec!(100000),
            dec!(0.1),
            dec!(0.001),
        );
        eng.agents_mut().clear();
        eng.agents_mut().push(agent);

        let feed = Arc::new(ReplayFeed::new(vec![bar(0, dec!(100))]));
        let handle = eng.start_live(feed).unwrap();

        let result = handle.join().await;
        assert!(matches!(result, Err(SimError::Engine(_))));

        // Faulted 전이가 감사 이벤트로 기록됨
        let events = store.load("engine").await.unwrap();
        assert!(events.iter().any(|e| matches!(
            e,
            SimEvent::Audit(a) if a.kind == AuditKind::EngineFaulted
        )));
    }
}

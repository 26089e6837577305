//! 시뮬레이션 엔진.
//!
//! 엔진은 에이전트 수명주기를 단독 소유합니다. 백테스트는 단일
//! 시뮬레이션 시계로 과거 바를 재생합니다: 바를 타임스탬프별로 묶어
//! 엄격한 오름차순으로 진행하고, 틱마다 에이전트당 태스크 하나를
//! 띄운 뒤 순서대로 join하여 시계가 넘어가기 전에 모든 에이전트가
//! 완료되도록 합니다. 에이전트들은 서로소 원장을 소유하므로 이 병렬
//! 평가는 결정적입니다.

use crate::agent::TradingAgent;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sim_core::{
    AuditKind, Fill, PerformanceSnapshot, PriceBar, SimError, SimEvent, SimResult,
    SimulationConfig,
};
use sim_data::{EventStore, NewsSentiment, SnapshotSink};
use sim_portfolio::{compute_metrics, PortfolioMetrics};
use sim_risk::{RiskConfig, RiskManager};
use sim_strategy::build_strategy;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{error, info, warn};

/// 엔진 수명주기 상태.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineState {
    /// 생성 직후
    Idle,
    /// 시뮬레이션 진행 중
    Running,
    /// 정상 종료
    Stopped,
    /// 피드 장애 등으로 중단
    Faulted,
}

impl std::fmt::Display for EngineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineState::Idle => write!(f, "idle"),
            EngineState::Running => write!(f, "running"),
            EngineState::Stopped => write!(f, "stopped"),
            EngineState::Faulted => write!(f, "faulted"),
        }
    }
}

/// 에이전트별 백테스트 결과.
#[derive(Debug, Clone, Serialize)]
pub struct AgentReport {
    /// 성과 지표
    pub metrics: PortfolioMetrics,
    /// 최종 총자산
    pub final_value: Decimal,
    /// 누적 실현 손익
    pub realized_pnl: Decimal,
    /// 체결 목록
    pub fills: Vec<Fill>,
    /// 스냅샷 이력
    pub snapshots: Vec<PerformanceSnapshot>,
    /// 정지 여부
    pub halted: bool,
}

/// 백테스트 실행 결과.
#[derive(Debug, Clone, Serialize)]
pub struct BacktestReport {
    /// 에이전트별 결과 (결정적 순회)
    pub agents: BTreeMap<String, AgentReport>,
    /// 감사 이벤트 종류별 건수
    pub audit_counts: BTreeMap<String, usize>,
    /// 기간 시작
    pub start_time: DateTime<Utc>,
    /// 기간 종료
    pub end_time: DateTime<Utc>,
    /// 데이터 포인트 수 (바 개수)
    pub data_points: usize,
}

impl BacktestReport {
    /// 요약 문자열 반환.
    pub fn summary(&self) -> String {
        let mut out = format!(
            "백테스트 결과 요약\n\
             ═══════════════════════════════════════\n\
             기간: {} → {}\n\
             데이터 포인트: {}\n",
            self.start_time.format("%Y-%m-%d %H:%M"),
            self.end_time.format("%Y-%m-%d %H:%M"),
            self.data_points,
        );

        for (agent_id, report) in &self.agents {
            out.push_str(&format!(
                "───────────────────────────────────────\n\
                 에이전트: {}{}\n\
                 최종 자산: {:.2}\n\
                 실현 손익: {:.2}\n\
                 총 수익률: {:.2}%\n\
                 최대 낙폭: {:.2}%\n\
                 샤프 비율: {:.2}\n\
                 체결 수: {}\n",
                agent_id,
                if report.halted { " (정지됨)" } else { "" },
                report.final_value,
                report.realized_pnl,
                report.metrics.total_return_pct,
                report.metrics.max_drawdown_pct,
                report.metrics.sharpe_ratio,
                report.fills.len(),
            ));
        }

        for (kind, count) in &self.audit_counts {
            out.push_str(&format!("감사[{kind}]: {count}\n"));
        }
        out.push_str("═══════════════════════════════════════");
        out
    }
}

/// 에이전트 수명주기를 소유하는 시뮬레이션 엔진.
pub struct SimulationEngine {
    config: SimulationConfig,
    state: EngineState,
    agents: Vec<TradingAgent>,
    store: Arc<dyn EventStore>,
    sink: Arc<dyn SnapshotSink>,
    audit_counts: BTreeMap<String, usize>,
}

impl SimulationEngine {
    /// 설정으로 엔진과 에이전트들을 생성합니다.
    pub fn new(
        config: SimulationConfig,
        store: Arc<dyn EventStore>,
        sink: Arc<dyn SnapshotSink>,
    ) -> SimResult<Self> {
        Self::with_sentiment(config, store, sink, None)
    }

    /// 감성 공급자를 포함해 엔진을 생성합니다.
    ///
    /// 각 에이전트는 독립 전략 인스턴스를 받습니다. 재현성을 위해 ML
    /// 전략의 시드는 `seed + 에이전트 인덱스`로 파생됩니다.
    pub fn with_sentiment(
        config: SimulationConfig,
        store: Arc<dyn EventStore>,
        sink: Arc<dyn SnapshotSink>,
        sentiment: Option<Arc<dyn NewsSentiment>>,
    ) -> SimResult<Self> {
        config.validate()?;

        let risk_config = RiskConfig::from(&config);
        let mut agents = Vec::with_capacity(config.agents);
        for index in 0..config.agents {
            let seed = config.seed.map(|s| s + index as u64);
            let strategy = build_strategy(
                config.strategy,
                &config.strategy_params,
                seed,
                sentiment.clone(),
            )?;
            agents.push(TradingAgent::new(
                format!("agent-{index}"),
                strategy,
                RiskManager::new(risk_config.clone()),
                config.initial_cash,
                config.max_position_size,
                config.commission_rate,
            ));
        }

        Ok(Self {
            config,
            state: EngineState::Idle,
            agents,
            store,
            sink,
            audit_counts: BTreeMap::new(),
        })
    }

    /// 현재 엔진 상태.
    pub fn state(&self) -> EngineState {
        self.state
    }

    /// 설정 (읽기 전용).
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub(crate) fn transition(&mut self, to: EngineState) -> SimResult<()> {
        let valid = matches!(
            (self.state, to),
            (EngineState::Idle, EngineState::Running)
                | (EngineState::Running, EngineState::Stopped)
                | (EngineState::Running, EngineState::Faulted)
        );
        if !valid {
            return Err(SimError::Engine(format!(
                "잘못된 상태 전이: {} → {to}",
                self.state
            )));
        }
        info!(from = %self.state, to = %to, "엔진 상태 전이");
        self.state = to;
        Ok(())
    }

    /// 과거 바 시퀀스로 백테스트를 실행합니다.
    ///
    /// 바는 타임스탬프 기준 엄격한 오름차순으로 묶여 재생됩니다.
    /// 같은 입력과 설정에 대해 결과는 바이트 단위로 동일합니다.
    pub async fn run_backtest(mut self, bars: Vec<PriceBar>) -> SimResult<BacktestReport> {
        if bars.is_empty() {
            return Err(SimError::Engine("백테스트 바 데이터가 없습니다".to_string()));
        }

        // 틱 = 같은 타임스탬프의 바 묶음, BTreeMap으로 오름차순 보장
        let mut ticks: BTreeMap<DateTime<Utc>, BTreeMap<String, PriceBar>> = BTreeMap::new();
        let data_points = bars.len();
        for bar in bars {
            let tick = ticks.entry(bar.timestamp).or_default();
            if tick.insert(bar.symbol.clone(), bar).is_some() {
                return Err(SimError::Engine(
                    "같은 타임스탬프에 같은 심볼의 바가 중복되었습니다".to_string(),
                ));
            }
        }

        let start_time = ticks
            .keys()
            .next()
            .copied()
            .ok_or_else(|| SimError::Engine("백테스트 틱이 없습니다".to_string()))?;
        let end_time = ticks.keys().next_back().copied().unwrap_or(start_time);

        self.transition(EngineState::Running)?;
        info!(
            ticks = ticks.len(),
            data_points,
            agents = self.agents.len(),
            "백테스트 시작"
        );

        for (timestamp, tick_bars) in ticks {
            self.run_tick(Arc::new(tick_bars), timestamp).await?;
        }

        self.transition(EngineState::Stopped)?;
        Ok(self.into_report(start_time, end_time, data_points))
    }

    /// 한 틱을 실행합니다: 에이전트당 태스크 생성 후 순서대로 join.
    pub(crate) async fn run_tick(
        &mut self,
        tick_bars: Arc<BTreeMap<String, PriceBar>>,
        timestamp: DateTime<Utc>,
    ) -> SimResult<()> {
        let mut handles = Vec::with_capacity(self.agents.len());
        for mut agent in self.agents.drain(..) {
            let bars = Arc::clone(&tick_bars);
            handles.push(tokio::spawn(async move {
                let events = agent.on_tick(&bars, timestamp).await;
                (agent, events)
            }));
        }

        // 제출 순서대로 join하여 에이전트 순서와 이벤트 순서를 보존
        for joined in futures::future::join_all(handles).await {
            let (agent, events) =
                joined.map_err(|e| SimError::Engine(format!("에이전트 태스크 join 실패: {e}")))?;
            self.agents.push(agent);
            for event in events {
                self.emit(&event).await;
            }
        }
        Ok(())
    }

    /// 이벤트를 저장소와 sink로 내보냅니다. 영속성 실패는 흐름을 바꾸지
    /// 않고 로깅만 합니다.
    pub(crate) async fn emit(&mut self, event: &SimEvent) {
        if let SimEvent::Audit(audit) = event {
            *self
                .audit_counts
                .entry(audit.kind.to_string())
                .or_insert(0) += 1;
            warn!(
                kind = %audit.kind,
                agent_id = %audit.agent_id,
                reason = %audit.reason,
                "감사 이벤트"
            );
        }

        if let Err(err) = self.store.append(event).await {
            error!(error = %err, "이벤트 저장 실패");
        }

        match event {
            SimEvent::Fill(fill) => self.sink.on_fill(fill).await,
            SimEvent::Snapshot(snapshot) => self.sink.on_snapshot(snapshot).await,
            SimEvent::Audit(_) => {}
        }
    }

    pub(crate) fn into_report(
        self,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        data_points: usize,
    ) -> BacktestReport {
        let mut agents = BTreeMap::new();

        for agent in &self.agents {
            // 최종 평가는 각 에이전트의 마지막 스냅샷 가치 기준
            let final_value = agent
                .snapshots()
                .last()
                .map(|s| s.total_value)
                .unwrap_or(agent.ledger().state().cash);

            agents.insert(
                agent.id().to_string(),
                AgentReport {
                    metrics: compute_metrics(agent.snapshots()),
                    final_value,
                    realized_pnl: agent.ledger().realized_pnl(),
                    fills: agent.ledger().state().trade_history.clone(),
                    snapshots: agent.snapshots().to_vec(),
                    halted: agent.is_halted(),
                },
            );
        }

        BacktestReport {
            agents,
            audit_counts: self.audit_counts,
            start_time,
            end_time,
            data_points,
        }
    }

    pub(crate) fn agents_mut(&mut self) -> &mut Vec<TradingAgent> {
        &mut self.agents
    }

    pub(crate) fn record_engine_audit(&mut self, kind: AuditKind, count: usize) {
        *self.audit_counts.entry(kind.to_string()).or_insert(0) += count;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use sim_data::{LogSink, MemoryStore};

    fn config() -> SimulationConfig {
        SimulationConfig::new(dec!(100000), vec!["AAPL".to_string()])
    }

    fn engine(config: SimulationConfig) -> SimulationEngine {
        SimulationEngine::new(config, Arc::new(MemoryStore::new()), Arc::new(LogSink::new()))
            .unwrap()
    }

    #[test]
    fn test_engine_starts_idle() {
        let engine = engine(config());
        assert_eq!(engine.state(), EngineState::Idle);
    }

    #[test]
    fn test_invalid_transition_rejected() {
        let mut engine = engine(config());
        assert!(engine.transition(EngineState::Stopped).is_err());
        assert!(engine.transition(EngineState::Running).is_ok());
        assert!(engine.transition(EngineState::Running).is_err());
        assert!(engine.transition(EngineState::Stopped).is_ok());
    }

    #[tokio::test]
    async fn test_empty_bars_rejected() {
        let engine = engine(config());
        assert!(engine.run_backtest(Vec::new()).await.is_err());
    }

    #[tokio::test]
    async fn test_duplicate_bar_rejected() {
        let engine = engine(config());
        let timestamp = Utc::now();
        let bar = PriceBar {
            symbol: "AAPL".to_string(),
            timestamp,
            open: dec!(100),
            high: dec!(101),
            low: dec!(99),
            close: dec!(100),
            volume: dec!(1000),
        };
        let result = engine.run_backtest(vec![bar.clone(), bar]).await;
        assert!(result.is_err());
    }
}

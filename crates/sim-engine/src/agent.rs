//! 트레이딩 에이전트.
//!
//! 에이전트는 전략, 리스크 관리자, 원장, 심볼별 바 윈도우를 묶습니다.
//! 틱마다 심볼별로 annotate → 신호 → 주문 → 검증 → 체결 순서의 상태
//! 기계를 한 바퀴 돌고, 틱 끝에 성과 스냅샷을 남깁니다.
//!
//! 원장 불변식 위반(`InsufficientFunds` 등)이 발생한 에이전트는
//! 정지되며, 다른 에이전트는 계속 진행합니다.

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use sim_core::{
    AgentId, AuditEvent, AuditKind, Fill, Order, PerformanceSnapshot, PriceBar, Side, SimEvent,
    SimResult,
};
use sim_portfolio::PortfolioLedger;
use sim_risk::{RiskManager, RiskVerdict};
use sim_strategy::Strategy;
use std::collections::{BTreeMap, VecDeque};
use tracing::{info, warn};

/// 주문 수량 소수 자릿수.
const QUANTITY_SCALE: u32 = 4;

/// 전략/리스크/원장을 묶는 시뮬레이션 참여자.
pub struct TradingAgent {
    id: AgentId,
    strategy: Box<dyn Strategy>,
    risk: RiskManager,
    ledger: PortfolioLedger,
    /// 심볼별 바 윈도우 (결정적 순회)
    windows: BTreeMap<String, VecDeque<PriceBar>>,
    snapshots: Vec<PerformanceSnapshot>,
    max_position_size: Decimal,
    commission_rate: Decimal,
    window_capacity: usize,
    halted: bool,
}

impl TradingAgent {
    /// 새 에이전트를 생성합니다.
    pub fn new(
        id: impl Into<AgentId>,
        strategy: Box<dyn Strategy>,
        risk: RiskManager,
        initial_cash: Decimal,
        max_position_size: Decimal,
        commission_rate: Decimal,
    ) -> Self {
        let id = id.into();
        // 윈도우는 전략 warmup의 4배까지 유지
        let window_capacity = strategy.warmup_bars() * 4;
        Self {
            ledger: PortfolioLedger::new(id.clone(), initial_cash),
            id,
            strategy,
            risk,
            windows: BTreeMap::new(),
            snapshots: Vec::new(),
            max_position_size,
            commission_rate,
            window_capacity,
            halted: false,
        }
    }

    /// 에이전트 ID.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// 정지 여부.
    pub fn is_halted(&self) -> bool {
        self.halted
    }

    /// 스냅샷 이력.
    pub fn snapshots(&self) -> &[PerformanceSnapshot] {
        &self.snapshots
    }

    /// 원장 (읽기 전용).
    pub fn ledger(&self) -> &PortfolioLedger {
        &self.ledger
    }

    /// 바를 심볼 윈도우에 추가합니다. 용량 초과 시 오래된 바를 버립니다.
    pub fn on_bar(&mut self, bar: PriceBar) {
        let window = self.windows.entry(bar.symbol.clone()).or_default();
        window.push_back(bar);
        while window.len() > self.window_capacity {
            window.pop_front();
        }
    }

    /// 윈도우의 마지막 종가로 현재가 맵을 구성합니다.
    fn current_prices(&self) -> BTreeMap<String, Decimal> {
        self.windows
            .iter()
            .filter_map(|(symbol, window)| {
                window.back().map(|bar| (symbol.clone(), bar.close))
            })
            .collect()
    }

    /// 한 틱을 처리합니다: 새 바 수집 → 심볼별 의사결정 → 스냅샷.
    ///
    /// 반환된 이벤트(체결/스냅샷/감사)는 엔진이 저장소와 sink로
    /// 내보냅니다. 정지된 에이전트는 아무 것도 하지 않습니다.
    pub async fn on_tick(
        &mut self,
        bars: &BTreeMap<String, PriceBar>,
        timestamp: DateTime<Utc>,
    ) -> Vec<SimEvent> {
        if self.halted {
            return Vec::new();
        }

        let mut events = Vec::new();
        for bar in bars.values() {
            self.on_bar(bar.clone());
        }

        // bars에 포함된 심볼만 이번 틱에 평가
        let symbols: Vec<String> = bars.keys().cloned().collect();
        for symbol in symbols {
            match self.decide(&symbol, timestamp).await {
                Ok(mut symbol_events) => events.append(&mut symbol_events),
                Err(err) if err.is_tick_local() => {
                    // 이력 부족은 감사 후 다음 심볼 진행
                    events.push(SimEvent::Audit(AuditEvent::new(
                        AuditKind::InsufficientHistory,
                        self.id.clone(),
                        Some(symbol),
                        timestamp,
                        err.to_string(),
                    )));
                }
                Err(err) => {
                    // 원장 불변식 위반 또는 전략 내부 오류: 에이전트 정지
                    warn!(agent_id = %self.id, error = %err, "에이전트 정지");
                    self.halted = true;
                    events.push(SimEvent::Audit(AuditEvent::new(
                        AuditKind::AgentHalted,
                        self.id.clone(),
                        Some(symbol),
                        timestamp,
                        err.to_string(),
                    )));
                    break;
                }
            }
        }

        let snapshot = self.ledger.snapshot(timestamp, &self.current_prices());
        self.snapshots.push(snapshot.clone());
        events.push(SimEvent::Snapshot(snapshot));
        events
    }

    /// 단일 심볼에 대한 의사결정: annotate → 신호 → 주문 → 검증 → 체결.
    async fn decide(&mut self, symbol: &str, timestamp: DateTime<Utc>) -> SimResult<Vec<SimEvent>> {
        let window = match self.windows.get(symbol) {
            Some(w) => w,
            None => return Ok(Vec::new()),
        };
        let bars: Vec<PriceBar> = window.iter().cloned().collect();

        let annotated = self.strategy.annotate(&bars)?;
        let signal = self.strategy.generate_signal(&annotated).await?;

        let side = match signal.side() {
            Some(side) => side,
            None => return Ok(Vec::new()),
        };

        let prices = self.current_prices();
        let price = match prices.get(symbol) {
            Some(p) if *p > dec!(0) => *p,
            _ => return Ok(Vec::new()),
        };

        let quantity = self.size_order(symbol, side, price, &prices);
        if quantity <= dec!(0) {
            return Ok(Vec::new());
        }

        let order = Order::new(self.id.clone(), symbol, side, quantity, price, timestamp);
        match self
            .risk
            .validate(&order, self.ledger.state(), &self.snapshots, &prices)
        {
            RiskVerdict::Approved => {
                let fill = Fill::from_order(&order, self.commission_rate);
                self.ledger.apply_fill(&fill)?;
                info!(
                    agent_id = %self.id,
                    symbol = %symbol,
                    side = %side,
                    quantity = %quantity,
                    price = %price,
                    "주문 체결"
                );
                Ok(vec![SimEvent::Fill(fill)])
            }
            RiskVerdict::Rejected { reason } => {
                info!(agent_id = %self.id, symbol = %symbol, reason = %reason, "주문 거부");
                Ok(vec![SimEvent::Audit(AuditEvent::new(
                    AuditKind::RiskRejected,
                    self.id.clone(),
                    Some(symbol.to_string()),
                    timestamp,
                    reason,
                ))])
            }
        }
    }

    /// 주문 수량을 결정합니다.
    ///
    /// 매수: 포지션 한도 금액 / 현재가 (내림 양자화).
    /// 매도: 보유량과 한도 수량 중 작은 값.
    fn size_order(
        &self,
        symbol: &str,
        side: Side,
        price: Decimal,
        prices: &BTreeMap<String, Decimal>,
    ) -> Decimal {
        let total_value = self.ledger.total_value(prices);
        let cap_quantity = (self.max_position_size * total_value / price)
            .round_dp_with_strategy(QUANTITY_SCALE, RoundingStrategy::ToZero);

        match side {
            Side::Buy => cap_quantity,
            Side::Sell => self.ledger.state().position(symbol).min(cap_quantity),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use sim_core::StrategyKind;
    use sim_risk::RiskConfig;
    use sim_strategy::build_strategy;

    fn bar(symbol: &str, minute: i64, close: Decimal) -> PriceBar {
        PriceBar {
            symbol: symbol.to_string(),
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap()
                + chrono::Duration::minutes(minute),
            open: close,
            high: close + dec!(1),
            low: close - dec!(1),
            close,
            volume: dec!(1000),
        }
    }

    fn agent() -> TradingAgent {
        let strategy =
            build_strategy(StrategyKind::MeanReversion, &serde_json::json!({}), None, None)
                .unwrap();
        TradingAgent::new(
            "agent-0",
            strategy,
            RiskManager::new(RiskConfig::default()),
            dec!(100000),
            dec!(0.1),
            dec!(0.001),
        )
    }

    #[tokio::test]
    async fn test_insufficient_history_audits_and_continues() {
        let mut agent = agent();
        let bars = BTreeMap::from([("AAPL".to_string(), bar("AAPL", 0, dec!(100)))]);
        let timestamp = bars["AAPL"].timestamp;

        let events = agent.on_tick(&bars, timestamp).await;

        // 이력 부족 감사 + 스냅샷, 체결 없음
        assert_eq!(events.len(), 2);
        assert!(matches!(
            &events[0],
            SimEvent::Audit(a) if a.kind == AuditKind::InsufficientHistory
        ));
        assert!(matches!(&events[1], SimEvent::Snapshot(_)));
        assert!(!agent.is_halted());
    }

    #[tokio::test]
    async fn test_window_is_bounded() {
        let mut agent = agent();
        for i in 0..500 {
            agent.on_bar(bar("AAPL", i, dec!(100)));
        }
        assert_eq!(agent.windows["AAPL"].len(), agent.window_capacity);
    }

    #[tokio::test]
    async fn test_flat_prices_hold_no_orders() {
        let mut agent = agent();
        let mut timestamp = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();

        for i in 0..30 {
            let b = bar("AAPL", i, dec!(100));
            timestamp = b.timestamp;
            let bars = BTreeMap::from([("AAPL".to_string(), b)]);
            let events = agent.on_tick(&bars, timestamp).await;
            // 체결은 한 번도 없어야 함
            assert!(!events.iter().any(|e| matches!(e, SimEvent::Fill(_))));
        }

        assert_eq!(agent.ledger().state().cash, dec!(100000));
        assert_eq!(agent.snapshots().len(), 30);
    }
}

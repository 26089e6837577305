//! Strategy trait 정의.

use crate::indicators::AnnotatedBar;
use async_trait::async_trait;
use sim_core::{PriceBar, Signal, SimResult, StrategyKind};

/// 트레이딩 전략 구현을 위한 Strategy trait.
///
/// 전략은 바 시계열에 지표를 주석하고, 가장 최근 바에 대해서만 신호를
/// 평가합니다. 주문 수량 결정과 리스크 검증은 호출자(에이전트)의
/// 책임입니다.
#[async_trait]
pub trait Strategy: Send + Sync {
    /// 전략 종류 반환.
    fn kind(&self) -> StrategyKind;

    /// 신호 생성에 필요한 최소 바 수.
    fn warmup_bars(&self) -> usize;

    /// 바 시계열에 지표를 주석합니다.
    ///
    /// 바 수가 lookback 미만이면 `SimError::InsufficientHistory`.
    fn annotate(&self, bars: &[PriceBar]) -> SimResult<Vec<AnnotatedBar>>;

    /// 가장 최근 주석 바에 대해 신호를 평가합니다.
    async fn generate_signal(&self, annotated: &[AnnotatedBar]) -> SimResult<Signal>;
}

//! 포트폴리오 원장 크레이트.
//!
//! 검증된 체결만 소비하는 `PortfolioLedger`와, 스냅샷 이력에 대한 순수
//! 성과 지표 계산(`compute_metrics`)을 제공합니다. 원장 상태는 체결
//! 시퀀스로부터 언제든 동일하게 재구성할 수 있습니다.

pub mod ledger;
pub mod metrics;

pub use ledger::PortfolioLedger;
pub use metrics::{compute_metrics, PortfolioMetrics, TRADING_DAYS_PER_YEAR};

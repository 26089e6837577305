//! 리스크 관리 크레이트.
//!
//! 모든 주문은 체결 전에 `RiskManager::validate`를 통과해야 합니다.
//! 검증은 에러를 내지 않으며, 승인/거부 판정만 반환합니다. 거부된
//! 주문은 재시도 없이 폐기되고 감사 로그에 남습니다.

pub mod config;
pub mod manager;

pub use config::RiskConfig;
pub use manager::{RiskManager, RiskVerdict};

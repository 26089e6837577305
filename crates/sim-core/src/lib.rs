//! # Sim Core
//!
//! 멀티 에이전트 트레이딩 시뮬레이션의 핵심 도메인 모델 및 타입을 제공합니다.
//!
//! 이 크레이트는 시뮬레이션 시스템 전반에서 사용되는 기본 타입을 제공합니다:
//! - 가격 바 및 시장 데이터 구조체
//! - 신호 / 주문 / 체결 타입
//! - 포트폴리오 상태 및 성과 스냅샷
//! - 감사 이벤트 기록
//! - 에러 분류 체계
//! - 설정 관리
//! - 로깅 인프라

pub mod config;
pub mod domain;
pub mod error;
pub mod logging;
pub mod types;

pub use config::*;
pub use domain::*;
pub use error::*;
pub use logging::*;
pub use types::*;

//! 시뮬레이션 엔진 크레이트.
//!
//! 전략/리스크/원장을 묶는 `TradingAgent`와, 에이전트 수명주기를
//! 단독 소유하는 `SimulationEngine`을 제공합니다. 백테스트 모드는
//! 과거 바를 단일 시뮬레이션 시계로 재생하고, 라이브 모드는 피드를
//! 주기적으로 폴링합니다. 같은 입력과 설정에 대해 백테스트 출력은
//! 바이트 단위로 동일합니다.

pub mod agent;
pub mod engine;
pub mod live;

pub use agent::TradingAgent;
pub use engine::{AgentReport, BacktestReport, EngineState, SimulationEngine};
pub use live::LiveHandle;

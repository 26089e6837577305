//! 시뮬레이션 도메인 모델.

mod audit;
mod bar;
mod order;
mod portfolio;
mod signal;

pub use audit::*;
pub use bar::*;
pub use order::*;
pub use portfolio::*;
pub use signal::*;

//! CLI 명령어 모듈.

pub mod backtest;
pub mod data;
pub mod live;

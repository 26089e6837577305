//! 백테스트 명령어.
//!
//! TOML 설정과 CSV 바 데이터로 백테스트를 실행하고 요약을 출력합니다.

use anyhow::{Context, Result};
use sim_core::SimulationConfig;
use sim_data::{LogSink, MemoryStore};
use sim_engine::SimulationEngine;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use crate::commands::data::load_bars_csv;

/// 백테스트를 실행합니다.
pub async fn run(config_path: &str, data_path: &str, output: Option<&str>) -> Result<()> {
    let config = SimulationConfig::load(config_path)
        .with_context(|| format!("설정 로드 실패: {config_path}"))?;
    let bars = load_bars_csv(Path::new(data_path))?;

    info!(
        bars = bars.len(),
        agents = config.agents,
        strategy = %config.strategy,
        "백테스트 시작"
    );

    let engine = SimulationEngine::new(
        config,
        Arc::new(MemoryStore::new()),
        Arc::new(LogSink::new()),
    )?;
    let report = engine.run_backtest(bars).await?;

    println!("{}", report.summary());

    if let Some(output_path) = output {
        let json = serde_json::to_string_pretty(&report)?;
        std::fs::write(output_path, json)
            .with_context(|| format!("결과 저장 실패: {output_path}"))?;
        info!(path = output_path, "결과 JSON 저장");
    }

    Ok(())
}

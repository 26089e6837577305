//! 라이브 페이퍼 루프 명령어.
//!
//! CSV 바를 재생 피드로 삼아 라이브 폴링 루프를 돌립니다. Ctrl-C가
//! 협조적 정지를 트리거하며, 진행 중인 틱이 끝난 뒤 종료합니다.
//! 이벤트는 JSONL 파일에 append됩니다.

use anyhow::{Context, Result};
use sim_core::SimulationConfig;
use sim_data::{JsonlStore, LogSink, ReplayFeed, RetryingFeed};
use sim_engine::SimulationEngine;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use crate::commands::data::load_bars_csv;

/// 라이브 페이퍼 루프를 실행합니다.
pub async fn run(config_path: &str, data_path: &str, events_path: &str) -> Result<()> {
    let config = SimulationConfig::load(config_path)
        .with_context(|| format!("설정 로드 실패: {config_path}"))?;
    let bars = load_bars_csv(Path::new(data_path))?;

    let store = Arc::new(
        JsonlStore::open(events_path)
            .await
            .with_context(|| format!("이벤트 로그 열기 실패: {events_path}"))?,
    );
    let feed = Arc::new(RetryingFeed::with_default_policy(ReplayFeed::new(bars)));

    info!(
        interval_secs = config.tick_interval().as_secs(),
        events = events_path,
        "라이브 루프 시작"
    );

    let engine = SimulationEngine::new(config, store, Arc::new(LogSink::new()))?;
    let handle = engine.start_live(feed)?;

    // Ctrl-C가 협조적 정지를 트리거, 루프는 현재 틱을 끝내고 종료
    let stopper = handle.stop_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("정지 요청, 현재 틱 완료 후 종료");
            let _ = stopper.send(true);
        }
    });

    let state = handle.join().await?;
    info!(state = %state, "라이브 루프 종료");
    Ok(())
}

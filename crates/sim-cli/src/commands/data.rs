//! 바 데이터 CSV 로딩.
//!
//! 형식: `symbol,timestamp,open,high,low,close,volume` (RFC 3339
//! 타임스탬프). 첫 줄이 헤더면 건너뜁니다.

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sim_core::PriceBar;
use std::path::Path;
use std::str::FromStr;

/// CSV 파일에서 바 목록을 읽습니다.
pub fn load_bars_csv(path: &Path) -> Result<Vec<PriceBar>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("CSV 파일 읽기 실패: {}", path.display()))?;

    let mut bars = Vec::new();
    for (line_num, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        // 헤더 스킵
        if line_num == 0 && line.starts_with("symbol") {
            continue;
        }

        bars.push(
            parse_bar_line(line)
                .with_context(|| format!("{}:{} 파싱 실패", path.display(), line_num + 1))?,
        );
    }

    if bars.is_empty() {
        return Err(anyhow!("CSV에 바 데이터가 없습니다: {}", path.display()));
    }
    Ok(bars)
}

fn parse_bar_line(line: &str) -> Result<PriceBar> {
    let parts: Vec<&str> = line.split(',').map(str::trim).collect();
    if parts.len() != 7 {
        return Err(anyhow!("필드 7개 필요, {}개 발견", parts.len()));
    }

    let timestamp: DateTime<Utc> = parts[1]
        .parse()
        .with_context(|| format!("타임스탬프 파싱 실패: {}", parts[1]))?;

    let decimal = |s: &str| -> Result<Decimal> {
        Decimal::from_str(s).map_err(|e| anyhow!("숫자 파싱 실패 '{s}': {e}"))
    };

    Ok(PriceBar {
        symbol: parts[0].to_string(),
        timestamp,
        open: decimal(parts[2])?,
        high: decimal(parts[3])?,
        low: decimal(parts[4])?,
        close: decimal(parts[5])?,
        volume: decimal(parts[6])?,
    })
}

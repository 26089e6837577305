//! 성과 지표 계산.
//!
//! 스냅샷 이력에 대한 순수 함수로 총수익률, 최대 낙폭, 샤프 비율을
//! 계산합니다. 샤프 비율은 스냅샷 간 수익률의 평균/표준편차로부터
//! 연간 거래일 252일 기준으로 연율화합니다.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use sim_core::{decimal_sqrt, PerformanceSnapshot};

/// 연간 거래일 수 (연율화 계산에 사용)
pub const TRADING_DAYS_PER_YEAR: u32 = 252;

/// 포트폴리오 성과 지표.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioMetrics {
    /// 총 수익률 (%)
    pub total_return_pct: Decimal,
    /// 최대 낙폭 (%)
    pub max_drawdown_pct: Decimal,
    /// 연율화 샤프 비율
    pub sharpe_ratio: Decimal,
}

impl PortfolioMetrics {
    /// 0으로 채운 지표 (스냅샷 없음).
    pub fn zero() -> Self {
        Self {
            total_return_pct: Decimal::ZERO,
            max_drawdown_pct: Decimal::ZERO,
            sharpe_ratio: Decimal::ZERO,
        }
    }
}

/// 스냅샷 이력에서 성과 지표를 계산합니다.
///
/// 스냅샷이 2개 미만이면 모든 지표는 0입니다.
pub fn compute_metrics(snapshots: &[PerformanceSnapshot]) -> PortfolioMetrics {
    if snapshots.len() < 2 {
        return PortfolioMetrics::zero();
    }

    let equity_curve: Vec<Decimal> = snapshots.iter().map(|s| s.total_value).collect();
    let first = equity_curve[0];
    let last = equity_curve[equity_curve.len() - 1];

    let total_return_pct = if first > Decimal::ZERO {
        (last - first) / first * dec!(100)
    } else {
        Decimal::ZERO
    };

    let returns: Vec<Decimal> = equity_curve
        .windows(2)
        .map(|w| {
            if w[0] > Decimal::ZERO {
                (w[1] - w[0]) / w[0]
            } else {
                Decimal::ZERO
            }
        })
        .collect();

    PortfolioMetrics {
        total_return_pct,
        max_drawdown_pct: calculate_max_drawdown(&equity_curve),
        sharpe_ratio: calculate_sharpe_ratio(&returns),
    }
}

/// 자산 곡선에서 최대 낙폭(MDD, %)을 계산합니다.
///
/// MDD = (고점 - 저점) / 고점 × 100
pub fn calculate_max_drawdown(equity_curve: &[Decimal]) -> Decimal {
    if equity_curve.is_empty() {
        return Decimal::ZERO;
    }

    let mut max_drawdown = Decimal::ZERO;
    let mut peak = equity_curve[0];

    for &equity in equity_curve {
        if equity > peak {
            peak = equity;
        }

        if peak > Decimal::ZERO {
            let drawdown = (peak - equity) / peak * dec!(100);
            if drawdown > max_drawdown {
                max_drawdown = drawdown;
            }
        }
    }

    max_drawdown
}

/// 기간 수익률 목록에서 연율화 샤프 비율을 계산합니다.
///
/// Sharpe = 평균 수익률 / 표준편차 × √252. 무위험 이자율은 0으로
/// 가정합니다 (시뮬레이션 기준).
pub fn calculate_sharpe_ratio(returns: &[Decimal]) -> Decimal {
    if returns.len() < 2 {
        return Decimal::ZERO;
    }

    let n = Decimal::from(returns.len());
    let mean = returns.iter().copied().sum::<Decimal>() / n;

    // 분산: Σ(ri - mean)² / (n-1)
    let variance = returns
        .iter()
        .map(|r| {
            let diff = *r - mean;
            diff * diff
        })
        .sum::<Decimal>()
        / (n - Decimal::ONE);

    let std_dev = decimal_sqrt(variance);
    if std_dev.is_zero() {
        return Decimal::ZERO;
    }

    let annualization = decimal_sqrt(Decimal::from(TRADING_DAYS_PER_YEAR));
    mean / std_dev * annualization
}

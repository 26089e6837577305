//! 시뮬레이션 시스템의 에러 분류 체계.
//!
//! 에러는 전파 범위에 따라 세 단계로 나뉩니다:
//! - 틱 단위 (해당 심볼의 해당 틱만 건너뜀): `InsufficientHistory`
//! - 에이전트 단위 (해당 에이전트만 정지): `InsufficientFunds`, `InsufficientPosition`
//! - 엔진 단위 (시뮬레이션 전체 중단): `DataFeedUnavailable`
//!
//! 리스크 거부는 에러가 아닌 정상 결과이므로 여기에 없습니다.
//! `AuditEvent`로 기록됩니다.

use rust_decimal::Decimal;
use thiserror::Error;

/// 핵심 시뮬레이션 에러.
#[derive(Debug, Error)]
pub enum SimError {
    /// 지표 계산에 필요한 바 수 미달 (해당 틱 건너뜀)
    #[error("이력 부족: 필요={required}, 보유={available}")]
    InsufficientHistory { required: usize, available: usize },

    /// 현금 잔고 부족 (원장/리스크 불변식 위반, 에이전트 정지)
    #[error("잔고 부족: 필요={required}, 가용={available}")]
    InsufficientFunds {
        required: Decimal,
        available: Decimal,
    },

    /// 보유 수량 부족 (원장/리스크 불변식 위반, 에이전트 정지)
    #[error("포지션 부족: {symbol} 필요={required}, 보유={available}")]
    InsufficientPosition {
        symbol: String,
        required: Decimal,
        available: Decimal,
    },

    /// 수량이 0 이하인 체결 (리스크 불변식 위반, 에이전트 정지)
    #[error("잘못된 체결: {0}")]
    InvalidFill(String),

    /// 데이터 피드 재시도 소진 (엔진 Faulted 전이)
    #[error("데이터 피드 사용 불가: {0}")]
    DataFeedUnavailable(String),

    /// 설정 에러
    #[error("설정 에러: {0}")]
    Config(String),

    /// 전략 실행 에러
    #[error("전략 에러: {0}")]
    Strategy(String),

    /// 영속성 에러
    #[error("영속성 에러: {0}")]
    Persistence(String),

    /// 엔진 상태 전이 에러
    #[error("엔진 에러: {0}")]
    Engine(String),

    /// 직렬화 에러
    #[error("직렬화 에러: {0}")]
    Serialization(String),
}

/// 시뮬레이션 작업을 위한 Result 타입.
pub type SimResult<T> = Result<T, SimError>;

impl SimError {
    /// 해당 틱만 건너뛰면 되는 에러인지 확인합니다.
    pub fn is_tick_local(&self) -> bool {
        matches!(self, SimError::InsufficientHistory { .. })
    }

    /// 에이전트를 정지시켜야 하는 에러인지 확인합니다.
    pub fn is_agent_fatal(&self) -> bool {
        matches!(
            self,
            SimError::InsufficientFunds { .. }
                | SimError::InsufficientPosition { .. }
                | SimError::InvalidFill(_)
        )
    }

    /// 엔진 전체를 중단시켜야 하는 에러인지 확인합니다.
    pub fn is_engine_fatal(&self) -> bool {
        matches!(self, SimError::DataFeedUnavailable(_))
    }
}

impl From<serde_json::Error> for SimError {
    fn from(err: serde_json::Error) -> Self {
        SimError::Serialization(err.to_string())
    }
}

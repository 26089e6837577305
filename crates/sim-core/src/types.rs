//! 시뮬레이션 전반에서 사용되는 공통 타입.

use rust_decimal::Decimal;

/// 금융 정밀도를 위한 가격 타입.
pub type Price = Decimal;

/// 주문 수량을 위한 타입.
pub type Quantity = Decimal;

/// 비율 타입 (0.01 = 1%).
pub type Ratio = Decimal;

/// 에이전트 식별자.
///
/// 백테스트 재현성을 위해 UUID 대신 설정에서 파생된 안정적인
/// 문자열을 사용합니다 (예: "agent-0").
pub type AgentId = String;

/// Decimal 타입의 제곱근을 뉴턴 방법으로 계산합니다.
///
/// # 알고리즘
///
/// 뉴턴-랩슨 방법 사용:
/// 1. 초기 추정값 = value / 2
/// 2. 반복: next = (guess + value/guess) / 2
/// 3. 수렴할 때까지 반복 (최대 50회)
pub fn decimal_sqrt(value: Decimal) -> Decimal {
    if value <= Decimal::ZERO {
        return Decimal::ZERO;
    }

    let mut guess = value / Decimal::TWO;
    let precision = Decimal::new(1, 10); // 0.0000000001

    for _ in 0..50 {
        let next_guess = (guess + value / guess) / Decimal::TWO;
        if (next_guess - guess).abs() < precision {
            return next_guess;
        }
        guess = next_guess;
    }

    guess
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_decimal_sqrt() {
        assert_eq!(decimal_sqrt(dec!(0)), dec!(0));
        let root = decimal_sqrt(dec!(144));
        assert!((root - dec!(12)).abs() < dec!(0.000001));
    }

    #[test]
    fn test_decimal_sqrt_fractional() {
        let root = decimal_sqrt(dec!(0.25));
        assert!((root - dec!(0.5)).abs() < dec!(0.000001));
    }
}

//! 내장 트레이딩 전략.
//!
//! 엔진 계약을 검증하고 사용 예시를 제공하는 기본 전략들입니다:
//!
//! - **SmaCrossover**: 단순 이동평균 골든/데드 크로스 전략. 진입 시
//!   손절/익절 가격을 함께 발행합니다.
//! - **BuyAndHold**: 첫 캔들에 진입 후 보유만 하는 기준(benchmark) 전략.

pub mod buy_hold;
pub mod sma_crossover;

pub use buy_hold::BuyAndHold;
pub use sma_crossover::SmaCrossover;

//! 백테스팅 엔진과 성과 분석.
//!
//! - [`backtest`]: 이벤트 기반 바 루프 오케스트레이션 ([`BacktestEngine`])
//! - [`performance`]: 자산 곡선/거래 기록에서 파생되는 성과 지표와
//!   가중 종합 평가 ([`PerformanceMetrics`], [`PerformanceAnalyzer`])

pub mod backtest;
pub mod performance;

pub use backtest::{
    BacktestConfig, BacktestEngine, BacktestError, BacktestReport, BacktestResult,
    BacktestStatistics,
};
pub use performance::{
    Grade, MonthlyReturn, PerformanceAnalyzer, PerformanceMetrics, PerformanceRating,
};

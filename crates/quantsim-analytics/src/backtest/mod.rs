//! 백테스트 엔진 모듈.

pub mod engine;

pub use engine::{
    BacktestConfig, BacktestEngine, BacktestError, BacktestReport, BacktestResult,
    BacktestStatistics,
};

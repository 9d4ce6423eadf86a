//! 성과 지표와 종합 평가.

pub mod analyzer;
pub mod metrics;

pub use analyzer::{Grade, PerformanceAnalyzer, PerformanceRating};
pub use metrics::{MonthlyReturn, PerformanceMetrics};

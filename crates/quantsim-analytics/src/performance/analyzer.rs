//! 성과 종합 평가.
//!
//! 지표 그룹별 부분 점수를 고정 구간별 선형 보간으로 계산하고,
//! 가중 합산해 0~100 종합 점수와 등급을 냅니다:
//!
//! `수익 × 0.30 + 리스크 × 0.30 + 안정성 × 0.25 + 트레이딩 × 0.15`
//!
//! 같은 지표 입력은 항상 같은 평가를 냅니다. 정성 코멘트도 임계값
//! 기반으로 결정적으로 생성됩니다.

use serde::{Deserialize, Serialize};

use crate::performance::metrics::PerformanceMetrics;

/// 그룹별 가중치.
const WEIGHT_RETURN: f64 = 0.30;
const WEIGHT_RISK: f64 = 0.30;
const WEIGHT_STABILITY: f64 = 0.25;
const WEIGHT_TRADING: f64 = 0.15;

/// 월간 표본이 부족할 때의 안정성 점수 (중립).
const NEUTRAL_STABILITY_SCORE: f64 = 50.0;

/// 종합 등급.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Grade {
    /// 80점 이상
    A,
    /// 60점 이상
    B,
    /// 40점 이상
    C,
    /// 20점 이상
    D,
    /// 20점 미만
    F,
}

impl Grade {
    /// 종합 점수에서 등급을 결정합니다.
    pub fn from_score(score: f64) -> Self {
        if score >= 80.0 {
            Grade::A
        } else if score >= 60.0 {
            Grade::B
        } else if score >= 40.0 {
            Grade::C
        } else if score >= 20.0 {
            Grade::D
        } else {
            Grade::F
        }
    }
}

impl std::fmt::Display for Grade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let grade = match self {
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
            Grade::D => "D",
            Grade::F => "F",
        };
        write!(f, "{grade}")
    }
}

/// 종합 평가 결과.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceRating {
    /// 수익 점수 (0~100)
    pub return_score: f64,
    /// 리스크 점수 (0~100, 낙폭·샤프 50/50 혼합)
    pub risk_score: f64,
    /// 안정성 점수 (0~100, 월간 승률·변동 계수 50/50 혼합)
    pub stability_score: f64,
    /// 트레이딩 점수 (0~100, 승률·프로핏 팩터 50/50 혼합)
    pub trading_score: f64,
    /// 가중 종합 점수 (0~100)
    pub total_score: f64,
    /// 등급
    pub grade: Grade,
    /// 강점
    pub strengths: Vec<String>,
    /// 약점
    pub weaknesses: Vec<String>,
    /// 개선 제안
    pub recommendations: Vec<String>,
}

/// 성과 분석기.
///
/// 상태 없는 순수 계산입니다.
pub struct PerformanceAnalyzer;

impl PerformanceAnalyzer {
    /// 지표를 종합 평가로 변환합니다.
    pub fn analyze(metrics: &PerformanceMetrics) -> PerformanceRating {
        let return_score = score_annualized_return(metrics.annualized_return_pct);

        let risk_score = (score_max_drawdown(metrics.max_drawdown_pct)
            + score_sharpe(metrics.sharpe_ratio))
            / 2.0;

        let stability_score = if metrics.monthly_returns.len() >= 2 {
            (score_monthly_win_rate(metrics.monthly_win_rate_pct)
                + score_monthly_cv(metrics.monthly_return_cv))
                / 2.0
        } else {
            NEUTRAL_STABILITY_SCORE
        };

        let trading_score = if metrics.total_trades > 0 {
            (score_win_rate(metrics.win_rate_pct) + score_profit_factor(metrics.profit_factor))
                / 2.0
        } else {
            0.0
        };

        let total_score = return_score * WEIGHT_RETURN
            + risk_score * WEIGHT_RISK
            + stability_score * WEIGHT_STABILITY
            + trading_score * WEIGHT_TRADING;

        PerformanceRating {
            return_score,
            risk_score,
            stability_score,
            trading_score,
            total_score,
            grade: Grade::from_score(total_score),
            strengths: build_strengths(metrics),
            weaknesses: build_weaknesses(metrics),
            recommendations: build_recommendations(metrics),
        }
    }
}

/// 연율화 수익률 점수.
fn score_annualized_return(annualized_pct: f64) -> f64 {
    let x = annualized_pct;
    if x >= 100.0 {
        100.0
    } else if x >= 50.0 {
        80.0 + (x - 50.0) / 50.0 * 20.0
    } else if x >= 20.0 {
        60.0 + (x - 20.0) / 30.0 * 20.0
    } else if x >= 0.0 {
        40.0 + x / 20.0 * 20.0
    } else if x >= -20.0 {
        20.0 + (x + 20.0) / 20.0 * 20.0
    } else if x >= -50.0 {
        (x + 50.0) / 30.0 * 20.0
    } else {
        0.0
    }
}

/// 최대 낙폭 점수 (낮을수록 좋음).
fn score_max_drawdown(drawdown_pct: f64) -> f64 {
    let x = drawdown_pct;
    if x < 10.0 {
        100.0
    } else if x < 20.0 {
        80.0 + (20.0 - x) / 10.0 * 20.0
    } else if x < 30.0 {
        60.0 + (30.0 - x) / 10.0 * 20.0
    } else if x < 40.0 {
        40.0 + (40.0 - x) / 10.0 * 20.0
    } else if x < 50.0 {
        20.0 + (50.0 - x) / 10.0 * 20.0
    } else if x < 70.0 {
        (70.0 - x) / 20.0 * 20.0
    } else {
        0.0
    }
}

/// 샤프 비율 점수.
fn score_sharpe(sharpe: f64) -> f64 {
    let x = sharpe;
    if x >= 2.0 {
        100.0
    } else if x >= 1.5 {
        80.0 + (x - 1.5) / 0.5 * 20.0
    } else if x >= 1.0 {
        60.0 + (x - 1.0) / 0.5 * 20.0
    } else if x >= 0.5 {
        40.0 + (x - 0.5) / 0.5 * 20.0
    } else if x >= 0.0 {
        20.0 + x / 0.5 * 20.0
    } else {
        0.0
    }
}

/// 승률 점수.
fn score_win_rate(win_rate_pct: f64) -> f64 {
    let x = win_rate_pct;
    if x >= 60.0 {
        100.0
    } else if x >= 50.0 {
        80.0 + (x - 50.0) / 10.0 * 20.0
    } else if x >= 40.0 {
        60.0 + (x - 40.0) / 10.0 * 20.0
    } else if x >= 30.0 {
        40.0 + (x - 30.0) / 10.0 * 20.0
    } else {
        x / 30.0 * 40.0
    }
}

/// 프로핏 팩터 점수.
fn score_profit_factor(profit_factor: f64) -> f64 {
    let x = profit_factor;
    if x >= 3.0 {
        100.0
    } else if x >= 2.0 {
        80.0 + (x - 2.0) * 20.0
    } else if x >= 1.5 {
        60.0 + (x - 1.5) / 0.5 * 20.0
    } else if x >= 1.0 {
        40.0 + (x - 1.0) / 0.5 * 20.0
    } else {
        x * 40.0
    }
}

/// 월간 승률 점수.
fn score_monthly_win_rate(monthly_win_rate_pct: f64) -> f64 {
    let x = monthly_win_rate_pct;
    if x >= 70.0 {
        100.0
    } else if x >= 60.0 {
        80.0 + (x - 60.0) / 10.0 * 20.0
    } else if x >= 50.0 {
        60.0 + (x - 50.0) / 10.0 * 20.0
    } else if x >= 40.0 {
        40.0 + (x - 40.0) / 10.0 * 20.0
    } else {
        x / 40.0 * 40.0
    }
}

/// 월간 수익률 변동 계수 점수 (낮을수록 좋음).
fn score_monthly_cv(cv: f64) -> f64 {
    let x = cv;
    if x <= 0.5 {
        100.0
    } else if x <= 1.0 {
        80.0 + (1.0 - x) / 0.5 * 20.0
    } else if x <= 1.5 {
        60.0 + (1.5 - x) / 0.5 * 20.0
    } else if x <= 2.5 {
        40.0 + (2.5 - x) * 20.0
    } else if x <= 4.0 {
        20.0 + (4.0 - x) / 1.5 * 20.0
    } else {
        0.0
    }
}

fn build_strengths(metrics: &PerformanceMetrics) -> Vec<String> {
    let mut strengths = Vec::new();

    if metrics.annualized_return_pct >= 30.0 {
        strengths.push(format!(
            "연율화 수익률이 {:.1}%로 높습니다",
            metrics.annualized_return_pct
        ));
    }
    if metrics.sharpe_ratio >= 1.5 {
        strengths.push(format!(
            "위험 대비 수익이 우수합니다 (샤프 {:.2})",
            metrics.sharpe_ratio
        ));
    }
    if metrics.max_drawdown_pct < 10.0 && metrics.total_return_pct > 0.0 {
        strengths.push(format!(
            "최대 낙폭이 {:.1}%로 잘 통제되었습니다",
            metrics.max_drawdown_pct
        ));
    }
    if metrics.total_trades > 0 && metrics.win_rate_pct >= 55.0 {
        strengths.push(format!("승률이 {:.1}%로 높습니다", metrics.win_rate_pct));
    }
    if metrics.total_trades > 0 && metrics.profit_factor >= 2.0 {
        strengths.push(format!(
            "프로핏 팩터가 {:.2}로 손익 구조가 좋습니다",
            metrics.profit_factor
        ));
    }

    strengths
}

fn build_weaknesses(metrics: &PerformanceMetrics) -> Vec<String> {
    let mut weaknesses = Vec::new();

    if metrics.annualized_return_pct < 0.0 {
        weaknesses.push(format!(
            "연율화 수익률이 {:.1}%로 마이너스입니다",
            metrics.annualized_return_pct
        ));
    }
    if metrics.max_drawdown_pct >= 30.0 {
        weaknesses.push(format!(
            "최대 낙폭이 {:.1}%로 큽니다",
            metrics.max_drawdown_pct
        ));
    }
    if metrics.sharpe_ratio < 0.5 && metrics.volatility_pct > 0.0 {
        weaknesses.push(format!(
            "위험 대비 수익이 낮습니다 (샤프 {:.2})",
            metrics.sharpe_ratio
        ));
    }
    if metrics.total_trades > 0 && metrics.win_rate_pct < 40.0 {
        weaknesses.push(format!("승률이 {:.1}%로 낮습니다", metrics.win_rate_pct));
    }
    if metrics.total_trades > 0 && metrics.profit_factor > 0.0 && metrics.profit_factor < 1.0 {
        weaknesses.push(format!(
            "프로핏 팩터가 {:.2}로 손실이 수익을 초과합니다",
            metrics.profit_factor
        ));
    }

    weaknesses
}

fn build_recommendations(metrics: &PerformanceMetrics) -> Vec<String> {
    let mut recommendations = Vec::new();

    if metrics.max_drawdown_pct >= 30.0 {
        recommendations
            .push("포지션 크기를 줄이거나 손절 기준을 강화해 낙폭을 관리하세요".to_string());
    }
    if metrics.total_trades > 0 && metrics.total_trades < 10 {
        recommendations.push(format!(
            "거래 표본이 {}건으로 적어 지표의 통계적 신뢰도가 낮습니다",
            metrics.total_trades
        ));
    }
    if metrics.monthly_return_cv > 2.0 {
        recommendations.push("월간 수익률 변동이 커 전략의 일관성 점검이 필요합니다".to_string());
    }
    if metrics.total_trades > 0 && metrics.profit_factor > 0.0 && metrics.profit_factor < 1.0 {
        recommendations.push("손절/익절 비율을 재검토해 손실 거래 관리를 개선하세요".to_string());
    }
    if recommendations.is_empty() {
        recommendations
            .push("현재 설정을 유지하며 더 긴 기간으로 검증을 확장하세요".to_string());
    }

    recommendations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::performance::metrics::MonthlyReturn;

    fn metrics_with(f: impl FnOnce(&mut PerformanceMetrics)) -> PerformanceMetrics {
        let mut metrics = PerformanceMetrics::default();
        f(&mut metrics);
        metrics
    }

    #[test]
    fn test_grade_boundaries() {
        assert_eq!(Grade::from_score(85.0), Grade::A);
        assert_eq!(Grade::from_score(80.0), Grade::A);
        assert_eq!(Grade::from_score(79.9), Grade::B);
        assert_eq!(Grade::from_score(60.0), Grade::B);
        assert_eq!(Grade::from_score(40.0), Grade::C);
        assert_eq!(Grade::from_score(20.0), Grade::D);
        assert_eq!(Grade::from_score(19.9), Grade::F);
    }

    #[test]
    fn test_return_score_breakpoints() {
        assert_eq!(score_annualized_return(150.0), 100.0);
        assert_eq!(score_annualized_return(100.0), 100.0);
        assert_eq!(score_annualized_return(75.0), 90.0);
        assert_eq!(score_annualized_return(50.0), 80.0);
        assert_eq!(score_annualized_return(20.0), 60.0);
        assert_eq!(score_annualized_return(0.0), 40.0);
        assert_eq!(score_annualized_return(-20.0), 20.0);
        assert_eq!(score_annualized_return(-50.0), 0.0);
        assert_eq!(score_annualized_return(-80.0), 0.0);
    }

    #[test]
    fn test_drawdown_score_breakpoints() {
        assert_eq!(score_max_drawdown(0.0), 100.0);
        assert_eq!(score_max_drawdown(9.9), 100.0);
        assert_eq!(score_max_drawdown(15.0), 90.0);
        assert_eq!(score_max_drawdown(25.0), 70.0);
        assert_eq!(score_max_drawdown(45.0), 30.0);
        assert_eq!(score_max_drawdown(60.0), 10.0);
        assert_eq!(score_max_drawdown(80.0), 0.0);
    }

    #[test]
    fn test_sharpe_score_breakpoints() {
        assert_eq!(score_sharpe(2.5), 100.0);
        assert_eq!(score_sharpe(2.0), 100.0);
        assert_eq!(score_sharpe(1.75), 90.0);
        assert_eq!(score_sharpe(1.0), 60.0);
        assert_eq!(score_sharpe(0.25), 30.0);
        assert_eq!(score_sharpe(-1.0), 0.0);
    }

    #[test]
    fn test_trading_score_blend() {
        let metrics = metrics_with(|m| {
            m.total_trades = 20;
            m.win_rate_pct = 60.0; // 100점
            m.profit_factor = 1.0; // 40점
        });
        let rating = PerformanceAnalyzer::analyze(&metrics);
        assert_eq!(rating.trading_score, 70.0);
    }

    #[test]
    fn test_no_trades_zero_trading_score() {
        let metrics = PerformanceMetrics::default();
        let rating = PerformanceAnalyzer::analyze(&metrics);
        assert_eq!(rating.trading_score, 0.0);
    }

    #[test]
    fn test_neutral_stability_without_monthly_sample() {
        let metrics = PerformanceMetrics::default();
        let rating = PerformanceAnalyzer::analyze(&metrics);
        assert_eq!(rating.stability_score, NEUTRAL_STABILITY_SCORE);
    }

    #[test]
    fn test_weighted_total_and_grade() {
        let metrics = metrics_with(|m| {
            m.annualized_return_pct = 100.0; // 수익 100
            m.max_drawdown_pct = 5.0; // 낙폭 100
            m.sharpe_ratio = 2.0; // 샤프 100 → 리스크 100
            m.total_trades = 50;
            m.win_rate_pct = 60.0; // 100
            m.profit_factor = 3.0; // 100 → 트레이딩 100
            m.monthly_win_rate_pct = 80.0; // 100
            m.monthly_return_cv = 0.3; // 100 → 안정성 100
            m.monthly_returns = vec![
                MonthlyReturn {
                    month: "2025-01".to_string(),
                    return_pct: 5.0,
                },
                MonthlyReturn {
                    month: "2025-02".to_string(),
                    return_pct: 6.0,
                },
            ];
        });

        let rating = PerformanceAnalyzer::analyze(&metrics);
        assert_eq!(rating.total_score, 100.0);
        assert_eq!(rating.grade, Grade::A);
        assert!(!rating.strengths.is_empty());
        assert!(rating.weaknesses.is_empty());
    }

    #[test]
    fn test_deterministic_rating() {
        let metrics = metrics_with(|m| {
            m.annualized_return_pct = 35.0;
            m.max_drawdown_pct = 22.0;
            m.sharpe_ratio = 1.2;
            m.total_trades = 30;
            m.win_rate_pct = 48.0;
            m.profit_factor = 1.6;
        });

        let first = PerformanceAnalyzer::analyze(&metrics);
        let second = PerformanceAnalyzer::analyze(&metrics);
        assert_eq!(first.total_score, second.total_score);
        assert_eq!(first.strengths, second.strengths);
        assert_eq!(first.recommendations, second.recommendations);
    }

    #[test]
    fn test_commentary_thresholds() {
        let metrics = metrics_with(|m| {
            m.annualized_return_pct = -15.0;
            m.max_drawdown_pct = 45.0;
            m.volatility_pct = 30.0;
            m.sharpe_ratio = -0.5;
            m.total_trades = 5;
            m.win_rate_pct = 20.0;
            m.profit_factor = 0.6;
        });

        let rating = PerformanceAnalyzer::analyze(&metrics);
        assert!(rating.strengths.is_empty());
        // 마이너스 수익, 큰 낙폭, 낮은 샤프, 낮은 승률, 1 미만 프로핏 팩터
        assert_eq!(rating.weaknesses.len(), 5);
        // 낙폭 관리, 표본 부족, 손익 관리 제안
        assert_eq!(rating.recommendations.len(), 3);
        assert_eq!(rating.grade, Grade::D);
    }
}

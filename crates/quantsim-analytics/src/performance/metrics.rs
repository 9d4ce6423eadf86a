//! 성과 지표 계산.
//!
//! `(초기 자본, 자산 곡선, 거래 기록)`의 순수 함수로 수익/리스크/
//! 리스크 조정/트레이딩/안정성 지표를 계산합니다.
//!
//! 샤프/소르티노/칼마/프로핏 팩터/손익비의 분모가 0인 경우는 모두 0으로
//! 정의됩니다. 나눗셈 오류는 발생하지 않습니다.
//!
//! 일간/월간 리샘플링은 UTC 달력 기준으로 각 구간의 마지막 자산 포인트를
//! 취합니다.

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

use quantsim_core::{EquityPoint, Trade};

/// 연율화 기준 일수 (암호화폐 시장 기준 365일).
const TRADING_DAYS_PER_YEAR: f64 = 365.0;

/// 월간 수익률 한 항목.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyReturn {
    /// 연-월 (예: "2025-07")
    pub month: String,
    /// 해당 월 수익률 (%)
    pub return_pct: f64,
}

/// 백테스트 성과 지표.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    // ===== 수익 지표 =====
    /// 총 수익률 (%)
    pub total_return_pct: f64,
    /// 연율화 수익률 (%)
    pub annualized_return_pct: f64,
    /// 일평균 수익률 (%)
    pub daily_return_mean_pct: f64,
    /// 월간 수익률 목록
    pub monthly_returns: Vec<MonthlyReturn>,

    // ===== 리스크 지표 =====
    /// 최대 낙폭 (%)
    pub max_drawdown_pct: f64,
    /// 최대 낙폭 구간의 고점 시각
    pub drawdown_peak_time: Option<DateTime<Utc>>,
    /// 최대 낙폭 구간의 저점 시각
    pub drawdown_trough_time: Option<DateTime<Utc>>,
    /// 고점 회복 시각 (회복하지 못하면 None)
    pub drawdown_recovery_time: Option<DateTime<Utc>>,
    /// 저점에서 회복까지 걸린 일수
    pub drawdown_recovery_days: Option<i64>,
    /// 연율화 변동성 (%)
    pub volatility_pct: f64,
    /// 하방 편차 (%, 음수 일간 수익률만 사용)
    pub downside_deviation_pct: f64,

    // ===== 리스크 조정 지표 =====
    /// 샤프 비율
    pub sharpe_ratio: f64,
    /// 소르티노 비율
    pub sortino_ratio: f64,
    /// 칼마 비율
    pub calmar_ratio: f64,

    // ===== 트레이딩 지표 =====
    /// 총 거래 수
    pub total_trades: usize,
    /// 수익 거래 수
    pub winning_trades: usize,
    /// 손실 거래 수
    pub losing_trades: usize,
    /// 승률 (%)
    pub win_rate_pct: f64,
    /// 평균 수익 (수익 거래)
    pub avg_win: f64,
    /// 평균 손실 (손실 거래, 음수)
    pub avg_loss: f64,
    /// 프로핏 팩터 (총수익 / |총손실|)
    pub profit_factor: f64,
    /// 손익비 (평균 수익 / |평균 손실|)
    pub profit_loss_ratio: f64,
    /// 최대 단일 수익
    pub max_win: f64,
    /// 최대 단일 손실 (음수)
    pub max_loss: f64,
    /// 평균 보유 시간 (시간)
    pub avg_holding_hours: f64,
    /// 최장 연속 수익 횟수
    pub max_consecutive_wins: usize,
    /// 최장 연속 손실 횟수
    pub max_consecutive_losses: usize,

    // ===== 안정성 지표 =====
    /// 월간 승률 (%)
    pub monthly_win_rate_pct: f64,
    /// 월간 수익률 변동 계수
    pub monthly_return_cv: f64,

    // ===== 요약 =====
    /// 순수익
    pub net_profit: f64,
    /// 최종 자산
    pub final_capital: f64,
}

impl PerformanceMetrics {
    /// 자산 곡선과 거래 기록에서 지표를 계산합니다.
    ///
    /// `risk_free_rate`는 % 단위 연이율입니다 (샤프/소르티노 계산용).
    pub fn calculate(
        initial_capital: f64,
        equity_curve: &[EquityPoint],
        trades: &[Trade],
        risk_free_rate: f64,
    ) -> Self {
        let mut metrics = Self {
            total_trades: trades.len(),
            ..Default::default()
        };

        metrics.final_capital = equity_curve
            .last()
            .map(|point| point.equity)
            .unwrap_or(initial_capital);
        metrics.net_profit = metrics.final_capital - initial_capital;

        metrics.fill_return_metrics(initial_capital, equity_curve);
        metrics.fill_risk_metrics(equity_curve);
        metrics.fill_risk_adjusted_metrics(risk_free_rate);
        metrics.fill_trading_metrics(trades);
        metrics.fill_stability_metrics();

        metrics
    }

    fn fill_return_metrics(&mut self, initial_capital: f64, equity_curve: &[EquityPoint]) {
        if initial_capital <= 0.0 || equity_curve.is_empty() {
            return;
        }

        self.total_return_pct = (self.final_capital / initial_capital - 1.0) * 100.0;

        let first = &equity_curve[0];
        let last = &equity_curve[equity_curve.len() - 1];
        let days = (last.timestamp - first.timestamp).num_days();
        let growth = self.final_capital / initial_capital;
        if days > 0 && growth > 0.0 {
            self.annualized_return_pct =
                (growth.powf(TRADING_DAYS_PER_YEAR / days as f64) - 1.0) * 100.0;
        }

        let daily_returns = daily_returns(equity_curve);
        self.daily_return_mean_pct = mean(&daily_returns) * 100.0;

        self.monthly_returns = monthly_returns(equity_curve);
    }

    fn fill_risk_metrics(&mut self, equity_curve: &[EquityPoint]) {
        // 최대 낙폭: 누적 고점 대비 하락률의 최댓값
        let mut peak_equity = f64::MIN;
        let mut peak_time: Option<DateTime<Utc>> = None;
        let mut max_drawdown = 0.0;
        let mut max_peak_equity = 0.0;
        let mut max_peak_time: Option<DateTime<Utc>> = None;
        let mut max_trough_time: Option<DateTime<Utc>> = None;
        let mut max_trough_index = 0usize;

        for (index, point) in equity_curve.iter().enumerate() {
            if point.equity > peak_equity {
                peak_equity = point.equity;
                peak_time = Some(point.timestamp);
            }
            if peak_equity > 0.0 {
                let drawdown = (peak_equity - point.equity) / peak_equity;
                if drawdown > max_drawdown {
                    max_drawdown = drawdown;
                    max_peak_equity = peak_equity;
                    max_peak_time = peak_time;
                    max_trough_time = Some(point.timestamp);
                    max_trough_index = index;
                }
            }
        }

        self.max_drawdown_pct = max_drawdown * 100.0;
        self.drawdown_peak_time = max_peak_time;
        self.drawdown_trough_time = max_trough_time;

        if max_drawdown > 0.0 {
            for point in &equity_curve[max_trough_index..] {
                if point.equity >= max_peak_equity {
                    self.drawdown_recovery_time = Some(point.timestamp);
                    if let Some(trough) = max_trough_time {
                        self.drawdown_recovery_days = Some((point.timestamp - trough).num_days());
                    }
                    break;
                }
            }
        }

        let daily = daily_returns(equity_curve);
        self.volatility_pct = sample_std(&daily) * TRADING_DAYS_PER_YEAR.sqrt() * 100.0;

        let negative: Vec<f64> = daily.iter().copied().filter(|r| *r < 0.0).collect();
        self.downside_deviation_pct =
            sample_std(&negative) * TRADING_DAYS_PER_YEAR.sqrt() * 100.0;
    }

    fn fill_risk_adjusted_metrics(&mut self, risk_free_rate: f64) {
        let excess_return = self.annualized_return_pct - risk_free_rate;

        self.sharpe_ratio = if self.volatility_pct > 0.0 {
            excess_return / self.volatility_pct
        } else {
            0.0
        };

        self.sortino_ratio = if self.downside_deviation_pct > 0.0 {
            excess_return / self.downside_deviation_pct
        } else {
            0.0
        };

        self.calmar_ratio = if self.max_drawdown_pct > 0.0 {
            self.annualized_return_pct / self.max_drawdown_pct
        } else {
            0.0
        };
    }

    fn fill_trading_metrics(&mut self, trades: &[Trade]) {
        if trades.is_empty() {
            return;
        }

        let wins: Vec<f64> = trades.iter().filter(|t| t.pnl > 0.0).map(|t| t.pnl).collect();
        let losses: Vec<f64> = trades.iter().filter(|t| t.pnl < 0.0).map(|t| t.pnl).collect();

        self.winning_trades = wins.len();
        self.losing_trades = losses.len();
        self.win_rate_pct = wins.len() as f64 / trades.len() as f64 * 100.0;

        self.avg_win = mean(&wins);
        self.avg_loss = mean(&losses);
        self.max_win = wins.iter().copied().fold(0.0, f64::max);
        self.max_loss = losses.iter().copied().fold(0.0, f64::min);

        let gross_profit: f64 = wins.iter().sum();
        let gross_loss: f64 = losses.iter().map(|pnl| pnl.abs()).sum();
        self.profit_factor = if gross_loss > 0.0 {
            gross_profit / gross_loss
        } else {
            0.0
        };
        self.profit_loss_ratio = if self.avg_loss != 0.0 {
            self.avg_win / self.avg_loss.abs()
        } else {
            0.0
        };

        let holding: Vec<f64> = trades.iter().map(Trade::holding_hours).collect();
        self.avg_holding_hours = mean(&holding);

        // 연속 수익/손실: 시간순 스캔, 손익 0인 거래에서 리셋
        let mut win_streak = 0usize;
        let mut loss_streak = 0usize;
        for trade in trades {
            if trade.pnl > 0.0 {
                win_streak += 1;
                loss_streak = 0;
            } else if trade.pnl < 0.0 {
                loss_streak += 1;
                win_streak = 0;
            } else {
                win_streak = 0;
                loss_streak = 0;
            }
            self.max_consecutive_wins = self.max_consecutive_wins.max(win_streak);
            self.max_consecutive_losses = self.max_consecutive_losses.max(loss_streak);
        }
    }

    fn fill_stability_metrics(&mut self) {
        if self.monthly_returns.is_empty() {
            return;
        }

        let values: Vec<f64> = self.monthly_returns.iter().map(|m| m.return_pct).collect();
        let positive = values.iter().filter(|v| **v > 0.0).count();
        self.monthly_win_rate_pct = positive as f64 / values.len() as f64 * 100.0;

        let average = mean(&values);
        self.monthly_return_cv = if average != 0.0 && values.len() >= 2 {
            sample_std(&values) / average.abs()
        } else {
            0.0
        };
    }
}

/// 산술 평균. 빈 입력은 0.
fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// 표본 표준편차 (n−1). 원소가 2개 미만이면 0.
fn sample_std(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let average = mean(values);
    let variance = values
        .iter()
        .map(|value| {
            let diff = value - average;
            diff * diff
        })
        .sum::<f64>()
        / (values.len() - 1) as f64;
    variance.sqrt()
}

/// 일간 수익률 (UTC 날짜별 마지막 자산 기준, 비율 단위).
fn daily_returns(equity_curve: &[EquityPoint]) -> Vec<f64> {
    let mut daily_closes: Vec<(chrono::NaiveDate, f64)> = Vec::new();
    for point in equity_curve {
        let date = point.timestamp.date_naive();
        match daily_closes.last_mut() {
            Some((last_date, equity)) if *last_date == date => *equity = point.equity,
            _ => daily_closes.push((date, point.equity)),
        }
    }

    pct_changes(&daily_closes.iter().map(|(_, e)| *e).collect::<Vec<_>>())
}

/// 월간 수익률 (UTC 연-월별 마지막 자산 기준, % 단위).
fn monthly_returns(equity_curve: &[EquityPoint]) -> Vec<MonthlyReturn> {
    let mut monthly_closes: Vec<((i32, u32), f64)> = Vec::new();
    for point in equity_curve {
        let key = (point.timestamp.year(), point.timestamp.month());
        match monthly_closes.last_mut() {
            Some((last_key, equity)) if *last_key == key => *equity = point.equity,
            _ => monthly_closes.push((key, point.equity)),
        }
    }

    let values: Vec<f64> = monthly_closes.iter().map(|(_, e)| *e).collect();
    pct_changes(&values)
        .into_iter()
        .zip(monthly_closes.iter().skip(1))
        .map(|(change, ((year, month), _))| MonthlyReturn {
            month: format!("{year:04}-{month:02}"),
            return_pct: change * 100.0,
        })
        .collect()
}

/// 연속 값들의 변화율. 직전 값이 0이면 해당 구간은 0.
fn pct_changes(values: &[f64]) -> Vec<f64> {
    values
        .windows(2)
        .map(|pair| {
            if pair[0] != 0.0 {
                pair[1] / pair[0] - 1.0
            } else {
                0.0
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;

    fn curve_from(values: &[f64], start: DateTime<Utc>, step: Duration) -> Vec<EquityPoint> {
        values
            .iter()
            .enumerate()
            .map(|(i, equity)| EquityPoint {
                timestamp: start + step * i as i32,
                equity: *equity,
                cash: *equity,
                holdings: 0.0,
            })
            .collect()
    }

    fn trade(pnl: f64, entry: DateTime<Utc>, hours: i64) -> Trade {
        Trade {
            symbol: "BTC/USDT".to_string(),
            entry_time: entry,
            exit_time: entry + Duration::hours(hours),
            quantity: 1.0,
            entry_price: 100.0,
            exit_price: 100.0 + pnl,
            pnl,
            pnl_pct: pnl,
        }
    }

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_known_max_drawdown() {
        // 고점 11000 → 저점 9000: (11000-9000)/11000 ≈ 18.18%
        let curve = curve_from(&[10_000.0, 11_000.0, 9_000.0, 12_000.0], start(), Duration::days(1));
        let metrics = PerformanceMetrics::calculate(10_000.0, &curve, &[], 0.0);

        assert!((metrics.max_drawdown_pct - 2_000.0 / 11_000.0 * 100.0).abs() < 1e-9);
        assert_eq!(metrics.drawdown_peak_time, Some(curve[1].timestamp));
        assert_eq!(metrics.drawdown_trough_time, Some(curve[2].timestamp));
        assert_eq!(metrics.drawdown_recovery_time, Some(curve[3].timestamp));
        assert_eq!(metrics.drawdown_recovery_days, Some(1));
    }

    #[test]
    fn test_unrecovered_drawdown() {
        let curve = curve_from(&[10_000.0, 11_000.0, 9_000.0, 9_500.0], start(), Duration::days(1));
        let metrics = PerformanceMetrics::calculate(10_000.0, &curve, &[], 0.0);

        assert!(metrics.drawdown_recovery_time.is_none());
        assert!(metrics.drawdown_recovery_days.is_none());
    }

    #[test]
    fn test_flat_curve_zero_denominators() {
        let curve = curve_from(&[10_000.0; 10], start(), Duration::days(1));
        let metrics = PerformanceMetrics::calculate(10_000.0, &curve, &[], 0.0);

        assert_eq!(metrics.total_return_pct, 0.0);
        assert_eq!(metrics.max_drawdown_pct, 0.0);
        assert_eq!(metrics.volatility_pct, 0.0);
        // 분모 0 → 모두 0, 나눗셈 오류 없음
        assert_eq!(metrics.sharpe_ratio, 0.0);
        assert_eq!(metrics.sortino_ratio, 0.0);
        assert_eq!(metrics.calmar_ratio, 0.0);
        assert_eq!(metrics.profit_factor, 0.0);
        assert_eq!(metrics.profit_loss_ratio, 0.0);
    }

    #[test]
    fn test_annualized_return_doubling_in_a_year() {
        // 365일에 걸쳐 2배: 연율화 수익률 ≈ 100%
        let curve = curve_from(&[10_000.0, 15_000.0, 20_000.0], start(), Duration::days(182))
            .into_iter()
            .enumerate()
            .map(|(i, mut point)| {
                // 마지막 포인트가 정확히 365일 뒤가 되도록 조정
                if i == 2 {
                    point.timestamp = start() + Duration::days(365);
                }
                point
            })
            .collect::<Vec<_>>();

        let metrics = PerformanceMetrics::calculate(10_000.0, &curve, &[], 0.0);
        assert!((metrics.annualized_return_pct - 100.0).abs() < 1e-6);
        assert!((metrics.total_return_pct - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_duration_annualized_return() {
        let curve = curve_from(&[10_000.0, 12_000.0], start(), Duration::hours(1));
        let metrics = PerformanceMetrics::calculate(10_000.0, &curve, &[], 0.0);

        // 기간 0일 → 연율화 0
        assert_eq!(metrics.annualized_return_pct, 0.0);
        assert!((metrics.total_return_pct - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_trading_metrics() {
        let trades = vec![
            trade(100.0, start(), 24),
            trade(50.0, start() + Duration::days(1), 12),
            trade(-30.0, start() + Duration::days(2), 6),
            trade(-70.0, start() + Duration::days(3), 6),
            trade(200.0, start() + Duration::days(4), 12),
        ];
        let curve = curve_from(&[10_000.0, 10_250.0], start(), Duration::days(5));
        let metrics = PerformanceMetrics::calculate(10_000.0, &curve, &trades, 0.0);

        assert_eq!(metrics.total_trades, 5);
        assert_eq!(metrics.winning_trades, 3);
        assert_eq!(metrics.losing_trades, 2);
        assert!((metrics.win_rate_pct - 60.0).abs() < 1e-9);
        assert!((metrics.avg_win - 350.0 / 3.0).abs() < 1e-9);
        assert!((metrics.avg_loss - (-50.0)).abs() < 1e-9);
        assert!((metrics.profit_factor - 3.5).abs() < 1e-9);
        assert!((metrics.profit_loss_ratio - (350.0 / 3.0) / 50.0).abs() < 1e-9);
        assert_eq!(metrics.max_win, 200.0);
        assert_eq!(metrics.max_loss, -70.0);
        assert!((metrics.avg_holding_hours - 12.0).abs() < 1e-9);
        assert_eq!(metrics.max_consecutive_wins, 2);
        assert_eq!(metrics.max_consecutive_losses, 2);
    }

    #[test]
    fn test_streak_resets_on_zero_pnl_trade() {
        let trades = vec![
            trade(10.0, start(), 1),
            trade(10.0, start() + Duration::days(1), 1),
            trade(0.0, start() + Duration::days(2), 1),
            trade(10.0, start() + Duration::days(3), 1),
        ];
        let curve = curve_from(&[10_000.0, 10_030.0], start(), Duration::days(4));
        let metrics = PerformanceMetrics::calculate(10_000.0, &curve, &trades, 0.0);

        // 손익 0 거래에서 연속 기록이 끊김
        assert_eq!(metrics.max_consecutive_wins, 2);
        assert_eq!(metrics.max_consecutive_losses, 0);
    }

    #[test]
    fn test_monthly_resampling() {
        // 1월 말 10000 → 2월 말 11000 (+10%) → 3월 말 9900 (-10%)
        let points = vec![
            (Utc.with_ymd_and_hms(2025, 1, 10, 0, 0, 0).unwrap(), 9_800.0),
            (Utc.with_ymd_and_hms(2025, 1, 31, 0, 0, 0).unwrap(), 10_000.0),
            (Utc.with_ymd_and_hms(2025, 2, 15, 0, 0, 0).unwrap(), 10_500.0),
            (Utc.with_ymd_and_hms(2025, 2, 28, 0, 0, 0).unwrap(), 11_000.0),
            (Utc.with_ymd_and_hms(2025, 3, 31, 0, 0, 0).unwrap(), 9_900.0),
        ];
        let curve: Vec<EquityPoint> = points
            .into_iter()
            .map(|(timestamp, equity)| EquityPoint {
                timestamp,
                equity,
                cash: equity,
                holdings: 0.0,
            })
            .collect();

        let metrics = PerformanceMetrics::calculate(9_800.0, &curve, &[], 0.0);

        assert_eq!(metrics.monthly_returns.len(), 2);
        assert_eq!(metrics.monthly_returns[0].month, "2025-02");
        assert!((metrics.monthly_returns[0].return_pct - 10.0).abs() < 1e-9);
        assert_eq!(metrics.monthly_returns[1].month, "2025-03");
        assert!((metrics.monthly_returns[1].return_pct - (-10.0)).abs() < 1e-9);

        // 월간 승률: 2개월 중 1개월 플러스
        assert!((metrics.monthly_win_rate_pct - 50.0).abs() < 1e-9);
        // 평균이 0이면 변동 계수도 0으로 정의
        assert_eq!(metrics.monthly_return_cv, 0.0);
    }

    #[test]
    fn test_downside_deviation_uses_negative_days_only() {
        let curve = curve_from(
            &[10_000.0, 10_100.0, 9_900.0, 10_000.0, 9_800.0, 10_100.0],
            start(),
            Duration::days(1),
        );
        let metrics = PerformanceMetrics::calculate(10_000.0, &curve, &[], 0.0);

        assert!(metrics.volatility_pct > 0.0);
        assert!(metrics.downside_deviation_pct > 0.0);
        // 하방 편차는 전체 변동성과 다른 표본을 사용
        assert!(metrics.downside_deviation_pct != metrics.volatility_pct);
    }

    #[test]
    fn test_empty_inputs() {
        let metrics = PerformanceMetrics::calculate(10_000.0, &[], &[], 0.0);

        assert_eq!(metrics.final_capital, 10_000.0);
        assert_eq!(metrics.net_profit, 0.0);
        assert_eq!(metrics.total_return_pct, 0.0);
        assert_eq!(metrics.total_trades, 0);
        assert_eq!(metrics.win_rate_pct, 0.0);
    }
}

//! 백테스팅 엔진.
//!
//! 과거 데이터로 트레이딩 전략을 시뮬레이션하고 성과 집계의 입력이 되는
//! 자산 곡선과 거래 기록을 생성합니다.
//!
//! # 주요 기능
//!
//! - **전략 시뮬레이션**: 캔들 단위로 전략의 신호 생성 및 실행
//! - **주문 체결 시뮬레이션**: 슬리피지, 수수료를 적용한 결정적 체결 모델
//! - **손절/익절 추적**: 진입 신호의 가격 수준 기반 자동 청산
//! - **자산 곡선**: 캔들마다 시가 평가로 자산 가치 변화 추적
//!
//! # 이벤트 순서
//!
//! 한 캔들에서 파생된 모든 이벤트(손절/익절 청산 신호, 전략 신호, 주문,
//! 체결)는 다음 캔들을 요청하기 전에 전부 소진됩니다. 같은 설정과 같은
//! 캔들 시퀀스는 항상 같은 자산 곡선과 거래 기록을 냅니다.
//!
//! # 사용 예시
//!
//! ```rust,ignore
//! use quantsim_analytics::{BacktestConfig, BacktestEngine};
//! use quantsim_core::HistoricalDataSource;
//! use quantsim_strategy::strategies::SmaCrossover;
//!
//! let config = BacktestConfig::new(100_000.0)
//!     .with_commission_rate(0.001)   // 0.1% 수수료
//!     .with_slippage_rate(0.0005);   // 0.05% 슬리피지
//!
//! let mut engine = BacktestEngine::new(config);
//! let mut strategy = SmaCrossover::new(5, 20).with_stop_loss_pct(0.05);
//! let mut source = HistoricalDataSource::new(bars)?;
//!
//! let report = engine.run(&mut strategy, &mut source).await?;
//! println!("{}", report.summary());
//! ```

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use quantsim_core::{
    Bar, DataSource, EquityPoint, Event, EventQueue, OrderEvent, Side, SignalEvent, SignalKind,
    Trade,
};
use quantsim_execution::{ExecutionSimulator, Portfolio, PortfolioSummary};
use quantsim_strategy::{Strategy, StrategyAdapter};

/// 진입 시 사용 가능 현금 대비 투입 비율 (고정 비율 사이징).
pub const POSITION_SIZING_FRACTION: f64 = 0.95;

/// 엔진이 생성하는 손절/익절 청산 신호의 strategy_id.
const EXIT_GUARD_ID: &str = "risk_exit";

/// 백테스트 오류.
#[derive(Debug, Error)]
pub enum BacktestError {
    /// 설정 오류
    #[error("백테스트 설정 오류: {0}")]
    ConfigError(String),

    /// 데이터 오류
    #[error("데이터 오류: {0}")]
    DataError(String),
}

/// 백테스트 결과 타입.
pub type BacktestResult<T> = Result<T, BacktestError>;

/// 백테스트 설정.
///
/// 실행 설정은 파일이 아니라 생성자 파라미터로 전달됩니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestConfig {
    /// 초기 자본금
    #[serde(default = "default_initial_capital")]
    pub initial_capital: f64,

    /// 거래 수수료율 (예: 0.001 = 0.1%)
    #[serde(default = "default_commission_rate")]
    pub commission_rate: f64,

    /// 슬리피지율 (예: 0.0005 = 0.05%)
    #[serde(default = "default_slippage_rate")]
    pub slippage_rate: f64,

    /// 무위험 이자율 (%, 성과 지표 계산용)
    #[serde(default)]
    pub risk_free_rate: f64,
}

// 설정 기본값 함수들 (serde default용)
fn default_initial_capital() -> f64 {
    100_000.0
}
fn default_commission_rate() -> f64 {
    0.001
} // 0.1%
fn default_slippage_rate() -> f64 {
    0.0005
} // 0.05%

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            initial_capital: default_initial_capital(),
            commission_rate: default_commission_rate(),
            slippage_rate: default_slippage_rate(),
            risk_free_rate: 0.0,
        }
    }
}

impl BacktestConfig {
    /// 새로운 백테스트 설정을 생성합니다.
    pub fn new(initial_capital: f64) -> Self {
        Self {
            initial_capital,
            ..Default::default()
        }
    }

    /// 수수료율 설정.
    pub fn with_commission_rate(mut self, rate: f64) -> Self {
        self.commission_rate = rate;
        self
    }

    /// 슬리피지율 설정.
    pub fn with_slippage_rate(mut self, rate: f64) -> Self {
        self.slippage_rate = rate;
        self
    }

    /// 무위험 이자율 설정 (%).
    pub fn with_risk_free_rate(mut self, rate: f64) -> Self {
        self.risk_free_rate = rate;
        self
    }

    /// 설정 검증.
    pub fn validate(&self) -> BacktestResult<()> {
        if self.initial_capital <= 0.0 {
            return Err(BacktestError::ConfigError(
                "초기 자본은 0보다 커야 합니다".to_string(),
            ));
        }
        if self.commission_rate < 0.0 {
            return Err(BacktestError::ConfigError(
                "수수료율은 0 이상이어야 합니다".to_string(),
            ));
        }
        if self.slippage_rate < 0.0 {
            return Err(BacktestError::ConfigError(
                "슬리피지율은 0 이상이어야 합니다".to_string(),
            ));
        }
        Ok(())
    }
}

/// 실행 종료 통계.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestStatistics {
    /// 생성된 신호 수
    pub signals: usize,
    /// 생성된 주문 수
    pub orders: usize,
    /// 체결 수
    pub fills: usize,
    /// 완료된 거래 수
    pub trades: usize,
    /// 데이터 기간 (일)
    pub duration_days: i64,
}

/// 백테스트 실행 리포트.
///
/// 리포팅/옵티마이저가 소비하는 유일한 엔진 경계입니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestReport {
    /// 초기 자본
    pub initial_capital: f64,
    /// 최종 자산 (마지막 자산 곡선 포인트)
    pub final_capital: f64,
    /// 자산 곡선 (캔들당 한 점)
    pub equity_curve: Vec<EquityPoint>,
    /// 완료된 거래
    pub trades: Vec<Trade>,
    /// 실행 통계
    pub statistics: BacktestStatistics,
    /// 장부 요약
    pub portfolio: PortfolioSummary,
    /// 백테스트 기간 시작
    pub start_time: DateTime<Utc>,
    /// 백테스트 기간 종료
    pub end_time: DateTime<Utc>,
    /// 소비한 캔들 수
    pub data_points: usize,
}

impl BacktestReport {
    /// 요약 문자열 반환.
    pub fn summary(&self) -> String {
        let total_return_pct = if self.initial_capital > 0.0 {
            (self.final_capital / self.initial_capital - 1.0) * 100.0
        } else {
            0.0
        };

        format!(
            "백테스트 결과 요약\n\
             ═══════════════════════════════════════\n\
             기간: {} → {} ({} 일)\n\
             데이터 포인트: {}\n\
             ───────────────────────────────────────\n\
             초기 자본: {:.2}\n\
             최종 자산: {:.2}\n\
             총 수익률: {:.2}%\n\
             ───────────────────────────────────────\n\
             신호: {} / 주문: {} / 체결: {}\n\
             완료 거래: {}\n\
             ═══════════════════════════════════════",
            self.start_time.format("%Y-%m-%d"),
            self.end_time.format("%Y-%m-%d"),
            self.statistics.duration_days,
            self.data_points,
            self.initial_capital,
            self.final_capital,
            total_return_pct,
            self.statistics.signals,
            self.statistics.orders,
            self.statistics.fills,
            self.statistics.trades,
        )
    }
}

/// 심볼별 손절/익절 추적 항목.
///
/// 포트폴리오가 아니라 엔진이 소유하며, 매수 신호가 가격 수준을 실어올 때
/// 설정되고 해당 심볼 포지션이 전량 청산되면 해제됩니다.
#[derive(Debug, Clone, Copy)]
struct ExitLevels {
    stop_loss: Option<f64>,
    take_profit: Option<f64>,
}

/// 백테스팅 엔진.
///
/// # 아키텍처
///
/// ```text
/// DataSource ──Bar──▶ BacktestEngine (이벤트 루프)
///                        │  Market  → 손절/익절 확인 + StrategyAdapter
///                        │  Signal  → 사이징 → Order
///                        │  Order   → ExecutionSimulator → Fill
///                        │  Fill    → Portfolio (장부 + 추적 해제)
///                        ▼
///                    BacktestReport
/// ```
///
/// run 하나는 자신의 큐와 장부를 독점 소유합니다. 독립적인 run들 사이에만
/// 병렬성이 허용됩니다.
pub struct BacktestEngine {
    config: BacktestConfig,
    simulator: ExecutionSimulator,
    portfolio: Portfolio,
    queue: EventQueue,
    exit_levels: HashMap<String, ExitLevels>,
}

impl BacktestEngine {
    /// 새로운 백테스트 엔진을 생성합니다.
    pub fn new(config: BacktestConfig) -> Self {
        let simulator = ExecutionSimulator::new(config.commission_rate, config.slippage_rate);
        let portfolio = Portfolio::new(config.initial_capital);

        Self {
            config,
            simulator,
            portfolio,
            queue: EventQueue::new(),
            exit_levels: HashMap::new(),
        }
    }

    /// 현재 현금 잔고 (장부에서 위임).
    pub fn balance(&self) -> f64 {
        self.portfolio.cash()
    }

    /// 보유 중인 포지션 수 (장부에서 위임).
    pub fn positions_count(&self) -> usize {
        self.portfolio
            .positions()
            .values()
            .filter(|p| p.is_open())
            .count()
    }

    /// 백테스트를 실행합니다.
    ///
    /// 데이터 소스가 소진될 때까지 캔들 단위로 진행합니다. run 시작 시
    /// 큐/장부/추적 상태가 초기화되므로 같은 엔진으로 여러 번 실행해도
    /// run 간 상태가 공유되지 않습니다.
    pub async fn run<S>(
        &mut self,
        strategy: &mut S,
        source: &mut dyn DataSource,
    ) -> BacktestResult<BacktestReport>
    where
        S: Strategy + ?Sized,
    {
        self.config.validate()?;
        self.reset();

        let mut adapter = StrategyAdapter::new(strategy);
        let mut start_time: Option<DateTime<Utc>> = None;
        let mut last_bar: Option<Bar> = None;
        let mut data_points = 0usize;

        while let Some(bar) = source.update_bars().await {
            if start_time.is_none() {
                start_time = Some(bar.timestamp);
                debug!(symbol = %bar.symbol, "백테스트 시작");
            }
            data_points += 1;

            self.queue.put(Event::Market(bar.clone()));

            // 현재 캔들에서 파생된 이벤트를 전부 소진한 뒤에만 다음 캔들 요청
            while let Some(event) = self.queue.get() {
                match event {
                    Event::Market(market_bar) => {
                        if let Some(signal) = self.exit_level_signal(&market_bar) {
                            self.queue.put(Event::Signal(signal));
                        }
                        for signal in adapter.on_bar(&market_bar, &*source).await {
                            self.queue.put(Event::Signal(signal));
                        }
                    }
                    Event::Signal(signal) => {
                        if let Some(order) = self.order_from_signal(&signal) {
                            self.queue.put(Event::Order(order));
                        }
                    }
                    Event::Order(order) => {
                        let fill = self.simulator.execute(&order, bar.close);
                        self.queue.put(Event::Fill(fill));
                    }
                    Event::Fill(fill) => {
                        self.portfolio.apply_fill(&fill);
                        // 전량 청산되면 손절/익절 추적 해제
                        if fill.side == Side::Sell && !self.portfolio.has_position(&fill.symbol) {
                            self.exit_levels.remove(&fill.symbol);
                        }
                    }
                }
            }

            let mut prices = HashMap::new();
            prices.insert(bar.symbol.clone(), bar.close);
            self.portfolio.mark_to_market(bar.timestamp, &prices);

            last_bar = Some(bar);
        }

        let (Some(start_time), Some(last_bar)) = (start_time, last_bar) else {
            return Err(BacktestError::DataError(
                "캔들 데이터가 비어있습니다".to_string(),
            ));
        };

        let stats = self.queue.stats();
        let final_capital = self
            .portfolio
            .last_equity()
            .unwrap_or(self.config.initial_capital);

        info!(
            data_points,
            signals = stats.signal,
            trades = self.portfolio.trades().len(),
            final_capital,
            "백테스트 완료"
        );

        Ok(BacktestReport {
            initial_capital: self.config.initial_capital,
            final_capital,
            equity_curve: self.portfolio.equity_curve().to_vec(),
            trades: self.portfolio.trades().to_vec(),
            statistics: BacktestStatistics {
                signals: stats.signal,
                orders: stats.order,
                fills: stats.fill,
                trades: self.portfolio.trades().len(),
                duration_days: (last_bar.timestamp - start_time).num_days(),
            },
            portfolio: self.portfolio.summary(),
            start_time,
            end_time: last_bar.timestamp,
            data_points,
        })
    }

    /// run 시작 전 상태 초기화.
    fn reset(&mut self) {
        self.portfolio = Portfolio::new(self.config.initial_capital);
        self.queue = EventQueue::new();
        self.exit_levels.clear();
    }

    /// 손절/익절 추적을 확인하고 필요하면 청산 신호를 생성합니다.
    ///
    /// 손절을 먼저 확인하며, 캔들 하나에서 둘 중 하나만 발동합니다.
    /// 신호 가격은 추적 중인 수준 그대로이므로 체결가도 그 수준이 됩니다.
    fn exit_level_signal(&self, bar: &Bar) -> Option<SignalEvent> {
        let levels = self.exit_levels.get(&bar.symbol)?;
        if !self.portfolio.has_position(&bar.symbol) {
            return None;
        }

        if let Some(stop_loss) = levels.stop_loss {
            if bar.low <= stop_loss {
                debug!(symbol = %bar.symbol, stop_loss, low = bar.low, "손절 발동");
                return Some(
                    SignalEvent::new(
                        EXIT_GUARD_ID,
                        bar.symbol.clone(),
                        SignalKind::Close,
                        stop_loss,
                        bar.timestamp,
                    )
                    .with_reason("stop_loss"),
                );
            }
        }

        if let Some(take_profit) = levels.take_profit {
            if bar.high >= take_profit {
                debug!(symbol = %bar.symbol, take_profit, high = bar.high, "익절 발동");
                return Some(
                    SignalEvent::new(
                        EXIT_GUARD_ID,
                        bar.symbol.clone(),
                        SignalKind::Close,
                        take_profit,
                        bar.timestamp,
                    )
                    .with_reason("take_profit"),
                );
            }
        }

        None
    }

    /// 신호를 0개 또는 1개의 주문으로 변환합니다.
    ///
    /// - 매수 + 미보유: 가용 현금의 95%를 투입하는 시장가 주문. 신호의
    ///   손절/익절 수준이 있으면 추적에 등록합니다.
    /// - 매도/청산 + 보유: 전량 주문. 청산(Close)은 신호 가격의 지정가,
    ///   매도(Sell)는 시장가.
    /// - 그 외 (보유 중 매수, 미보유 매도/청산, 관망): 주문 없음.
    fn order_from_signal(&mut self, signal: &SignalEvent) -> Option<OrderEvent> {
        match signal.kind {
            SignalKind::Buy => {
                if self.portfolio.has_position(&signal.symbol) {
                    debug!(symbol = %signal.symbol, "보유 중 매수 신호 무시");
                    return None;
                }
                if signal.price <= 0.0 {
                    return None;
                }

                let quantity = POSITION_SIZING_FRACTION * self.portfolio.cash() / signal.price;
                if quantity <= 0.0 {
                    return None;
                }

                if signal.stop_loss.is_some() || signal.take_profit.is_some() {
                    self.exit_levels.insert(
                        signal.symbol.clone(),
                        ExitLevels {
                            stop_loss: signal.stop_loss,
                            take_profit: signal.take_profit,
                        },
                    );
                }

                Some(OrderEvent::market(
                    signal.symbol.clone(),
                    Side::Buy,
                    quantity,
                    signal.timestamp,
                ))
            }
            SignalKind::Sell | SignalKind::Close => {
                let position = self
                    .portfolio
                    .position(&signal.symbol)
                    .filter(|p| p.is_open());
                let Some(position) = position else {
                    debug!(symbol = %signal.symbol, kind = %signal.kind, "보유 없는 청산 신호 무시");
                    return None;
                };

                let quantity = position.quantity;
                if signal.kind == SignalKind::Close {
                    Some(OrderEvent::limit(
                        signal.symbol.clone(),
                        Side::Sell,
                        quantity,
                        signal.price,
                        signal.timestamp,
                    ))
                } else {
                    Some(OrderEvent::market(
                        signal.symbol.clone(),
                        Side::Sell,
                        quantity,
                        signal.timestamp,
                    ))
                }
            }
            SignalKind::Hold => None,
        }
    }
}

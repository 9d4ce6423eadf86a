//! 포지션/현금 장부.
//!
//! run 하나가 독점 소유하며, 엔진의 Fill 처리 단계만 상태를 변경합니다.
//! 정상 동작에서 오류를 내지 않습니다. 보유 없는 매도는 손익에 대해
//! no-op이며 (수량은 0에서 클램프), 엔진의 주문 변환 단계에서 걸러지는
//! 것이 원칙입니다.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use quantsim_core::{EquityPoint, FillEvent, Position, Side, Trade};

/// 전량 청산 판정용 수량 허용 오차.
const QUANTITY_EPSILON: f64 = 1e-12;

/// 장부 요약 (결과 리포트용).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioSummary {
    /// 초기 자본
    pub initial_capital: f64,
    /// 현금 잔고
    pub cash: f64,
    /// 실현 손익 누계
    pub realized_pnl: f64,
    /// 보유 중인 포지션 수
    pub open_positions: usize,
    /// 완료된 거래 수
    pub closed_trades: usize,
}

/// 현금/포지션 장부.
///
/// run 생성 시 `initial_capital`로 만들어지고, run 종료 후에는 읽기
/// 전용으로 사용됩니다.
#[derive(Debug)]
pub struct Portfolio {
    initial_capital: f64,
    cash: f64,
    positions: HashMap<String, Position>,
    trades: Vec<Trade>,
    equity_curve: Vec<EquityPoint>,
}

impl Portfolio {
    /// 초기 자본으로 장부를 생성합니다.
    pub fn new(initial_capital: f64) -> Self {
        Self {
            initial_capital,
            cash: initial_capital,
            positions: HashMap::new(),
            trades: Vec::new(),
            equity_curve: Vec::new(),
        }
    }

    /// 초기 자본.
    pub fn initial_capital(&self) -> f64 {
        self.initial_capital
    }

    /// 현금 잔고.
    pub fn cash(&self) -> f64 {
        self.cash
    }

    /// 심볼별 포지션 맵.
    pub fn positions(&self) -> &HashMap<String, Position> {
        &self.positions
    }

    /// 특정 심볼의 포지션.
    pub fn position(&self, symbol: &str) -> Option<&Position> {
        self.positions.get(symbol)
    }

    /// 해당 심볼의 포지션을 보유 중인지 확인합니다.
    pub fn has_position(&self, symbol: &str) -> bool {
        self.positions.get(symbol).is_some_and(Position::is_open)
    }

    /// 완료된 거래 목록.
    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    /// 자산 곡선.
    pub fn equity_curve(&self) -> &[EquityPoint] {
        &self.equity_curve
    }

    /// 마지막 자산 곡선 포인트의 총 자산.
    pub fn last_equity(&self) -> Option<f64> {
        self.equity_curve.last().map(|point| point.equity)
    }

    /// 체결을 장부에 반영합니다.
    pub fn apply_fill(&mut self, fill: &FillEvent) {
        match fill.side {
            Side::Buy => self.apply_buy(fill),
            Side::Sell => self.apply_sell(fill),
        }
    }

    fn apply_buy(&mut self, fill: &FillEvent) {
        let position = self.positions.entry(fill.symbol.clone()).or_default();

        let new_quantity = position.quantity + fill.quantity;
        position.total_cost += fill.total_cost;
        if new_quantity > 0.0 {
            position.avg_price = position.total_cost / new_quantity;
        }
        position.quantity = new_quantity;
        if position.entry_time.is_none() {
            position.entry_time = Some(fill.timestamp);
        }

        self.cash -= fill.total_cost;

        debug!(
            symbol = %fill.symbol,
            quantity = fill.quantity,
            fill_price = fill.fill_price,
            avg_price = position.avg_price,
            cash = self.cash,
            "매수 체결 반영"
        );
    }

    fn apply_sell(&mut self, fill: &FillEvent) {
        let Some(position) = self.positions.get_mut(&fill.symbol) else {
            warn!(symbol = %fill.symbol, "보유 없는 매도 체결 무시");
            return;
        };
        if !position.is_open() {
            warn!(symbol = %fill.symbol, "보유 없는 매도 체결 무시");
            return;
        }

        // 수량은 보유량에서 클램프
        let close_quantity = fill.quantity.min(position.quantity);

        // 청산 체결이 포지션을 변경하기 전에 진입 정보를 캡처
        let entry_price = position.avg_price;
        let entry_time = position.entry_time;

        let pnl = (fill.fill_price - entry_price) * close_quantity - fill.commission;
        position.realized_pnl += pnl;
        position.quantity -= close_quantity;
        self.cash += close_quantity * fill.fill_price - fill.commission;

        let fully_closed = position.quantity <= QUANTITY_EPSILON;
        if fully_closed {
            position.reset();

            let pnl_pct = if entry_price > 0.0 && close_quantity > 0.0 {
                pnl / (entry_price * close_quantity) * 100.0
            } else {
                0.0
            };

            self.trades.push(Trade {
                symbol: fill.symbol.clone(),
                entry_time: entry_time.unwrap_or(fill.timestamp),
                exit_time: fill.timestamp,
                quantity: close_quantity,
                entry_price,
                exit_price: fill.fill_price,
                pnl,
                pnl_pct,
            });
        }

        debug!(
            symbol = %fill.symbol,
            quantity = close_quantity,
            fill_price = fill.fill_price,
            pnl,
            fully_closed,
            cash = self.cash,
            "매도 체결 반영"
        );
    }

    /// 포지션 평가액 합계.
    ///
    /// 가격 맵에 없는 심볼은 평균 단가로 평가합니다.
    pub fn holdings_value(&self, prices: &HashMap<String, f64>) -> f64 {
        self.positions
            .iter()
            .map(|(symbol, position)| {
                let price = prices.get(symbol).copied().unwrap_or(position.avg_price);
                position.market_value(price)
            })
            .sum()
    }

    /// 현재 총 자산 (현금 + 평가액).
    pub fn equity(&self, prices: &HashMap<String, f64>) -> f64 {
        self.cash + self.holdings_value(prices)
    }

    /// 시가 평가 후 자산 곡선에 한 점을 추가합니다.
    ///
    /// 캔들 하나당 정확히 한 번, 해당 캔들의 이벤트가 모두 소진된 뒤
    /// 호출되어야 합니다.
    pub fn mark_to_market(&mut self, timestamp: DateTime<Utc>, prices: &HashMap<String, f64>) {
        let holdings = self.holdings_value(prices);
        self.equity_curve.push(EquityPoint {
            timestamp,
            equity: self.cash + holdings,
            cash: self.cash,
            holdings,
        });
    }

    /// 장부 요약을 생성합니다.
    pub fn summary(&self) -> PortfolioSummary {
        PortfolioSummary {
            initial_capital: self.initial_capital,
            cash: self.cash,
            realized_pnl: self
                .positions
                .values()
                .map(|position| position.realized_pnl)
                .sum(),
            open_positions: self
                .positions
                .values()
                .filter(|position| position.is_open())
                .count(),
            closed_trades: self.trades.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use uuid::Uuid;

    use super::*;

    fn buy_fill(symbol: &str, quantity: f64, price: f64, commission: f64) -> FillEvent {
        FillEvent::new(
            Uuid::new_v4(),
            symbol,
            Side::Buy,
            quantity,
            price,
            commission,
            Utc::now(),
        )
    }

    fn sell_fill(symbol: &str, quantity: f64, price: f64, commission: f64) -> FillEvent {
        FillEvent::new(
            Uuid::new_v4(),
            symbol,
            Side::Sell,
            quantity,
            price,
            commission,
            Utc::now(),
        )
    }

    #[test]
    fn test_buy_fill_accounting() {
        let mut portfolio = Portfolio::new(10_000.0);
        portfolio.apply_fill(&buy_fill("BTC/USDT", 10.0, 100.0, 1.0));

        let position = portfolio.position("BTC/USDT").unwrap();
        assert_eq!(position.quantity, 10.0);
        assert_eq!(position.total_cost, 1001.0);
        assert_eq!(position.avg_price, 100.1);
        assert!(position.entry_time.is_some());
        assert_eq!(portfolio.cash(), 10_000.0 - 1001.0);
    }

    #[test]
    fn test_averaging_on_second_buy() {
        let mut portfolio = Portfolio::new(10_000.0);
        portfolio.apply_fill(&buy_fill("BTC/USDT", 10.0, 100.0, 0.0));
        portfolio.apply_fill(&buy_fill("BTC/USDT", 10.0, 120.0, 0.0));

        let position = portfolio.position("BTC/USDT").unwrap();
        assert_eq!(position.quantity, 20.0);
        assert_eq!(position.avg_price, 110.0);
    }

    #[test]
    fn test_full_close_records_trade_with_captured_entry() {
        let mut portfolio = Portfolio::new(10_000.0);
        let entry = buy_fill("BTC/USDT", 10.0, 100.0, 1.0);
        portfolio.apply_fill(&entry);

        let avg_before_close = portfolio.position("BTC/USDT").unwrap().avg_price;
        portfolio.apply_fill(&sell_fill("BTC/USDT", 10.0, 110.0, 1.1));

        // 거래 기록은 청산 전 평균 단가를 사용해야 함
        assert_eq!(portfolio.trades().len(), 1);
        let trade = &portfolio.trades()[0];
        assert!(trade.entry_price > 0.0);
        assert_eq!(trade.entry_price, avg_before_close);
        assert_eq!(trade.exit_price, 110.0);
        assert_eq!(trade.quantity, 10.0);

        let expected_pnl = (110.0 - avg_before_close) * 10.0 - 1.1;
        assert!((trade.pnl - expected_pnl).abs() < 1e-9);

        // 포지션 리셋 불변식
        let position = portfolio.position("BTC/USDT").unwrap();
        assert_eq!(position.quantity, 0.0);
        assert_eq!(position.avg_price, 0.0);
        assert_eq!(position.total_cost, 0.0);
        assert!(position.entry_time.is_none());
        assert!(!portfolio.has_position("BTC/USDT"));
    }

    #[test]
    fn test_partial_sell_keeps_position_open() {
        let mut portfolio = Portfolio::new(10_000.0);
        portfolio.apply_fill(&buy_fill("BTC/USDT", 10.0, 100.0, 0.0));
        portfolio.apply_fill(&sell_fill("BTC/USDT", 4.0, 110.0, 0.0));

        let position = portfolio.position("BTC/USDT").unwrap();
        assert_eq!(position.quantity, 6.0);
        assert_eq!(position.avg_price, 100.0);
        assert!(portfolio.trades().is_empty());
    }

    #[test]
    fn test_sell_without_position_is_noop() {
        let mut portfolio = Portfolio::new(10_000.0);
        portfolio.apply_fill(&sell_fill("BTC/USDT", 5.0, 100.0, 0.5));

        assert_eq!(portfolio.cash(), 10_000.0);
        assert!(portfolio.trades().is_empty());
    }

    #[test]
    fn test_oversell_clamps_quantity() {
        let mut portfolio = Portfolio::new(10_000.0);
        portfolio.apply_fill(&buy_fill("BTC/USDT", 5.0, 100.0, 0.0));
        portfolio.apply_fill(&sell_fill("BTC/USDT", 8.0, 110.0, 0.0));

        // 보유량 5개만 청산됨
        let trade = &portfolio.trades()[0];
        assert_eq!(trade.quantity, 5.0);
        assert_eq!(portfolio.cash(), 10_000.0 - 500.0 + 550.0);
        assert!(!portfolio.has_position("BTC/USDT"));
    }

    #[test]
    fn test_mark_to_market_invariant() {
        let mut portfolio = Portfolio::new(10_000.0);
        portfolio.apply_fill(&buy_fill("BTC/USDT", 10.0, 100.0, 1.0));

        let mut prices = HashMap::new();
        prices.insert("BTC/USDT".to_string(), 105.0);
        let now = Utc::now();
        portfolio.mark_to_market(now, &prices);
        portfolio.mark_to_market(now + Duration::hours(1), &prices);

        assert_eq!(portfolio.equity_curve().len(), 2);
        for point in portfolio.equity_curve() {
            assert!((point.equity - (point.cash + point.holdings)).abs() < 1e-9);
        }
        let point = &portfolio.equity_curve()[0];
        assert_eq!(point.holdings, 1050.0);
        assert_eq!(point.cash, 10_000.0 - 1001.0);
    }

    #[test]
    fn test_summary() {
        let mut portfolio = Portfolio::new(10_000.0);
        portfolio.apply_fill(&buy_fill("BTC/USDT", 10.0, 100.0, 0.0));
        portfolio.apply_fill(&sell_fill("BTC/USDT", 10.0, 110.0, 0.0));
        portfolio.apply_fill(&buy_fill("ETH/USDT", 1.0, 3000.0, 0.0));

        let summary = portfolio.summary();
        assert_eq!(summary.open_positions, 1);
        assert_eq!(summary.closed_trades, 1);
        assert!((summary.realized_pnl - 100.0).abs() < 1e-9);
    }

    mod properties {
        use proptest::prelude::*;

        use super::*;

        /// 매수/매도 체결 시퀀스를 적용해도 장부 항등식이 유지되는지 검증.
        ///
        /// - 현금 = 초기 자본 − Σ매수 비용 + Σ매도 대금
        /// - 포지션 리셋 불변식 (수량 0 ⇒ 단가/비용 0, 진입 시각 None)
        /// - 기록된 모든 거래의 진입가 > 0
        fn check_ledger(ops: Vec<(bool, f64, f64)>) {
            let mut portfolio = Portfolio::new(1_000_000.0);
            let mut expected_cash = 1_000_000.0;

            for (is_buy, quantity, price) in ops {
                let commission = quantity * price * 0.001;
                if is_buy {
                    portfolio.apply_fill(&buy_fill("BTC/USDT", quantity, price, commission));
                    expected_cash -= quantity * price + commission;
                } else {
                    let held = portfolio
                        .position("BTC/USDT")
                        .map(|p| p.quantity)
                        .unwrap_or(0.0);
                    portfolio.apply_fill(&sell_fill("BTC/USDT", quantity, price, commission));
                    if held > 0.0 {
                        expected_cash += quantity.min(held) * price - commission;
                    }
                }
            }

            assert!((portfolio.cash() - expected_cash).abs() < 1e-6);

            if let Some(position) = portfolio.position("BTC/USDT") {
                if !position.is_open() {
                    assert_eq!(position.avg_price, 0.0);
                    assert_eq!(position.total_cost, 0.0);
                    assert!(position.entry_time.is_none());
                }
            }

            for trade in portfolio.trades() {
                assert!(trade.entry_price > 0.0);
            }
        }

        proptest! {
            #[test]
            fn ledger_identities_hold(
                ops in prop::collection::vec(
                    (any::<bool>(), 0.1f64..10.0, 10.0f64..1000.0),
                    1..40,
                )
            ) {
                check_ledger(ops);
            }
        }
    }
}

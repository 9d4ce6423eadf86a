//! 단순 이동평균 크로스오버 전략.

use async_trait::async_trait;

use quantsim_core::Bar;

use crate::traits::{Analysis, RawSignal, Strategy, StrategyError};

/// SMA 골든/데드 크로스 전략.
///
/// 단기 SMA가 장기 SMA를 상향 돌파하면 매수, 하향 돌파하면 매도합니다.
/// 손절/익절 비율이 설정되면 진입 신호에 해당 가격 수준을 함께 발행하여
/// 엔진의 자동 청산 추적을 활성화합니다.
#[derive(Debug)]
pub struct SmaCrossover {
    short_period: usize,
    long_period: usize,
    stop_loss_pct: Option<f64>,
    take_profit_pct: Option<f64>,
    position_open: bool,
}

impl SmaCrossover {
    /// 단기/장기 기간으로 전략을 생성합니다.
    pub fn new(short_period: usize, long_period: usize) -> Self {
        Self {
            short_period,
            long_period,
            stop_loss_pct: None,
            take_profit_pct: None,
            position_open: false,
        }
    }

    /// 손절 비율을 설정합니다 (예: 0.05 = 진입가 대비 -5%).
    pub fn with_stop_loss_pct(mut self, pct: f64) -> Self {
        self.stop_loss_pct = Some(pct);
        self
    }

    /// 익절 비율을 설정합니다 (예: 0.10 = 진입가 대비 +10%).
    pub fn with_take_profit_pct(mut self, pct: f64) -> Self {
        self.take_profit_pct = Some(pct);
        self
    }

    fn sma(bars: &[Bar], period: usize) -> Option<f64> {
        if bars.len() < period || period == 0 {
            return None;
        }
        let sum: f64 = bars.iter().rev().take(period).map(|b| b.close).sum();
        Some(sum / period as f64)
    }
}

#[async_trait]
impl Strategy for SmaCrossover {
    fn name(&self) -> &str {
        "sma_crossover"
    }

    fn min_bars(&self) -> usize {
        self.long_period
    }

    async fn analyze(&mut self, bars: &[Bar]) -> Result<Analysis, StrategyError> {
        let mut analysis = Analysis::new();
        if let Some(short) = Self::sma(bars, self.short_period) {
            analysis = analysis.with_indicator("sma_short", short);
        }
        if let Some(long) = Self::sma(bars, self.long_period) {
            analysis = analysis.with_indicator("sma_long", long);
        }
        Ok(analysis)
    }

    async fn generate_signals(
        &mut self,
        bars: &[Bar],
        analysis: &Analysis,
    ) -> Result<Vec<RawSignal>, StrategyError> {
        let (Some(short), Some(long)) = (
            analysis.indicator("sma_short"),
            analysis.indicator("sma_long"),
        ) else {
            return Ok(vec![]);
        };

        let Some(last) = bars.last() else {
            return Ok(vec![]);
        };

        // 골든 크로스: 단기 > 장기
        if short > long && !self.position_open {
            self.position_open = true;

            // 이동평균 이격도에 비례한 확신도
            let spread_pct = (short - long) / long;
            let confidence = (0.5 + spread_pct * 10.0).clamp(0.5, 1.0);

            let stop_loss = self.stop_loss_pct.map(|pct| last.close * (1.0 - pct));
            let take_profit = self.take_profit_pct.map(|pct| last.close * (1.0 + pct));

            return Ok(vec![RawSignal::buy()
                .with_confidence(confidence)
                .with_levels(stop_loss, take_profit)
                .with_reason("golden_cross")]);
        }

        // 데드 크로스: 단기 < 장기
        if short < long && self.position_open {
            self.position_open = false;
            return Ok(vec![RawSignal::sell().with_reason("dead_cross")]);
        }

        Ok(vec![])
    }
}

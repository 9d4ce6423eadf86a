//! 매수 후 보유 전략.

use async_trait::async_trait;

use quantsim_core::Bar;

use crate::traits::{Analysis, RawSignal, Strategy, StrategyError};

/// 첫 캔들에 전액 매수 후 청산하지 않는 기준 전략.
///
/// 성과 비교의 기준선이자 엔진 계약 테스트의 기본 드라이버입니다.
#[derive(Debug, Default)]
pub struct BuyAndHold {
    entered: bool,
}

impl BuyAndHold {
    /// 새 전략 인스턴스를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Strategy for BuyAndHold {
    fn name(&self) -> &str {
        "buy_and_hold"
    }

    fn min_bars(&self) -> usize {
        1
    }

    async fn analyze(&mut self, _bars: &[Bar]) -> Result<Analysis, StrategyError> {
        Ok(Analysis::new())
    }

    async fn generate_signals(
        &mut self,
        _bars: &[Bar],
        _analysis: &Analysis,
    ) -> Result<Vec<RawSignal>, StrategyError> {
        if self.entered {
            return Ok(vec![]);
        }
        self.entered = true;
        Ok(vec![RawSignal::buy()
            .with_confidence(1.0)
            .with_reason("buy_and_hold")])
    }
}

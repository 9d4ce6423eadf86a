//! 전략 어댑터.
//!
//! 외부 전략의 `analyze → generate_signals` 계약을 엔진의 증분 신호
//! 계약으로 변환하는 신뢰 경계입니다.
//!
//! - 히스토리가 `min_bars`에 미달하면 신호 없음 (오류 아님)
//! - 전략이 `Err`를 반환하거나 패닉하면 로그 후 신호 없음 - 전략 코드는
//!   신뢰할 수 없으며 절대 시뮬레이션을 중단시키지 않습니다
//! - 확신도는 `[0, 1]`로 클램프, 없거나 유한하지 않으면 0.5

use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use tracing::{debug, warn};

use quantsim_core::{Bar, DataSource, SignalEvent, SignalKind};

use crate::traits::{Analysis, RawSignal, Strategy};

/// 확신도가 없거나 유효하지 않을 때의 기본 신호 강도.
pub const DEFAULT_STRENGTH: f64 = 0.5;

/// 전략을 엔진 이벤트 루프에 연결하는 어댑터.
///
/// run 하나당 하나씩, 전략을 가변 차용하여 생성됩니다.
pub struct StrategyAdapter<'a, S: Strategy + ?Sized> {
    strategy: &'a mut S,
}

impl<'a, S: Strategy + ?Sized> StrategyAdapter<'a, S> {
    /// 전략을 감싸는 어댑터를 생성합니다.
    pub fn new(strategy: &'a mut S) -> Self {
        Self { strategy }
    }

    /// 새 캔들에 대한 신호를 생성합니다.
    ///
    /// 데이터 소스에서 전략의 lookback 윈도우를 조회하고, 전략을 호출한 뒤
    /// Hold가 아닌 원시 신호를 `SignalEvent`로 변환합니다. 전략 오류와
    /// 패닉은 여기서 흡수됩니다.
    pub async fn on_bar(&mut self, bar: &Bar, source: &dyn DataSource) -> Vec<SignalEvent> {
        let min_bars = self.strategy.min_bars();
        let Some(bars) = source.latest_bars(min_bars) else {
            // lookback 부족은 정상 상태
            return Vec::new();
        };

        let analyze_result = AssertUnwindSafe(self.strategy.analyze(&bars))
            .catch_unwind()
            .await;
        let analysis = match analyze_result {
            Ok(Ok(analysis)) => analysis,
            Ok(Err(error)) => {
                warn!(
                    strategy = %self.strategy.name(),
                    symbol = %bar.symbol,
                    %error,
                    "전략 analyze 실패, 이번 캔들 신호 생략"
                );
                return Vec::new();
            }
            Err(_) => {
                warn!(
                    strategy = %self.strategy.name(),
                    symbol = %bar.symbol,
                    "전략 analyze 패닉, 이번 캔들 신호 생략"
                );
                return Vec::new();
            }
        };

        let generate_result = AssertUnwindSafe(self.strategy.generate_signals(&bars, &analysis))
            .catch_unwind()
            .await;
        let raw_signals = match generate_result {
            Ok(Ok(signals)) => signals,
            Ok(Err(error)) => {
                warn!(
                    strategy = %self.strategy.name(),
                    symbol = %bar.symbol,
                    %error,
                    "전략 generate_signals 실패, 이번 캔들 신호 생략"
                );
                return Vec::new();
            }
            Err(_) => {
                warn!(
                    strategy = %self.strategy.name(),
                    symbol = %bar.symbol,
                    "전략 generate_signals 패닉, 이번 캔들 신호 생략"
                );
                return Vec::new();
            }
        };

        let events: Vec<SignalEvent> = raw_signals
            .into_iter()
            .filter(|raw| raw.kind != SignalKind::Hold)
            .map(|raw| self.convert(raw, bar))
            .collect();

        if !events.is_empty() {
            debug!(
                strategy = %self.strategy.name(),
                symbol = %bar.symbol,
                count = events.len(),
                "전략 신호 생성"
            );
        }

        events
    }

    /// 원시 신호를 SignalEvent로 변환합니다.
    fn convert(&self, raw: RawSignal, bar: &Bar) -> SignalEvent {
        let mut event = SignalEvent::new(
            self.strategy.name(),
            bar.symbol.clone(),
            raw.kind,
            bar.close,
            bar.timestamp,
        )
        .with_strength(clamp_confidence(raw.confidence))
        .with_levels(raw.stop_loss, raw.take_profit);

        if let Some(reason) = raw.reason {
            event = event.with_reason(reason);
        }
        event
    }
}

/// 확신도를 검증합니다: 유한하면 `[0, 1]` 클램프, 아니면 기본값.
fn clamp_confidence(confidence: Option<f64>) -> f64 {
    match confidence {
        Some(value) if value.is_finite() => value.clamp(0.0, 1.0),
        _ => DEFAULT_STRENGTH,
    }
}

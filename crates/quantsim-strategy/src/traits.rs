//! Strategy trait 정의.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use quantsim_core::{Bar, SignalKind};

/// 전략 코드가 반환하는 오류 타입.
pub type StrategyError = Box<dyn std::error::Error + Send + Sync>;

/// 전략의 시장 분석 결과.
///
/// `analyze`가 생성하고 `generate_signals`가 소비하는 중간 산출물입니다.
/// 지표 값은 이름 → 값 맵으로, 그 외 정보는 metadata로 전달합니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Analysis {
    /// 계산된 지표 값 (예: "sma_short" → 52340.5)
    #[serde(default)]
    pub indicators: HashMap<String, f64>,
    /// 추가 메타데이터
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
}

impl Analysis {
    /// 빈 분석 결과를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 지표 값을 추가합니다.
    pub fn with_indicator(mut self, name: impl Into<String>, value: f64) -> Self {
        self.indicators.insert(name.into(), value);
        self
    }

    /// 지표 값을 조회합니다.
    pub fn indicator(&self, name: &str) -> Option<f64> {
        self.indicators.get(name).copied()
    }
}

/// 전략이 발행하는 원시 신호.
///
/// 어댑터가 신뢰 경계에서 검증한 뒤 `SignalEvent`로 변환합니다.
/// `confidence`가 없거나 유효하지 않으면 기본값 0.5가 적용됩니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawSignal {
    /// 신호 유형
    pub kind: SignalKind,
    /// 신호 확신도 (0.0 ~ 1.0, 선택)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    /// 제안 손절가 (선택)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_loss: Option<f64>,
    /// 제안 익절가 (선택)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub take_profit: Option<f64>,
    /// 신호 이유 (선택)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl RawSignal {
    /// 지정한 유형의 신호를 생성합니다.
    pub fn new(kind: SignalKind) -> Self {
        Self {
            kind,
            confidence: None,
            stop_loss: None,
            take_profit: None,
            reason: None,
        }
    }

    /// 매수 신호.
    pub fn buy() -> Self {
        Self::new(SignalKind::Buy)
    }

    /// 매도 신호.
    pub fn sell() -> Self {
        Self::new(SignalKind::Sell)
    }

    /// 전량 청산 신호.
    pub fn close() -> Self {
        Self::new(SignalKind::Close)
    }

    /// 확신도를 설정합니다.
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }

    /// 손절/익절 가격을 설정합니다.
    pub fn with_levels(mut self, stop_loss: Option<f64>, take_profit: Option<f64>) -> Self {
        self.stop_loss = stop_loss;
        self.take_profit = take_profit;
        self
    }

    /// 신호 이유를 설정합니다.
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

/// 트레이딩 전략 구현을 위한 Strategy trait.
///
/// 전략은 두 단계로 동작합니다: `analyze`가 캔들 윈도우에서 분석 결과를
/// 만들고, `generate_signals`가 그 결과로 원시 신호를 발행합니다.
/// 두 메서드 모두 어댑터의 신뢰 경계 안에서 호출됩니다.
#[async_trait]
pub trait Strategy: Send + Sync {
    /// 전략 식별자 (신호의 strategy_id로 기록됨).
    fn name(&self) -> &str;

    /// 신호 생성에 필요한 최소 캔들 수.
    ///
    /// 히스토리가 이보다 적으면 어댑터는 전략을 호출하지 않습니다.
    fn min_bars(&self) -> usize;

    /// 캔들 윈도우를 분석합니다.
    async fn analyze(&mut self, bars: &[Bar]) -> Result<Analysis, StrategyError>;

    /// 분석 결과로 원시 신호를 생성합니다.
    async fn generate_signals(
        &mut self,
        bars: &[Bar],
        analysis: &Analysis,
    ) -> Result<Vec<RawSignal>, StrategyError>;
}

//! 백테스트 이벤트 타입.
//!
//! 엔진의 바 루프를 구동하는 4종 이벤트를 정의합니다:
//!
//! - `Market` - 새 캔들 도착 (데이터 소스 → 엔진)
//! - `Signal` - 전략이 생성한 매매 신호 (전략 → 엔진)
//! - `Order` - 엔진이 신호를 변환한 주문 (엔진 → 체결 시뮬레이터)
//! - `Fill` - 시뮬레이터가 체결한 결과 (시뮬레이터 → 장부)
//!
//! 한 Market 이벤트에서 인과적으로 파생된 모든 이벤트는 다음 캔들을
//! 요청하기 전에 전부 소진됩니다. 이 전체 순서가 재현성의 근거입니다.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::Bar;

/// 매매 방향.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    /// 매수
    Buy,
    /// 매도
    Sell,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

/// 신호 유형.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    /// 신규 매수
    Buy,
    /// 매도
    Sell,
    /// 관망 (실행하지 않음)
    Hold,
    /// 보유 포지션 전량 청산
    Close,
}

impl SignalKind {
    /// 청산성 신호인지 확인합니다 (Sell 또는 Close).
    pub fn is_exit(&self) -> bool {
        matches!(self, SignalKind::Sell | SignalKind::Close)
    }
}

impl std::fmt::Display for SignalKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SignalKind::Buy => write!(f, "BUY"),
            SignalKind::Sell => write!(f, "SELL"),
            SignalKind::Hold => write!(f, "HOLD"),
            SignalKind::Close => write!(f, "CLOSE"),
        }
    }
}

/// 주문 유형.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderType {
    /// 시장가 (슬리피지 적용)
    Market,
    /// 지정가 (명시 가격으로 체결)
    Limit,
}

/// 전략이 생성한 매매 신호.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalEvent {
    /// 고유 신호 ID
    pub id: Uuid,
    /// 이 신호를 생성한 전략
    pub strategy_id: String,
    /// 거래 심볼
    pub symbol: String,
    /// 신호 발생 시각 (해당 캔들 시각)
    pub timestamp: DateTime<Utc>,
    /// 신호 유형
    pub kind: SignalKind,
    /// 신호 강도 (0.0 ~ 1.0)
    pub strength: f64,
    /// 신호 기준 가격
    pub price: f64,
    /// 제안 손절가 (선택)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_loss: Option<f64>,
    /// 제안 익절가 (선택)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub take_profit: Option<f64>,
    /// 신호 생성 이유 (선택)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl SignalEvent {
    /// 새 신호를 생성합니다. 강도 기본값은 1.0입니다.
    pub fn new(
        strategy_id: impl Into<String>,
        symbol: impl Into<String>,
        kind: SignalKind,
        price: f64,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            strategy_id: strategy_id.into(),
            symbol: symbol.into(),
            timestamp,
            kind,
            strength: 1.0,
            price,
            stop_loss: None,
            take_profit: None,
            reason: None,
        }
    }

    /// 신호 강도를 설정합니다 (0.0 ~ 1.0으로 클램프).
    pub fn with_strength(mut self, strength: f64) -> Self {
        self.strength = strength.clamp(0.0, 1.0);
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

/// 엔진이 신호를 변환한 주문.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderEvent {
    /// 고유 주문 ID
    pub id: Uuid,
    /// 거래 심볼
    pub symbol: String,
    /// 주문 시각
    pub timestamp: DateTime<Utc>,
    /// 주문 유형
    pub order_type: OrderType,
    /// 매매 방향
    pub side: Side,
    /// 주문 수량
    pub quantity: f64,
    /// 지정가 (시장가 주문은 None)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
}

impl OrderEvent {
    /// 시장가 주문을 생성합니다.
    pub fn market(
        symbol: impl Into<String>,
        side: Side,
        quantity: f64,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            symbol: symbol.into(),
            timestamp,
            order_type: OrderType::Market,
            side,
            quantity,
            price: None,
        }
    }

    /// 지정가 주문을 생성합니다.
    pub fn limit(
        symbol: impl Into<String>,
        side: Side,
        quantity: f64,
        price: f64,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            symbol: symbol.into(),
            timestamp,
            order_type: OrderType::Limit,
            side,
            quantity,
            price: Some(price),
        }
    }
}

/// 시뮬레이터가 생성한 체결 결과.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FillEvent {
    /// 고유 체결 ID
    pub id: Uuid,
    /// 원 주문 ID
    pub order_id: Uuid,
    /// 거래 심볼
    pub symbol: String,
    /// 체결 시각
    pub timestamp: DateTime<Utc>,
    /// 매매 방향
    pub side: Side,
    /// 체결 수량
    pub quantity: f64,
    /// 체결 가격 (슬리피지 반영)
    pub fill_price: f64,
    /// 수수료
    pub commission: f64,
    /// 체결 금액 (수량 × 체결가)
    pub fill_cost: f64,
    /// 총 비용 (체결 금액 + 수수료)
    pub total_cost: f64,
}

impl FillEvent {
    /// 새 체결을 생성합니다. 체결 금액과 총 비용은 여기서 계산됩니다.
    pub fn new(
        order_id: Uuid,
        symbol: impl Into<String>,
        side: Side,
        quantity: f64,
        fill_price: f64,
        commission: f64,
        timestamp: DateTime<Utc>,
    ) -> Self {
        let fill_cost = quantity * fill_price;
        Self {
            id: Uuid::new_v4(),
            order_id,
            symbol: symbol.into(),
            timestamp,
            side,
            quantity,
            fill_price,
            commission,
            fill_cost,
            total_cost: fill_cost + commission,
        }
    }
}

/// 백테스트 이벤트.
///
/// 데이터 흐름: Market → Signal → Order → Fill.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// 새 캔들 도착
    Market(Bar),
    /// 전략 신호
    Signal(SignalEvent),
    /// 주문
    Order(OrderEvent),
    /// 체결
    Fill(FillEvent),
}

impl Event {
    /// 이벤트 종류를 반환합니다.
    pub fn kind(&self) -> EventKind {
        match self {
            Event::Market(_) => EventKind::Market,
            Event::Signal(_) => EventKind::Signal,
            Event::Order(_) => EventKind::Order,
            Event::Fill(_) => EventKind::Fill,
        }
    }
}

/// 이벤트 종류 (카운터용 식별자).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// 캔들
    Market,
    /// 신호
    Signal,
    /// 주문
    Order,
    /// 체결
    Fill,
}

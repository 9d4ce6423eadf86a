//! 체결 시뮬레이터.
//!
//! 주문과 현재 가격으로 체결을 생성합니다. 난수 없이 결정적이며,
//! 같은 입력은 항상 같은 체결을 냅니다. (부분 체결과 지연을 무작위로
//! 흉내내는 변형은 페이퍼 트레이딩 모드의 것으로, 이 코어 밖입니다.)

use quantsim_core::{FillEvent, OrderEvent, OrderType, Side};

/// 슬리피지 적용 가격 계산.
///
/// 매수는 높은 가격, 매도는 낮은 가격으로 불리하게 체결됩니다.
pub fn apply_slippage(price: f64, slippage_rate: f64, side: Side) -> f64 {
    match side {
        Side::Buy => price * (1.0 + slippage_rate),
        Side::Sell => price * (1.0 - slippage_rate),
    }
}

/// 결정적 체결 시뮬레이터.
///
/// 수수료율과 슬리피지율은 run 수준 설정 상수입니다.
#[derive(Debug, Clone)]
pub struct ExecutionSimulator {
    commission_rate: f64,
    slippage_rate: f64,
}

impl ExecutionSimulator {
    /// 수수료율/슬리피지율로 시뮬레이터를 생성합니다.
    pub fn new(commission_rate: f64, slippage_rate: f64) -> Self {
        Self {
            commission_rate,
            slippage_rate,
        }
    }

    /// 주문을 체결합니다.
    ///
    /// 체결가 규칙:
    /// - 시장가 매수: `현재가 × (1 + 슬리피지율)`
    /// - 시장가 매도: `현재가 × (1 − 슬리피지율)`
    /// - 지정가: 주문의 명시 가격 (없으면 현재가 그대로)
    ///
    /// 수수료: `수량 × 체결가 × 수수료율`.
    pub fn execute(&self, order: &OrderEvent, current_price: f64) -> FillEvent {
        let fill_price = match order.order_type {
            OrderType::Market => apply_slippage(current_price, self.slippage_rate, order.side),
            OrderType::Limit => order.price.unwrap_or(current_price),
        };

        let commission = order.quantity * fill_price * self.commission_rate;

        FillEvent::new(
            order.id,
            order.symbol.clone(),
            order.side,
            order.quantity,
            fill_price,
            commission,
            order.timestamp,
        )
    }
}

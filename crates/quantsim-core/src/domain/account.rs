//! 계좌 관련 도메인 타입.
//!
//! 포지션, 완료 거래(라운드트립), 자산 곡선 포인트를 정의합니다.
//! 실제 장부 기록 로직은 `quantsim-execution`의 `Portfolio`가 담당합니다.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 한 심볼의 보유 포지션.
///
/// 불변식: `quantity == 0`이면 `avg_price == 0`, `total_cost == 0`,
/// `entry_time == None`이어야 합니다. 전량 청산 시 [`Position::reset`]으로
/// 이 상태로 되돌립니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Position {
    /// 보유 수량 (0 이상)
    pub quantity: f64,
    /// 평균 매입 단가
    pub avg_price: f64,
    /// 누적 매입 비용 (수수료 포함)
    pub total_cost: f64,
    /// 실현 손익 누계
    pub realized_pnl: f64,
    /// 최초 진입 시각 (미보유 시 None)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry_time: Option<DateTime<Utc>>,
}

impl Position {
    /// 새 빈 포지션을 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 포지션을 보유 중인지 확인합니다.
    pub fn is_open(&self) -> bool {
        self.quantity > 0.0
    }

    /// 주어진 가격 기준 평가 금액.
    pub fn market_value(&self, price: f64) -> f64 {
        self.quantity * price
    }

    /// 전량 청산 후 필드를 초기 상태로 되돌립니다.
    ///
    /// 실현 손익 누계는 보존됩니다.
    pub fn reset(&mut self) {
        self.quantity = 0.0;
        self.avg_price = 0.0;
        self.total_cost = 0.0;
        self.entry_time = None;
    }
}

/// 완료된 거래 기록 (진입 → 전량 청산).
///
/// `entry_price`와 `entry_time`은 청산 체결이 포지션을 변경하기 **전에**
/// 캡처한 값입니다. 0이거나 오염된 진입가는 장부 결함입니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    /// 거래 심볼
    pub symbol: String,
    /// 진입 시각
    pub entry_time: DateTime<Utc>,
    /// 청산 시각
    pub exit_time: DateTime<Utc>,
    /// 거래 수량
    pub quantity: f64,
    /// 진입 가격 (청산 직전 평균 단가)
    pub entry_price: f64,
    /// 청산 가격
    pub exit_price: f64,
    /// 실현 손익 (수수료 차감)
    pub pnl: f64,
    /// 손익률 (%)
    pub pnl_pct: f64,
}

impl Trade {
    /// 수익 거래인지 확인합니다.
    pub fn is_win(&self) -> bool {
        self.pnl > 0.0
    }

    /// 보유 기간 (시간 단위).
    pub fn holding_hours(&self) -> f64 {
        (self.exit_time - self.entry_time).num_seconds() as f64 / 3600.0
    }
}

/// 자산 곡선의 한 점.
///
/// 불변식: `equity == cash + holdings`. 캔들 하나당 정확히 한 점이
/// 기록됩니다 (이벤트 소진 후).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    /// 기록 시각
    pub timestamp: DateTime<Utc>,
    /// 총 자산 (현금 + 평가액)
    pub equity: f64,
    /// 현금 잔고
    pub cash: f64,
    /// 포지션 평가액
    pub holdings: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_position_reset_invariant() {
        let mut position = Position {
            quantity: 10.0,
            avg_price: 100.0,
            total_cost: 1001.0,
            realized_pnl: 55.0,
            entry_time: Some(Utc::now()),
        };

        position.reset();

        assert_eq!(position.quantity, 0.0);
        assert_eq!(position.avg_price, 0.0);
        assert_eq!(position.total_cost, 0.0);
        assert!(position.entry_time.is_none());
        // 실현 손익은 보존
        assert_eq!(position.realized_pnl, 55.0);
        assert!(!position.is_open());
    }

    #[test]
    fn test_trade_holding_hours() {
        let entry = Utc::now();
        let trade = Trade {
            symbol: "BTC/USDT".to_string(),
            entry_time: entry,
            exit_time: entry + Duration::hours(36),
            quantity: 1.0,
            entry_price: 100.0,
            exit_price: 110.0,
            pnl: 10.0,
            pnl_pct: 10.0,
        };

        assert!(trade.is_win());
        assert_eq!(trade.holding_hours(), 36.0);
    }
}

//! OHLCV 캔들 데이터.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 한 심볼의 특정 시점 OHLCV 캔들.
///
/// 데이터 소스가 한 번에 하나씩 공급하며, 엔진은 이를 Market 이벤트로
/// 큐에 투입합니다. 금액/가격은 원본 시스템과 동일하게 `f64`를 사용합니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    /// 거래 심볼
    pub symbol: String,
    /// 캔들 시각
    pub timestamp: DateTime<Utc>,
    /// 시가
    pub open: f64,
    /// 고가
    pub high: f64,
    /// 저가
    pub low: f64,
    /// 종가
    pub close: f64,
    /// 거래량
    pub volume: f64,
}

impl Bar {
    /// 새 캔들을 생성합니다.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        symbol: impl Into<String>,
        timestamp: DateTime<Utc>,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// 캔들의 중간 가격 ((고가+저가)/2).
    pub fn mid_price(&self) -> f64 {
        (self.high + self.low) / 2.0
    }

    /// 캔들 범위 (고가-저가).
    pub fn range(&self) -> f64 {
        self.high - self.low
    }
}

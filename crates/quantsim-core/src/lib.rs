//! quantsim 핵심 도메인 타입.
//!
//! 백테스트 엔진의 공용 어휘를 정의합니다:
//!
//! - **도메인 타입**: 캔들([`Bar`]), 이벤트([`Event`]), 포지션/거래/자산 곡선
//! - **이벤트 큐**: 바 단위 인과 순서를 보장하는 FIFO ([`EventQueue`])
//! - **데이터 소스**: 엔진이 의존하는 pull 기반 캔들 공급 계약 ([`DataSource`])
//!
//! 시뮬레이션 한 번(run)은 자신의 큐와 장부를 독점 소유하며,
//! run 사이에 공유되는 가변 상태는 없습니다.

pub mod data;
pub mod domain;
pub mod queue;

pub use data::{DataSource, DataSourceError, HistoricalDataSource, MAX_LATEST_BARS};
pub use domain::{
    Bar, EquityPoint, Event, EventKind, FillEvent, OrderEvent, OrderType, Position, Side,
    SignalEvent, SignalKind, Trade,
};
pub use queue::{EventQueue, EventStats};

//! 도메인 타입 정의.

pub mod account;
pub mod bar;
pub mod event;

pub use account::{EquityPoint, Position, Trade};
pub use bar::Bar;
pub use event::{Event, EventKind, FillEvent, OrderEvent, OrderType, Side, SignalEvent, SignalKind};

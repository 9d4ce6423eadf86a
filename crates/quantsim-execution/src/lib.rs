//! 체결 시뮬레이션과 포지션/현금 장부.
//!
//! - [`ExecutionSimulator`]: 주문 + 현재 가격 → 체결. 슬리피지와 수수료를
//!   적용하며 난수 없이 완전히 결정적입니다.
//! - [`Portfolio`]: run 하나가 독점 소유하는 현금/포지션 장부. 체결 반영,
//!   거래 기록, 자산 곡선 샘플링을 담당합니다.

pub mod portfolio;
pub mod simulator;

pub use portfolio::{Portfolio, PortfolioSummary};
pub use simulator::{apply_slippage, ExecutionSimulator};
